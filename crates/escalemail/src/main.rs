//! `escalemail` - Stopover report configuration and scan CLI
//!
//! Front-end over `escalemail-core`: manages the unified configuration
//! store and scans plain-text documents for stopover report pages.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use escalemail_core::code::normalize;
use escalemail_core::{
    ConfigStore, PageSource, RecipientSet, SourceError, StopoverProfile, encode_recipients, scan,
};

#[derive(Parser)]
#[command(name = "escalemail", version, about = "Stopover report configuration and scan")]
struct Cli {
    /// Path of the unified configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan a plain-text document (pages separated by form feeds) for
    /// stopover report pages.
    Scan {
        /// Document to scan.
        file: PathBuf,
    },
    /// Show the full configuration: stopovers, recipients, templates.
    Show,
    /// Enable a stopover code.
    Enable {
        /// Three-letter stopover code.
        code: String,
    },
    /// Disable a stopover code, removing its recipients and history.
    Disable {
        /// Three-letter stopover code.
        code: String,
    },
    /// Replace the recipients of a stopover.
    Recipients {
        /// Three-letter stopover code.
        code: String,
        /// Primary recipients.
        #[arg(long)]
        to: Vec<String>,
        /// Carbon-copy recipients.
        #[arg(long)]
        cc: Vec<String>,
        /// Blind-carbon-copy recipients.
        #[arg(long)]
        bcc: Vec<String>,
    },
    /// Record that a report was sent for a stopover, stamped now (UTC).
    MarkSent {
        /// Three-letter stopover code.
        code: String,
    },
    /// Show or update the shared subject/body templates.
    Templates {
        /// New subject template.
        #[arg(long)]
        subject: Option<String>,
        /// New body template.
        #[arg(long)]
        body: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "escalemail=info,escalemail_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let path = cli.config.unwrap_or_else(default_config_path);
    info!(path = %path.display(), "Opening configuration");
    let store = ConfigStore::open(path);

    match cli.command {
        Command::Scan { file } => cmd_scan(&file),
        Command::Show => {
            cmd_show(&store);
            Ok(())
        }
        Command::Enable { code } => {
            store.add_stopover(&code)?;
            println!("enabled {}", normalize(&code));
            Ok(())
        }
        Command::Disable { code } => {
            store.remove_stopover(&code)?;
            println!("disabled {}", normalize(&code));
            Ok(())
        }
        Command::Recipients { code, to, cc, bcc } => cmd_recipients(&store, &code, to, cc, bcc),
        Command::MarkSent { code } => {
            store.set_last_sent(&code, None)?;
            let code = normalize(&code);
            let stamped = store.get_last_sent().remove(&code).unwrap_or_default();
            println!("{code} marked sent at {stamped}");
            Ok(())
        }
        Command::Templates { subject, body } => {
            if let Some(subject) = subject {
                store.set_subject(&subject)?;
            }
            if let Some(body) = body {
                store.set_body(&body)?;
            }
            let (subject, body) = store.get_templates().effective();
            println!("subject: {subject}");
            println!("body:\n{body}");
            Ok(())
        }
    }
}

/// Default location of the unified configuration file.
fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("escalemail")
        .join("app_config.json")
}

fn cmd_scan(file: &Path) -> anyhow::Result<()> {
    let document = TextDocument::load(file)
        .with_context(|| format!("cannot read document {}", file.display()))?;
    let stopovers = scan(&document)?;

    if stopovers.is_empty() {
        println!("no stopover pages detected");
    } else {
        for stopover in &stopovers {
            println!("{stopover}");
        }
    }
    Ok(())
}

fn cmd_show(store: &ConfigStore) {
    let profiles = store.all_profiles();
    if profiles.is_empty() {
        println!("no stopovers configured");
    }
    for profile in &profiles {
        print_profile(profile);
    }
    let (subject, body) = store.get_templates().effective();
    println!("subject template: {subject}");
    println!("body template:\n{body}");
}

fn print_profile(profile: &StopoverProfile) {
    let state = if profile.enabled { "enabled" } else { "disabled" };
    println!("{} [{state}]", profile.code);
    for to in &profile.recipients.to {
        println!("  to:  {to}");
    }
    for cc in &profile.recipients.cc {
        println!("  cc:  {cc}");
    }
    for bcc in &profile.recipients.bcc {
        println!("  bcc: {bcc}");
    }
    if let Some(last_sent) = &profile.last_sent {
        println!("  last sent: {last_sent}");
    }
}

fn cmd_recipients(
    store: &ConfigStore,
    code: &str,
    to: Vec<String>,
    cc: Vec<String>,
    bcc: Vec<String>,
) -> anyhow::Result<()> {
    let recipients = RecipientSet { to, cc, bcc };
    if recipients.is_empty() {
        anyhow::bail!("at least one of --to, --cc, --bcc is required");
    }
    store.set_mapping(code, encode_recipients(&recipients))?;
    let profile = store.profile(code)?;
    print_profile(&profile);
    Ok(())
}

/// Plain-text document whose pages are separated by form-feed
/// characters. Loaded fully into memory at open time.
struct TextDocument {
    pages: Vec<String>,
}

impl TextDocument {
    fn load(path: &Path) -> std::io::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(Self {
            pages: contents.split('\u{c}').map(str::to_string).collect(),
        })
    }
}

impl PageSource for TextDocument {
    fn page_count(&self) -> Result<usize, SourceError> {
        Ok(self.pages.len())
    }

    fn page_text(&self, page: usize) -> Result<String, SourceError> {
        self.pages
            .get(page - 1)
            .cloned()
            .ok_or_else(|| SourceError::Page {
                page,
                reason: "page out of range".to_string(),
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use escalemail_core::Stopover;
    use std::io::Write;

    #[test]
    fn test_text_document_splits_on_form_feed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "sommaire\u{c}Escale [DKR]-Bilan avec objectifs\u{c}annexe"
        )
        .unwrap();

        let document = TextDocument::load(file.path()).unwrap();
        assert_eq!(document.page_count().unwrap(), 3);
        assert_eq!(
            scan(&document).unwrap(),
            vec![Stopover::new("DKR", 2)]
        );
    }

    #[test]
    fn test_text_document_single_page_without_form_feed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "ABJ-Bilan et objectifs").unwrap();

        let document = TextDocument::load(file.path()).unwrap();
        assert_eq!(document.page_count().unwrap(), 1);
        assert_eq!(document.page_text(1).unwrap(), "ABJ-Bilan et objectifs");
    }

    #[test]
    fn test_text_document_out_of_range_page() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "x").unwrap();

        let document = TextDocument::load(file.path()).unwrap();
        assert!(matches!(
            document.page_text(2),
            Err(SourceError::Page { page: 2, .. })
        ));
    }
}
