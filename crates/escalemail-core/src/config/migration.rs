//! One-shot migration from legacy configuration fragments.
//!
//! Older releases persisted several narrow files instead of one unified
//! configuration: a recipient-mapping file, a templates file, a free-text
//! body file, and a generic key/value config file. The migrator merges
//! whatever subset exists into a [`Configuration`] and, once the unified
//! file has been written, deletes the fragments so the two generations
//! cannot drift apart.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info, warn};

use super::model::Configuration;

/// Legacy recipient-mapping candidates, in priority order.
const MAPPING_FILES: [&str; 2] = ["stopover_emails.json", "mappings.json"];

/// Legacy structured templates file.
const TEMPLATES_FILE: &str = "templates.json";

/// Legacy free-text body template file.
const TEMPLATE_TXT_FILE: &str = "email_template.txt";

/// Legacy all-purpose config file (only its `last_sent` object is read).
const CONFIG_FILE: &str = "config.json";

/// Reads and merges legacy fragment files from one directory.
pub struct LegacyMigrator {
    legacy_dir: PathBuf,
}

impl LegacyMigrator {
    /// Create a migrator scanning the given directory for fragments.
    #[must_use]
    pub fn new(legacy_dir: impl Into<PathBuf>) -> Self {
        Self {
            legacy_dir: legacy_dir.into(),
        }
    }

    /// Merge all discovered fragments into a sanitized configuration.
    ///
    /// Missing or unparsable fragments are skipped; when nothing is
    /// found the default configuration is returned rather than an error.
    /// If no explicit stopover list is found, the mapping keys become
    /// the stopover list.
    #[must_use]
    pub fn migrate(&self) -> Configuration {
        let mut cfg = Configuration::default();

        let (mappings, stopovers) = self.read_mappings();
        cfg.stopovers = if stopovers.is_empty() {
            mappings.keys().cloned().collect()
        } else {
            stopovers
        };
        cfg.mappings = mappings;

        let (subject, body) = self.read_templates();
        cfg.templates.subject = subject;
        cfg.templates.body = body;

        cfg.last_sent = self.read_last_sent();

        if cfg == Configuration::default() {
            debug!(dir = %self.legacy_dir.display(), "No legacy fragments found");
        } else {
            info!(dir = %self.legacy_dir.display(), "Migrated legacy configuration fragments");
        }
        // Run the merged result through the sanitizer so migrated data
        // obeys the same schema rules as a loaded unified file.
        let raw = serde_json::to_value(&cfg).unwrap_or(Value::Null);
        Configuration::sanitize(&raw)
    }

    /// Delete every legacy fragment this migrator scans.
    ///
    /// Best-effort: failures are logged and swallowed.
    pub fn delete_fragments(&self) {
        let all = MAPPING_FILES
            .iter()
            .chain([&TEMPLATES_FILE, &TEMPLATE_TXT_FILE, &CONFIG_FILE]);
        for name in all {
            let path = self.legacy_dir.join(name);
            if path.exists() {
                match fs::remove_file(&path) {
                    Ok(()) => debug!(path = %path.display(), "Deleted legacy fragment"),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Failed to delete legacy fragment");
                    }
                }
            }
        }
    }

    /// Mappings and stopover list from the first matching candidate.
    ///
    /// Accepts a flat `{code: [addr, ...]}` shape or a nested
    /// `{mappings: {...}, stopovers: [...]}` shape.
    fn read_mappings(&self) -> (BTreeMap<String, Vec<String>>, Vec<String>) {
        let mut mappings = BTreeMap::new();
        let mut stopovers = Vec::new();

        for name in MAPPING_FILES {
            let Some(data) = read_json(&self.legacy_dir.join(name)) else {
                continue;
            };
            let Some(obj) = data.as_object() else {
                continue;
            };
            if !obj.is_empty() && obj.values().all(Value::is_array) {
                // Flat mapping shape.
                for (key, value) in obj {
                    mappings.insert(key.clone(), string_list(value));
                }
            } else {
                if let Some(nested) = obj.get("mappings").and_then(Value::as_object) {
                    for (key, value) in nested {
                        mappings.insert(key.clone(), string_list(value));
                    }
                }
                if let Some(list) = obj.get("stopovers").and_then(Value::as_array) {
                    stopovers = list
                        .iter()
                        .filter_map(|v| v.as_str().map(ToString::to_string))
                        .collect();
                }
            }
            if !mappings.is_empty() || !stopovers.is_empty() {
                break;
            }
        }
        (mappings, stopovers)
    }

    /// Templates from the structured JSON file, body falling back to
    /// the free-text template file.
    fn read_templates(&self) -> (String, String) {
        let mut subject = None;
        let mut body = None;

        if let Some(data) = read_json(&self.legacy_dir.join(TEMPLATES_FILE))
            && let Some(obj) = data.as_object()
        {
            subject = obj
                .get("subject")
                .and_then(Value::as_str)
                .map(ToString::to_string);
            body = obj
                .get("body")
                .and_then(Value::as_str)
                .map(ToString::to_string);
        }

        if body.is_none() {
            body = read_text(&self.legacy_dir.join(TEMPLATE_TXT_FILE));
        }

        (subject.unwrap_or_default(), body.unwrap_or_default())
    }

    /// `last_sent` entries from the legacy all-purpose config file.
    fn read_last_sent(&self) -> BTreeMap<String, String> {
        let mut last_sent = BTreeMap::new();
        if let Some(data) = read_json(&self.legacy_dir.join(CONFIG_FILE))
            && let Some(entries) = data.get("last_sent").and_then(Value::as_object)
        {
            for (key, value) in entries {
                if let Some(ts) = value.as_str() {
                    last_sent.insert(key.clone(), ts.to_string());
                }
            }
        }
        last_sent
    }
}

/// Read and parse a JSON file, `None` on any failure.
fn read_json(path: &Path) -> Option<Value> {
    if !path.exists() {
        return None;
    }
    match fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unparsable legacy fragment");
                None
            }
        },
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Skipping unreadable legacy fragment");
            None
        }
    }
}

/// Read a text file, `None` on any failure or when empty.
fn read_text(path: &Path) -> Option<String> {
    if !path.exists() {
        return None;
    }
    match fs::read_to_string(path) {
        Ok(contents) if !contents.is_empty() => Some(contents),
        Ok(_) => None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Skipping unreadable legacy fragment");
            None
        }
    }
}

/// Accept a list of strings or a lone string as a recipient list.
fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Value::String(s) => vec![s.clone()],
        _ => Vec::new(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_migrate_flat_mapping_shape() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("stopover_emails.json"),
            r#"{"ABJ": ["a@x.com"], "DKR": ["d@x.com", "e@x.com"]}"#,
        )
        .unwrap();

        let cfg = LegacyMigrator::new(dir.path()).migrate();
        assert_eq!(cfg.mappings["ABJ"], vec!["a@x.com"]);
        assert_eq!(cfg.mappings["DKR"], vec!["d@x.com", "e@x.com"]);
        // Stopovers default to the mapping keys.
        assert_eq!(cfg.stopovers, vec!["ABJ", "DKR"]);
    }

    #[test]
    fn test_migrate_nested_mapping_shape() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("mappings.json"),
            r#"{"mappings": {"ABJ": ["a@x.com"], "NDJ": "solo@x.com"}, "stopovers": ["ABJ"]}"#,
        )
        .unwrap();

        let cfg = LegacyMigrator::new(dir.path()).migrate();
        assert_eq!(cfg.mappings["ABJ"], vec!["a@x.com"]);
        assert_eq!(cfg.mappings["NDJ"], vec!["solo@x.com"]);
        assert_eq!(cfg.stopovers, vec!["ABJ"]);
    }

    #[test]
    fn test_first_matching_mapping_file_wins() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("stopover_emails.json"),
            r#"{"ABJ": ["first@x.com"]}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("mappings.json"),
            r#"{"ABJ": ["second@x.com"]}"#,
        )
        .unwrap();

        let cfg = LegacyMigrator::new(dir.path()).migrate();
        assert_eq!(cfg.mappings["ABJ"], vec!["first@x.com"]);
    }

    #[test]
    fn test_templates_json_preferred_body_falls_back_to_txt() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("templates.json"),
            r#"{"subject": "Sujet {{stopover_code}}"}"#,
        )
        .unwrap();
        fs::write(dir.path().join("email_template.txt"), "Corps du message").unwrap();

        let cfg = LegacyMigrator::new(dir.path()).migrate();
        assert_eq!(cfg.templates.subject, "Sujet {{stopover_code}}");
        assert_eq!(cfg.templates.body, "Corps du message");
    }

    #[test]
    fn test_last_sent_read_from_config_json() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("config.json"),
            r#"{"other": 1, "last_sent": {"ABJ": "2025-07-31T10:22:45Z", "bad": 3}}"#,
        )
        .unwrap();

        let cfg = LegacyMigrator::new(dir.path()).migrate();
        assert_eq!(cfg.last_sent.len(), 1);
        assert_eq!(cfg.last_sent["ABJ"], "2025-07-31T10:22:45Z");
    }

    #[test]
    fn test_migrate_empty_dir_yields_default() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            LegacyMigrator::new(dir.path()).migrate(),
            Configuration::default()
        );
    }

    #[test]
    fn test_unparsable_fragment_is_skipped() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("stopover_emails.json"), "{broken").unwrap();
        fs::write(dir.path().join("mappings.json"), r#"{"ABJ": ["a@x.com"]}"#).unwrap();

        let cfg = LegacyMigrator::new(dir.path()).migrate();
        assert_eq!(cfg.mappings["ABJ"], vec!["a@x.com"]);
    }

    #[test]
    fn test_delete_fragments_removes_all() {
        let dir = TempDir::new().unwrap();
        for name in [
            "stopover_emails.json",
            "mappings.json",
            "templates.json",
            "email_template.txt",
            "config.json",
        ] {
            fs::write(dir.path().join(name), "{}").unwrap();
        }

        LegacyMigrator::new(dir.path()).delete_fragments();
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
