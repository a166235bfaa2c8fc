//! Atomic on-disk persistence for the unified configuration file.

use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use super::model::Configuration;
use crate::Result;

/// Atomically write the configuration to `path`.
///
/// 1. If a file exists at `path`, copy it to a `.bak` sibling
///    (best-effort; a failure here is non-fatal).
/// 2. Serialize the full configuration to a `.tmp` sibling.
/// 3. Atomically rename the `.tmp` over `path`. Only this rename must be
///    atomic; everything before it leaves the canonical file untouched.
/// 4. Remove any stray `.tmp` regardless of success.
///
/// # Errors
///
/// Returns an error if serialization, the temporary write, or the final
/// rename fails.
pub fn write_config(path: &Path, config: &Configuration) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = sibling(path, "tmp");
    let bak_path = sibling(path, "bak");

    if path.exists() {
        if let Err(e) = fs::copy(path, &bak_path) {
            warn!(path = %path.display(), error = %e, "Failed to create .bak backup");
        }
    }

    let result = (|| {
        let contents = serde_json::to_string_pretty(config)?;
        fs::write(&tmp_path, contents)?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    })();

    // Cleanup a stray .tmp whether or not the rename happened.
    if tmp_path.exists() {
        let _ = fs::remove_file(&tmp_path);
    }

    if result.is_ok() {
        debug!(path = %path.display(), "Configuration written");
    }
    result
}

/// Load and sanitize the unified configuration file.
///
/// Returns `None` when the file is absent, unreadable, or not valid
/// JSON. That condition is recovered by the caller (legacy migration,
/// then defaults) and never surfaced as a hard failure.
#[must_use]
pub fn load_config(path: &Path) -> Option<Configuration> {
    if !path.exists() {
        return None;
    }
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read configuration file");
            return None;
        }
    };
    match serde_json::from_str::<serde_json::Value>(&contents) {
        Ok(raw) if raw.is_object() => Some(Configuration::sanitize(&raw)),
        Ok(_) => {
            warn!(path = %path.display(), "Configuration file is not a JSON object");
            None
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to parse configuration file");
            None
        }
    }
}

/// Build `<path>.<ext>` next to the canonical file.
fn sibling(path: &Path, ext: &str) -> std::path::PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(".");
    s.push(ext);
    std::path::PathBuf::from(s)
}
