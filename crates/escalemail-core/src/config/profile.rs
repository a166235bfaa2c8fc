//! Stopover profile facade.
//!
//! A profile is the structured per-stopover view the UI works with:
//! decoded recipients, effective templates, enablement, and the
//! last-sent timestamp. The store itself only persists the flat encoded
//! recipient list; this facade performs the codec encode/decode at the
//! save/load boundary.

use super::model::Templates;
use super::store::ConfigStore;
use crate::recipients::{RecipientSet, decode_recipients, encode_recipients};
use crate::{Result, code};

/// Per-stopover email configuration, decoded for consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopoverProfile {
    /// Normalized stopover code.
    pub code: String,
    /// Effective subject template (persisted value or default).
    pub subject: String,
    /// Effective body template (persisted value or default).
    pub body: String,
    /// Decoded To/Cc/Bcc recipients.
    pub recipients: RecipientSet,
    /// Whether the code is present in the stopover set.
    pub enabled: bool,
    /// ISO-8601 UTC timestamp of the last send, if any.
    pub last_sent: Option<String>,
}

impl ConfigStore {
    /// Build the profile for one stopover code.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidCode`] for a malformed code.
    pub fn profile(&self, raw_code: &str) -> Result<StopoverProfile> {
        let code = code::validate(raw_code)?;
        let encoded = self.get_mappings().remove(&code).unwrap_or_default();
        let (subject, body) = self.get_templates().effective();

        Ok(StopoverProfile {
            enabled: self.is_stopover_enabled(&code),
            last_sent: self.get_last_sent().remove(&code),
            recipients: decode_recipients(&encoded),
            subject,
            body,
            code,
        })
    }

    /// Persist a profile: recipients (re-encoded), enablement, and
    /// last-sent.
    ///
    /// Saving a disabled profile removes the stopover and purges its
    /// mapping and last-sent entries, keeping the schema invariant that
    /// mapping keys always belong to the stopover set.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidCode`] for a malformed code, or a
    /// persistence error from the underlying setters.
    pub fn save_profile(&self, profile: &StopoverProfile) -> Result<()> {
        let code = code::validate(&profile.code)?;
        if !profile.enabled {
            return self.remove_stopover(&code);
        }

        self.set_mapping(&code, encode_recipients(&profile.recipients))?;
        if let Some(ts) = &profile.last_sent {
            self.set_last_sent(&code, Some(ts))?;
        }
        Ok(())
    }

    /// Profiles for every known stopover, sorted by code.
    ///
    /// The set of known codes is the union of the stopover list and the
    /// mapping keys, so entries left behind by older data still appear.
    #[must_use]
    pub fn all_profiles(&self) -> Vec<StopoverProfile> {
        let mut codes: Vec<String> = self.get_stopovers();
        for key in self.get_mappings().into_keys() {
            if !codes.contains(&key) {
                codes.push(key);
            }
        }
        codes.sort();
        codes
            .into_iter()
            .filter_map(|c| self.profile(&c).ok())
            .collect()
    }

    /// Remove every trace of a stopover: list entry, mapping, last-sent.
    ///
    /// # Errors
    ///
    /// Returns the persistence error if the disk write failed.
    pub fn delete_profile(&self, code: &str) -> Result<()> {
        self.remove_stopover(code)?;
        self.remove_mapping(code)
    }

    /// Add one plain (To) recipient to a stopover's mapping.
    ///
    /// Returns `true` when the recipient was actually added; a blank
    /// address or an exact duplicate is a no-op. The code is implicitly
    /// enabled. The edit runs under a single store lock so concurrent
    /// additions to the same code cannot lose each other.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidCode`] for a malformed code, or
    /// the persistence error if the disk write failed.
    pub fn add_recipient(&self, raw_code: &str, address: &str) -> Result<bool> {
        let code = code::validate(raw_code)?;
        let address = address.trim().to_string();
        if address.is_empty() {
            return Ok(false);
        }

        self.update_mapping(&code, |current| {
            if current.contains(&address) {
                false
            } else {
                current.push(address);
                true
            }
        })
    }

    /// Remove one recipient (exact encoded entry) from a stopover's
    /// mapping. Removing the last recipient deletes the mapping entry.
    ///
    /// Returns `true` when something was removed.
    ///
    /// # Errors
    ///
    /// Returns the persistence error if the disk write failed.
    pub fn remove_recipient(&self, raw_code: &str, address: &str) -> Result<bool> {
        let address = address.trim().to_string();
        self.update_mapping(raw_code, |current| {
            let before = current.len();
            current.retain(|a| *a != address);
            current.len() != before
        })
    }
}
