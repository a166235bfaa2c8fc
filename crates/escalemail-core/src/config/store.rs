//! The unified configuration store.
//!
//! Sole owner of the in-memory [`Configuration`]: domain-scoped getters
//! and setters, synchronous atomic persistence, and observer fan-out.
//!
//! Every setter acquires the exclusive state lock, mutates, persists to
//! disk, and then notifies observers. If the disk write fails the
//! in-memory mutation is kept and stays authoritative for the rest of
//! the process; the failure is logged at the write site and returned to
//! the caller so it can be surfaced. Observers still run in that case.

use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{SecondsFormat, Utc};
use tracing::{error, info, warn};

use super::migration::LegacyMigrator;
use super::model::{Configuration, Templates};
use super::persist;
use crate::{Result, code};

/// Observer of the stopover list domain.
pub type StopoverObserver = Arc<dyn Fn(&[String]) + Send + Sync>;
/// Observer of the mappings domain.
pub type MappingObserver = Arc<dyn Fn(&BTreeMap<String, Vec<String>>) + Send + Sync>;
/// Observer of the templates domain.
pub type TemplateObserver = Arc<dyn Fn(&Templates) + Send + Sync>;
/// Observer of the last-sent domain.
pub type LastSentObserver = Arc<dyn Fn(&BTreeMap<String, String>) + Send + Sync>;
/// Observer of the whole configuration, fired after any domain change.
pub type GlobalObserver = Arc<dyn Fn(&Configuration) + Send + Sync>;

/// Configuration domains with dedicated observer channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Domain {
    Stopovers,
    Mappings,
    Templates,
    LastSent,
}

#[derive(Default, Clone)]
struct Observers {
    stopovers: Vec<StopoverObserver>,
    mappings: Vec<MappingObserver>,
    templates: Vec<TemplateObserver>,
    last_sent: Vec<LastSentObserver>,
    global: Vec<GlobalObserver>,
}

/// Single source of truth for the persisted configuration.
///
/// Construct one instance per process with [`ConfigStore::open`] and
/// share it by handle (for example `Arc<ConfigStore>`); there is no
/// hidden global instance.
pub struct ConfigStore {
    path: PathBuf,
    state: Mutex<Configuration>,
    observers: Mutex<Observers>,
}

/// Lock a mutex, recovering the inner value if a holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ConfigStore {
    /// Open the store backed by the unified file at `path`.
    ///
    /// Loads the unified file if it exists and parses; otherwise runs a
    /// one-shot migration from legacy fragments found next to it, writes
    /// the unified file, and deletes the fragments. When neither source
    /// yields anything the default configuration is used. Load failures
    /// are recovered here and never surfaced.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let config = if let Some(config) = persist::load_config(&path) {
            config
        } else {
            let legacy_dir = path.parent().map(PathBuf::from).unwrap_or_default();
            let migrator = LegacyMigrator::new(legacy_dir);
            let migrated = migrator.migrate();
            match persist::write_config(&path, &migrated) {
                Ok(()) => {
                    info!(path = %path.display(), "Unified configuration written");
                    migrator.delete_fragments();
                }
                Err(e) => {
                    error!(path = %path.display(), error = %e, "Failed to write migrated configuration");
                }
            }
            migrated
        };

        Self {
            path,
            state: Mutex::new(config),
            observers: Mutex::new(Observers::default()),
        }
    }

    /// Path of the unified configuration file.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    // Getters. All return deep copies; callers cannot mutate store state
    // through them.

    /// Snapshot of the entire configuration.
    #[must_use]
    pub fn get_all(&self) -> Configuration {
        lock(&self.state).clone()
    }

    /// Enabled stopover codes, in display order.
    #[must_use]
    pub fn get_stopovers(&self) -> Vec<String> {
        lock(&self.state).stopovers.clone()
    }

    /// Stopover code to encoded recipient list.
    #[must_use]
    pub fn get_mappings(&self) -> BTreeMap<String, Vec<String>> {
        lock(&self.state).mappings.clone()
    }

    /// Subject and body templates.
    #[must_use]
    pub fn get_templates(&self) -> Templates {
        lock(&self.state).templates.clone()
    }

    /// Stopover code to last-sent timestamp.
    #[must_use]
    pub fn get_last_sent(&self) -> BTreeMap<String, String> {
        lock(&self.state).last_sent.clone()
    }

    /// Whether the normalized code is present in the stopover list.
    #[must_use]
    pub fn is_stopover_enabled(&self, code: &str) -> bool {
        let code = code::normalize(code);
        lock(&self.state).stopovers.iter().any(|s| *s == code)
    }

    // Observer registration. Callbacks fire in registration order,
    // domain channels first, then the global channel. Registering from
    // inside a callback is allowed; the new observer only sees changes
    // after the fan-out in progress.

    /// Register an observer of the stopover list.
    pub fn on_stopovers_changed(&self, cb: impl Fn(&[String]) + Send + Sync + 'static) {
        lock(&self.observers).stopovers.push(Arc::new(cb));
    }

    /// Register an observer of the mappings.
    pub fn on_mappings_changed(
        &self,
        cb: impl Fn(&BTreeMap<String, Vec<String>>) + Send + Sync + 'static,
    ) {
        lock(&self.observers).mappings.push(Arc::new(cb));
    }

    /// Register an observer of the templates.
    pub fn on_templates_changed(&self, cb: impl Fn(&Templates) + Send + Sync + 'static) {
        lock(&self.observers).templates.push(Arc::new(cb));
    }

    /// Register an observer of the last-sent map.
    pub fn on_last_sent_changed(
        &self,
        cb: impl Fn(&BTreeMap<String, String>) + Send + Sync + 'static,
    ) {
        lock(&self.observers).last_sent.push(Arc::new(cb));
    }

    /// Register a global observer fired after any domain change.
    pub fn on_config_changed(&self, cb: impl Fn(&Configuration) + Send + Sync + 'static) {
        lock(&self.observers).global.push(Arc::new(cb));
    }

    // Setters. Each persists synchronously before observers run.

    /// Replace the stopover set.
    ///
    /// Codes are normalized to uppercase and deduplicated preserving
    /// first occurrence. Mappings and last-sent entries for codes absent
    /// from the new set are pruned.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidCode`] (before any mutation) if a
    /// code is not three alphabetic characters, or the persistence error
    /// if the disk write failed after the in-memory mutation.
    pub fn set_stopovers<I, S>(&self, codes: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut desired: Vec<String> = Vec::new();
        for raw in codes {
            let validated = code::validate(raw.as_ref())?;
            if !desired.contains(&validated) {
                desired.push(validated);
            }
        }

        let mut state = lock(&self.state);
        state.stopovers.clone_from(&desired);
        state.mappings = std::mem::take(&mut state.mappings)
            .into_iter()
            .map(|(k, v)| (code::normalize(&k), v))
            .filter(|(k, _)| desired.contains(k))
            .collect();
        state.last_sent = std::mem::take(&mut state.last_sent)
            .into_iter()
            .map(|(k, v)| (code::normalize(&k), v))
            .filter(|(k, _)| desired.contains(k))
            .collect();
        self.commit(
            state,
            true,
            &[Domain::Stopovers, Domain::Mappings, Domain::LastSent],
        )
    }

    /// Add one stopover code. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidCode`] for a malformed code, or
    /// the persistence error if the disk write failed.
    pub fn add_stopover(&self, code: &str) -> Result<()> {
        let code = code::validate(code)?;
        let mut state = lock(&self.state);
        let changed = !state.stopovers.contains(&code);
        if changed {
            state.stopovers.push(code);
        }
        self.commit(state, changed, &[Domain::Stopovers])
    }

    /// Remove one stopover code, purging its mapping and last-sent
    /// entries. Idempotent; the code is normalized but not validated so
    /// malformed historical keys can always be removed.
    ///
    /// # Errors
    ///
    /// Returns the persistence error if the disk write failed.
    pub fn remove_stopover(&self, code: &str) -> Result<()> {
        let code = code::normalize(code);
        let mut state = lock(&self.state);
        let before = state.stopovers.len();
        state.stopovers.retain(|s| *s != code);
        let removed_code = state.stopovers.len() != before;
        let removed_mapping = state.mappings.remove(&code).is_some();
        let removed_last_sent = state.last_sent.remove(&code).is_some();
        let changed = removed_code || removed_mapping || removed_last_sent;
        self.commit(
            state,
            changed,
            &[Domain::Stopovers, Domain::Mappings, Domain::LastSent],
        )
    }

    /// Store a recipient list for a code, verbatim.
    ///
    /// Callers wanting Cc/Bcc tagging encode through
    /// [`crate::encode_recipients`] first. Duplicate entries are dropped
    /// (idempotent add) and the code is implicitly added to the stopover
    /// set if absent.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidCode`] for a malformed code, or
    /// the persistence error if the disk write failed.
    pub fn set_mapping(&self, code: &str, recipients: Vec<String>) -> Result<()> {
        let code = code::validate(code)?;
        let mut deduped: Vec<String> = Vec::with_capacity(recipients.len());
        for addr in recipients {
            if !deduped.contains(&addr) {
                deduped.push(addr);
            }
        }

        let mut state = lock(&self.state);
        state.mappings.insert(code.clone(), deduped);
        if !state.stopovers.contains(&code) {
            state.stopovers.push(code);
        }
        self.commit(state, true, &[Domain::Mappings, Domain::Stopovers])
    }

    /// Delete the mapping entry for a code.
    ///
    /// The code stays in the stopover set.
    ///
    /// # Errors
    ///
    /// Returns the persistence error if the disk write failed.
    pub fn remove_mapping(&self, code: &str) -> Result<()> {
        let code = code::normalize(code);
        let mut state = lock(&self.state);
        let changed = state.mappings.remove(&code).is_some();
        self.commit(state, changed, &[Domain::Mappings])
    }

    /// Read-modify-write one mapping entry under a single lock
    /// acquisition, so concurrent edits of the same code cannot lose
    /// each other's changes.
    ///
    /// The closure receives the current recipient list (empty when the
    /// entry is absent) and returns whether it changed anything. On a
    /// change the list is deduplicated and stored; an emptied list
    /// removes the entry instead, and a valid code is implicitly added
    /// to the stopover set. Returns the closure's verdict. The code is
    /// normalized but not validated so entries under malformed
    /// historical keys can still be edited.
    ///
    /// # Errors
    ///
    /// Returns the persistence error if the disk write failed.
    pub fn update_mapping(
        &self,
        code: &str,
        update: impl FnOnce(&mut Vec<String>) -> bool,
    ) -> Result<bool> {
        let code = code::normalize(code);
        let mut state = lock(&self.state);
        let mut current = state.mappings.get(&code).cloned().unwrap_or_default();
        if !update(&mut current) {
            return Ok(false);
        }

        let mut domains = vec![Domain::Mappings];
        if current.is_empty() {
            state.mappings.remove(&code);
        } else {
            let mut deduped: Vec<String> = Vec::with_capacity(current.len());
            for addr in current {
                if !deduped.contains(&addr) {
                    deduped.push(addr);
                }
            }
            state.mappings.insert(code.clone(), deduped);
            if code::is_valid(&code) && !state.stopovers.contains(&code) {
                state.stopovers.push(code);
                domains.push(Domain::Stopovers);
            }
        }
        self.commit(state, true, &domains)?;
        Ok(true)
    }

    /// Update both template fields.
    ///
    /// # Errors
    ///
    /// Returns the persistence error if the disk write failed.
    pub fn set_templates(&self, subject: &str, body: &str) -> Result<()> {
        let mut state = lock(&self.state);
        state.templates = Templates {
            subject: subject.to_string(),
            body: body.to_string(),
        };
        self.commit(state, true, &[Domain::Templates])
    }

    /// Update the subject template.
    ///
    /// # Errors
    ///
    /// Returns the persistence error if the disk write failed.
    pub fn set_subject(&self, subject: &str) -> Result<()> {
        let mut state = lock(&self.state);
        state.templates.subject = subject.to_string();
        self.commit(state, true, &[Domain::Templates])
    }

    /// Update the body template.
    ///
    /// # Errors
    ///
    /// Returns the persistence error if the disk write failed.
    pub fn set_body(&self, body: &str) -> Result<()> {
        let mut state = lock(&self.state);
        state.templates.body = body.to_string();
        self.commit(state, true, &[Domain::Templates])
    }

    /// Record when a stopover report was last sent.
    ///
    /// Stamps the current UTC time when no timestamp is given. The code
    /// is implicitly added to the stopover set so the last-sent map
    /// never references an unknown code.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidCode`] for a malformed code, or
    /// the persistence error if the disk write failed.
    pub fn set_last_sent(&self, code: &str, timestamp: Option<&str>) -> Result<()> {
        let code = code::validate(code)?;
        let ts = timestamp
            .filter(|t| !t.is_empty())
            .map_or_else(now_utc, ToString::to_string);

        let mut state = lock(&self.state);
        state.last_sent.insert(code.clone(), ts);
        let mut domains = vec![Domain::LastSent];
        if !state.stopovers.contains(&code) {
            state.stopovers.push(code);
            domains.push(Domain::Stopovers);
        }
        self.commit(state, true, &domains)
    }

    /// Forget the last-sent timestamp for a code.
    ///
    /// # Errors
    ///
    /// Returns the persistence error if the disk write failed.
    pub fn clear_last_sent(&self, code: &str) -> Result<()> {
        let code = code::normalize(code);
        let mut state = lock(&self.state);
        let changed = state.last_sent.remove(&code).is_some();
        self.commit(state, changed, &[Domain::LastSent])
    }

    /// Replace stopovers, mappings, and last-sent in one mutation.
    ///
    /// Keys are normalized to uppercase; mapping and last-sent entries
    /// whose code is absent from the new stopover list are pruned.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidCode`] (before any mutation) for a
    /// malformed stopover code, or the persistence error if the disk
    /// write failed.
    pub fn replace_all(
        &self,
        stopovers: Vec<String>,
        mappings: BTreeMap<String, Vec<String>>,
        last_sent: BTreeMap<String, String>,
    ) -> Result<()> {
        let mut desired: Vec<String> = Vec::new();
        for raw in stopovers {
            let validated = code::validate(&raw)?;
            if !desired.contains(&validated) {
                desired.push(validated);
            }
        }
        let mappings: BTreeMap<String, Vec<String>> = mappings
            .into_iter()
            .map(|(k, v)| (code::normalize(&k), v))
            .filter(|(k, _)| desired.contains(k))
            .collect();
        let last_sent: BTreeMap<String, String> = last_sent
            .into_iter()
            .map(|(k, v)| (code::normalize(&k), v))
            .filter(|(k, _)| desired.contains(k))
            .collect();

        let mut state = lock(&self.state);
        state.stopovers = desired;
        state.mappings = mappings;
        state.last_sent = last_sent;
        self.commit(
            state,
            true,
            &[Domain::Stopovers, Domain::Mappings, Domain::LastSent],
        )
    }

    /// Persist under the state lock, then fan out to observers.
    ///
    /// The snapshot and a copy of the observer registry are taken
    /// before the state lock is released, so every notification carries
    /// exactly the state its mutation produced. Callbacks then run with
    /// no store lock held: they may call getters and setters and
    /// register further observers without deadlocking the store.
    fn commit(
        &self,
        state: MutexGuard<'_, Configuration>,
        changed: bool,
        domains: &[Domain],
    ) -> Result<()> {
        let persist_result = if changed {
            persist::write_config(&self.path, &state)
        } else {
            Ok(())
        };
        if let Err(e) = &persist_result {
            error!(path = %self.path.display(), error = %e,
                "Configuration write failed; in-memory state remains authoritative");
        }

        let snapshot = state.clone();
        // Cheap Arc clones; dispatching from the copy keeps both store
        // locks out of the callback's reach.
        let observers = lock(&self.observers).clone();
        drop(state);

        for domain in domains {
            match domain {
                Domain::Stopovers => {
                    for cb in &observers.stopovers {
                        invoke(|| cb(&snapshot.stopovers));
                    }
                }
                Domain::Mappings => {
                    for cb in &observers.mappings {
                        invoke(|| cb(&snapshot.mappings));
                    }
                }
                Domain::Templates => {
                    for cb in &observers.templates {
                        invoke(|| cb(&snapshot.templates));
                    }
                }
                Domain::LastSent => {
                    for cb in &observers.last_sent {
                        invoke(|| cb(&snapshot.last_sent));
                    }
                }
            }
            for cb in &observers.global {
                invoke(|| cb(&snapshot));
            }
        }

        persist_result
    }
}

/// Current UTC time as an ISO-8601 string with a trailing `Z`.
fn now_utc() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Run one observer callback, isolating panics from the fan-out.
fn invoke(f: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(f)).is_err() {
        warn!("Configuration observer panicked; continuing fan-out");
    }
}
