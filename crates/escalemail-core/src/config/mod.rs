//! Unified configuration module.
//!
//! Provides the persisted configuration aggregate, atomic persistence,
//! one-shot legacy migration, the observing store, and the stopover
//! profile facade.

mod migration;
mod model;
mod persist;
mod profile;
mod store;

pub use migration::LegacyMigrator;
pub use model::{
    Configuration, DEFAULT_BODY, DEFAULT_SUBJECT, TEMPLATE_PLACEHOLDER, Templates, render_template,
};
pub use profile::StopoverProfile;
pub use store::ConfigStore;
