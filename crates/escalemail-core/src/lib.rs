//! # escalemail-core
//!
//! Core business logic for the escalemail stopover report dispatcher.
//!
//! This crate provides:
//! - Unified configuration store with crash-safe atomic persistence
//! - One-shot migration from legacy configuration fragments
//! - Reactive observer channels for configuration domains
//! - Recipient codec folding To/Cc/Bcc into one persisted list
//! - Stopover page classifier and document scan
//! - Stopover profile facade combining store and codec

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod code;
pub mod config;
pub mod detection;
mod error;
pub mod recipients;

pub use config::{
    ConfigStore, Configuration, LegacyMigrator, StopoverProfile, TEMPLATE_PLACEHOLDER, Templates,
    render_template,
};
pub use detection::{
    DetectionReport, PageSource, SourceError, Stopover, analyze, classify, contains_objectives,
    extract_code, scan,
};
pub use error::{Error, Result};
pub use recipients::{RecipientSet, decode_recipients, encode_recipients};
