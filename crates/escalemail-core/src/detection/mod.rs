//! Stopover page detection.
//!
//! Pure per-page classification plus the document scan that turns a
//! page source into an ordered list of detected stopovers.

mod catalog;
mod classifier;
mod model;

pub use catalog::{PageSource, SourceError, scan};
pub use classifier::{DetectionReport, analyze, classify, contains_objectives, extract_code};
pub use model::Stopover;
