//! Document scan over a page source.

use thiserror::Error;
use tracing::{debug, warn};

use super::classifier;
use super::model::Stopover;
use crate::{Error, Result};

/// Failure reported by a [`PageSource`].
#[derive(Debug, Error)]
pub enum SourceError {
    /// The document itself cannot be opened or read. Fatal to the scan.
    #[error("document unreadable: {0}")]
    Document(String),
    /// One page's text cannot be extracted. The page is skipped.
    #[error("page {page} unreadable: {reason}")]
    Page {
        /// 1-based page number.
        page: usize,
        /// Why extraction failed.
        reason: String,
    },
}

/// Text source for one open document.
///
/// Implemented by external document collaborators (a PDF text
/// extractor, a plain-text reader); the scan never opens or closes
/// documents itself.
pub trait PageSource {
    /// Total number of pages.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Document`] when the document cannot be
    /// read at all.
    fn page_count(&self) -> std::result::Result<usize, SourceError>;

    /// Plain text of the given 1-based page.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Page`] for a single unreadable page or
    /// [`SourceError::Document`] when the whole document became
    /// unreadable.
    fn page_text(&self, page: usize) -> std::result::Result<String, SourceError>;
}

/// Scan every page of a document and collect detected stopovers in
/// document order.
///
/// Pages whose text cannot be extracted are skipped with a warning.
///
/// # Errors
///
/// Returns [`Error::DocumentUnreadable`] when the source reports a
/// document-level failure; that aborts the whole scan.
pub fn scan(source: &dyn PageSource) -> Result<Vec<Stopover>> {
    let page_count = source
        .page_count()
        .map_err(|e| Error::DocumentUnreadable(e.to_string()))?;

    let mut stopovers = Vec::new();
    for page in 1..=page_count {
        let text = match source.page_text(page) {
            Ok(text) => text,
            Err(e @ SourceError::Page { .. }) => {
                warn!(page, error = %e, "Skipping unreadable page");
                continue;
            }
            Err(e @ SourceError::Document(_)) => {
                return Err(Error::DocumentUnreadable(e.to_string()));
            }
        };
        if let Some(code) = classifier::classify(&text) {
            debug!(page, code = %code, "Stopover page detected");
            stopovers.push(Stopover::new(code, page));
        }
    }
    Ok(stopovers)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// In-memory page source for tests.
    struct FakeDocument {
        pages: Vec<std::result::Result<String, SourceError>>,
        unreadable: bool,
    }

    impl FakeDocument {
        fn of(pages: &[&str]) -> Self {
            Self {
                pages: pages.iter().map(|p| Ok((*p).to_string())).collect(),
                unreadable: false,
            }
        }
    }

    impl PageSource for FakeDocument {
        fn page_count(&self) -> std::result::Result<usize, SourceError> {
            if self.unreadable {
                Err(SourceError::Document("cannot open".to_string()))
            } else {
                Ok(self.pages.len())
            }
        }

        fn page_text(&self, page: usize) -> std::result::Result<String, SourceError> {
            match &self.pages[page - 1] {
                Ok(text) => Ok(text.clone()),
                Err(SourceError::Document(msg)) => Err(SourceError::Document(msg.clone())),
                Err(SourceError::Page { reason, .. }) => Err(SourceError::Page {
                    page,
                    reason: reason.clone(),
                }),
            }
        }
    }

    #[test]
    fn test_scan_collects_in_document_order() {
        let doc = FakeDocument::of(&[
            "sommaire",
            "Escale [DKR]-Bilan ... objectifs de la mission ...",
            "annexe sans code",
            "ABJ-Bilan et objectifs du trimestre",
        ]);

        let stopovers = scan(&doc).unwrap();
        assert_eq!(
            stopovers,
            vec![Stopover::new("DKR", 2), Stopover::new("ABJ", 4)]
        );
    }

    #[test]
    fn test_scan_skips_pages_without_both_conditions() {
        let doc = FakeDocument::of(&["[DKR]-Bilan sans mot-clé", "objectifs sans code"]);
        assert!(scan(&doc).unwrap().is_empty());
    }

    #[test]
    fn test_unreadable_page_is_skipped() {
        let mut doc = FakeDocument::of(&["x", "[ABJ]-Bilan objectifs"]);
        doc.pages[0] = Err(SourceError::Page {
            page: 1,
            reason: "corrupt stream".to_string(),
        });

        let stopovers = scan(&doc).unwrap();
        assert_eq!(stopovers, vec![Stopover::new("ABJ", 2)]);
    }

    #[test]
    fn test_unreadable_document_aborts_scan() {
        let mut doc = FakeDocument::of(&[]);
        doc.unreadable = true;
        assert!(matches!(scan(&doc), Err(Error::DocumentUnreadable(_))));
    }

    #[test]
    fn test_document_failure_mid_scan_aborts() {
        let mut doc = FakeDocument::of(&["[ABJ]-Bilan objectifs", "y"]);
        doc.pages[1] = Err(SourceError::Document("lost handle".to_string()));
        assert!(matches!(scan(&doc), Err(Error::DocumentUnreadable(_))));
    }
}
