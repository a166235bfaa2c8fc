//! Detection data models.

/// A stopover page found in a document.
///
/// Transient: produced by the classifier, consumed immediately by the
/// caller, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stopover {
    /// Three-letter uppercase stopover code.
    pub code: String,
    /// 1-based page number inside the document.
    pub page_number: usize,
}

impl Stopover {
    /// Create a stopover record.
    #[must_use]
    pub fn new(code: impl Into<String>, page_number: usize) -> Self {
        Self {
            code: code.into(),
            page_number,
        }
    }
}

impl std::fmt::Display for Stopover {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (Page {})", self.code, self.page_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Stopover::new("ABJ", 3).to_string(), "ABJ (Page 3)");
    }
}
