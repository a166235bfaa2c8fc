//! Stopover page classifier.
//!
//! A page is a stopover page when two independent conditions hold:
//! a three-letter code adjacent to the literal marker `Bilan` in one of
//! the known surface forms, and the keyword `objectifs` somewhere in
//! the page text.

use std::sync::LazyLock;

use regex::Regex;

use crate::code;

/// One ranked code extraction pattern.
struct CodePattern {
    name: &'static str,
    regex: Regex,
}

impl CodePattern {
    fn new(name: &'static str, pattern: &str) -> Self {
        #[allow(clippy::expect_used)] // Hard-coded patterns are known valid.
        let regex = Regex::new(pattern).expect("hard-coded pattern compiles");
        Self { name, regex }
    }
}

/// Ranked extraction patterns, most structured first. The first pattern
/// that matches anywhere in the page wins; later patterns are never
/// consulted once an earlier one matched.
static CODE_PATTERNS: LazyLock<Vec<CodePattern>> = LazyLock::new(|| {
    vec![
        CodePattern::new("bracketed", r"(?i)\[([A-Za-z]{3})\]-Bilan\b"),
        CodePattern::new("hyphenated", r"(?i)\b([A-Za-z]{3})-Bilan\b"),
        CodePattern::new("spaced", r"(?i)\b([A-Za-z]{3})\s*-\s*Bilan\b"),
    ]
});

static OBJECTIVES_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)] // Hard-coded pattern is known valid.
    let regex = Regex::new(r"(?i)objectifs").expect("hard-coded pattern compiles");
    regex
});

/// Extract the stopover code from page text, if any pattern matches.
///
/// The matched group is uppercased and re-validated to be exactly three
/// alphabetic characters before being returned.
#[must_use]
pub fn extract_code(text: &str) -> Option<String> {
    if text.is_empty() {
        return None;
    }
    for pattern in CODE_PATTERNS.iter() {
        if let Some(captures) = pattern.regex.captures(text) {
            let extracted = code::normalize(captures.get(1)?.as_str());
            if code::is_valid(&extracted) {
                tracing::trace!(pattern = pattern.name, code = %extracted, "Code extracted");
                return Some(extracted);
            }
            return None;
        }
    }
    None
}

/// Whether the page text contains the objectives keyword.
#[must_use]
pub fn contains_objectives(text: &str) -> bool {
    !text.is_empty() && OBJECTIVES_PATTERN.is_match(text)
}

/// Classify one page: the stopover code if, and only if, both a code
/// was extracted and the objectives keyword is present.
#[must_use]
pub fn classify(text: &str) -> Option<String> {
    let extracted = extract_code(text)?;
    contains_objectives(text).then_some(extracted)
}

/// Diagnostic breakdown of one page's classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionReport {
    /// Code extracted by the ranked patterns, if any.
    pub code: Option<String>,
    /// Whether the objectives keyword was found.
    pub has_objectives: bool,
    /// Whether the page qualifies as a stopover page.
    pub is_stopover: bool,
}

/// Analyze one page for diagnostics, exposing both conditions
/// separately.
#[must_use]
pub fn analyze(text: &str) -> DetectionReport {
    let code = extract_code(text);
    let has_objectives = contains_objectives(text);
    DetectionReport {
        is_stopover: code.is_some() && has_objectives,
        code,
        has_objectives,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bracketed_form() {
        assert_eq!(extract_code("Escale [DKR]-Bilan"), Some("DKR".to_string()));
    }

    #[test]
    fn test_extract_hyphenated_form() {
        assert_eq!(extract_code("ABJ-Bilan du mois"), Some("ABJ".to_string()));
    }

    #[test]
    fn test_extract_spaced_form() {
        assert_eq!(extract_code("NDJ - Bilan"), Some("NDJ".to_string()));
    }

    #[test]
    fn test_extract_is_case_insensitive_and_uppercases() {
        assert_eq!(extract_code("[dkr]-bilan"), Some("DKR".to_string()));
    }

    #[test]
    fn test_extract_no_match() {
        assert_eq!(extract_code(""), None);
        assert_eq!(extract_code("Bilan sans code"), None);
        assert_eq!(extract_code("ABCD-Bilan"), None);
    }

    #[test]
    fn test_bracketed_wins_over_looser_match_elsewhere() {
        // A looser form for NDJ appears first in the text, but the
        // bracketed pattern is ranked higher and wins for ABJ.
        let text = "NDJ - Bilan en préambule, puis [ABJ]-Bilan officiel";
        assert_eq!(extract_code(text), Some("ABJ".to_string()));
    }

    #[test]
    fn test_contains_objectives() {
        assert!(contains_objectives("Objectifs de la mission"));
        assert!(contains_objectives("les objectifs atteints"));
        assert!(!contains_objectives("aucun but"));
        assert!(!contains_objectives(""));
    }

    #[test]
    fn test_classify_requires_both_conditions() {
        assert_eq!(classify("[DKR]-Bilan sans le mot-clé"), None);
        assert_eq!(classify("objectifs sans code"), None);
        assert_eq!(
            classify("Escale [DKR]-Bilan ... objectifs de la mission ..."),
            Some("DKR".to_string())
        );
    }

    #[test]
    fn test_analyze_reports_both_conditions() {
        let report = analyze("[ABJ]-Bilan");
        assert_eq!(report.code, Some("ABJ".to_string()));
        assert!(!report.has_objectives);
        assert!(!report.is_stopover);

        let report = analyze("[ABJ]-Bilan objectifs");
        assert!(report.is_stopover);
    }
}
