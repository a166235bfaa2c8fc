//! Stopover code normalization and validation.
//!
//! A stopover code is exactly three alphabetic characters, stored and
//! looked up in uppercase (`"ABJ"`, `"DKR"`).

use crate::{Error, Result};

/// Normalize a raw code: trim surrounding whitespace and uppercase.
#[must_use]
pub fn normalize(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

/// Check whether a code is exactly three alphabetic characters.
#[must_use]
pub fn is_valid(code: &str) -> bool {
    code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic())
}

/// Normalize and validate a raw code.
///
/// # Errors
///
/// Returns [`Error::InvalidCode`] if the normalized code is not exactly
/// three alphabetic characters.
pub fn validate(raw: &str) -> Result<String> {
    let code = normalize(raw);
    if is_valid(&code) {
        Ok(code)
    } else {
        Err(Error::InvalidCode(raw.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_trims_and_uppercases() {
        assert_eq!(normalize(" abj "), "ABJ");
        assert_eq!(normalize("DkR"), "DKR");
    }

    #[test]
    fn test_is_valid() {
        assert!(is_valid("ABJ"));
        assert!(!is_valid("AB"));
        assert!(!is_valid("ABJD"));
        assert!(!is_valid("AB1"));
        assert!(!is_valid(""));
    }

    #[test]
    fn test_validate_accepts_lowercase_input() {
        assert_eq!(validate("dkr").unwrap(), "DKR");
    }

    #[test]
    fn test_validate_rejects_malformed() {
        assert!(matches!(validate("12X"), Err(Error::InvalidCode(_))));
        assert!(matches!(validate("ABCD"), Err(Error::InvalidCode(_))));
    }
}
