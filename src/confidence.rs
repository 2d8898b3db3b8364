//! Confidence scores and field validation
//!
//! Confidence expresses certainty of an auto-extracted or auto-linked fact:
//! - `1.0`: asserted by an authoritative source or a human
//! - `< 1.0`: produced by extraction or automatic linking
//!
//! Every check here runs before a row is written.

use crate::{Error, Result};

/// Default confidence for manually created rows
pub const DEFAULT_CONFIDENCE: f64 = 1.0;

/// Maximum stored length of a term's text
pub const MAX_TERM_LEN: usize = 500;

/// Maximum stored length of a language code
pub const MAX_LANGUAGE_LEN: usize = 10;

/// Validate that `value` lies in `[0.0, 1.0]`. NaN is rejected.
pub fn validate(field: &'static str, value: f64) -> Result<f64> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(Error::Range { field, value })
    }
}

/// Check if a confidence counts as asserted rather than inferred
pub fn is_asserted(value: f64) -> bool {
    (value - 1.0).abs() < f64::EPSILON
}

/// Trim `value` and require it to be non-empty and at most `max` chars
pub fn require_text(field: &'static str, value: &str, max: usize) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::Invalid {
            field,
            reason: "must not be empty".to_string(),
        });
    }
    if trimmed.chars().count() > max {
        return Err(Error::Invalid {
            field,
            reason: format!("longer than {} characters", max),
        });
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_inclusive() {
        assert_eq!(validate("confidence", 0.0).unwrap(), 0.0);
        assert_eq!(validate("confidence", 1.0).unwrap(), 1.0);
        assert!(matches!(validate("confidence", 1.01), Err(Error::Range { .. })));
        assert!(matches!(validate("confidence", -0.1), Err(Error::Range { .. })));
        assert!(validate("confidence", f64::NAN).is_err());
    }

    #[test]
    fn test_asserted() {
        assert!(is_asserted(1.0));
        assert!(!is_asserted(0.95));
    }

    #[test]
    fn test_require_text() {
        assert_eq!(require_text("term", "  capacitor ", 500).unwrap(), "capacitor");
        assert!(require_text("term", "   ", 500).is_err());
        assert!(require_text("term", "abcdef", 3).is_err());
    }
}
