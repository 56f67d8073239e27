//! # Validation Errors
//!
//! Every domain primitive rejects bad input with a [`ValidationError`]
//! that carries the input and the expected format.

use thiserror::Error;

/// Validation errors for domain primitives.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Slug does not match `[a-z0-9]+(-[a-z0-9]+)*` or is too long.
    #[error("invalid slug: \"{0}\" (expected lowercase letters, digits and single hyphens, at most 120 characters)")]
    InvalidSlug(String),

    /// No slug could be derived because the source has no letters or digits.
    #[error("cannot derive a slug from \"{0}\": it contains no letters or digits")]
    EmptySlugSource(String),

    /// Email address fails basic format validation.
    #[error("invalid email address: \"{0}\"")]
    InvalidEmail(String),

    /// Link is neither an absolute http(s) URL nor an `/uploads/` path.
    #[error("invalid link: \"{0}\" (expected an http(s) URL or a /uploads/ path)")]
    InvalidLink(String),

    /// Currency code is not three uppercase ASCII letters.
    #[error("invalid currency code: \"{0}\" (expected three letters, e.g. USD)")]
    InvalidCurrency(String),

    /// A string did not name a known variant of a closed enum.
    #[error("unknown {kind}: \"{value}\"")]
    UnknownVariant {
        /// What was being parsed (e.g. "publish status").
        kind: &'static str,
        /// The rejected input.
        value: String,
    },

    /// Pagination parameters are out of range.
    #[error("invalid pagination: {0}")]
    InvalidPagination(String),

    /// Uploaded bytes are not a supported image.
    #[error("unsupported image: {0}")]
    UnsupportedImage(String),

    /// A required field is empty or too long.
    #[error("{field} {reason}")]
    Field {
        /// Field name as it appears in requests.
        field: &'static str,
        /// Human-readable reason, e.g. "must not be empty".
        reason: String,
    },
}

impl ValidationError {
    /// Shorthand for a [`ValidationError::Field`] error.
    pub fn field(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Field {
            field,
            reason: reason.into(),
        }
    }
}

/// Check that a text field is non-empty after trimming and within `max` characters.
///
/// Returns the trimmed value.
pub fn required_text(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::field(field, "must not be empty"));
    }
    if trimmed.chars().count() > max {
        return Err(ValidationError::field(
            field,
            format!("must not exceed {max} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_error_display() {
        let err = ValidationError::field("title", "must not be empty");
        assert_eq!(err.to_string(), "title must not be empty");
    }

    #[test]
    fn unknown_variant_display() {
        let err = ValidationError::UnknownVariant {
            kind: "publish status",
            value: "archived".to_string(),
        };
        assert_eq!(err.to_string(), "unknown publish status: \"archived\"");
    }

    #[test]
    fn required_text_trims() {
        assert_eq!(required_text("name", "  Ada  ", 10).unwrap(), "Ada");
    }

    #[test]
    fn required_text_rejects_blank() {
        assert!(required_text("name", "   ", 10).is_err());
    }

    #[test]
    fn required_text_counts_chars_not_bytes() {
        assert!(required_text("name", "ééééé", 5).is_ok());
        assert!(required_text("name", "éééééé", 5).is_err());
    }
}
