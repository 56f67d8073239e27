//! # Email Addresses
//!
//! Emails are used as login identifiers and as the reply address on contact
//! messages. They are trimmed and lowercased on construction so uniqueness
//! checks are case-insensitive.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

const MAX_EMAIL_LEN: usize = 254;

/// A normalized email address.
///
/// # Validation
///
/// - At most 254 characters, no whitespace
/// - Exactly one `@` with a non-empty local part
/// - Domain contains a dot and no empty labels
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Validate and normalize an email address.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let normalized = s.trim().to_ascii_lowercase();
        let invalid = || ValidationError::InvalidEmail(s.to_string());

        if normalized.is_empty()
            || normalized.len() > MAX_EMAIL_LEN
            || normalized.chars().any(char::is_whitespace)
        {
            return Err(invalid());
        }

        let (local, domain) = normalized.split_once('@').ok_or_else(invalid)?;
        if local.is_empty() || domain.contains('@') || !domain.contains('.') {
            return Err(invalid());
        }
        if domain.split('.').any(str::is_empty) {
            return Err(invalid());
        }

        Ok(Self(normalized))
    }

    /// Return the address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Email {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}
