//! # Content Enumerations
//!
//! Closed sets of values stored on documents. All serialize as
//! `snake_case` strings and parse case-insensitively from query strings.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Visibility of a post, project or product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStatus {
    /// Visible only in the admin dashboard.
    #[default]
    Draft,
    /// Listed on the public site.
    Published,
}

impl PublishStatus {
    /// Return the string representation of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
        }
    }

    /// Whether the document is publicly visible.
    pub fn is_published(&self) -> bool {
        matches!(self, Self::Published)
    }
}

impl FromStr for PublishStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            _ => Err(ValidationError::UnknownVariant {
                kind: "publish status",
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for PublishStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of digital product sold in the shop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductKind {
    /// Downloadable book; listed on the ebooks page.
    Ebook,
    /// Video or text course.
    Course,
    /// Design or code template.
    Template,
    /// Anything else.
    Other,
}

impl ProductKind {
    /// Return the string representation of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ebook => "ebook",
            Self::Course => "course",
            Self::Template => "template",
            Self::Other => "other",
        }
    }
}

impl FromStr for ProductKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ebook" => Ok(Self::Ebook),
            "course" => Ok(Self::Course),
            "template" => Ok(Self::Template),
            "other" => Ok(Self::Other),
            _ => Err(ValidationError::UnknownVariant {
                kind: "product kind",
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for ProductKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which collection a category groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKind {
    /// Blog post categories.
    Blog,
    /// Portfolio project categories.
    Project,
    /// Shop product categories.
    Product,
}

impl CategoryKind {
    /// Return the string representation of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blog => "blog",
            Self::Project => "project",
            Self::Product => "product",
        }
    }
}

impl FromStr for CategoryKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blog" => Ok(Self::Blog),
            "project" => Ok(Self::Project),
            "product" => Ok(Self::Product),
            _ => Err(ValidationError::UnknownVariant {
                kind: "category kind",
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Three-letter currency code, stored uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Validate a currency code. Lowercase input is accepted and uppercased.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let code = s.trim().to_ascii_uppercase();
        if code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase()) {
            Ok(Self(code))
        } else {
            Err(ValidationError::InvalidCurrency(s.to_string()))
        }
    }

    /// Return the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Currency {
    fn default() -> Self {
        Self("USD".to_string())
    }
}

impl TryFrom<String> for Currency {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Currency> for String {
    fn from(c: Currency) -> Self {
        c.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_status_parses_case_insensitively() {
        assert_eq!("Published".parse::<PublishStatus>().unwrap(), PublishStatus::Published);
        assert_eq!(" draft ".parse::<PublishStatus>().unwrap(), PublishStatus::Draft);
        assert!("archived".parse::<PublishStatus>().is_err());
    }

    #[test]
    fn publish_status_default_is_draft() {
        assert_eq!(PublishStatus::default(), PublishStatus::Draft);
        assert!(!PublishStatus::Draft.is_published());
    }

    #[test]
    fn enums_serialize_snake_case() {
        assert_eq!(serde_json::to_string(&ProductKind::Ebook).unwrap(), "\"ebook\"");
        assert_eq!(serde_json::to_string(&CategoryKind::Project).unwrap(), "\"project\"");
        assert_eq!(
            serde_json::to_string(&PublishStatus::Published).unwrap(),
            "\"published\""
        );
    }

    #[test]
    fn as_str_matches_serde() {
        for kind in [
            ProductKind::Ebook,
            ProductKind::Course,
            ProductKind::Template,
            ProductKind::Other,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json.trim_matches('"'), kind.as_str());
            assert_eq!(kind.as_str().parse::<ProductKind>().unwrap(), kind);
        }
    }

    #[test]
    fn currency_uppercases() {
        assert_eq!(Currency::parse("eur").unwrap().as_str(), "EUR");
    }

    #[test]
    fn currency_rejects_bad_codes() {
        for bad in ["", "US", "USDT", "U$D", "12A"] {
            assert!(Currency::parse(bad).is_err(), "{bad:?} should be rejected");
        }
    }
}
