//! # Slugs
//!
//! URL path segments identifying published documents. A slug is one or more
//! runs of lowercase ASCII letters and digits joined by single hyphens, at
//! most [`MAX_SLUG_LEN`] characters.
//!
//! [`Slug::parse`] accepts only strings already in that form (used for
//! stored data and path parameters). [`Slug::derive`] normalizes arbitrary
//! text such as a title or a hand-typed slug.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Maximum slug length in characters.
pub const MAX_SLUG_LEN: usize = 120;

/// A validated, normalized slug.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

impl Slug {
    /// Accept a string that is already a well-formed slug.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        if is_well_formed(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(ValidationError::InvalidSlug(s.to_string()))
        }
    }

    /// Derive a slug from free text.
    ///
    /// Non-ASCII characters are transliterated to ASCII first (`é` → `e`,
    /// `ß` → `ss`, CJK to its romanization). Letters are lowercased,
    /// apostrophes are dropped, and every other run of non-alphanumeric
    /// characters becomes one hyphen. The result is cut to [`MAX_SLUG_LEN`].
    pub fn derive(source: &str) -> Result<Self, ValidationError> {
        let slug = slugify(source);
        if slug.is_empty() {
            return Err(ValidationError::EmptySlugSource(source.to_string()));
        }
        Ok(Self(slug))
    }

    /// Return the slug as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Slug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Slug {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Slug> for String {
    fn from(slug: Slug) -> Self {
        slug.0
    }
}

impl PartialEq<&str> for Slug {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

fn is_well_formed(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= MAX_SLUG_LEN
        && !s.starts_with('-')
        && !s.ends_with('-')
        && !s.contains("--")
        && s
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

fn slugify(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut pending_hyphen = false;

    let mut push = |c: char| {
        if c == '\'' || c == '\u{2019}' {
            return;
        }
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    };

    for c in source.chars() {
        if c.is_ascii() || c == '\u{2019}' {
            push(c);
        } else {
            match deunicode::deunicode_char(c) {
                Some(folded) => folded.chars().for_each(&mut push),
                None => push(' '),
            }
        }
    }

    if out.len() > MAX_SLUG_LEN {
        out.truncate(MAX_SLUG_LEN);
        while out.ends_with('-') {
            out.pop();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn derive_from_title() {
        let slug = Slug::derive("Hello, World! Building a Blog in 2024").unwrap();
        assert_eq!(slug.as_str(), "hello-world-building-a-blog-in-2024");
    }

    #[test]
    fn derive_drops_apostrophes() {
        assert_eq!(Slug::derive("Don't Panic").unwrap(), "dont-panic");
        assert_eq!(Slug::derive("It\u{2019}s here").unwrap(), "its-here");
    }

    #[test]
    fn derive_collapses_separators_and_trims() {
        assert_eq!(Slug::derive("  --Rust   &  Axum--  ").unwrap(), "rust-axum");
    }

    #[test]
    fn derive_folds_accented_letters() {
        assert_eq!(Slug::derive("Café au lait").unwrap(), "cafe-au-lait");
        assert_eq!(
            Slug::derive("Crème Brûlée Recipes").unwrap(),
            "creme-brulee-recipes"
        );
        assert_eq!(Slug::derive("Ünïcödé Straße").unwrap(), "unicode-strasse");
    }

    #[test]
    fn derive_romanizes_non_latin_titles() {
        let slug = Slug::derive("日本語のブログ").unwrap();
        assert!(Slug::parse(slug.as_str()).is_ok(), "{slug}");
    }

    #[test]
    fn derive_rejects_symbol_only_input() {
        let err = Slug::derive("!!! ???").unwrap_err();
        assert!(matches!(err, ValidationError::EmptySlugSource(_)));
    }

    #[test]
    fn derive_truncates_long_titles() {
        let title = "word ".repeat(60);
        let slug = Slug::derive(&title).unwrap();
        assert!(slug.as_str().len() <= MAX_SLUG_LEN);
        assert!(!slug.as_str().ends_with('-'));
    }

    #[test]
    fn parse_accepts_well_formed() {
        assert!(Slug::parse("my-first-post").is_ok());
        assert!(Slug::parse("2024").is_ok());
    }

    #[test]
    fn parse_rejects_malformed() {
        for bad in ["", "-lead", "trail-", "double--hyphen", "Upper", "with space", "under_score"] {
            assert!(Slug::parse(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn serde_roundtrip_validates() {
        let json = serde_json::to_string(&Slug::parse("a-b").unwrap()).unwrap();
        assert_eq!(json, "\"a-b\"");
        assert!(serde_json::from_str::<Slug>("\"Not A Slug\"").is_err());
    }

    proptest! {
        /// Whatever text goes in, a derived slug is always well formed.
        #[test]
        fn derived_slug_is_well_formed(source in ".{0,200}") {
            if let Ok(slug) = Slug::derive(&source) {
                prop_assert!(Slug::parse(slug.as_str()).is_ok(), "not well formed: {}", slug);
            }
        }

        /// Titles made of Latin letters with diacritics always yield a slug.
        #[test]
        fn accented_titles_derive(source in "[a-zA-Zàâäáãåçéèêëíìîïñóòôöõúùûüýÿ]{1,20}( [a-zàâäçéèêëîïôöùûü]{1,20}){0,4}") {
            let slug = Slug::derive(&source).unwrap();
            prop_assert!(Slug::parse(slug.as_str()).is_ok(), "not well formed: {}", slug);
        }

        /// Deriving from an existing slug is the identity.
        #[test]
        fn derive_is_idempotent(source in "[A-Za-z0-9 ,.!-]{1,80}") {
            if let Ok(slug) = Slug::derive(&source) {
                let again = Slug::derive(slug.as_str()).unwrap();
                prop_assert_eq!(slug, again);
            }
        }
    }
}
