#![deny(missing_docs)]

//! # folio-core — Domain Primitives for Folio
//!
//! Foundational types shared by the API service and the operator CLI. The
//! crate performs no I/O; it only validates and normalizes values.
//!
//! ## Design Principles
//!
//! 1. **Newtypes for validated strings.** A [`Slug`] or an [`Email`] can only
//!    be obtained through a constructor that enforces its format, so every
//!    value that reaches storage is already normalized.
//!
//! 2. **Closed enums for document states.** Publish status, product kind and
//!    category kind serialize as `snake_case` strings and reject anything else.
//!
//! 3. **[`ValidationError`] for every rejection.** Structured errors with
//!    `thiserror`, carrying the offending input.

pub mod content;
pub mod email;
pub mod error;
pub mod links;
pub mod media;
pub mod pagination;
pub mod slug;
pub mod text;

pub use content::{CategoryKind, Currency, ProductKind, PublishStatus};
pub use email::Email;
pub use error::ValidationError;
pub use links::validate_link;
pub use media::ImageKind;
pub use pagination::PageRequest;
pub use slug::Slug;
