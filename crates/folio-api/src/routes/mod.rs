//! # API Route Modules
//!
//! - `auth` — login, logout, registration, current user, user listing.
//! - `posts`, `projects`, `products` — public listings and reads, plus the
//!   admin CRUD for each content type. Shared behavior lives in `content`.
//! - `taxonomy` — categories and tags.
//! - `messages` — public contact form and the admin inbox.
//! - `uploads` — image upload for rich-text authoring.
//! - `dashboard` — admin statistics.

pub mod auth;
pub mod content;
pub mod dashboard;
pub mod messages;
pub mod posts;
pub mod products;
pub mod projects;
pub mod taxonomy;
pub mod uploads;

use folio_core::PageRequest;
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::{MessageRecord, PostRecord, ProductRecord, ProjectRecord};

/// One page of results.
#[derive(Debug, Serialize, ToSchema)]
#[aliases(
    PostPage = Page<PostRecord>,
    ProjectPage = Page<ProjectRecord>,
    ProductPage = Page<ProductRecord>,
    MessagePage = Page<MessageRecord>
)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Matching items across all pages.
    pub total: usize,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

impl<T> Page<T> {
    /// Slice `items` according to `request`.
    pub fn from_items(items: Vec<T>, request: PageRequest) -> Self {
        let (items, total) = request.slice(items);
        Self {
            items,
            total,
            page: request.page,
            limit: request.limit,
            total_pages: request.total_pages(total),
        }
    }
}
