//! # Shared Content Behavior
//!
//! Posts, projects and products share a [`ContentMeta`] block and the same
//! lifecycle: a slug unique within the collection, an optional category of
//! the matching kind, tags, draft/published status and a view counter.
//! Everything that depends only on that block lives here, generic over
//! [`Content`].

use chrono::{DateTime, Utc};
use folio_core::error::required_text;
use folio_core::{
    validate_link, CategoryKind, PageRequest, PublishStatus, Slug, ValidationError,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::db::{documents, write_through};
use crate::error::AppError;
use crate::routes::Page;
use crate::state::{
    AppState, CategoryRecord, ContentMeta, PostRecord, ProductRecord, ProjectRecord, TagRecord,
};
use crate::store::{Document, Store};

/// Maximum title length in characters.
pub const MAX_TITLE_LEN: usize = 200;
/// Maximum number of tags on one document.
pub const MAX_TAGS: usize = 20;

/// A publishable document.
pub trait Content: Document {
    /// Kind a referenced category must have.
    const CATEGORY_KIND: CategoryKind;

    fn meta(&self) -> &ContentMeta;

    fn meta_mut(&mut self) -> &mut ContentMeta;

    /// Short text searched by `q` alongside the title.
    fn summary(&self) -> &str;

    fn featured(&self) -> bool {
        false
    }
}

impl Content for PostRecord {
    const CATEGORY_KIND: CategoryKind = CategoryKind::Blog;

    fn meta(&self) -> &ContentMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ContentMeta {
        &mut self.meta
    }

    fn summary(&self) -> &str {
        &self.excerpt
    }
}

impl Content for ProjectRecord {
    const CATEGORY_KIND: CategoryKind = CategoryKind::Project;

    fn meta(&self) -> &ContentMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ContentMeta {
        &mut self.meta
    }

    fn summary(&self) -> &str {
        &self.summary
    }

    fn featured(&self) -> bool {
        self.featured
    }
}

impl Content for ProductRecord {
    const CATEGORY_KIND: CategoryKind = CategoryKind::Product;

    fn meta(&self) -> &ContentMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ContentMeta {
        &mut self.meta
    }

    fn summary(&self) -> &str {
        &self.description
    }

    fn featured(&self) -> bool {
        self.featured
    }
}

// ── Input ───────────────────────────────────────────────────────────

/// Request fields shared by posts, projects and products.
///
/// On update, an absent `slug` or `status` keeps the current value.
#[derive(Debug, Deserialize, ToSchema)]
pub struct MetaInput {
    pub title: String,
    /// Derived from the title when absent. Explicit values are normalized.
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
    /// Category slug.
    #[serde(default)]
    pub category: Option<String>,
    /// Tag names or slugs. Unknown tags are created.
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "published")]
    pub status: Option<PublishStatus>,
}

/// [`MetaInput`] after validation.
#[derive(Debug, Clone)]
pub struct MetaFields {
    pub title: String,
    pub slug: Option<Slug>,
    pub cover_image: Option<String>,
    pub category: Option<Slug>,
    /// `(slug, display name)` pairs, deduplicated by slug.
    pub tags: Vec<(Slug, String)>,
    pub status: Option<PublishStatus>,
}

/// Treat blank strings as absent.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Validate an optional link field.
pub fn optional_link(value: Option<String>) -> Result<Option<String>, ValidationError> {
    non_blank(value).map(|v| validate_link(&v)).transpose()
}

impl MetaInput {
    /// Validate the fields that do not depend on stored state.
    pub fn validate(self) -> Result<MetaFields, ValidationError> {
        let title = required_text("title", &self.title, MAX_TITLE_LEN)?;
        let slug = non_blank(self.slug)
            .map(|raw| Slug::derive(&raw))
            .transpose()?;
        let cover_image = optional_link(self.cover_image)?;
        let category = non_blank(self.category)
            .map(|raw| Slug::derive(&raw))
            .transpose()?;

        let mut tags: Vec<(Slug, String)> = Vec::new();
        for raw in self.tags {
            let name = raw.trim();
            if name.is_empty() {
                continue;
            }
            let slug = Slug::derive(name)?;
            if !tags.iter().any(|(existing, _)| *existing == slug) {
                tags.push((slug, name.to_string()));
            }
        }
        if tags.len() > MAX_TAGS {
            return Err(ValidationError::field(
                "tags",
                format!("must not contain more than {MAX_TAGS} entries"),
            ));
        }

        Ok(MetaFields {
            title,
            slug,
            cover_image,
            category,
            tags,
            status: self.status,
        })
    }
}

impl MetaFields {
    /// Build the metadata block of a new document.
    pub fn into_new_meta(self, now: DateTime<Utc>) -> Result<ContentMeta, ValidationError> {
        let slug = match self.slug {
            Some(slug) => slug,
            None => Slug::derive(&self.title)?,
        };
        let mut meta = ContentMeta {
            title: self.title,
            slug,
            cover_image: self.cover_image,
            category: self.category,
            tags: self.tags.into_iter().map(|(slug, _)| slug).collect(),
            status: PublishStatus::Draft,
            views: 0,
            published_at: None,
            created_at: now,
            updated_at: now,
        };
        set_status(&mut meta, self.status.unwrap_or_default(), now);
        Ok(meta)
    }

    /// Apply an update to an existing metadata block.
    pub fn apply_to(self, meta: &mut ContentMeta, now: DateTime<Utc>) {
        meta.title = self.title;
        if let Some(slug) = self.slug {
            meta.slug = slug;
        }
        meta.cover_image = self.cover_image;
        meta.category = self.category;
        meta.tags = self.tags.into_iter().map(|(slug, _)| slug).collect();
        if let Some(status) = self.status {
            set_status(meta, status, now);
        }
        meta.updated_at = now;
    }
}

/// Change the publish status. `published_at` is stamped on the first
/// publish and kept afterwards.
pub fn set_status(meta: &mut ContentMeta, status: PublishStatus, now: DateTime<Utc>) {
    meta.status = status;
    if status.is_published() && meta.published_at.is_none() {
        meta.published_at = Some(now);
    }
}

/// Check the referenced category exists and create unknown tags.
///
/// Runs before the document itself is written.
pub async fn resolve_references<T: Content>(
    state: &AppState,
    fields: &MetaFields,
) -> Result<(), AppError> {
    if let Some(slug) = &fields.category {
        let key = CategoryRecord::key_for(T::CATEGORY_KIND, slug);
        if state.categories.find_by_key(&key).is_none() {
            return Err(AppError::Validation(format!(
                "category \"{slug}\" does not exist for {}",
                T::CATEGORY_KIND
            )));
        }
    }

    for (slug, name) in &fields.tags {
        if state.tags.find_by_key(slug.as_str()).is_some() {
            continue;
        }
        let now = Utc::now();
        let tag = TagRecord {
            id: Uuid::new_v4(),
            name: name.clone(),
            slug: slug.clone(),
            created_at: now,
            updated_at: now,
        };
        // Losing a race to another request creating the same tag is fine.
        if let Ok(tag) = state.tags.insert_unique(tag) {
            write_through::inserted(state.db_pool.as_ref(), &state.tags, &tag).await?;
            tracing::info!(tag = %tag.slug, "created tag");
        }
    }

    Ok(())
}

// ── Listing ─────────────────────────────────────────────────────────

/// Query parameters for content listings.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ContentQuery {
    /// 1-based page number (default 1).
    pub page: Option<u32>,
    /// Page size (default 10, max 100).
    pub limit: Option<u32>,
    /// Category slug.
    pub category: Option<String>,
    /// Tag slug.
    pub tag: Option<String>,
    /// Case-insensitive substring of the title or summary.
    pub q: Option<String>,
    /// Only featured (or only non-featured) items.
    pub featured: Option<bool>,
}

/// Admin-only status filter.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StatusFilter {
    /// `draft` or `published`.
    #[param(value_type = Option<String>)]
    pub status: Option<PublishStatus>,
}

/// Sort order for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// Newest `published_at` first (public site).
    Published,
    /// Newest `created_at` first (dashboard).
    Created,
}

/// Filter, sort and paginate `items`.
pub fn query_page<T: Content>(
    mut items: Vec<T>,
    query: &ContentQuery,
    order: Order,
) -> Result<Page<T>, AppError> {
    let request = PageRequest::new(query.page, query.limit)?;
    let category = non_blank(query.category.clone())
        .map(|raw| Slug::derive(&raw))
        .transpose()?;
    let tag = non_blank(query.tag.clone())
        .map(|raw| Slug::derive(&raw))
        .transpose()?;
    let needle = non_blank(query.q.clone()).map(|q| q.to_lowercase());

    items.retain(|doc| {
        let meta = doc.meta();
        if let Some(category) = &category {
            if meta.category.as_ref() != Some(category) {
                return false;
            }
        }
        if let Some(tag) = &tag {
            if !meta.tags.contains(tag) {
                return false;
            }
        }
        if let Some(featured) = query.featured {
            if doc.featured() != featured {
                return false;
            }
        }
        if let Some(needle) = &needle {
            if !meta.title.to_lowercase().contains(needle)
                && !doc.summary().to_lowercase().contains(needle)
            {
                return false;
            }
        }
        true
    });

    match order {
        Order::Published => items.sort_by(|a, b| {
            b.meta()
                .published_at
                .cmp(&a.meta().published_at)
                .then_with(|| b.meta().created_at.cmp(&a.meta().created_at))
        }),
        Order::Created => items.sort_by(|a, b| b.meta().created_at.cmp(&a.meta().created_at)),
    }

    Ok(Page::from_items(items, request))
}

/// Published documents matching `query`, newest first.
pub fn list_published<T: Content>(
    store: &Store<T>,
    query: &ContentQuery,
    extra: impl Fn(&T) -> bool,
) -> Result<Page<T>, AppError> {
    let items = store.filter(|doc| doc.meta().status.is_published() && extra(doc));
    query_page(items, query, Order::Published)
}

/// All documents matching `query` and `status`, newest first.
pub fn list_admin<T: Content>(
    store: &Store<T>,
    query: &ContentQuery,
    status: &StatusFilter,
) -> Result<Page<T>, AppError> {
    let items = store.filter(|doc| status.status.map_or(true, |s| doc.meta().status == s));
    query_page(items, query, Order::Created)
}

// ── Reads & deletes ─────────────────────────────────────────────────

/// Fetch a published document by slug and count the view.
///
/// A failed view-count write is logged; the read still succeeds.
pub async fn view_published<T: Content>(
    state: &AppState,
    store: &Store<T>,
    slug: &str,
) -> Result<T, AppError> {
    let not_found = || AppError::NotFound(format!("{} \"{slug}\" not found", T::COLLECTION));
    let doc = store
        .find_by_key(slug)
        .filter(|doc| doc.meta().status.is_published())
        .ok_or_else(not_found)?;

    let viewed = store
        .update(&doc.id(), |d| {
            let meta = d.meta_mut();
            meta.views = meta.views.saturating_add(1);
        })
        .unwrap_or(doc);

    if let Some(pool) = &state.db_pool {
        if let Err(e) = documents::increment_views(pool, T::COLLECTION, viewed.id()).await {
            tracing::warn!(collection = T::COLLECTION, id = %viewed.id(), error = %e, "failed to persist view count");
        }
    }

    Ok(viewed)
}

/// Fetch any document by ID.
pub fn get_by_id<T: Content>(store: &Store<T>, id: &Uuid) -> Result<T, AppError> {
    store
        .get(id)
        .ok_or_else(|| AppError::NotFound(format!("{} {id} not found", T::COLLECTION)))
}

/// Delete a document by ID.
pub async fn delete_by_id<T: Content>(
    state: &AppState,
    store: &Store<T>,
    id: &Uuid,
) -> Result<T, AppError> {
    let removed = store
        .remove(id)
        .ok_or_else(|| AppError::NotFound(format!("{} {id} not found", T::COLLECTION)))?;
    write_through::deleted(state.db_pool.as_ref(), store, &removed).await?;
    tracing::info!(collection = T::COLLECTION, %id, slug = %removed.meta().slug, "deleted");
    Ok(removed)
}
