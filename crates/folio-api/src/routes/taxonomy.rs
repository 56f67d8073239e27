//! # Categories & Tags
//!
//! Categories belong to one content kind and are unique per kind. Tags are
//! shared by every content type; unknown tags are also created implicitly
//! when content is saved.
//!
//! A category or tag that content still references cannot be deleted, and
//! its slug (or a category's kind) cannot change, since content stores the
//! slug rather than the ID.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::Utc;
use folio_core::error::required_text;
use folio_core::{CategoryKind, Slug, ValidationError};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::{require_role, CallerIdentity, Role};
use crate::db::write_through;
use crate::error::AppError;
use crate::extractors::{extract_json, extract_query};
use crate::routes::content::{non_blank, Content};
use crate::state::{AppState, CategoryRecord, TagRecord};
use crate::store::Store;

/// Maximum category or tag name length.
pub const MAX_NAME_LEN: usize = 80;
/// Maximum category description length.
pub const MAX_DESCRIPTION_LEN: usize = 500;

// ── Request / response types ────────────────────────────────────────

/// Create or replace a category.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CategoryInput {
    pub name: String,
    /// Derived from the name when absent.
    #[serde(default)]
    pub slug: Option<String>,
    #[schema(value_type = String, example = "blog")]
    pub kind: CategoryKind,
    #[serde(default)]
    pub description: Option<String>,
}

struct CategoryFields {
    name: String,
    slug: Slug,
    kind: CategoryKind,
    description: Option<String>,
}

impl CategoryInput {
    fn validate(self) -> Result<CategoryFields, ValidationError> {
        let name = required_text("name", &self.name, MAX_NAME_LEN)?;
        let slug = match non_blank(self.slug) {
            Some(raw) => Slug::derive(&raw)?,
            None => Slug::derive(&name)?,
        };
        let description = non_blank(self.description);
        if description
            .as_ref()
            .is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_LEN)
        {
            return Err(ValidationError::field(
                "description",
                format!("must not exceed {MAX_DESCRIPTION_LEN} characters"),
            ));
        }
        Ok(CategoryFields {
            name,
            slug,
            kind: self.kind,
            description,
        })
    }
}

/// Create or rename a tag.
#[derive(Debug, Deserialize, ToSchema)]
pub struct TagInput {
    pub name: String,
    /// Derived from the name when absent.
    #[serde(default)]
    pub slug: Option<String>,
}

impl TagInput {
    fn validate(self) -> Result<(String, Slug), ValidationError> {
        let name = required_text("name", &self.name, MAX_NAME_LEN)?;
        let slug = match non_blank(self.slug) {
            Some(raw) => Slug::derive(&raw)?,
            None => Slug::derive(&name)?,
        };
        Ok((name, slug))
    }
}

/// Category listing filter.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct KindQuery {
    /// `blog`, `project` or `product`.
    #[param(value_type = Option<String>)]
    pub kind: Option<CategoryKind>,
}

/// A tag with the number of published documents using it.
#[derive(Debug, Serialize, ToSchema)]
pub struct TagUsage {
    #[serde(flatten)]
    pub tag: TagRecord,
    pub count: usize,
}

// ── Reference checks ────────────────────────────────────────────────
//
// These read the content stores without holding the taxonomy write lock. A
// content write landing between the check and a delete or re-key can leave
// content pointing at a missing category or tag. The next edit of that
// content fails with 400 for a category and recreates a tag.

fn category_in_use(state: &AppState, kind: CategoryKind, slug: &Slug) -> bool {
    fn uses<T: Content>(store: &Store<T>, slug: &Slug) -> bool {
        store.any(|doc| doc.meta().category.as_ref() == Some(slug))
    }
    match kind {
        CategoryKind::Blog => uses(&state.posts, slug),
        CategoryKind::Project => uses(&state.projects, slug),
        CategoryKind::Product => uses(&state.products, slug),
    }
}

fn tag_usage(state: &AppState, slug: &Slug, published_only: bool) -> usize {
    fn count<T: Content>(store: &Store<T>, slug: &Slug, published_only: bool) -> usize {
        store.count(|doc| {
            let meta = doc.meta();
            meta.tags.contains(slug) && (!published_only || meta.status.is_published())
        })
    }
    count(&state.posts, slug, published_only)
        + count(&state.projects, slug, published_only)
        + count(&state.products, slug, published_only)
}

// ── Routers ─────────────────────────────────────────────────────────

/// Public read endpoints.
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/api/categories", get(list_categories))
        .route("/api/tags", get(list_tags))
}

/// Dashboard endpoints. Mounted behind the auth middleware.
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/admin/categories",
            get(list_categories).post(create_category),
        )
        .route(
            "/api/admin/categories/:id",
            put(update_category).delete(delete_category),
        )
        .route("/api/admin/tags", get(list_tags).post(create_tag))
        .route("/api/admin/tags/:id", put(update_tag).delete(delete_tag))
}

// ── Categories ──────────────────────────────────────────────────────

/// GET /api/categories — List categories, optionally of one kind.
#[utoipa::path(
    get,
    path = "/api/categories",
    params(KindQuery),
    responses(
        (status = 200, description = "Categories ordered by kind and name", body = Vec<CategoryRecord>),
        (status = 400, description = "Unknown kind", body = crate::error::ErrorBody),
    ),
    tag = "taxonomy"
)]
async fn list_categories(
    State(state): State<AppState>,
    query: Result<Query<KindQuery>, QueryRejection>,
) -> Result<Json<Vec<CategoryRecord>>, AppError> {
    let query = extract_query(query)?;
    let mut categories = state
        .categories
        .filter(|c| query.kind.map_or(true, |k| c.kind == k));
    categories.sort_by(|a, b| {
        a.kind
            .as_str()
            .cmp(b.kind.as_str())
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
    Ok(Json(categories))
}

/// POST /api/admin/categories — Create a category.
#[utoipa::path(
    post,
    path = "/api/admin/categories",
    request_body = CategoryInput,
    responses(
        (status = 201, description = "Category created", body = CategoryRecord),
        (status = 400, description = "Validation error", body = crate::error::ErrorBody),
        (status = 409, description = "Slug already used for this kind", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "taxonomy"
)]
async fn create_category(
    State(state): State<AppState>,
    body: Result<Json<CategoryInput>, JsonRejection>,
) -> Result<(StatusCode, Json<CategoryRecord>), AppError> {
    let fields = extract_json(body)?.validate()?;
    let now = Utc::now();
    let record = CategoryRecord {
        id: Uuid::new_v4(),
        name: fields.name,
        slug: fields.slug,
        kind: fields.kind,
        description: fields.description,
        created_at: now,
        updated_at: now,
    };

    let record = state.categories.insert_unique(record)?;
    write_through::inserted(state.db_pool.as_ref(), &state.categories, &record).await?;

    tracing::info!(category_id = %record.id, kind = %record.kind, slug = %record.slug, "category created");
    Ok((StatusCode::CREATED, Json(record)))
}

/// PUT /api/admin/categories/:id — Replace a category.
#[utoipa::path(
    put,
    path = "/api/admin/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    request_body = CategoryInput,
    responses(
        (status = 200, description = "Category updated", body = CategoryRecord),
        (status = 400, description = "Validation error", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Slug taken, or referenced category re-keyed", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "taxonomy"
)]
async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<CategoryInput>, JsonRejection>,
) -> Result<Json<CategoryRecord>, AppError> {
    let fields = extract_json(body)?.validate()?;
    let existing = state
        .categories
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("category {id} not found")))?;

    let rekeyed = existing.slug != fields.slug || existing.kind != fields.kind;
    if rekeyed && category_in_use(&state, existing.kind, &existing.slug) {
        return Err(AppError::Conflict(format!(
            "category \"{}\" is in use; its slug and kind cannot change",
            existing.slug
        )));
    }

    let now = Utc::now();
    let (previous, current) = state.categories.update_unique(&id, |category| {
        category.name = fields.name;
        category.slug = fields.slug;
        category.kind = fields.kind;
        category.description = fields.description;
        category.updated_at = now;
        Ok(())
    })?;
    write_through::updated(
        state.db_pool.as_ref(),
        &state.categories,
        &previous,
        &current,
    )
    .await?;

    Ok(Json(current))
}

/// DELETE /api/admin/categories/:id — Delete an unused category.
#[utoipa::path(
    delete,
    path = "/api/admin/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 403, description = "Admin role required", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Category still referenced", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "taxonomy"
)]
async fn delete_category(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    require_role(&caller, Role::Admin)?;
    let existing = state
        .categories
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("category {id} not found")))?;
    if category_in_use(&state, existing.kind, &existing.slug) {
        return Err(AppError::Conflict(format!(
            "category \"{}\" is still referenced by {} content",
            existing.slug, existing.kind
        )));
    }

    let removed = state
        .categories
        .remove(&id)
        .ok_or_else(|| AppError::NotFound(format!("category {id} not found")))?;
    write_through::deleted(state.db_pool.as_ref(), &state.categories, &removed).await?;

    tracing::info!(category_id = %id, slug = %removed.slug, "category deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ── Tags ────────────────────────────────────────────────────────────

/// GET /api/tags — List tags with published usage counts.
#[utoipa::path(
    get,
    path = "/api/tags",
    responses(
        (status = 200, description = "Tags ordered by name", body = Vec<TagUsage>),
    ),
    tag = "taxonomy"
)]
async fn list_tags(State(state): State<AppState>) -> Json<Vec<TagUsage>> {
    let mut tags: Vec<TagUsage> = state
        .tags
        .list()
        .into_iter()
        .map(|tag| TagUsage {
            count: tag_usage(&state, &tag.slug, true),
            tag,
        })
        .collect();
    tags.sort_by(|a, b| a.tag.name.to_lowercase().cmp(&b.tag.name.to_lowercase()));
    Json(tags)
}

/// POST /api/admin/tags — Create a tag.
#[utoipa::path(
    post,
    path = "/api/admin/tags",
    request_body = TagInput,
    responses(
        (status = 201, description = "Tag created", body = TagRecord),
        (status = 400, description = "Validation error", body = crate::error::ErrorBody),
        (status = 409, description = "Slug already in use", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "taxonomy"
)]
async fn create_tag(
    State(state): State<AppState>,
    body: Result<Json<TagInput>, JsonRejection>,
) -> Result<(StatusCode, Json<TagRecord>), AppError> {
    let (name, slug) = extract_json(body)?.validate()?;
    let now = Utc::now();
    let record = state.tags.insert_unique(TagRecord {
        id: Uuid::new_v4(),
        name,
        slug,
        created_at: now,
        updated_at: now,
    })?;
    write_through::inserted(state.db_pool.as_ref(), &state.tags, &record).await?;

    tracing::info!(tag_id = %record.id, slug = %record.slug, "tag created");
    Ok((StatusCode::CREATED, Json(record)))
}

/// PUT /api/admin/tags/:id — Rename a tag.
#[utoipa::path(
    put,
    path = "/api/admin/tags/{id}",
    params(("id" = Uuid, Path, description = "Tag ID")),
    request_body = TagInput,
    responses(
        (status = 200, description = "Tag updated", body = TagRecord),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Slug taken, or referenced tag re-slugged", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "taxonomy"
)]
async fn update_tag(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<TagInput>, JsonRejection>,
) -> Result<Json<TagRecord>, AppError> {
    let (name, slug) = extract_json(body)?.validate()?;
    let existing = state
        .tags
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("tag {id} not found")))?;
    if existing.slug != slug && tag_usage(&state, &existing.slug, false) > 0 {
        return Err(AppError::Conflict(format!(
            "tag \"{}\" is in use; its slug cannot change",
            existing.slug
        )));
    }

    let now = Utc::now();
    let (previous, current) = state.tags.update_unique(&id, |tag| {
        tag.name = name;
        tag.slug = slug;
        tag.updated_at = now;
        Ok(())
    })?;
    write_through::updated(state.db_pool.as_ref(), &state.tags, &previous, &current).await?;

    Ok(Json(current))
}

/// DELETE /api/admin/tags/:id — Delete an unused tag.
#[utoipa::path(
    delete,
    path = "/api/admin/tags/{id}",
    params(("id" = Uuid, Path, description = "Tag ID")),
    responses(
        (status = 204, description = "Tag deleted"),
        (status = 403, description = "Admin role required", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Tag still referenced", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "taxonomy"
)]
async fn delete_tag(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    require_role(&caller, Role::Admin)?;
    let existing = state
        .tags
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("tag {id} not found")))?;
    let uses = tag_usage(&state, &existing.slug, false);
    if uses > 0 {
        return Err(AppError::Conflict(format!(
            "tag \"{}\" is still used by {uses} document(s)",
            existing.slug
        )));
    }

    let removed = state
        .tags
        .remove(&id)
        .ok_or_else(|| AppError::NotFound(format!("tag {id} not found")))?;
    write_through::deleted(state.db_pool.as_ref(), &state.tags, &removed).await?;

    tracing::info!(tag_id = %id, slug = %removed.slug, "tag deleted");
    Ok(StatusCode::NO_CONTENT)
}
