//! # Blog Posts
//!
//! ## Endpoints
//!
//! - `GET /api/posts` — published posts, newest first
//! - `GET /api/posts/:slug` — published post (counts a view)
//! - `GET|POST /api/admin/posts` — all posts / create
//! - `GET|PUT|DELETE /api/admin/posts/:id` — read / replace / delete (admin)

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use folio_core::{text, ValidationError};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{require_role, CallerIdentity, Role};
use crate::db::write_through;
use crate::error::AppError;
use crate::extractors::{extract_json, extract_query};
use crate::routes::content::{
    self, resolve_references, ContentQuery, MetaFields, MetaInput, StatusFilter,
};
use crate::routes::Page;
use crate::state::{AppState, PostRecord};

/// Maximum excerpt length in characters.
pub const MAX_EXCERPT_LEN: usize = 500;
/// Length of an excerpt generated from the body.
pub const AUTO_EXCERPT_LEN: usize = 200;

// ── Request DTOs ────────────────────────────────────────────────────

/// Create or replace a post.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PostInput {
    #[serde(flatten)]
    pub meta: MetaInput,
    /// Generated from the body when absent.
    #[serde(default)]
    pub excerpt: Option<String>,
    /// Rich-text HTML.
    #[serde(default)]
    pub content: String,
}

struct PostFields {
    meta: MetaFields,
    excerpt: String,
    content: String,
}

impl PostInput {
    fn validate(self) -> Result<PostFields, ValidationError> {
        let meta = self.meta.validate()?;
        let excerpt = match content::non_blank(self.excerpt) {
            Some(excerpt) if excerpt.chars().count() > MAX_EXCERPT_LEN => {
                return Err(ValidationError::field(
                    "excerpt",
                    format!("must not exceed {MAX_EXCERPT_LEN} characters"),
                ));
            }
            Some(excerpt) => excerpt,
            None => text::excerpt(&self.content, AUTO_EXCERPT_LEN),
        };
        Ok(PostFields {
            meta,
            excerpt,
            content: self.content,
        })
    }
}

// ── Routers ─────────────────────────────────────────────────────────

/// Public read endpoints.
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/api/posts", get(list_posts))
        .route("/api/posts/:slug", get(get_post))
}

/// Dashboard endpoints. Mounted behind the auth middleware.
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/posts", get(admin_list_posts).post(create_post))
        .route(
            "/api/admin/posts/:id",
            get(admin_get_post).put(update_post).delete(delete_post),
        )
}

// ── Public handlers ─────────────────────────────────────────────────

/// GET /api/posts — List published posts.
#[utoipa::path(
    get,
    path = "/api/posts",
    params(ContentQuery),
    responses(
        (status = 200, description = "Published posts", body = crate::routes::PostPage),
        (status = 400, description = "Invalid query", body = crate::error::ErrorBody),
    ),
    tag = "posts"
)]
async fn list_posts(
    State(state): State<AppState>,
    query: Result<Query<ContentQuery>, QueryRejection>,
) -> Result<Json<Page<PostRecord>>, AppError> {
    let query = extract_query(query)?;
    Ok(Json(content::list_published(&state.posts, &query, |_| true)?))
}

/// GET /api/posts/:slug — Read a published post.
#[utoipa::path(
    get,
    path = "/api/posts/{slug}",
    params(("slug" = String, Path, description = "Post slug")),
    responses(
        (status = 200, description = "Post found", body = PostRecord),
        (status = 404, description = "Not found or not published", body = crate::error::ErrorBody),
    ),
    tag = "posts"
)]
async fn get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PostRecord>, AppError> {
    Ok(Json(content::view_published(&state, &state.posts, &slug).await?))
}

// ── Admin handlers ──────────────────────────────────────────────────

/// GET /api/admin/posts — List all posts including drafts.
#[utoipa::path(
    get,
    path = "/api/admin/posts",
    params(ContentQuery, StatusFilter),
    responses(
        (status = 200, description = "Posts", body = crate::routes::PostPage),
        (status = 401, description = "Not signed in", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "posts"
)]
async fn admin_list_posts(
    State(state): State<AppState>,
    query: Result<Query<ContentQuery>, QueryRejection>,
    status: Result<Query<StatusFilter>, QueryRejection>,
) -> Result<Json<Page<PostRecord>>, AppError> {
    let query = extract_query(query)?;
    let status = extract_query(status)?;
    Ok(Json(content::list_admin(&state.posts, &query, &status)?))
}

/// GET /api/admin/posts/:id — Read any post.
#[utoipa::path(
    get,
    path = "/api/admin/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Post found", body = PostRecord),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "posts"
)]
async fn admin_get_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PostRecord>, AppError> {
    Ok(Json(content::get_by_id(&state.posts, &id)?))
}

/// POST /api/admin/posts — Create a post.
#[utoipa::path(
    post,
    path = "/api/admin/posts",
    request_body = PostInput,
    responses(
        (status = 201, description = "Post created", body = PostRecord),
        (status = 400, description = "Validation error", body = crate::error::ErrorBody),
        (status = 409, description = "Slug already in use", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "posts"
)]
async fn create_post(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<PostInput>, JsonRejection>,
) -> Result<(StatusCode, Json<PostRecord>), AppError> {
    let fields = extract_json(body)?.validate()?;
    resolve_references::<PostRecord>(&state, &fields.meta).await?;

    let now = Utc::now();
    let record = PostRecord {
        id: Uuid::new_v4(),
        meta: fields.meta.into_new_meta(now)?,
        excerpt: fields.excerpt,
        reading_time_minutes: text::reading_time_minutes(&fields.content),
        content: fields.content,
        author_id: Some(caller.user_id),
    };

    let record = state.posts.insert_unique(record)?;
    write_through::inserted(state.db_pool.as_ref(), &state.posts, &record).await?;

    tracing::info!(post_id = %record.id, slug = %record.meta.slug, "post created");
    Ok((StatusCode::CREATED, Json(record)))
}

/// PUT /api/admin/posts/:id — Replace a post's editable fields.
#[utoipa::path(
    put,
    path = "/api/admin/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    request_body = PostInput,
    responses(
        (status = 200, description = "Post updated", body = PostRecord),
        (status = 400, description = "Validation error", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Slug already in use", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "posts"
)]
async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<PostInput>, JsonRejection>,
) -> Result<Json<PostRecord>, AppError> {
    let fields = extract_json(body)?.validate()?;
    resolve_references::<PostRecord>(&state, &fields.meta).await?;

    let now = Utc::now();
    let (previous, current) = state.posts.update_unique(&id, |post| {
        fields.meta.apply_to(&mut post.meta, now);
        post.excerpt = fields.excerpt;
        post.reading_time_minutes = text::reading_time_minutes(&fields.content);
        post.content = fields.content;
        Ok(())
    })?;
    write_through::updated(state.db_pool.as_ref(), &state.posts, &previous, &current).await?;

    Ok(Json(current))
}

/// DELETE /api/admin/posts/:id — Delete a post.
#[utoipa::path(
    delete,
    path = "/api/admin/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 204, description = "Post deleted"),
        (status = 403, description = "Admin role required", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "posts"
)]
async fn delete_post(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    require_role(&caller, Role::Admin)?;
    content::delete_by_id(&state, &state.posts, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
