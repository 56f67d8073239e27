//! # Portfolio Projects
//!
//! ## Endpoints
//!
//! - `GET /api/projects` — published projects (`featured` filter)
//! - `GET /api/projects/:slug` — published project (counts a view)
//! - `GET|POST /api/admin/projects` — all projects / create
//! - `GET|PUT|DELETE /api/admin/projects/:id` — read / replace / delete (admin)

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use folio_core::ValidationError;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{require_role, CallerIdentity, Role};
use crate::db::write_through;
use crate::error::AppError;
use crate::extractors::{extract_json, extract_query};
use crate::routes::content::{
    self, non_blank, optional_link, resolve_references, ContentQuery, MetaFields, MetaInput,
    StatusFilter,
};
use crate::routes::Page;
use crate::state::{AppState, ProjectRecord};

/// Maximum summary length in characters.
pub const MAX_SUMMARY_LEN: usize = 500;
/// Maximum gallery images per project.
pub const MAX_GALLERY: usize = 30;
/// Maximum tech stack entries per project.
pub const MAX_TECH_STACK: usize = 30;

/// Create or replace a project.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ProjectInput {
    #[serde(flatten)]
    pub meta: MetaInput,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub content: String,
    /// Image links (http(s) or `/uploads/`).
    #[serde(default)]
    pub gallery: Vec<String>,
    #[serde(default)]
    pub tech_stack: Vec<String>,
    #[serde(default)]
    pub live_url: Option<String>,
    #[serde(default)]
    pub repo_url: Option<String>,
    #[serde(default)]
    pub featured: bool,
}

struct ProjectFields {
    meta: MetaFields,
    summary: String,
    content: String,
    gallery: Vec<String>,
    tech_stack: Vec<String>,
    live_url: Option<String>,
    repo_url: Option<String>,
    featured: bool,
}

impl ProjectInput {
    fn validate(self) -> Result<ProjectFields, ValidationError> {
        let meta = self.meta.validate()?;

        let summary = self.summary.trim().to_string();
        if summary.chars().count() > MAX_SUMMARY_LEN {
            return Err(ValidationError::field(
                "summary",
                format!("must not exceed {MAX_SUMMARY_LEN} characters"),
            ));
        }

        if self.gallery.len() > MAX_GALLERY {
            return Err(ValidationError::field(
                "gallery",
                format!("must not contain more than {MAX_GALLERY} images"),
            ));
        }
        let gallery = self
            .gallery
            .into_iter()
            .filter_map(|link| non_blank(Some(link)))
            .map(|link| folio_core::validate_link(&link))
            .collect::<Result<Vec<_>, _>>()?;

        let mut tech_stack: Vec<String> = Vec::new();
        for item in self.tech_stack {
            let item = item.trim();
            if !item.is_empty() && !tech_stack.iter().any(|t| t.eq_ignore_ascii_case(item)) {
                tech_stack.push(item.to_string());
            }
        }
        if tech_stack.len() > MAX_TECH_STACK {
            return Err(ValidationError::field(
                "tech_stack",
                format!("must not contain more than {MAX_TECH_STACK} entries"),
            ));
        }

        Ok(ProjectFields {
            meta,
            summary,
            content: self.content,
            gallery,
            tech_stack,
            live_url: optional_link(self.live_url)?,
            repo_url: optional_link(self.repo_url)?,
            featured: self.featured,
        })
    }
}

/// Public read endpoints.
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/api/projects", get(list_projects))
        .route("/api/projects/:slug", get(get_project))
}

/// Dashboard endpoints. Mounted behind the auth middleware.
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/admin/projects",
            get(admin_list_projects).post(create_project),
        )
        .route(
            "/api/admin/projects/:id",
            get(admin_get_project)
                .put(update_project)
                .delete(delete_project),
        )
}

/// GET /api/projects — List published projects.
#[utoipa::path(
    get,
    path = "/api/projects",
    params(ContentQuery),
    responses(
        (status = 200, description = "Published projects", body = crate::routes::ProjectPage),
        (status = 400, description = "Invalid query", body = crate::error::ErrorBody),
    ),
    tag = "projects"
)]
async fn list_projects(
    State(state): State<AppState>,
    query: Result<Query<ContentQuery>, QueryRejection>,
) -> Result<Json<Page<ProjectRecord>>, AppError> {
    let query = extract_query(query)?;
    Ok(Json(content::list_published(&state.projects, &query, |_| true)?))
}

/// GET /api/projects/:slug — Read a published project.
#[utoipa::path(
    get,
    path = "/api/projects/{slug}",
    params(("slug" = String, Path, description = "Project slug")),
    responses(
        (status = 200, description = "Project found", body = ProjectRecord),
        (status = 404, description = "Not found or not published", body = crate::error::ErrorBody),
    ),
    tag = "projects"
)]
async fn get_project(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ProjectRecord>, AppError> {
    Ok(Json(
        content::view_published(&state, &state.projects, &slug).await?,
    ))
}

/// GET /api/admin/projects — List all projects including drafts.
#[utoipa::path(
    get,
    path = "/api/admin/projects",
    params(ContentQuery, StatusFilter),
    responses(
        (status = 200, description = "Projects", body = crate::routes::ProjectPage),
    ),
    security(("bearer" = [])),
    tag = "projects"
)]
async fn admin_list_projects(
    State(state): State<AppState>,
    query: Result<Query<ContentQuery>, QueryRejection>,
    status: Result<Query<StatusFilter>, QueryRejection>,
) -> Result<Json<Page<ProjectRecord>>, AppError> {
    let query = extract_query(query)?;
    let status = extract_query(status)?;
    Ok(Json(content::list_admin(&state.projects, &query, &status)?))
}

/// GET /api/admin/projects/:id — Read any project.
#[utoipa::path(
    get,
    path = "/api/admin/projects/{id}",
    params(("id" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Project found", body = ProjectRecord),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "projects"
)]
async fn admin_get_project(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProjectRecord>, AppError> {
    Ok(Json(content::get_by_id(&state.projects, &id)?))
}

/// POST /api/admin/projects — Create a project.
#[utoipa::path(
    post,
    path = "/api/admin/projects",
    request_body = ProjectInput,
    responses(
        (status = 201, description = "Project created", body = ProjectRecord),
        (status = 400, description = "Validation error", body = crate::error::ErrorBody),
        (status = 409, description = "Slug already in use", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "projects"
)]
async fn create_project(
    State(state): State<AppState>,
    body: Result<Json<ProjectInput>, JsonRejection>,
) -> Result<(StatusCode, Json<ProjectRecord>), AppError> {
    let fields = extract_json(body)?.validate()?;
    resolve_references::<ProjectRecord>(&state, &fields.meta).await?;

    let now = Utc::now();
    let record = ProjectRecord {
        id: Uuid::new_v4(),
        meta: fields.meta.into_new_meta(now)?,
        summary: fields.summary,
        content: fields.content,
        gallery: fields.gallery,
        tech_stack: fields.tech_stack,
        live_url: fields.live_url,
        repo_url: fields.repo_url,
        featured: fields.featured,
    };

    let record = state.projects.insert_unique(record)?;
    write_through::inserted(state.db_pool.as_ref(), &state.projects, &record).await?;

    tracing::info!(project_id = %record.id, slug = %record.meta.slug, "project created");
    Ok((StatusCode::CREATED, Json(record)))
}

/// PUT /api/admin/projects/:id — Replace a project's editable fields.
#[utoipa::path(
    put,
    path = "/api/admin/projects/{id}",
    params(("id" = Uuid, Path, description = "Project ID")),
    request_body = ProjectInput,
    responses(
        (status = 200, description = "Project updated", body = ProjectRecord),
        (status = 400, description = "Validation error", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Slug already in use", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "projects"
)]
async fn update_project(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<ProjectInput>, JsonRejection>,
) -> Result<Json<ProjectRecord>, AppError> {
    let fields = extract_json(body)?.validate()?;
    resolve_references::<ProjectRecord>(&state, &fields.meta).await?;

    let now = Utc::now();
    let (previous, current) = state.projects.update_unique(&id, |project| {
        fields.meta.apply_to(&mut project.meta, now);
        project.summary = fields.summary;
        project.content = fields.content;
        project.gallery = fields.gallery;
        project.tech_stack = fields.tech_stack;
        project.live_url = fields.live_url;
        project.repo_url = fields.repo_url;
        project.featured = fields.featured;
        Ok(())
    })?;
    write_through::updated(state.db_pool.as_ref(), &state.projects, &previous, &current).await?;

    Ok(Json(current))
}

/// DELETE /api/admin/projects/:id — Delete a project.
#[utoipa::path(
    delete,
    path = "/api/admin/projects/{id}",
    params(("id" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 204, description = "Project deleted"),
        (status = 403, description = "Admin role required", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "projects"
)]
async fn delete_project(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    require_role(&caller, Role::Admin)?;
    content::delete_by_id(&state, &state.projects, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
