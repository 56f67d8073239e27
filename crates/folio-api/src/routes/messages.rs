//! # Contact Messages
//!
//! ## Endpoints
//!
//! - `POST /api/messages` — contact form submission (rate-limited)
//! - `GET /api/admin/messages` — inbox, newest first (`unread` filter)
//! - `GET|PATCH|DELETE /api/admin/messages/:id` — read / mark read / delete (admin)

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use folio_core::error::required_text;
use folio_core::{Email, PageRequest, ValidationError};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::{require_role, CallerIdentity, Role};
use crate::db::write_through;
use crate::error::AppError;
use crate::extractors::{extract_json, extract_query, extract_validated_json, Validate};
use crate::routes::Page;
use crate::state::{AppState, MessageRecord};

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_SUBJECT_LEN: usize = 200;
pub const MAX_BODY_LEN: usize = 5000;

/// Contact form submission.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ContactInput {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub subject: String,
    #[serde(alias = "message")]
    pub body: String,
}

impl Validate for ContactInput {
    fn validate(&self) -> Result<(), ValidationError> {
        required_text("name", &self.name, MAX_NAME_LEN)?;
        Email::parse(&self.email)?;
        if self.subject.trim().chars().count() > MAX_SUBJECT_LEN {
            return Err(ValidationError::field(
                "subject",
                format!("must not exceed {MAX_SUBJECT_LEN} characters"),
            ));
        }
        required_text("body", &self.body, MAX_BODY_LEN)?;
        Ok(())
    }
}

/// Mark a message read or unread.
#[derive(Debug, Deserialize, ToSchema)]
pub struct MarkReadInput {
    pub read: bool,
}

/// Inbox query parameters.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MessageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    /// `true` for unread only, `false` for read only.
    pub unread: Option<bool>,
}

/// Public contact endpoint. The caller wraps it in the rate limiter.
pub fn public_router() -> Router<AppState> {
    Router::new().route("/api/messages", post(submit_message))
}

/// Dashboard endpoints. Mounted behind the auth middleware.
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/messages", get(list_messages))
        .route(
            "/api/admin/messages/:id",
            get(get_message).patch(mark_message).delete(delete_message),
        )
}

/// POST /api/messages — Submit the contact form.
#[utoipa::path(
    post,
    path = "/api/messages",
    request_body = ContactInput,
    responses(
        (status = 201, description = "Message received", body = MessageRecord),
        (status = 400, description = "Validation error", body = crate::error::ErrorBody),
        (status = 429, description = "Too many submissions", body = crate::error::ErrorBody),
    ),
    tag = "messages"
)]
async fn submit_message(
    State(state): State<AppState>,
    body: Result<Json<ContactInput>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageRecord>), AppError> {
    let input = extract_validated_json(body)?;
    let now = Utc::now();
    let record = MessageRecord {
        id: Uuid::new_v4(),
        name: input.name.trim().to_string(),
        email: Email::parse(&input.email)?,
        subject: input.subject.trim().to_string(),
        body: input.body.trim().to_string(),
        read: false,
        created_at: now,
        updated_at: now,
    };

    state.messages.insert(record.id, record.clone());
    write_through::inserted(state.db_pool.as_ref(), &state.messages, &record).await?;

    tracing::info!(message_id = %record.id, "contact message received");
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /api/admin/messages — List messages, newest first.
#[utoipa::path(
    get,
    path = "/api/admin/messages",
    params(MessageQuery),
    responses(
        (status = 200, description = "Messages", body = crate::routes::MessagePage),
        (status = 400, description = "Invalid query", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "messages"
)]
async fn list_messages(
    State(state): State<AppState>,
    query: Result<Query<MessageQuery>, QueryRejection>,
) -> Result<Json<Page<MessageRecord>>, AppError> {
    let query = extract_query(query)?;
    let request = PageRequest::new(query.page, query.limit)?;
    let mut items = state
        .messages
        .filter(|m| query.unread.map_or(true, |unread| m.read != unread));
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(Page::from_items(items, request)))
}

/// GET /api/admin/messages/:id — Read one message.
#[utoipa::path(
    get,
    path = "/api/admin/messages/{id}",
    params(("id" = Uuid, Path, description = "Message ID")),
    responses(
        (status = 200, description = "Message found", body = MessageRecord),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "messages"
)]
async fn get_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageRecord>, AppError> {
    state
        .messages
        .get(&id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("message {id} not found")))
}

/// PATCH /api/admin/messages/:id — Set the read flag.
#[utoipa::path(
    patch,
    path = "/api/admin/messages/{id}",
    params(("id" = Uuid, Path, description = "Message ID")),
    request_body = MarkReadInput,
    responses(
        (status = 200, description = "Message updated", body = MessageRecord),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "messages"
)]
async fn mark_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<MarkReadInput>, JsonRejection>,
) -> Result<Json<MessageRecord>, AppError> {
    let input = extract_json(body)?;
    let now = Utc::now();
    let (previous, current) = state.messages.update_unique(&id, |message| {
        message.read = input.read;
        message.updated_at = now;
        Ok(())
    })?;
    write_through::updated(state.db_pool.as_ref(), &state.messages, &previous, &current).await?;
    Ok(Json(current))
}

/// DELETE /api/admin/messages/:id — Delete a message.
#[utoipa::path(
    delete,
    path = "/api/admin/messages/{id}",
    params(("id" = Uuid, Path, description = "Message ID")),
    responses(
        (status = 204, description = "Message deleted"),
        (status = 403, description = "Admin role required", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "messages"
)]
async fn delete_message(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    require_role(&caller, Role::Admin)?;
    let removed = state
        .messages
        .remove(&id)
        .ok_or_else(|| AppError::NotFound(format!("message {id} not found")))?;
    write_through::deleted(state.db_pool.as_ref(), &state.messages, &removed).await?;
    Ok(StatusCode::NO_CONTENT)
}
