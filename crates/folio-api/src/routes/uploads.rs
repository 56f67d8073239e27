//! # Image Uploads
//!
//! `POST /api/admin/uploads` takes a multipart form with a single `file`
//! field. The image type is sniffed from the data, the file is written to
//! the upload directory under a fresh UUID, and the public URL is returned
//! for the rich-text editor to embed. Stored files are served back from
//! `/uploads/*`.

use axum::extract::multipart::{Field, MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use folio_core::ImageKind;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

/// Name of the multipart field carrying the image.
pub const FILE_FIELD: &str = "file";

/// A stored upload.
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    /// URL to embed, `{PUBLIC_BASE_URL}/uploads/{filename}`.
    pub url: String,
    pub filename: String,
    pub content_type: String,
    /// Size in bytes.
    pub size: usize,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/admin/uploads", post(upload_image))
}

/// Public URL of a stored upload.
pub fn upload_url(public_base_url: &str, filename: &str) -> String {
    format!("{public_base_url}/uploads/{filename}")
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::BadRequest(err.body_text())
    }
}

async fn read_field(field: Field<'_>, max_bytes: usize) -> Result<(Vec<u8>, Option<String>), AppError> {
    let declared = field.content_type().map(str::to_string);
    let bytes = field.bytes().await.map_err(multipart_error)?;
    if bytes.is_empty() {
        return Err(AppError::Validation("uploaded file is empty".into()));
    }
    if bytes.len() > max_bytes {
        return Err(AppError::Validation(format!(
            "uploaded file is {} bytes; the limit is {max_bytes}",
            bytes.len()
        )));
    }
    Ok((bytes.to_vec(), declared))
}

/// POST /api/admin/uploads — Store an image.
#[utoipa::path(
    post,
    path = "/api/admin/uploads",
    request_body(content = Vec<u8>, content_type = "multipart/form-data", description = "Form with a `file` field"),
    responses(
        (status = 201, description = "Image stored", body = UploadResponse),
        (status = 400, description = "Missing, empty, oversized or unsupported file", body = crate::error::ErrorBody),
        (status = 413, description = "Request body too large", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "uploads"
)]
async fn upload_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    let mut multipart = multipart.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let max_bytes = state.config.max_upload_bytes;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() == Some(FILE_FIELD) {
            upload = Some(read_field(field, max_bytes).await?);
            break;
        }
    }
    let (bytes, declared) = upload
        .ok_or_else(|| AppError::Validation(format!("multipart field \"{FILE_FIELD}\" is required")))?;

    let kind = ImageKind::classify(&bytes, declared.as_deref())?;
    let filename = format!("{}.{}", Uuid::new_v4(), kind.extension());

    let dir = &state.config.upload_dir;
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| AppError::Internal(format!("creating {}: {e}", dir.display())))?;
    let path = dir.join(&filename);
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| AppError::Internal(format!("writing {}: {e}", path.display())))?;

    tracing::info!(%filename, size = bytes.len(), content_type = kind.mime(), "image uploaded");

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            url: upload_url(&state.config.public_base_url, &filename),
            filename,
            content_type: kind.mime().to_string(),
            size: bytes.len(),
        }),
    ))
}
