//! # Authentication & Authorization Middleware
//!
//! Session-token middleware with role-based access control.
//!
//! Clients log in with email and password and receive an opaque bearer
//! token. Each authenticated request presents it as
//!
//! ```text
//! Authorization: Bearer {token}
//! ```
//!
//! The middleware hashes the token, looks up the session, drops it if it
//! has expired, loads the user and injects a [`CallerIdentity`] into the
//! request extensions. Handlers extract it via the `FromRequestParts` impl.

use axum::extract::{Request, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, ErrorBody};
use crate::session;
use crate::state::{AppState, SessionRecord};
use crate::store::Document;

// ── Role ────────────────────────────────────────────────────────────────────

/// Dashboard roles, ordered by privilege level.
///
/// The `Ord` derivation respects variant declaration order
/// (`Editor < Admin`), so access checks are a single `>=` comparison.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Creates and edits content, manages taxonomy, reads messages.
    Editor,
    /// Everything an editor can do, plus deletions and user management.
    Admin,
}

impl Role {
    /// Return the string representation of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Editor => "editor",
            Self::Admin => "admin",
        }
    }
}

// ── CallerIdentity ──────────────────────────────────────────────────────────

/// Identity of the authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub user_id: Uuid,
    pub role: Role,
    /// The session the request authenticated with; logout deletes it.
    pub session_id: Uuid,
}

impl CallerIdentity {
    /// Check if the caller has at least the given minimum role.
    pub fn has_role(&self, minimum: Role) -> bool {
        self.role >= minimum
    }
}

/// Extracts the identity that the auth middleware injected into extensions.
/// Returns 401 if no identity is present.
#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no caller identity in request context".into()))
    }
}

/// Check that the caller has at least the required role.
/// Returns 403 Forbidden if the caller's role is insufficient.
pub fn require_role(caller: &CallerIdentity, minimum: Role) -> Result<(), AppError> {
    if caller.has_role(minimum) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "role '{}' required, caller has '{}'",
            minimum.as_str(),
            caller.role.as_str()
        )))
    }
}

// ── Token Resolution ────────────────────────────────────────────────────────

/// Pull the bearer token out of the `Authorization` header.
///
/// `Ok(None)` when the header is absent; `Err` when it is present but
/// malformed.
pub fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, AppError> {
    let value = match headers.get(header::AUTHORIZATION) {
        Some(value) => value,
        None => return Ok(None),
    };
    let value = value
        .to_str()
        .map_err(|_| AppError::Unauthorized("authorization header is not valid ASCII".into()))?;
    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(Some(token.trim())),
        _ => Err(AppError::Unauthorized(
            "authorization header must use Bearer scheme".into(),
        )),
    }
}

/// Resolve a bearer token to a caller.
///
/// Expired sessions are deleted as a side effect.
pub async fn resolve_token(state: &AppState, token: &str) -> Result<CallerIdentity, AppError> {
    let token_hash = session::hash_token(token);
    let record = state
        .sessions
        .find_by_key(&token_hash)
        .filter(|s| session::token_matches(token, &s.token_hash))
        .ok_or_else(|| AppError::Unauthorized("invalid or expired session".into()))?;

    if record.is_expired(Utc::now()) {
        state.sessions.remove(&record.id);
        if let Some(pool) = &state.db_pool {
            if let Err(e) =
                crate::db::documents::delete(pool, SessionRecord::COLLECTION, record.id).await
            {
                tracing::warn!(session_id = %record.id, error = %e, "failed to delete expired session");
            }
        }
        return Err(AppError::Unauthorized("invalid or expired session".into()));
    }

    let user = state
        .users
        .get(&record.user_id)
        .ok_or_else(|| AppError::Unauthorized("invalid or expired session".into()))?;

    Ok(CallerIdentity {
        user_id: user.id,
        role: user.role,
        session_id: record.id,
    })
}

/// Resolve the caller from request headers, if any credentials were sent.
pub async fn resolve_caller(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Option<CallerIdentity>, AppError> {
    match bearer_token(headers)? {
        Some(token) => resolve_token(state, token).await.map(Some),
        None => Ok(None),
    }
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Require a valid session and inject the [`CallerIdentity`].
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match resolve_caller(&state, request.headers()).await {
        Ok(Some(identity)) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Ok(None) => {
            tracing::warn!("authentication failed: missing authorization header");
            unauthorized_response("missing authorization header")
        }
        Err(AppError::Unauthorized(msg)) => {
            tracing::warn!(reason = %msg, "authentication failed");
            unauthorized_response(&msg)
        }
        Err(other) => other.into_response(),
    }
}

fn unauthorized_response(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorBody::new("UNAUTHORIZED", message)),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::UserRecord;
    use axum::body::Body;
    use axum::http::Request;
    use axum::middleware::from_fn_with_state;
    use axum::routing::get;
    use axum::Router;
    use chrono::Duration;
    use folio_core::Email;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn seed_user(state: &AppState, role: Role) -> UserRecord {
        let now = Utc::now();
        let user = UserRecord {
            id: Uuid::new_v4(),
            name: "Test".to_string(),
            email: Email::parse(&format!("{}@example.com", Uuid::new_v4())).unwrap(),
            password_hash: String::new(),
            role,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(user.id, user.clone());
        user
    }

    fn seed_session(state: &AppState, user_id: Uuid, ttl_hours: i64) -> String {
        let (token, record) = session::issue(user_id, ttl_hours, Utc::now());
        state.sessions.insert_unique(record).unwrap();
        token.to_string()
    }

    async fn whoami(caller: CallerIdentity) -> String {
        caller.role.as_str().to_string()
    }

    fn test_app(state: AppState) -> Router {
        Router::new()
            .route("/test", get(whoami))
            .layer(from_fn_with_state(state.clone(), auth_middleware))
            .with_state(state)
    }

    async fn call(app: Router, auth: Option<&str>) -> (StatusCode, String) {
        let mut builder = Request::builder().uri("/test");
        if let Some(value) = auth {
            builder = builder.header("Authorization", value);
        }
        let response = app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[test]
    fn role_ordering() {
        assert!(Role::Admin > Role::Editor);
        let editor = CallerIdentity {
            user_id: Uuid::new_v4(),
            role: Role::Editor,
            session_id: Uuid::new_v4(),
        };
        assert!(require_role(&editor, Role::Editor).is_ok());
        assert!(matches!(
            require_role(&editor, Role::Admin),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn role_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
    }

    #[test]
    fn bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).unwrap().is_none());
        headers.insert(header::AUTHORIZATION, "Bearer abc".parse().unwrap());
        assert_eq!(bearer_token(&headers).unwrap(), Some("abc"));
        headers.insert(header::AUTHORIZATION, "Basic dXNlcjpwYXNz".parse().unwrap());
        assert!(bearer_token(&headers).is_err());
    }

    #[tokio::test]
    async fn valid_session_accepted() {
        let state = AppState::new();
        let user = seed_user(&state, Role::Admin);
        let token = seed_session(&state, user.id, 1);

        let (status, body) = call(test_app(state), Some(&format!("Bearer {token}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "admin");
    }

    #[tokio::test]
    async fn missing_header_rejected() {
        let (status, body) = call(test_app(AppState::new()), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("missing"));
    }

    #[tokio::test]
    async fn unknown_token_rejected() {
        let (status, _) = call(test_app(AppState::new()), Some("Bearer deadbeef")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn expired_session_rejected_and_removed() {
        let state = AppState::new();
        let user = seed_user(&state, Role::Editor);
        let (token, mut record) = session::issue(user.id, 1, Utc::now());
        record.expires_at = Utc::now() - Duration::minutes(1);
        state.sessions.insert_unique(record).unwrap();

        let (status, _) = call(test_app(state.clone()), Some(&format!("Bearer {}", *token))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(state.sessions.is_empty());
    }

    #[tokio::test]
    async fn session_for_deleted_user_rejected() {
        let state = AppState::new();
        let token = seed_session(&state, Uuid::new_v4(), 1);
        let (status, _) = call(test_app(state), Some(&format!("Bearer {token}"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
