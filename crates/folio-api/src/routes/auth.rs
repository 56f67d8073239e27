//! # Authentication Endpoints
//!
//! ## Endpoints
//!
//! - `POST /api/auth/login` — exchange email and password for a session token (rate-limited)
//! - `POST /api/auth/register` — create a user; open only while no user exists
//! - `POST /api/auth/logout` — end the current session
//! - `GET /api/auth/me` — the caller's profile
//! - `GET /api/admin/users` — all users (admin)

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use folio_core::error::required_text;
use folio_core::Email;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::auth::{require_role, resolve_caller, CallerIdentity, Role};
use crate::db::write_through;
use crate::error::AppError;
use crate::extractors::extract_json;
use crate::password;
use crate::session;
use crate::state::{AppState, UserProfile, UserRecord};

/// Maximum display name length.
pub const MAX_NAME_LEN: usize = 100;

const INVALID_CREDENTIALS: &str = "invalid email or password";

// ── Request / response types ────────────────────────────────────────

/// Login credentials.
#[derive(Deserialize, ToSchema)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// A new session.
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    /// Bearer token. Returned once; only its hash is stored.
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserProfile,
}

/// A new user.
#[derive(Deserialize, ToSchema)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
    /// Ignored for the first user, who is always an admin. Default `editor`.
    #[serde(default)]
    pub role: Option<Role>,
}

// ── User creation ───────────────────────────────────────────────────

/// Validate, hash and store a new user.
///
/// Shared by registration and startup admin seeding.
pub async fn create_user(
    state: &AppState,
    name: &str,
    email: &str,
    password: Zeroizing<String>,
    role: Role,
) -> Result<UserRecord, AppError> {
    let name = required_text("name", name, MAX_NAME_LEN)?;
    let email = Email::parse(email)?;
    password::validate_password(&password)?;
    if state.users.find_by_key(email.as_str()).is_some() {
        return Err(AppError::Conflict(format!("user {email} already exists")));
    }

    let password_hash = password::hash_password_blocking(password).await?;
    let now = Utc::now();
    let user = state.users.insert_unique(UserRecord {
        id: Uuid::new_v4(),
        name,
        email,
        password_hash,
        role,
        created_at: now,
        updated_at: now,
    })?;
    write_through::inserted(state.db_pool.as_ref(), &state.users, &user).await?;

    tracing::info!(user_id = %user.id, role = user.role.as_str(), "user created");
    Ok(user)
}

/// Drop the user's expired sessions. Failures are logged; login goes on.
pub async fn prune_expired_sessions(state: &AppState, user_id: Uuid, now: DateTime<Utc>) -> usize {
    let expired = state
        .sessions
        .remove_where(|s| s.user_id == user_id && s.is_expired(now));
    for record in &expired {
        if let Err(e) = write_through::deleted(state.db_pool.as_ref(), &state.sessions, record).await {
            tracing::warn!(session_id = %record.id, error = %e, "failed to delete expired session");
        }
    }
    if !expired.is_empty() {
        tracing::debug!(%user_id, count = expired.len(), "pruned expired sessions");
    }
    expired.len()
}

// ── Routers ─────────────────────────────────────────────────────────

/// `POST /api/auth/login`. The caller wraps it in the rate limiter.
pub fn login_router() -> Router<AppState> {
    Router::new().route("/api/auth/login", post(login))
}

/// `POST /api/auth/register`, which authenticates on its own.
pub fn public_router() -> Router<AppState> {
    Router::new().route("/api/auth/register", post(register))
}

/// Session and user endpoints. Mounted behind the auth middleware.
pub fn authenticated_router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
        .route("/api/admin/users", get(list_users))
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /api/auth/login — Start a session.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginInput,
    responses(
        (status = 200, description = "Session created", body = LoginResponse),
        (status = 401, description = "Invalid email or password", body = crate::error::ErrorBody),
        (status = 429, description = "Too many attempts", body = crate::error::ErrorBody),
    ),
    tag = "auth"
)]
async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginInput>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let input = extract_json(body)?;
    let user = Email::parse(&input.email)
        .ok()
        .and_then(|email| state.users.find_by_key(email.as_str()));

    let stored_hash = user.as_ref().map(|u| u.password_hash.clone());
    let verified =
        password::verify_password_blocking(Zeroizing::new(input.password), stored_hash).await?;
    let user = match user {
        Some(user) if verified => user,
        _ => {
            tracing::warn!("login failed");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
        }
    };

    let now = Utc::now();
    prune_expired_sessions(&state, user.id, now).await;
    let (token, record) = session::issue(user.id, state.config.session_ttl_hours, now);
    let record = state.sessions.insert_unique(record)?;
    write_through::inserted(state.db_pool.as_ref(), &state.sessions, &record).await?;

    tracing::info!(user_id = %user.id, session_id = %record.id, "login succeeded");
    Ok(Json(LoginResponse {
        token: token.to_string(),
        expires_at: record.expires_at,
        user: UserProfile::from(&user),
    }))
}

/// POST /api/auth/register — Create a user.
///
/// The first user becomes an admin without authentication. After that an
/// admin session is required.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterInput,
    responses(
        (status = 201, description = "User created", body = UserProfile),
        (status = 400, description = "Validation error", body = crate::error::ErrorBody),
        (status = 401, description = "Users exist and no session was sent", body = crate::error::ErrorBody),
        (status = 403, description = "Admin role required", body = crate::error::ErrorBody),
        (status = 409, description = "Email already registered", body = crate::error::ErrorBody),
    ),
    security((), ("bearer" = [])),
    tag = "auth"
)]
async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<RegisterInput>, JsonRejection>,
) -> Result<(StatusCode, Json<UserProfile>), AppError> {
    let input = extract_json(body)?;

    let role = if state.users.is_empty() {
        Role::Admin
    } else {
        let caller = resolve_caller(&state, &headers)
            .await?
            .ok_or_else(|| AppError::Unauthorized("an admin session is required".into()))?;
        require_role(&caller, Role::Admin)?;
        input.role.unwrap_or(Role::Editor)
    };

    let user = create_user(
        &state,
        &input.name,
        &input.email,
        Zeroizing::new(input.password),
        role,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(UserProfile::from(&user))))
}

/// POST /api/auth/logout — Delete the current session.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 204, description = "Session ended"),
        (status = 401, description = "Not signed in", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
async fn logout(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<StatusCode, AppError> {
    if let Some(removed) = state.sessions.remove(&caller.session_id) {
        write_through::deleted(state.db_pool.as_ref(), &state.sessions, &removed).await?;
    }
    tracing::info!(user_id = %caller.user_id, "logged out");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/auth/me — The caller's profile.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = UserProfile),
        (status = 401, description = "Not signed in", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
async fn me(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<UserProfile>, AppError> {
    state
        .users
        .get(&caller.user_id)
        .map(|user| Json(UserProfile::from(&user)))
        .ok_or_else(|| AppError::Unauthorized("user no longer exists".into()))
}

/// GET /api/admin/users — List users, oldest first.
#[utoipa::path(
    get,
    path = "/api/admin/users",
    responses(
        (status = 200, description = "Users", body = Vec<UserProfile>),
        (status = 403, description = "Admin role required", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
async fn list_users(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<Vec<UserProfile>>, AppError> {
    require_role(&caller, Role::Admin)?;
    let mut users = state.users.list();
    users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    Ok(Json(users.iter().map(UserProfile::from).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(s: &str) -> Zeroizing<String> {
        Zeroizing::new(s.to_string())
    }

    #[tokio::test]
    async fn create_user_normalizes_email() {
        let state = AppState::new();
        let user = create_user(&state, "Ada", "Ada@Example.COM", secret("long enough"), Role::Editor)
            .await
            .unwrap();
        assert_eq!(user.email.as_str(), "ada@example.com");
        assert!(user.password_hash.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let state = AppState::new();
        create_user(&state, "Ada", "ada@example.com", secret("long enough"), Role::Admin)
            .await
            .unwrap();
        let err = create_user(&state, "Other", "ADA@example.com", secret("long enough"), Role::Editor)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn prunes_only_the_users_expired_sessions() {
        let state = AppState::new();
        let now = Utc::now();
        let user = Uuid::new_v4();
        let other = Uuid::new_v4();
        let (_, expired) = session::issue(user, 1, now - chrono::Duration::hours(2));
        let (_, live) = session::issue(user, 1, now);
        let (_, foreign) = session::issue(other, 1, now - chrono::Duration::hours(2));
        for record in [expired, live.clone(), foreign.clone()] {
            state.sessions.insert_unique(record).unwrap();
        }

        assert_eq!(prune_expired_sessions(&state, user, now).await, 1);
        assert_eq!(state.sessions.len(), 2);
        assert!(state.sessions.get(&live.id).is_some());
        assert!(state.sessions.get(&foreign.id).is_some());
    }

    #[tokio::test]
    async fn short_password_rejected() {
        let state = AppState::new();
        let err = create_user(&state, "Ada", "ada@example.com", secret("short"), Role::Admin)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(state.users.is_empty());
    }
}
