//! # folio-api — Axum API Services for Folio
//!
//! Backend for a personal site with a private dashboard: blog posts,
//! portfolio projects and digital products, their categories and tags,
//! a contact form inbox and image uploads for the rich-text editor.
//!
//! ## API Surface
//!
//! | Prefix                    | Module                  | Access          |
//! |---------------------------|-------------------------|-----------------|
//! | `/api/posts`              | [`routes::posts`]       | public read     |
//! | `/api/projects`           | [`routes::projects`]    | public read     |
//! | `/api/products`           | [`routes::products`]    | public read     |
//! | `/api/categories`, `/api/tags` | [`routes::taxonomy`] | public read  |
//! | `/api/messages`           | [`routes::messages`]    | public, rate-limited |
//! | `/api/auth/*`             | [`routes::auth`]        | login rate-limited; logout/me need a session |
//! | `/api/admin/*`            | all of the above, plus [`routes::uploads`] and [`routes::dashboard`] | session |
//! | `/uploads/*`              | static files            | public          |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → [RateLimit | Auth] → Handler
//! ```
//!
//! ## OpenAPI
//!
//! Generated from utoipa annotations and served at `/openapi.json`.

pub mod auth;
pub mod bootstrap;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod password;
pub mod routes;
pub mod session;
pub mod state;
pub mod store;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::get;
use axum::{Extension, Router};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;

use crate::middleware::metrics::{metrics_middleware, ApiMetrics};
use crate::middleware::rate_limit::{rate_limit_middleware, RateLimitConfig, RateLimiter};
use crate::state::AppState;

/// Room for multipart framing on top of the upload size limit. Files over
/// the limit but within this slack get a 400 from the handler; anything
/// larger is cut off by the body limit with 413.
const UPLOAD_BODY_OVERHEAD: usize = 64 * 1024;

/// Assemble the full application router with all routes and middleware.
///
/// Health probes (`/health/*`) and uploaded files (`/uploads/*`) are
/// mounted outside the API middleware.
pub fn app(state: AppState) -> Router {
    app_with_limits(state, RateLimitConfig::default())
}

/// [`app`] with an explicit rate limit, for tests and tuning.
pub fn app_with_limits(state: AppState, rate_limit: RateLimitConfig) -> Router {
    let metrics = ApiMetrics::new();
    let limiter = RateLimiter::new(rate_limit);
    let upload_body_limit = state
        .config
        .max_upload_bytes
        .saturating_add(UPLOAD_BODY_OVERHEAD);

    // Unauthenticated writes, limited per client.
    let rate_limited = Router::new()
        .merge(routes::auth::login_router())
        .merge(routes::messages::public_router())
        .route_layer(from_fn(rate_limit_middleware))
        .layer(Extension(limiter));

    let public = Router::new()
        .merge(routes::posts::public_router())
        .merge(routes::projects::public_router())
        .merge(routes::products::public_router())
        .merge(routes::taxonomy::public_router())
        .merge(routes::auth::public_router())
        .merge(openapi::router());

    let authenticated = Router::new()
        .merge(routes::auth::authenticated_router())
        .merge(routes::posts::admin_router())
        .merge(routes::projects::admin_router())
        .merge(routes::products::admin_router())
        .merge(routes::taxonomy::admin_router())
        .merge(routes::messages::admin_router())
        .merge(routes::dashboard::router())
        .merge(routes::uploads::router().layer(DefaultBodyLimit::max(upload_body_limit)))
        .route_layer(from_fn_with_state(state.clone(), auth::auth_middleware));

    let api = Router::new()
        .merge(rate_limited)
        .merge(public)
        .merge(authenticated)
        .layer(from_fn(metrics_middleware))
        .layer(middleware::tracing_layer::layer())
        .layer(Extension(metrics))
        .with_state(state.clone());

    let health = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .with_state(state.clone());

    let router = Router::new()
        .merge(health)
        .merge(api)
        .nest_service("/uploads", ServeDir::new(&state.config.upload_dir));

    match cors_layer(&state.config.cors_origins) {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

/// CORS for the configured origins; `None` when no origin is configured.
fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    if allowed.is_empty() {
        return None;
    }
    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
    )
}

/// Liveness probe. 200 whenever the process can answer.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe. 503 when a configured database cannot be reached.
async fn readiness(State(state): State<AppState>) -> (StatusCode, &'static str) {
    match &state.db_pool {
        Some(pool) => match db::ping(pool).await {
            Ok(()) => (StatusCode::OK, "ready"),
            Err(e) => {
                tracing::warn!(error = %e, "readiness check failed");
                (StatusCode::SERVICE_UNAVAILABLE, "database unavailable")
            }
        },
        None => (StatusCode::OK, "ready"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_disabled_without_origins() {
        assert!(cors_layer(&[]).is_none());
        assert!(cors_layer(&["https://site.example".to_string()]).is_some());
    }
}
