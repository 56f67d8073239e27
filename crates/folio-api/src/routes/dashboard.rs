//! # Dashboard Statistics
//!
//! `GET /api/admin/stats` — collection counts, view totals, unread
//! messages and process request counters for the dashboard home page.

use axum::extract::State;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::middleware::metrics::{ApiMetrics, MetricsSnapshot};
use crate::routes::content::Content;
use crate::state::AppState;
use crate::store::Store;

/// Counts for one content collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ToSchema)]
pub struct ContentStats {
    pub total: usize,
    pub published: usize,
    pub drafts: usize,
    /// Sum of view counters.
    pub views: u64,
}

impl ContentStats {
    fn collect<T: Content>(store: &Store<T>) -> Self {
        store.fold(Self::default(), |mut acc, doc| {
            let meta = doc.meta();
            acc.total += 1;
            if meta.status.is_published() {
                acc.published += 1;
            } else {
                acc.drafts += 1;
            }
            acc.views = acc.views.saturating_add(meta.views);
            acc
        })
    }
}

/// Inbox counts.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct MessageStats {
    pub total: usize,
    pub unread: usize,
}

/// Dashboard statistics.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatsResponse {
    pub posts: ContentStats,
    pub projects: ContentStats,
    pub products: ContentStats,
    pub messages: MessageStats,
    pub categories: usize,
    pub tags: usize,
    pub users: usize,
    /// Views across all content.
    pub total_views: u64,
    /// Counters since process start.
    pub requests: MetricsSnapshot,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/admin/stats", get(stats))
}

/// GET /api/admin/stats — Dashboard statistics.
#[utoipa::path(
    get,
    path = "/api/admin/stats",
    responses(
        (status = 200, description = "Statistics", body = StatsResponse),
        (status = 401, description = "Not signed in", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "dashboard"
)]
async fn stats(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
) -> Json<StatsResponse> {
    let posts = ContentStats::collect(&state.posts);
    let projects = ContentStats::collect(&state.projects);
    let products = ContentStats::collect(&state.products);

    Json(StatsResponse {
        total_views: posts
            .views
            .saturating_add(projects.views)
            .saturating_add(products.views),
        posts,
        projects,
        products,
        messages: MessageStats {
            total: state.messages.len(),
            unread: state.messages.count(|m| !m.read),
        },
        categories: state.categories.len(),
        tags: state.tags.len(),
        users: state.users.len(),
        requests: metrics.snapshot(),
    })
}
