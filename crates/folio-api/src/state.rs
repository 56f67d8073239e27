//! # Application State
//!
//! Shared state for the Folio API: one [`Store`] per document collection,
//! the optional Postgres pool used for write-through persistence, and the
//! runtime configuration.
//!
//! The record types below are the documents themselves. They are what the
//! admin endpoints return and what is serialized into the `body` column of
//! the `documents` table.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use folio_core::{CategoryKind, Currency, Email, ProductKind, PublishStatus, Slug};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::Role;
use crate::store::{Document, Store};

// -- Users & sessions ----------------------------------------------------------

/// A dashboard user.
///
/// Never returned directly from a handler; see [`UserProfile`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub name: String,
    pub email: Email,
    /// Argon2id PHC string.
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document for UserRecord {
    const COLLECTION: &'static str = "users";

    fn id(&self) -> Uuid {
        self.id
    }

    fn unique_key(&self) -> Option<String> {
        Some(self.email.as_str().to_string())
    }
}

/// Public view of a user, without the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<&UserRecord> for UserProfile {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.as_str().to_string(),
            role: user.role,
            created_at: user.created_at,
        }
    }
}

/// A login session. The bearer token itself is never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Hex SHA-256 of the bearer token.
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Document for SessionRecord {
    const COLLECTION: &'static str = "sessions";

    fn id(&self) -> Uuid {
        self.id
    }

    fn unique_key(&self) -> Option<String> {
        Some(self.token_hash.clone())
    }
}

// -- Content ---------------------------------------------------------------------

/// Fields shared by posts, projects and products. Flattened into each
/// record, so stored and returned JSON stays flat.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ContentMeta {
    pub title: String,
    #[schema(value_type = String)]
    pub slug: Slug,
    pub cover_image: Option<String>,
    /// Slug of a category whose kind matches the document type.
    #[schema(value_type = Option<String>)]
    pub category: Option<Slug>,
    #[schema(value_type = Vec<String>)]
    pub tags: Vec<Slug>,
    #[schema(value_type = String, example = "draft")]
    pub status: PublishStatus,
    pub views: u64,
    /// Set the first time the document is published; never cleared.
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A blog post.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PostRecord {
    pub id: Uuid,
    #[serde(flatten)]
    pub meta: ContentMeta,
    pub excerpt: String,
    /// Rich-text HTML body.
    pub content: String,
    pub author_id: Option<Uuid>,
    pub reading_time_minutes: u32,
}

impl Document for PostRecord {
    const COLLECTION: &'static str = "posts";

    fn id(&self) -> Uuid {
        self.id
    }

    fn unique_key(&self) -> Option<String> {
        Some(self.meta.slug.to_string())
    }
}

/// A portfolio project.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProjectRecord {
    pub id: Uuid,
    #[serde(flatten)]
    pub meta: ContentMeta,
    pub summary: String,
    pub content: String,
    pub gallery: Vec<String>,
    pub tech_stack: Vec<String>,
    pub live_url: Option<String>,
    pub repo_url: Option<String>,
    pub featured: bool,
}

impl Document for ProjectRecord {
    const COLLECTION: &'static str = "projects";

    fn id(&self) -> Uuid {
        self.id
    }

    fn unique_key(&self) -> Option<String> {
        Some(self.meta.slug.to_string())
    }
}

/// A digital product (ebook, course, template).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductRecord {
    pub id: Uuid,
    #[serde(flatten)]
    pub meta: ContentMeta,
    pub description: String,
    pub content: String,
    #[schema(value_type = String, example = "ebook")]
    pub kind: ProductKind,
    /// Price in minor units of `currency`.
    pub price_cents: i64,
    #[schema(value_type = String, example = "USD")]
    pub currency: Currency,
    pub purchase_url: Option<String>,
    pub featured: bool,
}

impl Document for ProductRecord {
    const COLLECTION: &'static str = "products";

    fn id(&self) -> Uuid {
        self.id
    }

    fn unique_key(&self) -> Option<String> {
        Some(self.meta.slug.to_string())
    }
}

// -- Messages & taxonomy ---------------------------------------------------------

/// A contact form submission.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageRecord {
    pub id: Uuid,
    pub name: String,
    #[schema(value_type = String)]
    pub email: Email,
    pub subject: String,
    pub body: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document for MessageRecord {
    const COLLECTION: &'static str = "messages";

    fn id(&self) -> Uuid {
        self.id
    }
}

/// A category. Slugs are unique per kind, so `blog:news` and
/// `product:news` may coexist.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryRecord {
    pub id: Uuid,
    pub name: String,
    #[schema(value_type = String)]
    pub slug: Slug,
    #[schema(value_type = String, example = "blog")]
    pub kind: CategoryKind,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CategoryRecord {
    /// The `{kind}:{slug}` key a category is unique under.
    pub fn key_for(kind: CategoryKind, slug: &Slug) -> String {
        format!("{}:{}", kind.as_str(), slug)
    }
}

impl Document for CategoryRecord {
    const COLLECTION: &'static str = "categories";

    fn id(&self) -> Uuid {
        self.id
    }

    fn unique_key(&self) -> Option<String> {
        Some(Self::key_for(self.kind, &self.slug))
    }
}

/// A tag shared by posts, projects and products.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TagRecord {
    pub id: Uuid,
    pub name: String,
    #[schema(value_type = String)]
    pub slug: Slug,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document for TagRecord {
    const COLLECTION: &'static str = "tags";

    fn id(&self) -> Uuid {
        self.id
    }

    fn unique_key(&self) -> Option<String> {
        Some(self.slug.to_string())
    }
}

// -- Configuration ---------------------------------------------------------------

/// Default session lifetime (one week).
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 168;
/// Default upload size limit (5 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// An environment variable was set to a value that cannot be parsed.
#[derive(Error, Debug)]
#[error("{key} has invalid value \"{value}\": {reason}")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
    pub reason: String,
}

/// Application configuration.
///
/// Custom `Debug` redacts the `database_url`, which usually embeds a password.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Postgres connection string. `None` runs in-memory only.
    pub database_url: Option<String>,
    pub session_ttl_hours: i64,
    /// Directory uploaded images are written to and served from.
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    /// Prefix for upload URLs returned to clients, e.g. `https://cdn.example.com`.
    /// Empty yields site-relative `/uploads/...` URLs.
    pub public_base_url: String,
    /// Allowed CORS origins. Empty disables the CORS layer.
    pub cors_origins: Vec<String>,
    pub site_name: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("session_ttl_hours", &self.session_ttl_hours)
            .field("upload_dir", &self.upload_dir)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("public_base_url", &self.public_base_url)
            .field("cors_origins", &self.cors_origins)
            .field("site_name", &self.site_name)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            database_url: None,
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
            upload_dir: PathBuf::from("./uploads"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            public_base_url: String::new(),
            cors_origins: Vec::new(),
            site_name: "Folio".to_string(),
        }
    }
}

impl AppConfig {
    /// Build configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup. Unset and blank
    /// values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let port = parse_var(&get, "PORT", defaults.port)?;
        let session_ttl_hours = parse_var(&get, "SESSION_TTL_HOURS", defaults.session_ttl_hours)?;
        if session_ttl_hours <= 0 {
            return Err(ConfigError {
                key: "SESSION_TTL_HOURS",
                value: session_ttl_hours.to_string(),
                reason: "must be positive".to_string(),
            });
        }
        let max_upload_bytes = parse_var(&get, "MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?;

        let cors_origins = get("CORS_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            port,
            database_url: get("DATABASE_URL"),
            session_ttl_hours,
            upload_dir: get("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            max_upload_bytes,
            public_base_url: get("PUBLIC_BASE_URL")
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .unwrap_or_default(),
            cors_origins,
            site_name: defaults.site_name,
        })
    }
}

fn parse_var<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

// -- Application State -----------------------------------------------------------

/// Shared application state accessible to all route handlers.
///
/// Clone-friendly via `Arc` internals in each `Store`.
#[derive(Debug, Clone)]
pub struct AppState {
    pub users: Store<UserRecord>,
    pub sessions: Store<SessionRecord>,
    pub posts: Store<PostRecord>,
    pub projects: Store<ProjectRecord>,
    pub products: Store<ProductRecord>,
    pub messages: Store<MessageRecord>,
    pub categories: Store<CategoryRecord>,
    pub tags: Store<TagRecord>,

    /// PostgreSQL connection pool for durable persistence.
    /// When `None`, the API operates in in-memory-only mode.
    pub db_pool: Option<PgPool>,

    pub config: AppConfig,
}

impl AppState {
    /// Create an in-memory state with default configuration.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default(), None)
    }

    /// Create a state with the given configuration and optional database pool.
    pub fn with_config(config: AppConfig, db_pool: Option<PgPool>) -> Self {
        Self {
            users: Store::new(),
            sessions: Store::new(),
            posts: Store::new(),
            projects: Store::new(),
            products: Store::new(),
            messages: Store::new(),
            categories: Store::new(),
            tags: Store::new(),
            db_pool,
            config,
        }
    }

    /// Hydrate in-memory stores from the database.
    ///
    /// Called once on startup when a database pool is available.
    pub async fn hydrate_from_db(&self) -> Result<(), sqlx::Error> {
        let pool = match &self.db_pool {
            Some(pool) => pool,
            None => return Ok(()),
        };

        let users = hydrate(pool, &self.users).await?;
        let sessions = hydrate(pool, &self.sessions).await?;
        let posts = hydrate(pool, &self.posts).await?;
        let projects = hydrate(pool, &self.projects).await?;
        let products = hydrate(pool, &self.products).await?;
        let messages = hydrate(pool, &self.messages).await?;
        let categories = hydrate(pool, &self.categories).await?;
        let tags = hydrate(pool, &self.tags).await?;

        tracing::info!(
            users,
            sessions,
            posts,
            projects,
            products,
            messages,
            categories,
            tags,
            "Hydrated in-memory stores from database"
        );

        Ok(())
    }
}

async fn hydrate<T: Document>(pool: &PgPool, store: &Store<T>) -> Result<usize, sqlx::Error> {
    let docs = crate::db::documents::load_all::<T>(pool).await?;
    let count = docs.len();
    for doc in docs {
        store.insert(doc.id(), doc);
    }
    Ok(count)
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
