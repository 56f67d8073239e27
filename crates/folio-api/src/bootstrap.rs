//! # Startup Bootstrap
//!
//! Builds the [`AppState`] the server runs with.
//!
//! ## Bootstrap Sequence
//!
//! 1. **Load Site Config**: if `SITE_CONFIG` names a YAML file, parse it and
//!    apply its `site_name`.
//! 2. **Hydrate**: load every collection from the database, when one is
//!    configured.
//! 3. **Seed Categories**: create the site config's default categories that
//!    do not exist yet.
//! 4. **Seed Admin**: when no user exists and `ADMIN_EMAIL` and
//!    `ADMIN_PASSWORD` are set, create an admin.
//! 5. **Log Banner**: mode, port and site name.
//!
//! Example site config:
//!
//! ```yaml
//! site_name: Jane's Workshop
//! categories:
//!   - name: Tutorials
//!     kind: blog
//!   - name: Ebooks
//!     kind: product
//!     description: Long-form guides
//! ```

use std::path::{Path, PathBuf};

use chrono::Utc;
use folio_core::error::required_text;
use folio_core::{CategoryKind, Slug};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::auth::Role;
use crate::db::write_through;
use crate::error::AppError;
use crate::routes::auth::create_user;
use crate::routes::taxonomy::MAX_NAME_LEN;
use crate::state::{AppConfig, AppState, CategoryRecord};

/// Errors during bootstrap.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// Site config file not found at the given path.
    #[error("site config not found: {path}")]
    SiteConfigNotFound { path: String },

    /// Site config is not valid YAML or has invalid entries.
    #[error("invalid site config {path}: {reason}")]
    InvalidSiteConfig { path: String, reason: String },

    /// Loading collections from the database failed.
    #[error("database hydration failed: {0}")]
    Hydrate(#[from] sqlx::Error),

    /// Creating a default category or the admin user failed.
    #[error("seeding failed: {0}")]
    Seed(#[from] AppError),

    /// IO error during bootstrap.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Contents of the `SITE_CONFIG` file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    #[serde(default)]
    pub site_name: Option<String>,
    #[serde(default)]
    pub categories: Vec<SeedCategory>,
}

/// A category created on startup if missing.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedCategory {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    pub kind: CategoryKind,
    #[serde(default)]
    pub description: Option<String>,
}

/// Startup inputs read from the environment.
///
/// Custom `Debug` redacts the admin password.
#[derive(Clone, Default)]
pub struct BootstrapEnv {
    pub site_config: Option<PathBuf>,
    pub admin_email: Option<String>,
    pub admin_password: Option<Zeroizing<String>>,
    pub admin_name: Option<String>,
}

impl std::fmt::Debug for BootstrapEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapEnv")
            .field("site_config", &self.site_config)
            .field("admin_email", &self.admin_email)
            .field(
                "admin_password",
                &self.admin_password.as_ref().map(|_| "[REDACTED]"),
            )
            .field("admin_name", &self.admin_name)
            .finish()
    }
}

impl BootstrapEnv {
    /// Read `SITE_CONFIG`, `ADMIN_EMAIL`, `ADMIN_PASSWORD` and `ADMIN_NAME`.
    pub fn from_env() -> Self {
        let get = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        Self {
            site_config: get("SITE_CONFIG").map(PathBuf::from),
            admin_email: get("ADMIN_EMAIL"),
            admin_password: get("ADMIN_PASSWORD").map(Zeroizing::new),
            admin_name: get("ADMIN_NAME"),
        }
    }
}

/// Default display name of a seeded admin.
pub const DEFAULT_ADMIN_NAME: &str = "Administrator";

/// Parse a site config file.
pub fn load_site_config(path: &Path) -> Result<SiteConfig, BootstrapError> {
    let display = path.display().to_string();
    if !path.exists() {
        return Err(BootstrapError::SiteConfigNotFound { path: display });
    }
    let raw = std::fs::read_to_string(path)?;
    let config: SiteConfig =
        serde_yaml::from_str(&raw).map_err(|e| BootstrapError::InvalidSiteConfig {
            path: display.clone(),
            reason: e.to_string(),
        })?;
    if let Some(name) = &config.site_name {
        if name.trim().is_empty() {
            return Err(BootstrapError::InvalidSiteConfig {
                path: display,
                reason: "site_name must not be blank".to_string(),
            });
        }
    }
    Ok(config)
}

/// Build the application state.
pub async fn bootstrap(
    mut config: AppConfig,
    db_pool: Option<PgPool>,
    env: BootstrapEnv,
) -> Result<AppState, BootstrapError> {
    let site = match &env.site_config {
        Some(path) => {
            let site = load_site_config(path)?;
            tracing::info!(path = %path.display(), categories = site.categories.len(), "loaded site config");
            site
        }
        None => SiteConfig::default(),
    };
    if let Some(name) = &site.site_name {
        config.site_name = name.trim().to_string();
    }

    let state = AppState::with_config(config, db_pool);
    state.hydrate_from_db().await?;

    let seeded = seed_categories(&state, &site.categories).await?;
    if seeded > 0 {
        tracing::info!(count = seeded, "seeded default categories");
    }
    seed_admin(&state, &env).await?;

    log_banner(&state);
    Ok(state)
}

/// Create each category whose `{kind}:{slug}` key is not taken. Returns how
/// many were created.
pub async fn seed_categories(
    state: &AppState,
    categories: &[SeedCategory],
) -> Result<usize, AppError> {
    let mut created = 0;
    for seed in categories {
        let name = required_text("name", &seed.name, MAX_NAME_LEN)?;
        let slug = match seed.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Slug::derive(raw)?,
            None => Slug::derive(&name)?,
        };
        if state
            .categories
            .find_by_key(&CategoryRecord::key_for(seed.kind, &slug))
            .is_some()
        {
            continue;
        }

        let now = Utc::now();
        let record = state.categories.insert_unique(CategoryRecord {
            id: Uuid::new_v4(),
            name,
            slug,
            kind: seed.kind,
            description: seed
                .description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(String::from),
            created_at: now,
            updated_at: now,
        })?;
        write_through::inserted(state.db_pool.as_ref(), &state.categories, &record).await?;
        created += 1;
    }
    Ok(created)
}

/// Create the first admin from the environment. Does nothing once any user
/// exists or when either variable is missing.
pub async fn seed_admin(state: &AppState, env: &BootstrapEnv) -> Result<bool, AppError> {
    if !state.users.is_empty() {
        return Ok(false);
    }
    let (Some(email), Some(password)) = (&env.admin_email, &env.admin_password) else {
        tracing::warn!("no users exist; the first POST /api/auth/register creates an admin");
        return Ok(false);
    };

    let name = env.admin_name.as_deref().unwrap_or(DEFAULT_ADMIN_NAME);
    let user = create_user(state, name, email, password.clone(), Role::Admin).await?;
    tracing::info!(user_id = %user.id, email = %user.email, "seeded admin user");
    Ok(true)
}

fn log_banner(state: &AppState) {
    let mode = if state.db_pool.is_some() {
        "database"
    } else {
        "in-memory"
    };
    tracing::info!(
        site = %state.config.site_name,
        mode,
        port = state.config.port,
        upload_dir = %state.config.upload_dir.display(),
        posts = state.posts.len(),
        projects = state.projects.len(),
        products = state.products.len(),
        "Folio ready"
    );
}
