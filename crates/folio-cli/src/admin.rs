//! # Create-Admin Subcommand
//!
//! Creates an admin account straight in the database named by
//! `DATABASE_URL`, for installs where the first-user registration window
//! has already closed or was never used.

use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;
use zeroize::Zeroizing;

use folio_api::auth::Role;
use folio_api::routes::auth::create_user;
use folio_api::state::{AppConfig, AppState, UserRecord};

/// Arguments for the `folio create-admin` subcommand.
#[derive(Args, Debug)]
pub struct CreateAdminArgs {
    /// Login email of the new admin.
    #[arg(long)]
    pub email: String,

    /// Display name of the new admin.
    #[arg(long, default_value = folio_api::bootstrap::DEFAULT_ADMIN_NAME)]
    pub name: String,

    /// Database to write to.
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: String,
}

/// Execute the create-admin subcommand.
pub async fn run_create_admin(args: &CreateAdminArgs, out: &mut impl Write) -> Result<u8> {
    let password = crate::read_password(std::io::stdin().lock())?;

    let pool = folio_api::db::init_pool(Some(&args.database_url))
        .await
        .context("could not connect to the database")?;
    let state = AppState::with_config(AppConfig::default(), pool);
    state
        .hydrate_from_db()
        .await
        .context("could not load existing users")?;

    let user = create_admin(&state, &args.name, &args.email, password).await?;
    writeln!(out, "created admin {} ({})", user.email, user.id)?;
    Ok(0)
}

/// Create the admin through the same path as registration, so validation
/// and the duplicate-email check are shared.
pub async fn create_admin(
    state: &AppState,
    name: &str,
    email: &str,
    password: Zeroizing<String>,
) -> Result<UserRecord> {
    let user = create_user(state, name, email, password, Role::Admin)
        .await
        .with_context(|| format!("could not create admin {email}"))?;
    tracing::info!(user_id = %user.id, "admin created from CLI");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn password() -> Zeroizing<String> {
        Zeroizing::new("a strong password".to_string())
    }

    #[tokio::test]
    async fn creates_admin() {
        let state = AppState::new();
        let user = create_admin(&state, "Owner", "Owner@Example.com", password())
            .await
            .unwrap();
        assert_eq!(user.role, Role::Admin);
        assert_eq!(user.email.as_str(), "owner@example.com");
        assert!(state.users.find_by_key("owner@example.com").is_some());
    }

    #[tokio::test]
    async fn existing_email_fails() {
        let state = AppState::new();
        create_admin(&state, "Owner", "owner@example.com", password())
            .await
            .unwrap();
        let err = create_admin(&state, "Again", "owner@example.com", password())
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("already exists"));
        assert_eq!(state.users.len(), 1);
    }

    #[tokio::test]
    async fn short_password_fails() {
        let state = AppState::new();
        let short = Zeroizing::new("short".to_string());
        assert!(create_admin(&state, "Owner", "owner@example.com", short)
            .await
            .is_err());
    }
}
