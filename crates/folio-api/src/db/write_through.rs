//! Write-through of in-memory mutations.
//!
//! Handlers mutate the [`Store`] first (that is where unique keys are
//! checked) and then call one of these functions. If the database write
//! fails the in-memory change is undone and the request fails with 500,
//! so memory never holds a document the database rejected.

use sqlx::PgPool;

use crate::db::documents;
use crate::error::AppError;
use crate::store::{Document, Store};

fn map_db_error<T: Document>(doc: &T, err: sqlx::Error) -> AppError {
    if documents::is_unique_violation(&err) {
        return AppError::Conflict(format!(
            "{} with key \"{}\" already exists",
            T::COLLECTION,
            doc.unique_key().unwrap_or_default()
        ));
    }
    tracing::error!(collection = T::COLLECTION, id = %doc.id(), error = %err, "write-through failed");
    AppError::Internal(format!("failed to persist {} {}", T::COLLECTION, doc.id()))
}

/// Persist a newly inserted document, removing it from memory on failure.
pub async fn inserted<T: Document>(
    pool: Option<&PgPool>,
    store: &Store<T>,
    doc: &T,
) -> Result<(), AppError> {
    let Some(pool) = pool else { return Ok(()) };
    if let Err(e) = documents::upsert(pool, doc).await {
        store.remove(&doc.id());
        return Err(map_db_error(doc, e));
    }
    Ok(())
}

/// Persist an updated document, restoring `previous` in memory on failure.
pub async fn updated<T: Document>(
    pool: Option<&PgPool>,
    store: &Store<T>,
    previous: &T,
    current: &T,
) -> Result<(), AppError> {
    let Some(pool) = pool else { return Ok(()) };
    if let Err(e) = documents::upsert(pool, current).await {
        store.insert(previous.id(), previous.clone());
        return Err(map_db_error(current, e));
    }
    Ok(())
}

/// Delete a removed document from the database, reinserting it in memory on failure.
pub async fn deleted<T: Document>(
    pool: Option<&PgPool>,
    store: &Store<T>,
    removed: &T,
) -> Result<(), AppError> {
    let Some(pool) = pool else { return Ok(()) };
    if let Err(e) = documents::delete(pool, T::COLLECTION, removed.id()).await {
        store.insert(removed.id(), removed.clone());
        return Err(map_db_error(removed, e));
    }
    Ok(())
}
