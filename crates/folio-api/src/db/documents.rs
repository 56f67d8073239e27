//! Document persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `documents` table.
//! Unique keys are enforced both here (partial unique index) and in the
//! in-memory store; the store is the primary check.

use sqlx::PgPool;
use uuid::Uuid;

use crate::store::Document;

/// Serialize a document body for the JSONB column.
fn serialize_body<T: Document>(doc: &T) -> Result<serde_json::Value, sqlx::Error> {
    serde_json::to_value(doc).map_err(|e| {
        tracing::error!(collection = T::COLLECTION, id = %doc.id(), error = %e, "failed to serialize document");
        sqlx::Error::Encode(Box::new(e))
    })
}

/// Insert or replace a document.
pub async fn upsert<T: Document>(pool: &PgPool, doc: &T) -> Result<(), sqlx::Error> {
    let body = serialize_body(doc)?;

    sqlx::query(
        "INSERT INTO documents (collection, id, unique_key, body, created_at, updated_at)
         VALUES ($1, $2, $3, $4, now(), now())
         ON CONFLICT (collection, id) DO UPDATE
         SET unique_key = EXCLUDED.unique_key, body = EXCLUDED.body, updated_at = now()",
    )
    .bind(T::COLLECTION)
    .bind(doc.id())
    .bind(doc.unique_key())
    .bind(&body)
    .execute(pool)
    .await?;

    Ok(())
}

/// Delete a document. Returns whether a row was removed.
pub async fn delete(pool: &PgPool, collection: &str, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
        .bind(collection)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Atomically add one to the `views` field of a document body.
pub async fn increment_views(
    pool: &PgPool,
    collection: &str,
    id: Uuid,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE documents
         SET body = jsonb_set(body, '{views}', to_jsonb(COALESCE((body->>'views')::bigint, 0) + 1))
         WHERE collection = $1 AND id = $2",
    )
    .bind(collection)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Load every document in `T`'s collection, oldest first.
///
/// Rows whose body no longer decodes are logged and skipped so one bad
/// document cannot keep the service from starting.
pub async fn load_all<T: Document>(pool: &PgPool) -> Result<Vec<T>, sqlx::Error> {
    let rows: Vec<(Uuid, serde_json::Value)> = sqlx::query_as(
        "SELECT id, body FROM documents WHERE collection = $1 ORDER BY created_at ASC",
    )
    .bind(T::COLLECTION)
    .fetch_all(pool)
    .await?;

    let mut docs = Vec::with_capacity(rows.len());
    for (id, body) in rows {
        match serde_json::from_value::<T>(body) {
            Ok(doc) => docs.push(doc),
            Err(e) => {
                tracing::error!(
                    collection = T::COLLECTION,
                    %id,
                    error = %e,
                    "skipping document that failed to decode"
                );
            }
        }
    }

    Ok(docs)
}

/// Whether a database error is a unique-constraint violation.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.is_unique_violation(),
        _ => false,
    }
}
