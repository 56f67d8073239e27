//! # Document Store
//!
//! Every collection (users, sessions, posts, projects, products, messages,
//! categories, tags) lives in an in-memory [`Store`] that serves all reads.
//! When a database is configured, mutations are written through to the
//! `documents` table (see [`crate::db::documents`]) and the stores are
//! hydrated from it on startup.
//!
//! Collections that declare a unique key (slugs, emails, session token
//! hashes) enforce it inside the write lock, so the check and the mutation
//! cannot interleave with another request.

use std::collections::HashMap;
use std::sync::Arc;

use folio_core::ValidationError;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// A record stored in a named collection.
pub trait Document: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Collection name, used as the `collection` column when persisted.
    const COLLECTION: &'static str;

    /// Primary identifier.
    fn id(&self) -> Uuid;

    /// Value that must be unique within the collection, if any.
    fn unique_key(&self) -> Option<String> {
        None
    }
}

/// Errors from keyed store mutations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No document with this ID.
    #[error("{collection} {id} not found")]
    NotFound {
        collection: &'static str,
        id: Uuid,
    },

    /// Another document already holds the unique key.
    #[error("{collection} with key \"{key}\" already exists")]
    Conflict {
        collection: &'static str,
        key: String,
    },

    /// The mutation was rejected by validation.
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Thread-safe, cloneable in-memory key-value store.
///
/// All operations are synchronous (the RwLock is `parking_lot`, not `tokio::sync`)
/// because the lock is never held across `.await` points.
#[derive(Debug)]
pub struct Store<T: Clone + Send + Sync> {
    data: Arc<RwLock<HashMap<Uuid, T>>>,
}

impl<T: Clone + Send + Sync> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<T: Clone + Send + Sync> Store<T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert a record without any uniqueness check, returning the previous value.
    pub fn insert(&self, id: Uuid, value: T) -> Option<T> {
        self.data.write().insert(id, value)
    }

    /// Retrieve a record by ID.
    pub fn get(&self, id: &Uuid) -> Option<T> {
        self.data.read().get(id).cloned()
    }

    /// List all records, in no particular order.
    pub fn list(&self) -> Vec<T> {
        self.data.read().values().cloned().collect()
    }

    /// Records matching `pred`.
    pub fn filter(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        self.data
            .read()
            .values()
            .filter(|v| pred(v))
            .cloned()
            .collect()
    }

    /// First record matching `pred`.
    pub fn find(&self, pred: impl Fn(&T) -> bool) -> Option<T> {
        self.data.read().values().find(|v| pred(v)).cloned()
    }

    /// Whether any record matches `pred`.
    pub fn any(&self, pred: impl Fn(&T) -> bool) -> bool {
        self.data.read().values().any(pred)
    }

    /// Number of records matching `pred`, counted under the read lock.
    pub fn count(&self, pred: impl Fn(&T) -> bool) -> usize {
        self.data.read().values().filter(|v| pred(v)).count()
    }

    /// Fold over every record under the read lock, without cloning.
    pub fn fold<A>(&self, init: A, f: impl FnMut(A, &T) -> A) -> A {
        self.data.read().values().fold(init, f)
    }

    /// Update a record in place. Returns the updated record, or `None` if not found.
    pub fn update(&self, id: &Uuid, f: impl FnOnce(&mut T)) -> Option<T> {
        let mut guard = self.data.write();
        if let Some(entry) = guard.get_mut(id) {
            f(entry);
            Some(entry.clone())
        } else {
            None
        }
    }

    /// Remove a record by ID.
    pub fn remove(&self, id: &Uuid) -> Option<T> {
        self.data.write().remove(id)
    }

    /// Remove every record matching `pred`, returning the removed records.
    pub fn remove_where(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        let mut guard = self.data.write();
        let ids: Vec<Uuid> = guard
            .iter()
            .filter(|(_, v)| pred(v))
            .map(|(id, _)| *id)
            .collect();
        ids.iter().filter_map(|id| guard.remove(id)).collect()
    }

    /// Return the number of records.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Document> Store<T> {
    /// Insert a new document, failing if its unique key is taken.
    pub fn insert_unique(&self, value: T) -> Result<T, StoreError> {
        let mut guard = self.data.write();
        if let Some(key) = value.unique_key() {
            let taken = guard
                .values()
                .any(|other| other.id() != value.id() && other.unique_key().as_deref() == Some(&key));
            if taken {
                return Err(StoreError::Conflict {
                    collection: T::COLLECTION,
                    key,
                });
            }
        }
        guard.insert(value.id(), value.clone());
        Ok(value)
    }

    /// Atomically apply `f` to a copy of the document and commit it if the
    /// closure succeeds and the resulting unique key is still free.
    ///
    /// Returns `(previous, current)` so callers can roll back.
    pub fn update_unique(
        &self,
        id: &Uuid,
        f: impl FnOnce(&mut T) -> Result<(), StoreError>,
    ) -> Result<(T, T), StoreError> {
        let mut guard = self.data.write();
        let previous = guard.get(id).cloned().ok_or(StoreError::NotFound {
            collection: T::COLLECTION,
            id: *id,
        })?;

        let mut next = previous.clone();
        f(&mut next)?;

        if let Some(key) = next.unique_key() {
            let taken = guard
                .values()
                .any(|other| other.id() != *id && other.unique_key().as_deref() == Some(&key));
            if taken {
                return Err(StoreError::Conflict {
                    collection: T::COLLECTION,
                    key,
                });
            }
        }

        guard.insert(*id, next.clone());
        Ok((previous, next))
    }

    /// Look up a document by its unique key.
    pub fn find_by_key(&self, key: &str) -> Option<T> {
        self.data
            .read()
            .values()
            .find(|v| v.unique_key().as_deref() == Some(key))
            .cloned()
    }
}

impl<T: Clone + Send + Sync> Default for Store<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: Uuid,
        key: String,
        body: String,
    }

    impl Document for Note {
        const COLLECTION: &'static str = "notes";

        fn id(&self) -> Uuid {
            self.id
        }

        fn unique_key(&self) -> Option<String> {
            Some(self.key.clone())
        }
    }

    fn note(key: &str) -> Note {
        Note {
            id: Uuid::new_v4(),
            key: key.to_string(),
            body: String::new(),
        }
    }

    #[test]
    fn store_new_creates_empty_store() {
        let store: Store<Note> = Store::new();
        assert!(store.is_empty());
        assert!(store.list().is_empty());
    }

    #[test]
    fn insert_unique_rejects_duplicate_key() {
        let store = Store::new();
        store.insert_unique(note("a")).unwrap();
        let err = store.insert_unique(note("a")).unwrap_err();
        assert!(matches!(err, StoreError::Conflict { collection: "notes", .. }));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn update_unique_applies_change() {
        let store = Store::new();
        let n = store.insert_unique(note("a")).unwrap();
        let (prev, next) = store
            .update_unique(&n.id, |doc| {
                doc.body = "edited".to_string();
                Ok(())
            })
            .unwrap();
        assert_eq!(prev.body, "");
        assert_eq!(next.body, "edited");
        assert_eq!(store.get(&n.id).unwrap().body, "edited");
    }

    #[test]
    fn update_unique_keeps_own_key() {
        let store = Store::new();
        let n = store.insert_unique(note("a")).unwrap();
        assert!(store.update_unique(&n.id, |_| Ok(())).is_ok());
    }

    #[test]
    fn update_unique_rejects_taken_key_and_leaves_record() {
        let store = Store::new();
        store.insert_unique(note("a")).unwrap();
        let b = store.insert_unique(note("b")).unwrap();
        let err = store
            .update_unique(&b.id, |doc| {
                doc.key = "a".to_string();
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
        assert_eq!(store.get(&b.id).unwrap().key, "b");
    }

    #[test]
    fn update_unique_closure_error_leaves_record() {
        let store = Store::new();
        let n = store.insert_unique(note("a")).unwrap();
        let err = store
            .update_unique(&n.id, |doc| {
                doc.body = "half-applied".to_string();
                Err(ValidationError::field("body", "rejected").into())
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
        assert_eq!(store.get(&n.id).unwrap().body, "");
    }

    #[test]
    fn update_unique_missing_is_not_found() {
        let store: Store<Note> = Store::new();
        let err = store.update_unique(&Uuid::new_v4(), |_| Ok(())).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn find_by_key_and_filter() {
        let store = Store::new();
        let a = store.insert_unique(note("a")).unwrap();
        store.insert_unique(note("b")).unwrap();
        assert_eq!(store.find_by_key("a").unwrap().id, a.id);
        assert!(store.find_by_key("zzz").is_none());
        assert_eq!(store.filter(|n| n.key != "a").len(), 1);
        assert!(store.any(|n| n.key == "b"));
    }

    #[test]
    fn remove_where_removes_matching() {
        let store = Store::new();
        store.insert_unique(note("a")).unwrap();
        store.insert_unique(note("b")).unwrap();
        let removed = store.remove_where(|n| n.key == "a");
        assert_eq!(removed.len(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn count_and_fold_read_in_place() {
        let store = Store::new();
        for key in ["a", "b", "bb"] {
            store.insert_unique(note(key)).unwrap();
        }
        assert_eq!(store.count(|n| n.key.starts_with('b')), 2);
        assert_eq!(store.count(|n| n.key == "zzz"), 0);
        assert_eq!(store.fold(0, |acc, n| acc + n.key.len()), 4);
    }

    #[test]
    fn store_clone_shares_underlying_data() {
        let store = Store::new();
        let clone = store.clone();
        clone.insert_unique(note("a")).unwrap();
        assert_eq!(store.len(), 1);
    }
}
