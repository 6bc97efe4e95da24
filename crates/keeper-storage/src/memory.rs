//! In-memory backends.
//!
//! All state lives behind a single `RwLock`, so every trait method is atomic
//! with respect to every other. Nothing is persisted; data is lost when the
//! process exits. Used by the test suites and by local runs without a
//! database.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{
    CustomerRow, CustomerStore, NewCustomer, ObjectStore, RecordKind, RecordScope, RecordStore,
    ScopedUpdate, SessionRow, SessionStore, StorageError, StoredRecord,
};

type RecordKey = (RecordKind, i64, String);

#[derive(Debug, Default)]
struct State {
    customers: BTreeMap<String, CustomerRow>,
    next_customer_id: i64,
    sessions: Vec<SessionRow>,
    records: BTreeMap<RecordKey, StoredRecord>,
}

/// In-memory customer, session and record store.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<RwLock<State>>,
}

impl MemoryBackend {
    /// Create a new empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of session rows ever stored, valid or not.
    pub async fn session_count(&self) -> usize {
        self.state.read().await.sessions.len()
    }
}

fn record_key(kind: RecordKind, scope: &RecordScope) -> RecordKey {
    (kind, scope.owner_id, scope.title.clone())
}

#[async_trait::async_trait]
impl CustomerStore for MemoryBackend {
    async fn insert_customer(&self, customer: NewCustomer) -> Result<CustomerRow, StorageError> {
        let mut state = self.state.write().await;
        if state.customers.contains_key(&customer.login) {
            return Err(StorageError::Conflict {
                entity: "customer",
                key: customer.login,
            });
        }
        state.next_customer_id += 1;
        let row = CustomerRow {
            id: state.next_customer_id,
            name: customer.name,
            login: customer.login,
            master_password_hash: customer.master_password_hash,
        };
        state.customers.insert(row.login.clone(), row.clone());
        Ok(row)
    }

    async fn customer_by_login(&self, login: &str) -> Result<Option<CustomerRow>, StorageError> {
        Ok(self.state.read().await.customers.get(login).cloned())
    }
}

#[async_trait::async_trait]
impl SessionStore for MemoryBackend {
    async fn invalidate_sessions(&self, owner_id: i64) -> Result<u64, StorageError> {
        let mut state = self.state.write().await;
        let mut changed = 0;
        for row in state
            .sessions
            .iter_mut()
            .filter(|r| r.owner_id == owner_id && r.valid)
        {
            row.valid = false;
            changed += 1;
        }
        Ok(changed)
    }

    async fn rotate_session(&self, session: SessionRow) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        for row in state
            .sessions
            .iter_mut()
            .filter(|r| r.owner_id == session.owner_id)
        {
            row.valid = false;
        }
        state.sessions.push(SessionRow {
            valid: true,
            ..session
        });
        Ok(())
    }

    async fn session_is_valid(&self, token_hash: &str) -> Result<bool, StorageError> {
        let state = self.state.read().await;
        Ok(state
            .sessions
            .iter()
            .any(|r| r.valid && r.token_hash == token_hash))
    }
}

#[async_trait::async_trait]
impl RecordStore for MemoryBackend {
    async fn insert_record(&self, record: StoredRecord) -> Result<(), StorageError> {
        let key = (record.kind(), record.owner_id, record.title.clone());
        let mut state = self.state.write().await;
        if state.records.contains_key(&key) {
            return Err(StorageError::Conflict {
                entity: record.kind().label(),
                key: record.title,
            });
        }
        state.records.insert(key, record);
        Ok(())
    }

    async fn record_by_title(
        &self,
        kind: RecordKind,
        scope: &RecordScope,
    ) -> Result<Option<StoredRecord>, StorageError> {
        let state = self.state.read().await;
        Ok(state.records.get(&record_key(kind, scope)).cloned())
    }

    async fn list_records(
        &self,
        kind: RecordKind,
        owner_id: i64,
    ) -> Result<Vec<StoredRecord>, StorageError> {
        let state = self.state.read().await;
        // BTreeMap order is (kind, owner, title), so this is already sorted.
        Ok(state
            .records
            .iter()
            .filter(|((k, owner, _), _)| *k == kind && *owner == owner_id)
            .map(|(_, record)| record.clone())
            .collect())
    }

    async fn apply_update(&self, update: &ScopedUpdate) -> Result<u64, StorageError> {
        let mut state = self.state.write().await;
        let Some(record) = state.records.get_mut(&record_key(update.kind, &update.scope)) else {
            return Ok(0);
        };
        let mut patched = record.clone();
        if !update.apply_to(&mut patched) {
            return Err(StorageError::Write {
                entity: update.kind.label(),
                key: update.scope.title.clone(),
                reason: "assignment names a column of another record kind".to_owned(),
            });
        }
        *record = patched;
        Ok(1)
    }

    async fn delete_record(
        &self,
        kind: RecordKind,
        scope: &RecordScope,
    ) -> Result<Option<StoredRecord>, StorageError> {
        let mut state = self.state.write().await;
        Ok(state.records.remove(&record_key(kind, scope)))
    }
}

/// In-memory object store.
#[derive(Debug, Clone, Default)]
pub struct MemoryObjectStore {
    objects: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryObjectStore {
    /// Create a new empty object store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the store holds no objects.
    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put_object(&self, key: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        self.objects.write().await.insert(key.to_owned(), bytes);
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.objects
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::ObjectNotFound {
                key: key.to_owned(),
            })
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        self.objects.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::{Column, ColumnAssignment, RecordPayload};

    fn session(owner_id: i64, hash: &str) -> SessionRow {
        let now = Utc::now();
        SessionRow {
            owner_id,
            token_hash: hash.to_owned(),
            valid: true,
            issued_at: now,
            expires_at: now + Duration::hours(24),
        }
    }

    fn password(owner_id: i64, title: &str) -> StoredRecord {
        StoredRecord {
            owner_id,
            title: title.to_owned(),
            description: "d".to_owned(),
            payload: RecordPayload::Password {
                secret: "a".to_owned(),
            },
        }
    }

    fn scope(owner_id: i64, title: &str) -> RecordScope {
        RecordScope {
            owner_id,
            title: title.to_owned(),
        }
    }

    #[tokio::test]
    async fn duplicate_login_conflicts() {
        let backend = MemoryBackend::new();
        let new = NewCustomer {
            name: "A".into(),
            login: "a@b.com".into(),
            master_password_hash: "h".into(),
        };
        let first = backend.insert_customer(new.clone()).await.unwrap();
        assert_eq!(first.id, 1);
        let err = backend.insert_customer(new).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn rotate_keeps_one_valid_session() {
        let backend = MemoryBackend::new();
        backend.rotate_session(session(1, "t1")).await.unwrap();
        backend.rotate_session(session(2, "other")).await.unwrap();
        backend.rotate_session(session(1, "t2")).await.unwrap();

        assert!(!backend.session_is_valid("t1").await.unwrap());
        assert!(backend.session_is_valid("t2").await.unwrap());
        assert!(backend.session_is_valid("other").await.unwrap());
        assert_eq!(backend.session_count().await, 3);
    }

    #[tokio::test]
    async fn invalidate_counts_only_valid_rows() {
        let backend = MemoryBackend::new();
        backend.rotate_session(session(1, "t1")).await.unwrap();
        backend.rotate_session(session(1, "t2")).await.unwrap();
        assert_eq!(backend.invalidate_sessions(1).await.unwrap(), 1);
        assert!(!backend.session_is_valid("t2").await.unwrap());
    }

    #[tokio::test]
    async fn titles_are_scoped_by_owner() {
        let backend = MemoryBackend::new();
        backend.insert_record(password(1, "x")).await.unwrap();
        backend.insert_record(password(2, "x")).await.unwrap();
        let err = backend.insert_record(password(1, "x")).await.unwrap_err();
        assert!(err.is_conflict());

        let removed = backend
            .delete_record(RecordKind::Password, &scope(2, "x"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(removed.owner_id, 2);
        assert!(
            backend
                .delete_record(RecordKind::Password, &scope(2, "x"))
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            backend
                .record_by_title(RecordKind::Password, &scope(1, "x"))
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn list_is_sorted_and_kind_filtered() {
        let backend = MemoryBackend::new();
        backend.insert_record(password(1, "b")).await.unwrap();
        backend.insert_record(password(1, "a")).await.unwrap();
        backend.insert_record(password(2, "c")).await.unwrap();

        let titles: Vec<_> = backend
            .list_records(RecordKind::Password, 1)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.title)
            .collect();
        assert_eq!(titles, ["a", "b"]);
        assert!(
            backend
                .list_records(RecordKind::Card, 1)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn update_of_missing_row_reports_zero() {
        let backend = MemoryBackend::new();
        let update = ScopedUpdate {
            kind: RecordKind::Password,
            assignments: vec![ColumnAssignment {
                column: Column::Description,
                value: String::new(),
            }],
            scope: scope(1, "nope"),
        };
        assert_eq!(backend.apply_update(&update).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn foreign_column_update_leaves_record_intact() {
        let backend = MemoryBackend::new();
        backend.insert_record(password(1, "x")).await.unwrap();
        let update = ScopedUpdate {
            kind: RecordKind::Password,
            assignments: vec![
                ColumnAssignment {
                    column: Column::Description,
                    value: "changed".into(),
                },
                ColumnAssignment {
                    column: Column::Cvc,
                    value: "123".into(),
                },
            ],
            scope: scope(1, "x"),
        };
        assert!(backend.apply_update(&update).await.is_err());
        let stored = backend
            .record_by_title(RecordKind::Password, &scope(1, "x"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.description, "d");
    }

    #[tokio::test]
    async fn objects_round_trip_and_delete_is_idempotent() {
        let store = MemoryObjectStore::new();
        store.put_object("k", b"payload".to_vec()).await.unwrap();
        assert_eq!(store.get_object("k").await.unwrap(), b"payload");
        store.delete_object("k").await.unwrap();
        store.delete_object("k").await.unwrap();
        assert!(matches!(
            store.get_object("k").await,
            Err(StorageError::ObjectNotFound { .. })
        ));
        assert!(store.is_empty().await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_rotations_keep_one_valid_row() {
        let backend = MemoryBackend::new();
        let handles: Vec<_> = (0..32)
            .map(|n| {
                let backend = backend.clone();
                tokio::spawn(async move {
                    backend
                        .rotate_session(session(7, &format!("t{n}")))
                        .await
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let state = backend.state.read().await;
        assert_eq!(state.sessions.len(), 32);
        assert_eq!(state.sessions.iter().filter(|r| r.valid).count(), 1);
    }
}
