//! Storage collaborators for Keeper.
//!
//! This crate defines the persistence seams the vault core talks to. None of
//! them know about encryption or tokens: secret columns arrive already
//! encrypted and session rows carry only a token digest.
//!
//! - [`CustomerStore`]: registered customers and their master-password digests
//! - [`SessionStore`]: issued session tokens, at most one valid per customer
//! - [`RecordStore`]: password, card and file-metadata records scoped by owner
//! - [`ObjectStore`]: opaque file payloads keyed by object key
//!
//! Implementations:
//!
//! - [`MemoryBackend`] and [`MemoryObjectStore`]: in-memory, for tests and local runs
//! - [`FsObjectStore`]: objects as files under a root directory
//! - [`PostgresBackend`]: PostgreSQL via `sqlx` (feature `postgres-backend`)

mod error;
mod fs_objects;
mod memory;
mod model;
#[cfg(feature = "postgres-backend")]
mod postgres_backend;

pub use error::StorageError;
pub use fs_objects::FsObjectStore;
pub use memory::{MemoryBackend, MemoryObjectStore};
pub use model::{
    Column, ColumnAssignment, CustomerRow, NewCustomer, RecordKind, RecordPayload, RecordScope,
    ScopedUpdate, SessionRow, StoredRecord,
};
#[cfg(feature = "postgres-backend")]
pub use postgres_backend::PostgresBackend;

/// Registered customers.
#[async_trait::async_trait]
pub trait CustomerStore: Send + Sync + 'static {
    /// Insert a customer and return the stored row with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Conflict`] if the login is already taken, or
    /// [`StorageError::Write`] if the backend fails.
    async fn insert_customer(&self, customer: NewCustomer) -> Result<CustomerRow, StorageError>;

    /// Look a customer up by login. Returns `Ok(None)` if no such login.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Read`] if the backend fails.
    async fn customer_by_login(&self, login: &str) -> Result<Option<CustomerRow>, StorageError>;
}

/// Issued session tokens.
///
/// The store upholds one invariant: at most one row per owner has
/// `valid = true` at any observable instant.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Mark every session of `owner_id` as no longer valid and return how
    /// many rows changed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Write`] if the backend fails.
    async fn invalidate_sessions(&self, owner_id: i64) -> Result<u64, StorageError>;

    /// Invalidate every session of the row's owner and insert `session` as
    /// the only valid one, as a single atomic step. Concurrent rotations for
    /// the same owner are serialized; the last one to commit wins.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Transaction`] or [`StorageError::Write`] if the
    /// backend fails. On error no change is visible.
    async fn rotate_session(&self, session: SessionRow) -> Result<(), StorageError>;

    /// Whether a row with exactly this token digest exists and is valid.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Read`] if the backend fails.
    async fn session_is_valid(&self, token_hash: &str) -> Result<bool, StorageError>;
}

/// Secret records. Every operation is pinned to one owner.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync + 'static {
    /// Insert a new record.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Conflict`] if the owner already has a record of
    /// this kind with the same title, or [`StorageError::Write`] on failure.
    async fn insert_record(&self, record: StoredRecord) -> Result<(), StorageError>;

    /// Fetch one record. Returns `Ok(None)` if the owner has no such title.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Read`] if the backend fails.
    async fn record_by_title(
        &self,
        kind: RecordKind,
        scope: &RecordScope,
    ) -> Result<Option<StoredRecord>, StorageError>;

    /// Every record of one kind owned by `owner_id`, ordered by title.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Read`] if the backend fails.
    async fn list_records(
        &self,
        kind: RecordKind,
        owner_id: i64,
    ) -> Result<Vec<StoredRecord>, StorageError>;

    /// Apply a partial update and return the number of rows changed. Zero
    /// means the owner has no such title; it is not an error here.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Write`] if the backend fails.
    async fn apply_update(&self, update: &ScopedUpdate) -> Result<u64, StorageError>;

    /// Delete one record and return it as it was at the moment of deletion,
    /// or `None` if the owner has no such title.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Delete`] if the backend fails.
    async fn delete_record(
        &self,
        kind: RecordKind,
        scope: &RecordScope,
    ) -> Result<Option<StoredRecord>, StorageError>;
}

/// Opaque file payloads.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Store `bytes` under `key`, replacing any previous object.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidObjectKey`] for unsafe keys or
    /// [`StorageError::Write`] if the store fails.
    async fn put_object(&self, key: &str, bytes: Vec<u8>) -> Result<(), StorageError>;

    /// Read the object stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ObjectNotFound`] if there is none, or
    /// [`StorageError::Read`] if the store fails.
    async fn get_object(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Remove the object under `key`. Removing a missing object is not an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Delete`] if the store fails.
    async fn delete_object(&self, key: &str) -> Result<(), StorageError>;
}
