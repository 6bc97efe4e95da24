//! Shared application state for the Keeper server.
//!
//! A single [`AppState`] is constructed at startup and shared across all
//! Axum handlers via `Arc`. Keys and stores are injected here once and are
//! read-only afterwards.

use std::sync::Arc;

use keeper_core::{AccountService, CipherError, FieldCipher, SessionAuthority, VaultRecordService};
use keeper_storage::{
    CustomerStore, MemoryBackend, MemoryObjectStore, ObjectStore, RecordStore, SessionStore,
};

/// Shared application state passed to all HTTP handlers.
pub struct AppState {
    /// Registration and credential checks.
    pub accounts: AccountService,
    /// Token issue, rotation and verification.
    pub sessions: SessionAuthority,
    /// Password, card and file records.
    pub records: VaultRecordService,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

impl AppState {
    /// Wire the services onto one backend that stores customers, sessions
    /// and records, plus an object store for file payloads.
    pub fn new<B>(
        backend: B,
        objects: Arc<dyn ObjectStore>,
        cipher: FieldCipher,
        sign_key: &[u8],
    ) -> Self
    where
        B: CustomerStore + SessionStore + RecordStore,
    {
        let backend = Arc::new(backend);
        let customers: Arc<dyn CustomerStore> = backend.clone();
        let sessions: Arc<dyn SessionStore> = backend.clone();
        let records: Arc<dyn RecordStore> = backend;

        Self {
            accounts: AccountService::new(customers),
            sessions: SessionAuthority::new(sign_key, sessions),
            records: VaultRecordService::new(records, objects, Arc::new(cipher)),
        }
    }

    /// State backed entirely by memory, for tests and local runs.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError`] if `cipher_key` is not a usable AES key.
    pub fn in_memory(sign_key: &[u8], cipher_key: &[u8]) -> Result<Self, CipherError> {
        Ok(Self::new(
            MemoryBackend::new(),
            Arc::new(MemoryObjectStore::new()),
            FieldCipher::new(cipher_key)?,
            sign_key,
        ))
    }
}
