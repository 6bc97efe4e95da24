//! Error types for `keeper-core`.
//!
//! Crypto errors never include key material or plaintext, only lengths and
//! operation descriptions.

use keeper_storage::{RecordKind, StorageError};

/// Errors from the field cipher.
#[derive(Debug, thiserror::Error)]
pub enum CipherError {
    /// The key is shorter than the 16-byte minimum.
    #[error("cipher key too short: need at least 16 bytes, got {len}")]
    KeyTooShort { len: usize },

    /// The key, once truncated to a multiple of 8 bytes, is not an AES key size.
    #[error("cipher key of {len} bytes truncates to {truncated}, which is not 16, 24 or 32")]
    InvalidKeyLength { len: usize, truncated: usize },

    /// Empty plaintext on encrypt, or empty ciphertext on decrypt.
    #[error("empty input")]
    EmptyInput,

    /// The ciphertext is not valid base64.
    #[error("ciphertext is not valid base64: {reason}")]
    Decode { reason: String },

    /// The ciphertext has malformed padding or is not whole blocks.
    #[error("malformed ciphertext padding")]
    Padding,

    /// The decrypted bytes are not UTF-8.
    #[error("decrypted value is not valid UTF-8")]
    Utf8,
}

/// A malformed input field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: &'static str,
}

impl ValidationError {
    #[must_use]
    pub fn new(field: &'static str, reason: &'static str) -> Self {
        Self { field, reason }
    }
}

/// Errors from the session authority.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The token is malformed, mis-signed or expired.
    #[error("invalid token: {reason}")]
    Invalid { reason: String },

    /// The token verifies but a later login has superseded it.
    #[error("token has been superseded")]
    Superseded,

    /// Encoding a new token failed.
    #[error("failed to sign token: {reason}")]
    Signing { reason: String },

    /// The session store failed.
    #[error("session storage error: {0}")]
    Storage(#[from] StorageError),
}

impl SessionError {
    /// Whether the caller should be told "unauthenticated" rather than
    /// "internal error".
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Invalid { .. } | Self::Superseded)
    }
}

/// Errors from registration and credential checks.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    /// A registration field is malformed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The login is already registered.
    #[error("login '{login}' is already registered")]
    Conflict { login: String },

    /// The customer store failed.
    #[error("account storage error: {0}")]
    Storage(StorageError),
}

impl From<StorageError> for AccountError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict { key, .. } => Self::Conflict { login: key },
            other => Self::Storage(other),
        }
    }
}

/// Errors from the vault record service.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// An input field is malformed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The caller owns no record of this kind with this title.
    #[error("{kind} '{title}' not found")]
    NotFound { kind: RecordKind, title: String },

    /// The caller already owns a record of this kind with this title.
    #[error("{kind} '{title}' already exists")]
    Conflict { kind: RecordKind, title: String },

    /// Encrypting or decrypting a field failed.
    #[error("record crypto error: {0}")]
    Crypto(#[from] CipherError),

    /// The record store or object store failed.
    #[error("record storage error: {0}")]
    Storage(StorageError),
}

impl RecordError {
    pub(crate) fn not_found(kind: RecordKind, title: &str) -> Self {
        Self::NotFound {
            kind,
            title: title.to_owned(),
        }
    }

    /// Map a storage error, turning uniqueness violations into
    /// [`RecordError::Conflict`] for `kind`/`title`.
    pub(crate) fn from_storage(kind: RecordKind, title: &str, err: StorageError) -> Self {
        if err.is_conflict() {
            Self::Conflict {
                kind,
                title: title.to_owned(),
            }
        } else {
            Self::Storage(err)
        }
    }
}

impl From<StorageError> for RecordError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err)
    }
}
