//! Row types shared by every backend.
//!
//! Secret values arrive here already encrypted; nothing in this crate knows
//! about the field cipher.

use chrono::{DateTime, Utc};

/// A registered customer as stored.
#[derive(Clone, PartialEq, Eq)]
pub struct CustomerRow {
    pub id: i64,
    pub name: String,
    pub login: String,
    /// Lowercase hex SHA-256 digest of the master password.
    pub master_password_hash: String,
}

impl std::fmt::Debug for CustomerRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomerRow")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("login", &self.login)
            .field("master_password_hash", &"[REDACTED]")
            .finish()
    }
}

/// A customer about to be inserted. The backend assigns the id.
#[derive(Clone)]
pub struct NewCustomer {
    pub name: String,
    pub login: String,
    pub master_password_hash: String,
}

impl std::fmt::Debug for NewCustomer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewCustomer")
            .field("name", &self.name)
            .field("login", &self.login)
            .finish_non_exhaustive()
    }
}

/// One issued session token. Only the digest of the token is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRow {
    pub owner_id: i64,
    pub token_hash: String,
    pub valid: bool,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// The three kinds of secret record a customer can keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecordKind {
    Password,
    Card,
    File,
}

impl RecordKind {
    /// Table holding records of this kind.
    #[must_use]
    pub fn table(self) -> &'static str {
        match self {
            Self::Password => "password_records",
            Self::Card => "card_records",
            Self::File => "file_records",
        }
    }

    /// Human-readable name used in errors and logs.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::Card => "card",
            Self::File => "file",
        }
    }

    /// Columns a partial update may assign, in storage order.
    #[must_use]
    pub fn mutable_columns(self) -> &'static [Column] {
        match self {
            Self::Password => &[Column::Secret, Column::Description],
            Self::Card => &[
                Column::Number,
                Column::Expiry,
                Column::Cvc,
                Column::Description,
            ],
            Self::File => &[Column::FileName, Column::Description],
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A mutable column of a secret record table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Secret,
    Number,
    Expiry,
    Cvc,
    FileName,
    Description,
}

impl Column {
    /// SQL column name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Secret => "secret",
            Self::Number => "number",
            Self::Expiry => "expiry",
            Self::Cvc => "cvc",
            Self::FileName => "file_name",
            Self::Description => "description",
        }
    }
}

/// Kind-specific columns of a secret record.
#[derive(Clone, PartialEq, Eq)]
pub enum RecordPayload {
    Password {
        secret: String,
    },
    Card {
        number: String,
        expiry: String,
        cvc: String,
    },
    File {
        file_name: String,
        object_key: String,
    },
}

impl std::fmt::Debug for RecordPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Password { .. } => f.debug_struct("Password").finish_non_exhaustive(),
            Self::Card { .. } => f.debug_struct("Card").finish_non_exhaustive(),
            Self::File {
                file_name,
                object_key,
            } => f
                .debug_struct("File")
                .field("file_name", file_name)
                .field("object_key", object_key)
                .finish(),
        }
    }
}

impl RecordPayload {
    #[must_use]
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Password { .. } => RecordKind::Password,
            Self::Card { .. } => RecordKind::Card,
            Self::File { .. } => RecordKind::File,
        }
    }
}

/// A secret record as stored, owned by exactly one customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub owner_id: i64,
    pub title: String,
    pub description: String,
    pub payload: RecordPayload,
}

impl StoredRecord {
    #[must_use]
    pub fn kind(&self) -> RecordKind {
        self.payload.kind()
    }

    /// Overwrite one column. Returns `false` when the column does not belong
    /// to this record's kind, leaving the record untouched.
    pub fn assign(&mut self, column: Column, value: String) -> bool {
        let slot = match (column, &mut self.payload) {
            (Column::Description, _) => &mut self.description,
            (Column::Secret, RecordPayload::Password { secret }) => secret,
            (Column::Number, RecordPayload::Card { number, .. }) => number,
            (Column::Expiry, RecordPayload::Card { expiry, .. }) => expiry,
            (Column::Cvc, RecordPayload::Card { cvc, .. }) => cvc,
            (Column::FileName, RecordPayload::File { file_name, .. }) => file_name,
            _ => return false,
        };
        *slot = value;
        true
    }
}

/// The tenant-pinned key of a secret record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordScope {
    pub owner_id: i64,
    pub title: String,
}

/// One `column = value` pair of a partial update.
#[derive(Clone, PartialEq, Eq)]
pub struct ColumnAssignment {
    pub column: Column,
    pub value: String,
}

impl std::fmt::Debug for ColumnAssignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnAssignment")
            .field("column", &self.column)
            .finish_non_exhaustive()
    }
}

/// A partial update: the columns to assign and the `(title, owner)` row they
/// apply to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedUpdate {
    pub kind: RecordKind,
    pub assignments: Vec<ColumnAssignment>,
    pub scope: RecordScope,
}

impl ScopedUpdate {
    /// Whether applying this update would change nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Apply every assignment to an in-memory record.
    ///
    /// Returns `false` if any assignment names a column foreign to the
    /// record's kind; the record may then be partially modified, so callers
    /// should work on a copy.
    pub fn apply_to(&self, record: &mut StoredRecord) -> bool {
        self.assignments
            .iter()
            .all(|a| record.assign(a.column, a.value.clone()))
    }
}
