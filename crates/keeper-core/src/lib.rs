//! Core library for Keeper.
//!
//! The access-control and record-confidentiality layer of the vault:
//!
//! - [`FieldCipher`] encrypts individual secret attributes before storage
//! - [`SessionAuthority`] issues bearer tokens and keeps one session valid
//!   per customer
//! - [`RecordPatchBuilder`] turns partial updates into scoped column
//!   assignments
//! - [`VaultRecordService`] ties these together for passwords, cards and
//!   files, always scoped to the calling [`Principal`]
//! - [`AccountService`] registers customers and checks their credentials
//!
//! Persistence goes through the traits of `keeper-storage`.

pub mod accounts;
pub mod cipher;
pub mod error;
pub mod model;
pub mod patch;
pub mod records;
pub mod session;
pub mod validation;

pub use accounts::AccountService;
pub use cipher::{FieldCipher, IvPolicy};
pub use error::{AccountError, CipherError, RecordError, SessionError, ValidationError};
pub use patch::RecordPatchBuilder;
pub use records::VaultRecordService;
pub use session::{IssuedToken, Principal, SessionAuthority};
