//! Customer registration and credential checks.

use std::sync::Arc;

use keeper_storage::{CustomerStore, NewCustomer};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::AccountError;
use crate::model::Registration;
use crate::session::Principal;
use crate::validation;

/// Lowercase hex SHA-256 of a master password.
#[must_use]
pub fn hash_master_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// Registers customers and checks their credentials.
#[derive(Clone)]
pub struct AccountService {
    customers: Arc<dyn CustomerStore>,
}

impl std::fmt::Debug for AccountService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountService").finish_non_exhaustive()
    }
}

impl AccountService {
    pub fn new(customers: Arc<dyn CustomerStore>) -> Self {
        Self { customers }
    }

    /// Register a new customer.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::Validation`] for a malformed login or empty
    /// master password, [`AccountError::Conflict`] if the login is taken, and
    /// [`AccountError::Storage`] if the store fails.
    pub async fn register(&self, registration: Registration) -> Result<Principal, AccountError> {
        validation::login(&registration.login)?;
        validation::required("masterPassword", &registration.master_password)?;

        let row = self
            .customers
            .insert_customer(NewCustomer {
                name: registration.name,
                login: registration.login,
                master_password_hash: hash_master_password(&registration.master_password),
            })
            .await?;

        tracing::info!(customer_id = row.id, "customer registered");
        Ok(Principal {
            id: row.id,
            login: row.login,
        })
    }

    /// Check a login and master password. Returns `Ok(None)` for empty
    /// inputs, unknown logins and wrong passwords alike.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::Storage`] if the store fails.
    pub async fn verify_credentials(
        &self,
        login: &str,
        password: &str,
    ) -> Result<Option<Principal>, AccountError> {
        if login.is_empty() || password.is_empty() {
            return Ok(None);
        }
        let Some(row) = self.customers.customer_by_login(login).await? else {
            return Ok(None);
        };

        let supplied = hash_master_password(password);
        if !bool::from(supplied.as_bytes().ct_eq(row.master_password_hash.as_bytes())) {
            tracing::debug!(customer_id = row.id, "master password mismatch");
            return Ok(None);
        }
        Ok(Some(Principal {
            id: row.id,
            login: row.login,
        }))
    }
}
