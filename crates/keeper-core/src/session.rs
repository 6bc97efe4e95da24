//! Single-active-session authority.
//!
//! Tokens are HS256 JWTs carrying the customer's login and id. A token is
//! accepted only if its signature and expiry check out *and* the session
//! store still marks it valid. Logging in again rotates the stored session,
//! so every earlier token stops working even though it has not expired.
//!
//! The store only ever sees the SHA-256 digest of a token.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use keeper_storage::{SessionRow, SessionStore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::SessionError;

/// How long an issued token stays valid.
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24;

/// The authenticated identity a request acts as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: i64,
    pub login: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    login: String,
    uid: i64,
    iat: i64,
    exp: i64,
    /// Unique per token, so two logins within one second still differ.
    jti: String,
}

/// A freshly signed token and the window it is valid for.
#[derive(Clone)]
pub struct IssuedToken {
    pub principal: Principal,
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedToken")
            .field("principal", &self.principal)
            .field("token", &"[REDACTED]")
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Hash a token for storage and lookup. Returns lowercase hex SHA-256.
#[must_use]
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Issues, rotates and verifies session tokens.
pub struct SessionAuthority {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
    store: Arc<dyn SessionStore>,
}

impl std::fmt::Debug for SessionAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionAuthority")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl SessionAuthority {
    /// Create an authority signing with `signing_key` and tracking sessions
    /// in `store`.
    pub fn new(signing_key: &[u8], store: Arc<dyn SessionStore>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);
        Self {
            encoding: EncodingKey::from_secret(signing_key),
            decoding: DecodingKey::from_secret(signing_key),
            validation,
            ttl: Duration::hours(DEFAULT_SESSION_TTL_HOURS),
            store,
        }
    }

    /// Override the token lifetime.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sign a new token for `principal`. Nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Signing`] if encoding fails.
    pub fn issue(&self, principal: &Principal) -> Result<IssuedToken, SessionError> {
        let issued_at = Utc::now();
        let expires_at = issued_at + self.ttl;
        let claims = Claims {
            login: principal.login.clone(),
            uid: principal.id,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        };
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| SessionError::Signing {
                reason: e.to_string(),
            })?;

        Ok(IssuedToken {
            principal: principal.clone(),
            token,
            issued_at,
            expires_at,
        })
    }

    /// Mark every stored token of `owner_id` as no longer valid.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Storage`] if the store fails.
    pub async fn invalidate(&self, owner_id: i64) -> Result<u64, SessionError> {
        let changed = self.store.invalidate_sessions(owner_id).await?;
        tracing::info!(owner_id, changed, "sessions invalidated");
        Ok(changed)
    }

    /// Make `issued` the only valid session of its owner. Invalidating the
    /// previous sessions and storing the new one happen atomically.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Storage`] if the store fails; the previous
    /// session then stays in effect.
    pub async fn persist(&self, issued: &IssuedToken) -> Result<(), SessionError> {
        let owner_id = issued.principal.id;
        let token_hash = hash_token(&issued.token);
        let digest = token_hash.get(..8).unwrap_or_default().to_owned();
        self.store
            .rotate_session(SessionRow {
                owner_id,
                token_hash,
                valid: true,
                issued_at: issued.issued_at,
                expires_at: issued.expires_at,
            })
            .await?;
        tracing::info!(owner_id, token = %digest, "session rotated");
        Ok(())
    }

    /// Issue and persist a token for a principal whose credentials have
    /// already been checked.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Signing`] or [`SessionError::Storage`].
    pub async fn login(&self, principal: &Principal) -> Result<IssuedToken, SessionError> {
        let issued = self.issue(principal)?;
        self.persist(&issued).await?;
        Ok(issued)
    }

    /// Resolve a bearer token to its principal.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Invalid`] for malformed, mis-signed or expired
    /// tokens, [`SessionError::Superseded`] if the store no longer marks the
    /// token valid, and [`SessionError::Storage`] if the lookup fails.
    pub async fn verify(&self, token: &str) -> Result<Principal, SessionError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| SessionError::Invalid {
                reason: match e.kind() {
                    ErrorKind::ExpiredSignature => "token expired",
                    ErrorKind::InvalidSignature => "signature mismatch",
                    _ => "malformed token",
                }
                .to_owned(),
            })?;
        let claims = data.claims;

        if !self.store.session_is_valid(&hash_token(token)).await? {
            tracing::debug!(owner_id = claims.uid, "rejected superseded token");
            return Err(SessionError::Superseded);
        }

        Ok(Principal {
            id: claims.uid,
            login: claims.login,
        })
    }
}
