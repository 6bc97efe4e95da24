//! Server configuration for Keeper.
//!
//! Loads configuration from environment variables with sensible defaults.
//! Only the signing key is mandatory.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use keeper_core::IvPolicy;

/// Errors in the environment configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    #[error("{name} must be set")]
    Missing { name: &'static str },

    /// A variable has a value that cannot be used.
    #[error("{name} has an invalid value: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    pub bind_addr: SocketAddr,
    /// Record, customer and session storage.
    pub storage_backend: StorageBackendType,
    /// File payload storage.
    pub object_store: ObjectStoreType,
    /// HMAC key for session tokens.
    pub sign_key: Vec<u8>,
    /// Key for the field cipher.
    pub cipher_key: Vec<u8>,
    /// IV policy for the field cipher.
    pub iv_policy: IvPolicy,
    /// Deadline applied to every request.
    pub request_timeout: Duration,
    /// Largest accepted file upload; `None` accepts any size.
    pub max_upload_bytes: Option<usize>,
    /// Log level filter (e.g., `info`, `debug`, `warn`).
    pub log_level: String,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind_addr", &self.bind_addr)
            .field("storage_backend", &self.storage_backend)
            .field("object_store", &self.object_store)
            .field("sign_key", &"[REDACTED]")
            .field("cipher_key", &"[REDACTED]")
            .field("iv_policy", &self.iv_policy)
            .field("request_timeout", &self.request_timeout)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("log_level", &self.log_level)
            .finish()
    }
}

/// Supported storage backend types.
#[derive(Clone, PartialEq, Eq)]
pub enum StorageBackendType {
    /// In-memory (development only, data lost on restart).
    Memory,
    /// PostgreSQL.
    Postgres { url: String },
}

impl std::fmt::Debug for StorageBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => f.write_str("Memory"),
            Self::Postgres { .. } => f.write_str("Postgres"),
        }
    }
}

/// Supported object store types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectStoreType {
    /// In-memory (development only, data lost on restart).
    Memory,
    /// One file per object under a directory.
    Filesystem { root: PathBuf },
}

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
/// Default cap on a single file upload (100 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `KEEPER_SIGN_KEY` is missing or a value
    /// cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Variables:
    /// - `KEEPER_BIND_ADDR`: full bind address (default: `127.0.0.1:8080`)
    /// - `PORT`: port to bind on `0.0.0.0`, used when `KEEPER_BIND_ADDR` is unset
    /// - `KEEPER_STORAGE`: `memory` or `postgres` (default: `memory`)
    /// - `DATABASE_URL`: PostgreSQL connection string (default: `postgres://localhost/keeper`)
    /// - `KEEPER_OBJECT_STORE`: `memory` or `fs` (default: `memory`)
    /// - `KEEPER_OBJECT_DIR`: root for the `fs` object store (default: `./objects`)
    /// - `KEEPER_SIGN_KEY`: token signing key (required)
    /// - `KEEPER_CIPHER_KEY`: field cipher key (default: the signing key)
    /// - `KEEPER_CIPHER_IV`: `random` or `fixed` (default: `random`)
    /// - `KEEPER_REQUEST_TIMEOUT_SECS`: per-request deadline (default: `30`)
    /// - `KEEPER_MAX_UPLOAD_BYTES`: largest file upload, `0` for no limit (default: 100 MiB)
    /// - `KEEPER_LOG_LEVEL`: log filter (default: `info`)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `KEEPER_SIGN_KEY` is missing or a value
    /// cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.is_empty());

        let bind_addr = if let Some(addr) = var("KEEPER_BIND_ADDR") {
            addr.parse().map_err(|e| ConfigError::Invalid {
                name: "KEEPER_BIND_ADDR",
                reason: format!("{e}"),
            })?
        } else if let Some(port) = var("PORT") {
            let port: u16 = port.parse().map_err(|e| ConfigError::Invalid {
                name: "PORT",
                reason: format!("{e}"),
            })?;
            SocketAddr::from(([0, 0, 0, 0], port))
        } else {
            SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT))
        };

        let storage_backend = match var("KEEPER_STORAGE")
            .unwrap_or_else(|| "memory".to_owned())
            .to_lowercase()
            .as_str()
        {
            "memory" => StorageBackendType::Memory,
            "postgres" | "postgresql" => StorageBackendType::Postgres {
                url: var("DATABASE_URL")
                    .unwrap_or_else(|| "postgres://localhost/keeper".to_owned()),
            },
            other => {
                return Err(ConfigError::Invalid {
                    name: "KEEPER_STORAGE",
                    reason: format!("unknown backend '{other}'"),
                });
            }
        };

        let object_store = match var("KEEPER_OBJECT_STORE")
            .unwrap_or_else(|| "memory".to_owned())
            .to_lowercase()
            .as_str()
        {
            "memory" => ObjectStoreType::Memory,
            "fs" | "filesystem" => ObjectStoreType::Filesystem {
                root: PathBuf::from(
                    var("KEEPER_OBJECT_DIR").unwrap_or_else(|| "./objects".to_owned()),
                ),
            },
            other => {
                return Err(ConfigError::Invalid {
                    name: "KEEPER_OBJECT_STORE",
                    reason: format!("unknown object store '{other}'"),
                });
            }
        };

        let sign_key = var("KEEPER_SIGN_KEY")
            .ok_or(ConfigError::Missing {
                name: "KEEPER_SIGN_KEY",
            })?
            .into_bytes();
        let cipher_key = var("KEEPER_CIPHER_KEY").map_or_else(|| sign_key.clone(), String::into_bytes);

        let iv_policy = match var("KEEPER_CIPHER_IV").as_deref() {
            None | Some("random") => IvPolicy::Random,
            Some("fixed") => IvPolicy::Fixed,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "KEEPER_CIPHER_IV",
                    reason: format!("expected 'random' or 'fixed', got '{other}'"),
                });
            }
        };

        let request_timeout = match var("KEEPER_REQUEST_TIMEOUT_SECS") {
            Some(secs) => {
                let secs: u64 = secs.parse().map_err(|e| ConfigError::Invalid {
                    name: "KEEPER_REQUEST_TIMEOUT_SECS",
                    reason: format!("{e}"),
                })?;
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        };

        let max_upload_bytes = match var("KEEPER_MAX_UPLOAD_BYTES") {
            Some(bytes) => {
                let bytes: usize = bytes.parse().map_err(|e| ConfigError::Invalid {
                    name: "KEEPER_MAX_UPLOAD_BYTES",
                    reason: format!("{e}"),
                })?;
                (bytes > 0).then_some(bytes)
            }
            None => Some(DEFAULT_MAX_UPLOAD_BYTES),
        };

        let log_level = var("KEEPER_LOG_LEVEL").unwrap_or_else(|| "info".to_owned());

        Ok(Self {
            bind_addr,
            storage_backend,
            object_store,
            sign_key,
            cipher_key,
            iv_policy,
            request_timeout,
            max_upload_bytes,
            log_level,
        })
    }
}
