//! PostgreSQL backend.
//!
//! One table per entity: `customers`, `sessions` and one table per record
//! kind. Tables are created on connect. A partial unique index on
//! `sessions (owner_id) WHERE valid` makes the one-valid-session rule a
//! database constraint as well as an application one.
//!
//! Feature-gated behind `postgres-backend`.

use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

use crate::{
    CustomerRow, CustomerStore, NewCustomer, RecordKind, RecordPayload, RecordScope, RecordStore,
    ScopedUpdate, SessionRow, SessionStore, StorageError, StoredRecord,
};

const MIGRATIONS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS customers (\
        id                   BIGSERIAL PRIMARY KEY, \
        name                 TEXT NOT NULL, \
        login                TEXT NOT NULL UNIQUE, \
        master_password_hash TEXT NOT NULL\
    )",
    "CREATE TABLE IF NOT EXISTS sessions (\
        id         BIGSERIAL PRIMARY KEY, \
        owner_id   BIGINT NOT NULL REFERENCES customers (id) ON DELETE CASCADE, \
        token_hash TEXT NOT NULL, \
        valid      BOOLEAN NOT NULL, \
        issued_at  TIMESTAMPTZ NOT NULL, \
        expires_at TIMESTAMPTZ NOT NULL\
    )",
    "CREATE INDEX IF NOT EXISTS idx_sessions_token_hash ON sessions (token_hash)",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_sessions_one_valid ON sessions (owner_id) WHERE valid",
    "CREATE TABLE IF NOT EXISTS password_records (\
        owner_id    BIGINT NOT NULL REFERENCES customers (id) ON DELETE CASCADE, \
        title       TEXT NOT NULL, \
        secret      TEXT NOT NULL, \
        description TEXT NOT NULL DEFAULT '', \
        PRIMARY KEY (owner_id, title)\
    )",
    "CREATE TABLE IF NOT EXISTS card_records (\
        owner_id    BIGINT NOT NULL REFERENCES customers (id) ON DELETE CASCADE, \
        title       TEXT NOT NULL, \
        number      TEXT NOT NULL, \
        expiry      TEXT NOT NULL, \
        cvc         TEXT NOT NULL, \
        description TEXT NOT NULL DEFAULT '', \
        PRIMARY KEY (owner_id, title)\
    )",
    "CREATE TABLE IF NOT EXISTS file_records (\
        owner_id    BIGINT NOT NULL REFERENCES customers (id) ON DELETE CASCADE, \
        title       TEXT NOT NULL, \
        file_name   TEXT NOT NULL, \
        object_key  TEXT NOT NULL, \
        description TEXT NOT NULL DEFAULT '', \
        PRIMARY KEY (owner_id, title)\
    )",
];

/// A backend storing customers, sessions and records in PostgreSQL.
///
/// Thread-safe via `PgPool`. All operations are fully async.
#[derive(Clone)]
pub struct PostgresBackend {
    pool: PgPool,
}

impl std::fmt::Debug for PostgresBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresBackend")
            .field("pool", &"[PgPool]")
            .finish_non_exhaustive()
    }
}

impl PostgresBackend {
    /// Connect to PostgreSQL and create the tables if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if the connection or migration fails.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let open_err = |reason: String| StorageError::Open {
            path: redact_url(database_url),
            reason,
        };

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| open_err(e.to_string()))?;

        for statement in MIGRATIONS {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(|e| open_err(format!("migration failed: {e}")))?;
        }

        tracing::info!("postgres storage ready");
        Ok(Self { pool })
    }

    async fn fetch_records(
        &self,
        kind: RecordKind,
        owner_id: i64,
        title: Option<&str>,
    ) -> Result<Vec<StoredRecord>, StorageError> {
        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT * FROM {} WHERE owner_id = ",
            kind.table()
        ));
        query.push_bind(owner_id);
        if let Some(title) = title {
            query.push(" AND title = ").push_bind(title);
        }
        query.push(" ORDER BY title");

        let read_err = |e: sqlx::Error| StorageError::Read {
            entity: kind.label(),
            key: title.unwrap_or("*").to_owned(),
            reason: e.to_string(),
        };
        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(read_err)?;
        rows.iter()
            .map(|row| decode_record(kind, row))
            .collect::<Result<_, _>>()
            .map_err(read_err)
    }
}

/// Strip credentials from a connection URL before it reaches a log line.
fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://[REDACTED]{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_owned(),
    }
}

fn decode_record(kind: RecordKind, row: &PgRow) -> Result<StoredRecord, sqlx::Error> {
    let payload = match kind {
        RecordKind::Password => RecordPayload::Password {
            secret: row.try_get("secret")?,
        },
        RecordKind::Card => RecordPayload::Card {
            number: row.try_get("number")?,
            expiry: row.try_get("expiry")?,
            cvc: row.try_get("cvc")?,
        },
        RecordKind::File => RecordPayload::File {
            file_name: row.try_get("file_name")?,
            object_key: row.try_get("object_key")?,
        },
    };
    Ok(StoredRecord {
        owner_id: row.try_get("owner_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        payload,
    })
}

fn write_error(entity: &'static str, key: &str, e: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return StorageError::Conflict {
                entity,
                key: key.to_owned(),
            };
        }
    }
    StorageError::Write {
        entity,
        key: key.to_owned(),
        reason: e.to_string(),
    }
}

fn transaction_error(e: sqlx::Error) -> StorageError {
    StorageError::Transaction {
        reason: e.to_string(),
    }
}

#[async_trait::async_trait]
impl CustomerStore for PostgresBackend {
    async fn insert_customer(&self, customer: NewCustomer) -> Result<CustomerRow, StorageError> {
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO customers (name, login, master_password_hash) \
             VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&customer.name)
        .bind(&customer.login)
        .bind(&customer.master_password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| write_error("customer", &customer.login, e))?;

        Ok(CustomerRow {
            id,
            name: customer.name,
            login: customer.login,
            master_password_hash: customer.master_password_hash,
        })
    }

    async fn customer_by_login(&self, login: &str) -> Result<Option<CustomerRow>, StorageError> {
        let row: Option<(i64, String, String, String)> = sqlx::query_as(
            "SELECT id, name, login, master_password_hash FROM customers WHERE login = $1",
        )
        .bind(login)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Read {
            entity: "customer",
            key: login.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(row.map(|(id, name, login, master_password_hash)| CustomerRow {
            id,
            name,
            login,
            master_password_hash,
        }))
    }
}

#[async_trait::async_trait]
impl SessionStore for PostgresBackend {
    async fn invalidate_sessions(&self, owner_id: i64) -> Result<u64, StorageError> {
        let result =
            sqlx::query("UPDATE sessions SET valid = FALSE WHERE owner_id = $1 AND valid")
                .bind(owner_id)
                .execute(&self.pool)
                .await
                .map_err(|e| write_error("session", &owner_id.to_string(), e))?;
        Ok(result.rows_affected())
    }

    async fn rotate_session(&self, session: SessionRow) -> Result<(), StorageError> {
        let owner = session.owner_id.to_string();
        let mut tx = self.pool.begin().await.map_err(transaction_error)?;

        // Serializes concurrent logins of the same customer.
        sqlx::query("SELECT id FROM customers WHERE id = $1 FOR UPDATE")
            .bind(session.owner_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(transaction_error)?;

        sqlx::query("UPDATE sessions SET valid = FALSE WHERE owner_id = $1 AND valid")
            .bind(session.owner_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| write_error("session", &owner, e))?;

        sqlx::query(
            "INSERT INTO sessions (owner_id, token_hash, valid, issued_at, expires_at) \
             VALUES ($1, $2, TRUE, $3, $4)",
        )
        .bind(session.owner_id)
        .bind(&session.token_hash)
        .bind(session.issued_at)
        .bind(session.expires_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| write_error("session", &owner, e))?;

        tx.commit().await.map_err(transaction_error)
    }

    async fn session_is_valid(&self, token_hash: &str) -> Result<bool, StorageError> {
        let (valid,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM sessions WHERE token_hash = $1 AND valid)",
        )
        .bind(token_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StorageError::Read {
            entity: "session",
            key: "[token]".to_owned(),
            reason: e.to_string(),
        })?;
        Ok(valid)
    }
}

#[async_trait::async_trait]
impl RecordStore for PostgresBackend {
    async fn insert_record(&self, record: StoredRecord) -> Result<(), StorageError> {
        let kind = record.kind();
        let query = match &record.payload {
            RecordPayload::Password { secret } => sqlx::query(
                "INSERT INTO password_records (owner_id, title, description, secret) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(record.owner_id)
            .bind(&record.title)
            .bind(&record.description)
            .bind(secret),
            RecordPayload::Card {
                number,
                expiry,
                cvc,
            } => sqlx::query(
                "INSERT INTO card_records (owner_id, title, description, number, expiry, cvc) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(record.owner_id)
            .bind(&record.title)
            .bind(&record.description)
            .bind(number)
            .bind(expiry)
            .bind(cvc),
            RecordPayload::File {
                file_name,
                object_key,
            } => sqlx::query(
                "INSERT INTO file_records (owner_id, title, description, file_name, object_key) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(record.owner_id)
            .bind(&record.title)
            .bind(&record.description)
            .bind(file_name)
            .bind(object_key),
        };

        query
            .execute(&self.pool)
            .await
            .map_err(|e| write_error(kind.label(), &record.title, e))?;
        Ok(())
    }

    async fn record_by_title(
        &self,
        kind: RecordKind,
        scope: &RecordScope,
    ) -> Result<Option<StoredRecord>, StorageError> {
        let mut rows = self
            .fetch_records(kind, scope.owner_id, Some(&scope.title))
            .await?;
        Ok(rows.pop())
    }

    async fn list_records(
        &self,
        kind: RecordKind,
        owner_id: i64,
    ) -> Result<Vec<StoredRecord>, StorageError> {
        self.fetch_records(kind, owner_id, None).await
    }

    async fn apply_update(&self, update: &ScopedUpdate) -> Result<u64, StorageError> {
        if update.is_empty() {
            let existing = self.record_by_title(update.kind, &update.scope).await?;
            return Ok(u64::from(existing.is_some()));
        }

        let mut query =
            QueryBuilder::<Postgres>::new(format!("UPDATE {} SET ", update.kind.table()));
        {
            let mut assignments = query.separated(", ");
            for assignment in &update.assignments {
                assignments
                    .push(assignment.column.name())
                    .push_unseparated(" = ")
                    .push_bind_unseparated(assignment.value.as_str());
            }
        }
        query
            .push(" WHERE title = ")
            .push_bind(update.scope.title.as_str())
            .push(" AND owner_id = ")
            .push_bind(update.scope.owner_id);

        let result = query
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| write_error(update.kind.label(), &update.scope.title, e))?;
        Ok(result.rows_affected())
    }

    async fn delete_record(
        &self,
        kind: RecordKind,
        scope: &RecordScope,
    ) -> Result<Option<StoredRecord>, StorageError> {
        let delete_err = |e: sqlx::Error| StorageError::Delete {
            entity: kind.label(),
            key: scope.title.clone(),
            reason: e.to_string(),
        };
        let sql = format!(
            "DELETE FROM {} WHERE owner_id = $1 AND title = $2 RETURNING *",
            kind.table()
        );
        let row = sqlx::query(&sql)
            .bind(scope.owner_id)
            .bind(&scope.title)
            .fetch_optional(&self.pool)
            .await
            .map_err(delete_err)?;
        row.map(|row| decode_record(kind, &row))
            .transpose()
            .map_err(delete_err)
    }
}

#[cfg(test)]
mod tests {
    use super::redact_url;

    #[test]
    fn redacts_credentials() {
        assert_eq!(
            redact_url("postgres://user:pw@localhost/keeper"),
            "postgres://[REDACTED]@localhost/keeper"
        );
        assert_eq!(
            redact_url("postgres://localhost/keeper"),
            "postgres://localhost/keeper"
        );
    }
}
