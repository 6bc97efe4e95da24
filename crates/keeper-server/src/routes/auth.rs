//! Account routes: `/api/user/register` and `/api/user/login`
//!
//! Both are reachable without a token. A successful login returns the new
//! session token in the `Authorization` response header and supersedes any
//! session the customer held before.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, HeaderValue, header};
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use keeper_core::model::Registration;

use crate::error::AppError;
use crate::state::AppState;

/// Build the register/login router, mounted under `/api/user`.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

// ── Request / Response types ─────────────────────────────────────────

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub login: String,
    #[serde(default, alias = "pwd")]
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("login", &self.login)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
pub struct CustomerResponse {
    pub id: i64,
    pub login: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub id: i64,
    pub login: String,
    pub expires_at: DateTime<Utc>,
}

// ── Handlers ─────────────────────────────────────────────────────────

async fn register(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Registration>, JsonRejection>,
) -> Result<Json<CustomerResponse>, AppError> {
    let Json(registration) = body?;
    let principal = state.accounts.register(registration).await?;
    Ok(Json(CustomerResponse {
        id: principal.id,
        login: principal.login,
    }))
}

async fn login(
    State(state): State<Arc<AppState>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(HeaderMap, Json<LoginResponse>), AppError> {
    let Json(req) = body?;
    let principal = state
        .accounts
        .verify_credentials(&req.login, &req.password)
        .await?
        .ok_or_else(|| AppError::Unauthorized("invalid login or password".to_owned()))?;

    let issued = state.sessions.login(&principal).await?;
    let value = HeaderValue::try_from(format!("Bearer {}", issued.token))
        .map_err(|e| AppError::Internal(format!("token is not a valid header value: {e}")))?;
    let mut headers = HeaderMap::new();
    headers.insert(header::AUTHORIZATION, value);

    tracing::info!(customer_id = principal.id, "customer logged in");
    Ok((
        headers,
        Json(LoginResponse {
            id: principal.id,
            login: principal.login,
            expires_at: issued.expires_at,
        }),
    ))
}
