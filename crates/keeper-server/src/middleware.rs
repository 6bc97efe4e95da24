//! Request middleware for the Keeper server.
//!
//! [`authorization_gate`] turns an `Authorization: Bearer <token>` header
//! into a [`Principal`] stored in the request extensions. Handlers read it
//! with `Extension<Principal>`; identity is never taken from any other
//! header. [`deadline`] bounds the time a request may take.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use keeper_core::Principal;

use crate::error::AppError;
use crate::state::AppState;

/// Extract the token from an `Authorization: Bearer <token>` header.
///
/// Returns `None` if the header is absent, not ASCII, or not of the
/// `Bearer <token>` shape.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() || token.contains(' ') {
        return None;
    }
    Some(token)
}

/// Middleware that resolves the caller's session token to a principal.
///
/// Rejects with 401 when the token is missing, malformed, invalid or
/// superseded, and with 500 when the session store cannot be reached.
///
/// # Errors
///
/// Returns [`AppError::Unauthorized`] or [`AppError::Internal`].
pub async fn authorization_gate(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers())
        .map(str::to_owned)
        .ok_or_else(|| AppError::Unauthorized("missing or malformed bearer token".to_owned()))?;

    let principal: Principal = state.sessions.verify(&token).await?;
    tracing::debug!(principal_id = principal.id, "request authorized");
    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}

/// Middleware that fails a request with 500 once `limit` has elapsed. The
/// in-flight handler future is dropped, cancelling any pending storage call.
pub async fn deadline(State(limit): State<Duration>, req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    if let Ok(response) = tokio::time::timeout(limit, next.run(req)).await {
        response
    } else {
        AppError::Internal(format!(
            "{method} {path} exceeded the {}s deadline",
            limit.as_secs()
        ))
        .into_response()
    }
}
