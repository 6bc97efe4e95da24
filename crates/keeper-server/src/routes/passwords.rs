//! Password routes: `/api/user/password*`
//!
//! Every handler acts on the records of the [`Principal`] placed in the
//! request extensions by the authorization gate.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Extension, Json, Router};

use keeper_core::Principal;
use keeper_core::model::{NewPassword, PasswordEntry, PasswordPatch, PasswordSummary};

use crate::error::AppError;
use crate::state::AppState;

/// Build the password router, mounted under `/api/user`.
///
/// Paths:
/// - `PUT    /password`: create
/// - `GET    /passwords`: list titles and descriptions
/// - `GET    /password/{title}`: read with the decrypted secret
/// - `POST   /password/update/{title}`: partial update
/// - `DELETE /password/{title}`: delete
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/password", put(create_password))
        .route("/passwords", get(list_passwords))
        .route(
            "/password/{title}",
            get(get_password).delete(delete_password),
        )
        .route("/password/update/{title}", post(update_password))
}

async fn create_password(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    body: Result<Json<NewPassword>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let Json(new) = body?;
    state.records.create_password(&principal, new).await?;
    Ok(StatusCode::ACCEPTED)
}

async fn list_passwords(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<PasswordSummary>>, AppError> {
    Ok(Json(state.records.list_passwords(&principal).await?))
}

async fn get_password(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(title): Path<String>,
) -> Result<Json<PasswordEntry>, AppError> {
    Ok(Json(state.records.password_by_title(&principal, &title).await?))
}

async fn update_password(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(title): Path<String>,
    body: Result<Json<PasswordPatch>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let Json(patch) = body?;
    state
        .records
        .update_password(&principal, &title, patch)
        .await?;
    Ok(StatusCode::ACCEPTED)
}

async fn delete_password(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(title): Path<String>,
) -> Result<StatusCode, AppError> {
    state.records.delete_password(&principal, &title).await?;
    Ok(StatusCode::OK)
}
