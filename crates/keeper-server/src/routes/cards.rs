//! Card routes: `/api/user/card*`
//!
//! Listings return masked numbers; only a read by title returns the full
//! decrypted card.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Extension, Json, Router};

use keeper_core::Principal;
use keeper_core::model::{CardEntry, CardPatch, CardSummary, NewCard};

use crate::error::AppError;
use crate::state::AppState;

/// Build the card router, mounted under `/api/user`.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/card", put(create_card))
        .route("/cards", get(list_cards))
        .route("/card/{title}", get(get_card).delete(delete_card))
        .route("/card/update/{title}", post(update_card))
}

async fn create_card(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    body: Result<Json<NewCard>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let Json(new) = body?;
    state.records.create_card(&principal, new).await?;
    Ok(StatusCode::ACCEPTED)
}

async fn list_cards(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<CardSummary>>, AppError> {
    Ok(Json(state.records.list_cards(&principal).await?))
}

async fn get_card(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(title): Path<String>,
) -> Result<Json<CardEntry>, AppError> {
    Ok(Json(state.records.card_by_title(&principal, &title).await?))
}

async fn update_card(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(title): Path<String>,
    body: Result<Json<CardPatch>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let Json(patch) = body?;
    state.records.update_card(&principal, &title, patch).await?;
    Ok(StatusCode::ACCEPTED)
}

async fn delete_card(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(title): Path<String>,
) -> Result<StatusCode, AppError> {
    state.records.delete_card(&principal, &title).await?;
    Ok(StatusCode::OK)
}
