//! File routes: `/api/user/file*`
//!
//! Uploads carry the raw payload as the request body and their metadata in
//! `x-file-*` headers. Downloads return the payload as
//! `application/octet-stream`.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Extension, Json, Router};

use keeper_core::Principal;
use keeper_core::model::{FilePatch, FileSummary, NewFile};

use super::{FILE_DESCRIPTION_HEADER, FILE_NAME_HEADER, FILE_TITLE_HEADER};
use crate::error::AppError;
use crate::state::AppState;

/// Build the file router, mounted under `/api/user`.
///
/// Uploads may be up to `max_upload_bytes` long, or any length for `None`.
pub fn router(max_upload_bytes: Option<usize>) -> Router<Arc<AppState>> {
    let body_limit =
        max_upload_bytes.map_or_else(DefaultBodyLimit::disable, DefaultBodyLimit::max);
    Router::new()
        .route("/file", put(upload_file).layer(body_limit))
        .route("/files", get(list_files))
        .route("/file/{title}", get(download_file).delete(delete_file))
        .route("/file/update/{title}", post(update_file))
}

/// Read an optional UTF-8 header, treating an absent header as empty.
fn header_text(headers: &HeaderMap, name: &HeaderName) -> Result<String, AppError> {
    headers.get(name).map_or_else(
        || Ok(String::new()),
        |value| {
            value
                .to_str()
                .map(str::to_owned)
                .map_err(|_| AppError::BadRequest(format!("header {name} must be visible ASCII")))
        },
    )
}

async fn upload_file(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let new = NewFile {
        title: header_text(&headers, &FILE_TITLE_HEADER)?,
        file_name: header_text(&headers, &FILE_NAME_HEADER)?,
        description: header_text(&headers, &FILE_DESCRIPTION_HEADER)?,
    };
    state
        .records
        .create_file(&principal, new, body.to_vec())
        .await?;
    Ok(StatusCode::ACCEPTED)
}

async fn list_files(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<FileSummary>>, AppError> {
    Ok(Json(state.records.list_files(&principal).await?))
}

async fn download_file(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(title): Path<String>,
) -> Result<Response, AppError> {
    let download = state.records.download_file(&principal, &title).await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    // Names that cannot be sent as a header value are simply not advertised.
    if let Ok(name) = HeaderValue::try_from(download.summary.file_name.as_str()) {
        headers.insert(FILE_NAME_HEADER, name);
    }
    Ok((StatusCode::OK, headers, download.bytes).into_response())
}

async fn update_file(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(title): Path<String>,
    body: Result<Json<FilePatch>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let Json(patch) = body?;
    state.records.update_file(&principal, &title, patch).await?;
    Ok(StatusCode::ACCEPTED)
}

async fn delete_file(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(title): Path<String>,
) -> Result<StatusCode, AppError> {
    state.records.delete_file(&principal, &title).await?;
    Ok(StatusCode::OK)
}
