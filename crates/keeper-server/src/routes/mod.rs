//! HTTP route modules and router assembly.

pub mod auth;
pub mod cards;
pub mod files;
pub mod health;
pub mod passwords;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::{HeaderName, HeaderValue, Method, header};
use axum::middleware as axum_mw;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::middleware::{authorization_gate, deadline};
use crate::state::AppState;

/// Header carrying the display title of an uploaded file.
pub const FILE_TITLE_HEADER: HeaderName = HeaderName::from_static("x-file-title");
/// Header carrying the original name of an uploaded file.
pub const FILE_NAME_HEADER: HeaderName = HeaderName::from_static("x-file-name");
/// Header carrying the description of an uploaded file.
pub const FILE_DESCRIPTION_HEADER: HeaderName = HeaderName::from_static("x-file-description");

/// Limits the router enforces on every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpLimits {
    /// Deadline for a whole request.
    pub request_timeout: Duration,
    /// Largest accepted file upload; `None` accepts any size.
    pub max_upload_bytes: Option<usize>,
}

impl From<&ServerConfig> for HttpLimits {
    fn from(config: &ServerConfig) -> Self {
        Self {
            request_timeout: config.request_timeout,
            max_upload_bytes: config.max_upload_bytes,
        }
    }
}

/// Build the Axum router with all routes and middleware.
///
/// Everything under `/api/user` except register and login passes the
/// authorization gate. Every request is bounded by `limits.request_timeout`.
pub fn build_router(state: Arc<AppState>, limits: HttpLimits) -> Router {
    let authenticated_routes = Router::new()
        .merge(passwords::router())
        .merge(cards::router())
        .merge(files::router(limits.max_upload_bytes))
        .route_layer(axum_mw::from_fn_with_state(
            Arc::clone(&state),
            authorization_gate,
        ));

    let user_routes = Router::new()
        .merge(auth::router())
        .merge(authenticated_routes);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            FILE_TITLE_HEADER,
            FILE_NAME_HEADER,
            FILE_DESCRIPTION_HEADER,
        ])
        .expose_headers([header::AUTHORIZATION]);

    Router::new()
        .nest("/api/user", user_routes)
        .merge(health::router())
        .layer(axum_mw::from_fn_with_state(limits.request_timeout, deadline))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .with_state(state)
}
