//! Keeper HTTP server.
//!
//! Wires the core services and a storage backend into an Axum router that
//! serves the JSON API at `/api/user/*`.

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
