//! HTTP Module
//!
//! Thin translation layer from HTTP routes to engine calls.
//!
//! ## Routes
//! - `POST   /put/:key_value` (`KEY:VALUE`, split on the first `:`)
//! - `GET    /get/:key`
//! - `DELETE /delete/:key`
//! - `POST   /compact`
//! - `GET    /health`
//! - `GET    /stats`
//!
//! Engine calls block on disk I/O, so they run on tokio's blocking pool.

mod handlers;
mod response;

pub use handlers::{
    compact_handler, delete_handler, get_handler, health_handler, put_handler, stats_handler,
};
pub use response::{ApiError, CompactResponse, GetResponse, MessageResponse, PutResponse};

use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;

use crate::engine::Engine;

/// Build the router over a shared engine
pub fn router(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/put/:key_value", post(put_handler))
        .route("/get/:key", get(get_handler))
        .route("/delete/:key", delete(delete_handler))
        .route("/compact", post(compact_handler))
        .with_state(engine)
}
