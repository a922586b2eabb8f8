//! Avatar API Service Library
//!
//! HTTP server rendering initials avatars as streamed PNG responses.

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod state;

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

/// Build the service router.
///
/// `get` routes also answer `HEAD`; other methods get 405.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/avatar/:initials", get(handlers::avatar_handler))
        .route("/health", get(handlers::health_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
