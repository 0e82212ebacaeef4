//! Route definitions for the HTTP API.

pub mod analyses;
pub mod health;

use axum::{Router, extract::DefaultBodyLimit};

use crate::middleware::{
    cors_layer, propagate_request_id_layer, set_request_id_layer, trace_layer,
};
use crate::state::AppState;

/// Build the complete router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(analyses::routes())
        .with_state(state)
}

/// Build the router wrapped in the middleware stack. Request ids are set
/// outermost so request spans and responses both carry them.
pub fn build_app(state: AppState) -> Router {
    let max_upload_bytes = state.config().max_upload_bytes;
    let cors = cors_layer(&state.config().cors_allowed_origins);

    build_router(state)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors)
        .layer(trace_layer())
        .layer(propagate_request_id_layer())
        .layer(set_request_id_layer())
}
