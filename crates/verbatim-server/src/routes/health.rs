//! Health check endpoint.

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Width of the loaded embedding model.
    pub embedding_dimension: usize,
    /// Embedding backend name.
    pub embedding_backend: String,
    /// Sentiment backend name.
    pub sentiment_backend: String,
}

/// GET /health - Health check endpoint.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let pipeline = state.pipeline();
    Json(HealthResponse {
        status: "ok".to_string(),
        embedding_dimension: pipeline.embedding_dimension(),
        embedding_backend: pipeline.embedding_backend().to_string(),
        sentiment_backend: pipeline.sentiment_backend().to_string(),
    })
}

/// Build health check routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::models::build_pipeline;

    #[tokio::test]
    async fn test_health_check() {
        let config = ServerConfig::default();
        let state = AppState::new(build_pipeline(&config).unwrap(), config);

        let response = health_check(State(state)).await;
        assert_eq!(response.status, "ok");
        assert_eq!(response.embedding_dimension, 256);
        assert_eq!(response.embedding_backend, "hashing");
    }
}
