//! verbatim-server: HTTP API for comment analysis
//!
//! This crate provides:
//! - `POST /analyses` and `POST /analyses/csv` running the full pipeline
//! - JSON, CSV and plain-text report outputs
//! - Example lookups by lemma, hashtag or emoji
//! - A health endpoint describing the loaded models
//!
//! # Architecture
//!
//! Models are loaded once at startup (see [`models::build_pipeline`]) and
//! shared read-only by every request. Analyses run on the blocking pool.
//! The Axum router carries a middleware stack for:
//! - Request tracing and logging
//! - CORS handling
//! - Request ID generation
//! - Upload size limits
//! - JSON error responses
//!
//! # Usage
//!
//! ```rust,ignore
//! use verbatim_server::{ServerConfig, AppState, models::build_pipeline, routes};
//!
//! let config = ServerConfig::from_env()?;
//! let pipeline = build_pipeline(&config)?;
//! let app = routes::build_app(AppState::new(pipeline, config));
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;

// Re-exports for convenience
pub use config::{ConfigError, EmbeddingBackend, SentimentBackend, ServerConfig};
pub use error::{ApiError, ApiResult};
pub use state::AppState;

// Re-export dependent crates
pub use verbatim_analysis;
pub use verbatim_core;
