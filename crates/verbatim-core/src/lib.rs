//! verbatim-core: shared types for the Verbatim comment analysis service
//!
//! This crate provides:
//! - The [`Record`](types::Record) data model and its identifiers
//! - Sentiment labels and theme assignments
//! - Provider traits for the external embedding, sentiment and
//!   lemmatization models

pub mod providers;
pub mod types;

pub use providers::{EmbeddingProvider, Lemmatizer, ProviderError, StarPrediction, StarRatingModel};
pub use types::{
    CommentRow, NormalizedText, Record, RecordId, Sentiment, SentimentLabel, ThemeAssignment,
    ThemeLabels,
};
