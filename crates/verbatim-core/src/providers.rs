//! Traits for the externally supplied models.
//!
//! The analysis pipeline only talks to models through these traits, so a
//! local model, an HTTP inference service or a test double can be swapped in
//! without touching normalization or clustering code.
//!
//! Implementations must be `Send + Sync`: one handle is created at process
//! start and shared read-only by every worker thread.

use serde::{Deserialize, Serialize};

/// Errors raised by model providers.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    /// The model could not be loaded or reached.
    #[error("model unavailable: {0}")]
    Unavailable(String),

    /// The model failed on a specific input.
    #[error("inference failed: {0}")]
    Inference(String),

    /// The model answered with something the caller cannot interpret.
    #[error("invalid model response: {0}")]
    InvalidResponse(String),
}

/// Maps text to a fixed-length dense vector.
pub trait EmbeddingProvider: Send + Sync {
    /// Length of every vector returned by [`embed`](Self::embed).
    fn dimension(&self) -> usize;

    /// Embeds one text. Overlong input is truncated, never rejected.
    fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;

    /// Short backend name for logs and health output.
    fn name(&self) -> &str {
        "embedding"
    }
}

/// Raw prediction of a 5-point star rating model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarPrediction {
    /// Label on the model's own scale, e.g. `"1 star"` or `"4 stars"`.
    pub label: String,
    /// Confidence of the label.
    pub score: f32,
}

impl StarPrediction {
    /// Builds a prediction for `stars` (1-5) with the canonical label text.
    pub fn stars(stars: u8, score: f32) -> Self {
        let label = if stars == 1 {
            "1 star".to_string()
        } else {
            format!("{} stars", stars)
        };
        Self { label, score }
    }
}

/// The underlying fine-grained sentiment model.
pub trait StarRatingModel: Send + Sync {
    /// Maximum number of characters the model accepts.
    fn max_input_chars(&self) -> usize {
        512
    }

    /// Rates one non-empty text.
    fn rate(&self, text: &str) -> Result<StarPrediction, ProviderError>;

    /// Short backend name for logs and health output.
    fn name(&self) -> &str {
        "sentiment"
    }
}

/// Reduces cleaned text to dictionary base forms.
pub trait Lemmatizer: Send + Sync {
    /// Returns the lemmas of `cleaned_text` with stopwords and punctuation
    /// tokens removed, in text order.
    fn lemmatize(&self, cleaned_text: &str) -> Vec<String>;
}
