//! Embedding providers.
//!
//! Two backends implement [`EmbeddingProvider`]:
//! - [`HashingEmbedder`]: local feature-hashing model (word and character
//!   trigram features hashed with BLAKE3), needs no external service
//! - [`HttpEmbedder`]: blocking client for OpenAI-compatible `/embeddings`
//!   endpoints
//!
//! Both truncate overlong input to `max_tokens` whitespace tokens instead of
//! failing.

use std::thread;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use verbatim_core::{EmbeddingProvider, ProviderError};

/// Default dimension of the hashing model.
pub const DEFAULT_HASHING_DIMENSION: usize = 256;

/// Default maximum number of tokens fed to a model.
pub const DEFAULT_MAX_TOKENS: usize = 128;

/// Weight of a whole-word feature.
const WORD_WEIGHT: f32 = 1.0;

/// Weight of a character trigram feature.
const TRIGRAM_WEIGHT: f32 = 0.5;

/// Text used to probe a remote model at startup.
const PROBE_TEXT: &str = "probe";

/// Keeps at most `max_tokens` whitespace-separated tokens.
pub fn truncate_tokens(text: &str, max_tokens: usize) -> String {
    text.split_whitespace()
        .take(max_tokens)
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// Hashing model
// ============================================================================

/// Deterministic local embedding model based on feature hashing.
///
/// Each token contributes a signed weight to one bucket chosen by its BLAKE3
/// hash, and so does each character trigram of the token, which lets
/// inflected forms of the same word land close together. The vector is
/// L2-normalized; empty text maps to the zero vector.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
    max_tokens: usize,
}

impl HashingEmbedder {
    /// Creates a hashing model with the given output dimension.
    pub fn new(dimension: usize, max_tokens: usize) -> Result<Self, ProviderError> {
        if dimension == 0 {
            return Err(ProviderError::Unavailable(
                "hashing embedder dimension must be positive".into(),
            ));
        }
        if max_tokens == 0 {
            return Err(ProviderError::Unavailable(
                "hashing embedder max_tokens must be positive".into(),
            ));
        }
        Ok(Self {
            dimension,
            max_tokens,
        })
    }

    fn add_feature(&self, vector: &mut [f32], feature: &str, weight: f32) {
        let hash = blake3::hash(feature.as_bytes());
        let bytes = hash.as_bytes();

        let mut index_bytes = [0u8; 8];
        index_bytes.copy_from_slice(&bytes[..8]);
        let index = (u64::from_le_bytes(index_bytes) % self.dimension as u64) as usize;
        let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };

        vector[index] += sign * weight;
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_HASHING_DIMENSION,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl EmbeddingProvider for HashingEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let mut vector = vec![0.0f32; self.dimension];

        for token in text.split_whitespace().take(self.max_tokens) {
            self.add_feature(&mut vector, &format!("w:{}", token), WORD_WEIGHT);

            let padded: Vec<char> = format!("<{}>", token).chars().collect();
            for window in padded.windows(3) {
                let trigram: String = window.iter().collect();
                self.add_feature(&mut vector, &format!("c:{}", trigram), TRIGRAM_WEIGHT);
            }
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }

        Ok(vector)
    }

    fn name(&self) -> &str {
        "hashing"
    }
}

// ============================================================================
// HTTP model
// ============================================================================

/// Settings for [`HttpEmbedder`].
#[derive(Debug, Clone)]
pub struct HttpEmbedderConfig {
    /// Base URL; `/embeddings` is appended.
    pub base_url: String,
    /// Model name sent with each request.
    pub model: String,
    /// Optional bearer token.
    pub api_key: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Attempts for transient failures.
    pub max_retries: usize,
    /// Input truncation limit.
    pub max_tokens: usize,
}

impl HttpEmbedderConfig {
    /// Creates a configuration with default timeout, retries and truncation.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key: None,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// Blocking embeddings client for OpenAI-compatible endpoints.
#[derive(Debug, Clone)]
pub struct HttpEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dimension: usize,
    max_retries: usize,
    max_tokens: usize,
}

impl HttpEmbedder {
    /// Builds the client and probes the endpoint to learn the dimension.
    ///
    /// Any failure here means the model is unavailable.
    pub fn connect(config: HttpEmbedderConfig) -> Result<Self, ProviderError> {
        if config.model.trim().is_empty() {
            return Err(ProviderError::Unavailable("missing embedding model name".into()));
        }

        let mut headers = HeaderMap::new();
        if let Some(key) = config.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            let auth = HeaderValue::from_str(&format!("Bearer {}", key.trim()))
                .map_err(|_| ProviderError::Unavailable("invalid embedding API key".into()))?;
            headers.insert(AUTHORIZATION, auth);
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ProviderError::Unavailable(format!("http client: {}", e)))?;

        let mut embedder = Self {
            client,
            endpoint: format!("{}/embeddings", config.base_url.trim_end_matches('/')),
            model: config.model,
            dimension: 0,
            max_retries: config.max_retries.max(1),
            max_tokens: config.max_tokens.max(1),
        };

        let probe = embedder
            .request(PROBE_TEXT)
            .map_err(|e| ProviderError::Unavailable(format!("probe failed: {}", e)))?;
        if probe.is_empty() {
            return Err(ProviderError::Unavailable(
                "embedding endpoint returned an empty vector".into(),
            ));
        }
        embedder.dimension = probe.len();

        tracing::info!(
            endpoint = %embedder.endpoint,
            model = %embedder.model,
            dimension = embedder.dimension,
            "Connected to embedding model"
        );
        Ok(embedder)
    }

    fn request(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let input = [text];
        let mut attempt = 0usize;

        loop {
            let request = EmbeddingRequest {
                model: &self.model,
                input: &input,
            };
            match self.client.post(&self.endpoint).json(&request).send() {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let parsed: EmbeddingResponse = resp
                            .json()
                            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
                        return parsed
                            .data
                            .into_iter()
                            .min_by_key(|entry| entry.index)
                            .map(|entry| entry.embedding)
                            .ok_or_else(|| {
                                ProviderError::InvalidResponse("no embedding returned".into())
                            });
                    }

                    let body = resp
                        .text()
                        .unwrap_or_else(|_| "<body unavailable>".to_string());
                    if should_retry(status) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        thread::sleep(retry_backoff(attempt));
                        continue;
                    }
                    return Err(ProviderError::Inference(format!(
                        "embedding request failed ({}): {}",
                        status, body
                    )));
                }
                Err(err) => {
                    if is_retryable_error(&err) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        thread::sleep(retry_backoff(attempt));
                        continue;
                    }
                    return Err(ProviderError::Inference(err.to_string()));
                }
            }
        }
    }
}

impl EmbeddingProvider for HttpEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let truncated = truncate_tokens(text, self.max_tokens);
        let vector = self.request(&truncated)?;
        if vector.len() != self.dimension {
            return Err(ProviderError::InvalidResponse(format!(
                "expected {} dimensions, got {}",
                self.dimension,
                vector.len()
            )));
        }
        Ok(vector)
    }

    fn name(&self) -> &str {
        "http"
    }
}

pub(crate) fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

pub(crate) fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

pub(crate) fn retry_backoff(attempt: usize) -> Duration {
    let capped = attempt.min(5) as u32;
    Duration::from_millis(250 * (1 << capped))
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn hashing_is_deterministic() {
        let model = HashingEmbedder::default();
        let a = model.embed("livraison rapide").unwrap();
        let b = model.embed("livraison rapide").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), DEFAULT_HASHING_DIMENSION);
    }

    #[test]
    fn hashing_is_normalized() {
        let model = HashingEmbedder::new(64, 16).unwrap();
        let v = model.embed("prix trop cher").unwrap();
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[test]
    fn hashing_empty_text_is_zero() {
        let model = HashingEmbedder::new(32, 16).unwrap();
        let v = model.embed("").unwrap();
        assert_eq!(v.len(), 32);
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn hashing_similar_texts_are_closer() {
        let model = HashingEmbedder::default();
        let a = model.embed("livraison rapide colis").unwrap();
        let b = model.embed("livraison rapide").unwrap();
        let c = model.embed("écran cassé remboursement").unwrap();
        assert!(cosine(&a, &b) > cosine(&a, &c));
    }

    #[test]
    fn hashing_truncates_long_input() {
        let model = HashingEmbedder::new(64, 2).unwrap();
        let short = model.embed("alpha beta").unwrap();
        let long = model.embed("alpha beta gamma delta epsilon").unwrap();
        assert_eq!(short, long);
    }

    #[test]
    fn hashing_rejects_zero_dimension() {
        assert!(matches!(
            HashingEmbedder::new(0, 10),
            Err(ProviderError::Unavailable(_))
        ));
    }

    #[test]
    fn truncate_tokens_keeps_prefix() {
        assert_eq!(truncate_tokens("a  b c d", 2), "a b");
        assert_eq!(truncate_tokens("", 5), "");
    }

    #[test]
    fn retry_policy() {
        assert!(should_retry(StatusCode::TOO_MANY_REQUESTS));
        assert!(should_retry(StatusCode::BAD_GATEWAY));
        assert!(!should_retry(StatusCode::BAD_REQUEST));
        assert!(retry_backoff(1) < retry_backoff(2));
        assert_eq!(retry_backoff(10), retry_backoff(5));
    }

    #[test]
    fn http_embedder_unreachable_is_unavailable() {
        let mut config = HttpEmbedderConfig::new("http://127.0.0.1:9", "test-model");
        config.timeout = Duration::from_millis(200);
        config.max_retries = 1;
        assert!(matches!(
            HttpEmbedder::connect(config),
            Err(ProviderError::Unavailable(_))
        ));
    }

    #[test]
    fn http_embedder_requires_model_name() {
        let config = HttpEmbedderConfig::new("http://127.0.0.1:9", " ");
        assert!(matches!(
            HttpEmbedder::connect(config),
            Err(ProviderError::Unavailable(_))
        ));
    }
}
