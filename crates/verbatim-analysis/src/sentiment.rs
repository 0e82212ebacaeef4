//! Three-way sentiment from a 5-star rating model.
//!
//! [`SentimentScorer`] wraps any [`StarRatingModel`] and folds its star label
//! into NEGATIVE / NEUTRAL / POSITIVE. Two models are provided:
//!
//! - [`LexiconStarModel`]: local polarity lexicon (French and English) with
//!   negation and intensifier handling
//! - [`HttpStarModel`]: a text-classification inference endpoint that
//!   answers `[{"label": "4 stars", "score": 0.61}, ...]`

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use verbatim_core::{ProviderError, Sentiment, SentimentLabel, StarPrediction, StarRatingModel};

use crate::embedding::{is_retryable_error, retry_backoff, should_retry};

/// Input limit of the star rating model, in characters.
pub const DEFAULT_MAX_INPUT_CHARS: usize = 512;

/// Maps a star label to a sentiment label.
///
/// `"1 star"` and `"2 stars"` are negative, `"3 stars"` neutral, `"4 stars"`
/// and `"5 stars"` positive. Anything else is an invalid model response.
pub fn map_star_label(label: &str) -> Result<SentimentLabel, ProviderError> {
    match label.trim().to_lowercase().as_str() {
        "1 star" | "2 stars" => Ok(SentimentLabel::Negative),
        "3 stars" => Ok(SentimentLabel::Neutral),
        "4 stars" | "5 stars" => Ok(SentimentLabel::Positive),
        _ => Err(ProviderError::InvalidResponse(format!(
            "unknown star label '{}'",
            label
        ))),
    }
}

/// Returns at most `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

/// Scores comments with a star rating model.
#[derive(Clone)]
pub struct SentimentScorer {
    model: Arc<dyn StarRatingModel>,
}

impl SentimentScorer {
    pub fn new(model: Arc<dyn StarRatingModel>) -> Self {
        Self { model }
    }

    /// Name of the underlying model.
    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Scores one text.
    ///
    /// Blank text is NEUTRAL with score 0.0 and never reaches the model.
    /// Longer text than the model accepts is truncated.
    pub fn score(&self, text: &str) -> Result<Sentiment, ProviderError> {
        if text.trim().is_empty() {
            return Ok(Sentiment::neutral_empty());
        }

        let input = truncate_chars(text, self.model.max_input_chars());
        let prediction = self.model.rate(input)?;
        let label = map_star_label(&prediction.label)?;

        Ok(Sentiment {
            label,
            score: clamp_score(prediction.score),
        })
    }
}

impl std::fmt::Debug for SentimentScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SentimentScorer")
            .field("model", &self.model.name())
            .finish()
    }
}

fn clamp_score(score: f32) -> f32 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

// ============================================================================
// Lexicon model
// ============================================================================

/// Positive words and their weights.
const POSITIVE_WORDS: &[(&str, f32)] = &[
    // French
    ("bon", 1.0),
    ("bonne", 1.0),
    ("bien", 1.0),
    ("super", 1.5),
    ("génial", 2.0),
    ("geniale", 2.0),
    ("géniale", 2.0),
    ("excellent", 2.0),
    ("excellente", 2.0),
    ("parfait", 2.0),
    ("parfaite", 2.0),
    ("top", 1.5),
    ("rapide", 1.0),
    ("efficace", 1.0),
    ("satisfait", 1.5),
    ("satisfaite", 1.5),
    ("content", 1.0),
    ("contente", 1.0),
    ("ravi", 2.0),
    ("ravie", 2.0),
    ("merci", 0.5),
    ("recommande", 1.5),
    ("agréable", 1.0),
    ("pratique", 0.5),
    ("aime", 1.0),
    ("adore", 2.0),
    ("magnifique", 2.0),
    ("impeccable", 2.0),
    ("qualité", 0.5),
    ("sympa", 1.0),
    ("fiable", 1.0),
    // English
    ("good", 1.0),
    ("great", 1.5),
    ("excellent", 2.0),
    ("love", 2.0),
    ("amazing", 2.0),
    ("wonderful", 2.0),
    ("happy", 1.0),
    ("fantastic", 2.0),
    ("awesome", 2.0),
    ("best", 1.5),
    ("perfect", 2.0),
    ("fast", 1.0),
    ("nice", 1.0),
    ("recommend", 1.5),
    ("thanks", 0.5),
];

/// Negative words and their weights (positive numbers).
const NEGATIVE_WORDS: &[(&str, f32)] = &[
    // French
    ("mauvais", 1.0),
    ("mauvaise", 1.0),
    ("mal", 1.0),
    ("nul", 2.0),
    ("nulle", 2.0),
    ("horrible", 2.0),
    ("déçu", 1.5),
    ("déçue", 1.5),
    ("décevant", 1.5),
    ("décevante", 1.5),
    ("déception", 1.5),
    ("lent", 1.0),
    ("lente", 1.0),
    ("retard", 1.0),
    ("cassé", 1.5),
    ("cassée", 1.5),
    ("abîmé", 1.5),
    ("problème", 1.0),
    ("panne", 1.0),
    ("cher", 0.5),
    ("chère", 0.5),
    ("arnaque", 2.0),
    ("inadmissible", 2.0),
    ("honteux", 2.0),
    ("catastrophe", 2.0),
    ("pire", 2.0),
    ("remboursement", 0.5),
    ("inutile", 1.0),
    ("défectueux", 1.5),
    ("jamais", 0.5),
    // English
    ("bad", 1.0),
    ("terrible", 2.0),
    ("awful", 2.0),
    ("hate", 2.0),
    ("worst", 2.0),
    ("sad", 1.0),
    ("angry", 1.5),
    ("disappointed", 1.5),
    ("poor", 1.0),
    ("broken", 1.5),
    ("slow", 1.0),
    ("late", 1.0),
    ("refund", 0.5),
    ("useless", 1.5),
];

/// Words that flip the polarity of the following words.
const NEGATORS: &[&str] = &[
    "ne", "n", "pas", "plus", "aucun", "aucune", "rien", "sans", "not", "no", "never", "don",
    "doesn", "didn", "isn", "wasn", "t",
];

/// Words that strengthen the following polarity word.
const INTENSIFIERS: &[&str] = &[
    "très",
    "vraiment",
    "tellement",
    "extrêmement",
    "trop",
    "very",
    "really",
    "so",
    "extremely",
];

/// Number of tokens a negator reaches.
const NEGATION_WINDOW: usize = 3;

/// Intensifier multiplier.
const INTENSIFIER_BOOST: f32 = 1.5;

/// Local star rating model based on a polarity lexicon.
///
/// The net polarity of the text, normalized to `[-1, 1]`, is mapped onto the
/// five-star scale. Text without any lexicon hit is rated 3 stars.
#[derive(Debug, Clone)]
pub struct LexiconStarModel {
    weights: HashMap<String, f32>,
    max_input_chars: usize,
}

impl Default for LexiconStarModel {
    fn default() -> Self {
        Self::builtin()
    }
}

impl LexiconStarModel {
    /// Builds the model from the built-in French and English lexicon.
    pub fn builtin() -> Self {
        let mut weights = HashMap::new();
        for &(word, weight) in POSITIVE_WORDS {
            weights.insert(word.to_string(), weight);
        }
        for &(word, weight) in NEGATIVE_WORDS {
            weights.insert(word.to_string(), -weight);
        }
        Self {
            weights,
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
        }
    }

    /// Adds or overrides one word. Negative weights are negative words.
    pub fn with_word(mut self, word: &str, weight: f32) -> Self {
        self.weights.insert(word.to_lowercase(), weight);
        self
    }

    /// Net polarity in `[-1, 1]` and the number of lexicon hits.
    pub fn polarity(&self, text: &str) -> (f32, usize) {
        let lowered = text.to_lowercase();
        let tokens = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty());

        let mut net = 0.0f32;
        let mut magnitude = 0.0f32;
        let mut hits = 0usize;
        let mut negation_left = 0usize;
        let mut boost = 1.0f32;

        for token in tokens {
            if NEGATORS.contains(&token) {
                negation_left = NEGATION_WINDOW;
                continue;
            }
            if INTENSIFIERS.contains(&token) {
                boost = INTENSIFIER_BOOST;
                continue;
            }

            if let Some(&weight) = self.weights.get(token) {
                let mut value = weight * boost;
                if negation_left > 0 {
                    value = -value;
                }
                net += value;
                magnitude += value.abs();
                hits += 1;
            }

            boost = 1.0;
            negation_left = negation_left.saturating_sub(1);
        }

        if magnitude == 0.0 {
            (0.0, hits)
        } else {
            (net / magnitude, hits)
        }
    }
}

impl StarRatingModel for LexiconStarModel {
    fn max_input_chars(&self) -> usize {
        self.max_input_chars
    }

    fn rate(&self, text: &str) -> Result<StarPrediction, ProviderError> {
        let (polarity, hits) = self.polarity(text);
        if hits == 0 {
            return Ok(StarPrediction::stars(3, 0.5));
        }

        let stars = if polarity <= -0.6 {
            1
        } else if polarity < -0.2 {
            2
        } else if polarity <= 0.2 {
            3
        } else if polarity < 0.6 {
            4
        } else {
            5
        };

        let confidence = if stars == 3 {
            1.0 - polarity.abs()
        } else {
            0.5 + polarity.abs() / 2.0
        };

        Ok(StarPrediction::stars(stars, confidence))
    }

    fn name(&self) -> &str {
        "lexicon"
    }
}

// ============================================================================
// HTTP model
// ============================================================================

const PROBE_TEXT: &str = "probe";

/// Settings for [`HttpStarModel`].
#[derive(Debug, Clone)]
pub struct HttpStarModelConfig {
    /// Full URL of the classification endpoint.
    pub url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub max_retries: usize,
    pub max_input_chars: usize,
}

impl HttpStarModelConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: None,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
        }
    }
}

#[derive(Serialize)]
struct ClassificationRequest<'a> {
    inputs: &'a str,
}

/// Inference servers answer either a flat list or one list per input.
#[derive(Deserialize)]
#[serde(untagged)]
enum ClassificationResponse {
    Flat(Vec<StarPrediction>),
    Nested(Vec<Vec<StarPrediction>>),
}

impl ClassificationResponse {
    fn top(self) -> Option<StarPrediction> {
        let predictions = match self {
            Self::Flat(list) => list,
            Self::Nested(lists) => lists.into_iter().next().unwrap_or_default(),
        };
        predictions
            .into_iter()
            .fold(None, |best: Option<StarPrediction>, p| match best {
                Some(b) if b.score >= p.score => Some(b),
                _ => Some(p),
            })
    }
}

/// Star rating model behind an HTTP text-classification endpoint.
pub struct HttpStarModel {
    client: Client,
    url: String,
    max_retries: usize,
    max_input_chars: usize,
}

impl HttpStarModel {
    /// Builds the client and checks that the endpoint answers with a star
    /// label. Any failure here means the model is unavailable.
    pub fn connect(config: HttpStarModelConfig) -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = config.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            let auth = HeaderValue::from_str(&format!("Bearer {}", key.trim()))
                .map_err(|_| ProviderError::Unavailable("invalid sentiment API key".into()))?;
            headers.insert(AUTHORIZATION, auth);
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ProviderError::Unavailable(format!("http client: {}", e)))?;

        let model = Self {
            client,
            url: config.url,
            max_retries: config.max_retries.max(1),
            max_input_chars: config.max_input_chars.max(1),
        };

        let probe = model
            .request(PROBE_TEXT)
            .map_err(|e| ProviderError::Unavailable(format!("probe failed: {}", e)))?;
        map_star_label(&probe.label)
            .map_err(|e| ProviderError::Unavailable(format!("probe failed: {}", e)))?;

        tracing::info!(url = %model.url, "Connected to sentiment model");
        Ok(model)
    }

    fn request(&self, text: &str) -> Result<StarPrediction, ProviderError> {
        let mut attempt = 0usize;

        loop {
            let body = ClassificationRequest { inputs: text };
            match self.client.post(&self.url).json(&body).send() {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let parsed: ClassificationResponse = resp
                            .json()
                            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
                        return parsed.top().ok_or_else(|| {
                            ProviderError::InvalidResponse("no prediction returned".into())
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
                        "sentiment request failed ({}): {}",
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

impl StarRatingModel for HttpStarModel {
    fn max_input_chars(&self) -> usize {
        self.max_input_chars
    }

    fn rate(&self, text: &str) -> Result<StarPrediction, ProviderError> {
        self.request(text)
    }

    fn name(&self) -> &str {
        "http"
    }
}
