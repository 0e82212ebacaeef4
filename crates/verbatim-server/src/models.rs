//! Model loading at startup.
//!
//! Every model is created exactly once, before the server accepts requests.
//! A model that cannot be loaded stops the process.

use std::sync::Arc;

use verbatim_analysis::{
    AnalysisError, AnalysisResult, HashingEmbedder, HttpEmbedder, HttpEmbedderConfig,
    HttpStarModel, HttpStarModelConfig, LexiconLemmatizer, LexiconStarModel, Normalizer,
    Pipeline, SentimentScorer, Stage,
};
use verbatim_core::{EmbeddingProvider, ProviderError, StarRatingModel};

use crate::config::{EmbeddingBackend, SentimentBackend, ServerConfig};

/// Loads every model and assembles the analysis pipeline.
///
/// HTTP backends use blocking clients and probe their endpoint, so call this
/// outside the async runtime (e.g. in `spawn_blocking`).
pub fn build_pipeline(config: &ServerConfig) -> AnalysisResult<Pipeline> {
    let lemmatizer = match &config.lemma_lexicon_path {
        Some(path) => LexiconLemmatizer::with_lexicon_file(path).map_err(|e| {
            AnalysisError::ModelUnavailable {
                stage: Stage::Lemmatization,
                source: ProviderError::Unavailable(e.to_string()),
            }
        })?,
        None => LexiconLemmatizer::builtin(),
    };
    let normalizer = Normalizer::new(Arc::new(lemmatizer))?;

    let embedder = load_embedder(config).map_err(|source| AnalysisError::ModelUnavailable {
        stage: Stage::Embedding,
        source,
    })?;
    let star_model = load_star_model(config).map_err(|source| {
        AnalysisError::ModelUnavailable {
            stage: Stage::Sentiment,
            source,
        }
    })?;

    tracing::info!(
        embedding = embedder.name(),
        dimension = embedder.dimension(),
        sentiment = star_model.name(),
        "Models loaded"
    );

    Ok(Pipeline::new(
        normalizer,
        embedder,
        SentimentScorer::new(star_model),
        config.pipeline_config(),
    ))
}

fn load_embedder(config: &ServerConfig) -> Result<Arc<dyn EmbeddingProvider>, ProviderError> {
    match config.embedding_backend {
        EmbeddingBackend::Hashing => Ok(Arc::new(HashingEmbedder::new(
            config.embedding_dimension,
            config.embedding_max_tokens,
        )?)),
        EmbeddingBackend::Http => {
            let url = config
                .embedding_url
                .clone()
                .ok_or_else(|| ProviderError::Unavailable("EMBEDDING_URL is not set".into()))?;
            let model = config.embedding_model.clone().unwrap_or_default();

            let mut http = HttpEmbedderConfig::new(url, model);
            http.api_key = config.embedding_api_key.clone();
            http.max_tokens = config.embedding_max_tokens;
            Ok(Arc::new(HttpEmbedder::connect(http)?))
        }
    }
}

fn load_star_model(config: &ServerConfig) -> Result<Arc<dyn StarRatingModel>, ProviderError> {
    match config.sentiment_backend {
        SentimentBackend::Lexicon => Ok(Arc::new(LexiconStarModel::builtin())),
        SentimentBackend::Http => {
            let url = config
                .sentiment_url
                .clone()
                .ok_or_else(|| ProviderError::Unavailable("SENTIMENT_URL is not set".into()))?;

            let mut http = HttpStarModelConfig::new(url);
            http.api_key = config.sentiment_api_key.clone();
            Ok(Arc::new(HttpStarModel::connect(http)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_local_models() {
        let config = ServerConfig {
            embedding_dimension: 64,
            ..ServerConfig::default()
        };
        let pipeline = build_pipeline(&config).unwrap();
        assert_eq!(pipeline.embedding_dimension(), 64);
        assert_eq!(pipeline.embedding_backend(), "hashing");
        assert_eq!(pipeline.sentiment_backend(), "lexicon");
    }

    #[test]
    fn test_lexicon_file_is_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# extra forms").unwrap();
        writeln!(file, "livrée\tlivrer").unwrap();

        let config = ServerConfig {
            lemma_lexicon_path: Some(file.path().to_path_buf()),
            ..ServerConfig::default()
        };
        assert!(build_pipeline(&config).is_ok());
    }

    #[test]
    fn test_missing_lexicon_is_fatal() {
        let config = ServerConfig {
            lemma_lexicon_path: Some("/nonexistent/lexicon.tsv".into()),
            ..ServerConfig::default()
        };
        let err = build_pipeline(&config).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::ModelUnavailable {
                stage: Stage::Lemmatization,
                ..
            }
        ));
        assert!(err.is_model_failure());
        assert!(err.to_string().contains("lexicon.tsv"));
    }

    #[test]
    fn test_unreachable_sentiment_model_is_fatal() {
        let config = ServerConfig {
            sentiment_backend: SentimentBackend::Http,
            sentiment_url: Some("http://127.0.0.1:9/classify".into()),
            ..ServerConfig::default()
        };
        let err = build_pipeline(&config).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::ModelUnavailable {
                stage: Stage::Sentiment,
                ..
            }
        ));
    }
}
