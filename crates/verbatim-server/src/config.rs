//! Server configuration from environment variables.

use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use http::HeaderValue;
use verbatim_analysis::{
    ClusterParams, DEFAULT_HASHING_DIMENSION, DEFAULT_MAX_THEMES, DEFAULT_MAX_TOKENS,
    DEFAULT_SUBTHEMES, DEFAULT_THEMES, KMeansConfig, PipelineConfig,
};

/// Default request body limit: 10 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Which embedding model to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingBackend {
    /// Local feature-hashing model.
    Hashing,
    /// OpenAI-compatible `/embeddings` endpoint.
    Http,
}

impl FromStr for EmbeddingBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hashing" => Ok(Self::Hashing),
            "http" => Ok(Self::Http),
            other => Err(format!("expected 'hashing' or 'http', got '{}'", other)),
        }
    }
}

impl fmt::Display for EmbeddingBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hashing => f.write_str("hashing"),
            Self::Http => f.write_str("http"),
        }
    }
}

/// Which sentiment model to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentimentBackend {
    /// Local polarity lexicon.
    Lexicon,
    /// Text-classification inference endpoint.
    Http,
}

impl FromStr for SentimentBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lexicon" => Ok(Self::Lexicon),
            "http" => Ok(Self::Http),
            other => Err(format!("expected 'lexicon' or 'http', got '{}'", other)),
        }
    }
}

impl fmt::Display for SentimentBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lexicon => f.write_str("lexicon"),
            Self::Http => f.write_str("http"),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server port to listen on.
    pub port: u16,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// CORS allowed origins (comma-separated or "*" for all).
    pub cors_allowed_origins: String,
    /// Largest accepted request body in bytes.
    pub max_upload_bytes: usize,
    /// Themes used when a request does not choose.
    pub default_themes: usize,
    /// Sub-themes used when a request does not choose.
    pub default_subthemes: usize,
    /// Largest accepted theme or sub-theme count.
    pub max_themes: usize,
    /// K-Means seed for both clustering levels.
    pub cluster_seed: u64,
    pub embedding_backend: EmbeddingBackend,
    /// Vector width of the hashing model.
    pub embedding_dimension: usize,
    pub embedding_url: Option<String>,
    pub embedding_model: Option<String>,
    pub embedding_api_key: Option<String>,
    /// Tokens kept before embedding.
    pub embedding_max_tokens: usize,
    pub sentiment_backend: SentimentBackend,
    pub sentiment_url: Option<String>,
    pub sentiment_api_key: Option<String>,
    /// Optional `form<TAB>lemma` file extending the built-in lexicon.
    pub lemma_lexicon_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            log_level: "info".to_string(),
            cors_allowed_origins: "*".to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            default_themes: DEFAULT_THEMES,
            default_subthemes: DEFAULT_SUBTHEMES,
            max_themes: DEFAULT_MAX_THEMES,
            cluster_seed: verbatim_analysis::kmeans::DEFAULT_SEED,
            embedding_backend: EmbeddingBackend::Hashing,
            embedding_dimension: DEFAULT_HASHING_DIMENSION,
            embedding_url: None,
            embedding_model: None,
            embedding_api_key: None,
            embedding_max_tokens: DEFAULT_MAX_TOKENS,
            sentiment_backend: SentimentBackend::Lexicon,
            sentiment_url: None,
            sentiment_api_key: None,
            lemma_lexicon_path: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional:
    /// - `PORT`: Server port (default: 3000)
    /// - `LOG_LEVEL`: Logging level (default: "info")
    /// - `CORS_ALLOWED_ORIGINS`: Allowed CORS origins (default: "*")
    /// - `MAX_UPLOAD_BYTES`: Request body limit (default: 10 MiB)
    /// - `DEFAULT_THEMES` / `DEFAULT_SUBTHEMES`: (default: 5 / 3)
    /// - `MAX_THEMES`: Upper bound for both counts (default: 50)
    /// - `CLUSTER_SEED`: K-Means seed (default: 42)
    /// - `EMBEDDING_BACKEND`: "hashing" or "http" (default: "hashing")
    /// - `EMBEDDING_DIMENSION`: Hashing vector width (default: 256)
    /// - `EMBEDDING_URL`, `EMBEDDING_MODEL`: Required for the http backend
    /// - `EMBEDDING_API_KEY`: Bearer token for the http backend
    /// - `EMBEDDING_MAX_TOKENS`: Truncation length (default: 128)
    /// - `SENTIMENT_BACKEND`: "lexicon" or "http" (default: "lexicon")
    /// - `SENTIMENT_URL`: Required for the http backend
    /// - `SENTIMENT_API_KEY`: Bearer token for the http backend
    /// - `LEMMA_LEXICON_PATH`: Extra lemmatization lexicon
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let config = Self {
            port: parse_var(&var, "PORT", defaults.port)?,
            log_level: var("LOG_LEVEL").unwrap_or(defaults.log_level),
            cors_allowed_origins: var("CORS_ALLOWED_ORIGINS")
                .unwrap_or(defaults.cors_allowed_origins),
            max_upload_bytes: parse_var(&var, "MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            default_themes: parse_var(&var, "DEFAULT_THEMES", defaults.default_themes)?,
            default_subthemes: parse_var(&var, "DEFAULT_SUBTHEMES", defaults.default_subthemes)?,
            max_themes: parse_var(&var, "MAX_THEMES", defaults.max_themes)?,
            cluster_seed: parse_var(&var, "CLUSTER_SEED", defaults.cluster_seed)?,
            embedding_backend: parse_var(&var, "EMBEDDING_BACKEND", defaults.embedding_backend)?,
            embedding_dimension: parse_var(
                &var,
                "EMBEDDING_DIMENSION",
                defaults.embedding_dimension,
            )?,
            embedding_url: var("EMBEDDING_URL"),
            embedding_model: var("EMBEDDING_MODEL"),
            embedding_api_key: var("EMBEDDING_API_KEY"),
            embedding_max_tokens: parse_var(
                &var,
                "EMBEDDING_MAX_TOKENS",
                defaults.embedding_max_tokens,
            )?,
            sentiment_backend: parse_var(&var, "SENTIMENT_BACKEND", defaults.sentiment_backend)?,
            sentiment_url: var("SENTIMENT_URL"),
            sentiment_api_key: var("SENTIMENT_API_KEY"),
            lemma_lexicon_path: var("LEMMA_LEXICON_PATH").map(PathBuf::from),
        };

        config.validate()?;
        Ok(config)
    }

    /// Checks ranges and backend requirements.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_upload_bytes == 0 {
            return Err(invalid("MAX_UPLOAD_BYTES", "must be positive"));
        }
        if self.max_themes == 0 {
            return Err(invalid("MAX_THEMES", "must be positive"));
        }
        if self.default_themes == 0 || self.default_themes > self.max_themes {
            return Err(invalid("DEFAULT_THEMES", "must be between 1 and MAX_THEMES"));
        }
        if self.default_subthemes == 0 || self.default_subthemes > self.max_themes {
            return Err(invalid("DEFAULT_SUBTHEMES", "must be between 1 and MAX_THEMES"));
        }
        if self.embedding_dimension == 0 {
            return Err(invalid("EMBEDDING_DIMENSION", "must be positive"));
        }
        if self.embedding_max_tokens == 0 {
            return Err(invalid("EMBEDDING_MAX_TOKENS", "must be positive"));
        }

        if self.embedding_backend == EmbeddingBackend::Http {
            if self.embedding_url.is_none() {
                return Err(ConfigError::MissingEnvVar("EMBEDDING_URL".to_string()));
            }
            if self.embedding_model.is_none() {
                return Err(ConfigError::MissingEnvVar("EMBEDDING_MODEL".to_string()));
            }
        }
        if self.sentiment_backend == SentimentBackend::Http && self.sentiment_url.is_none() {
            return Err(ConfigError::MissingEnvVar("SENTIMENT_URL".to_string()));
        }

        if self.cors_allowed_origins.trim() != "*" {
            for origin in self.cors_allowed_origins.split(',') {
                HeaderValue::from_str(origin.trim()).map_err(|_| {
                    invalid("CORS_ALLOWED_ORIGINS", &format!("invalid origin '{}'", origin))
                })?;
            }
        }

        Ok(())
    }

    /// Get the socket address for the server.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }

    /// Pipeline settings derived from this configuration.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            kmeans: KMeansConfig {
                seed: self.cluster_seed,
                ..KMeansConfig::default()
            },
            default_params: ClusterParams {
                n_themes: self.default_themes,
                n_subthemes: self.default_subthemes,
            },
            max_themes: self.max_themes,
            frequency_limit: None,
        }
    }
}

fn parse_var<T, F>(var: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| invalid(name, &e.to_string())),
        None => Ok(default),
    }
}

fn invalid(name: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// Invalid environment variable value.
    #[error("invalid value for environment variable {name}: {reason}")]
    InvalidValue { name: String, reason: String },
}
