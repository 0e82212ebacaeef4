//! verbatim-analysis: comment analysis pipeline
//!
//! This crate provides:
//! - Text normalization with emoji and hashtag side channels
//! - Lemmatization against a French/English lexicon
//! - Local and HTTP embedding models
//! - Star-rating sentiment folded into three labels
//! - Hierarchical theme / sub-theme clustering with seeded K-Means
//! - Frequency, contingency and temporal reports
//! - CSV input and CSV / plain-text exports
//!
//! ## Modules
//!
//! - [`normalize`]: cleaning, emoji and hashtag extraction
//! - [`lemma`]: stopwords and the form -> lemma lexicon
//! - [`embedding`]: hashing and HTTP embedding providers
//! - [`kmeans`]: seeded Lloyd's algorithm with k-means++
//! - [`clustering`]: two-level theme clustering
//! - [`sentiment`]: star-rating models and the sentiment scorer
//! - [`report`]: aggregate tables and example lookup
//! - [`input`]: uploaded CSV tables
//! - [`export`]: CSV and text report exports
//! - [`pipeline`]: end-to-end orchestration
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use verbatim_analysis::{
//!     ClusterParams, HashingEmbedder, LexiconLemmatizer, LexiconStarModel, Normalizer,
//!     Pipeline, PipelineConfig, SentimentScorer, Table,
//! };
//!
//! let normalizer = Normalizer::new(Arc::new(LexiconLemmatizer::builtin()))?;
//! let pipeline = Pipeline::new(
//!     normalizer,
//!     Arc::new(HashingEmbedder::default()),
//!     SentimentScorer::new(Arc::new(LexiconStarModel::builtin())),
//!     PipelineConfig::default(),
//! );
//!
//! let table = Table::from_csv(std::fs::File::open("avis.csv")?)?;
//! let analysis = pipeline.run_table(&table, "commentaire", None, ClusterParams::default())?;
//!
//! for theme in &analysis.themes {
//!     println!("{}: {} comments", theme.label, theme.size);
//! }
//! ```

pub use verbatim_core;

pub mod clustering;
pub mod embedding;
pub mod error;
pub mod export;
pub mod input;
pub mod kmeans;
pub mod lemma;
pub mod normalize;
pub mod pipeline;
pub mod report;
pub mod sentiment;

// Re-export main types for convenience
pub use clustering::{
    ClusterOutcome, ClusterParams, DEFAULT_SUBTHEMES, DEFAULT_THEMES, HierarchicalClusterer,
    ThemeSummary,
};
pub use embedding::{
    DEFAULT_HASHING_DIMENSION, DEFAULT_MAX_TOKENS, HashingEmbedder, HttpEmbedder,
    HttpEmbedderConfig,
};
pub use error::{AnalysisError, AnalysisResult, InputError, Stage};
pub use export::{to_csv, to_text_report};
pub use input::Table;
pub use kmeans::{KMeans, KMeansConfig, KMeansFit};
pub use lemma::LexiconLemmatizer;
pub use normalize::{Normalizer, extract_emojis};
pub use pipeline::{Analysis, DEFAULT_MAX_THEMES, Pipeline, PipelineConfig};
pub use report::{
    DEFAULT_EXAMPLE_LIMIT, Facet, FrequencyEntry, Report, ReportAssembler, TemporalCount,
    examples_containing, parse_day,
};
pub use sentiment::{
    HttpStarModel, HttpStarModelConfig, LexiconStarModel, SentimentScorer, map_star_label,
};
