//! Error types for the analysis pipeline.

use std::fmt;
use thiserror::Error;
use verbatim_core::{ProviderError, RecordId};

/// Result type alias for analysis operations.
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Pipeline stage that talks to an external model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Lemmatization,
    Embedding,
    Sentiment,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Lemmatization => "lemmatization",
            Self::Embedding => "embedding",
            Self::Sentiment => "sentiment",
        };
        f.write_str(name)
    }
}

/// Errors in the uploaded table.
#[derive(Debug, Error)]
pub enum InputError {
    /// The table could not be parsed.
    #[error("unreadable table: {0}")]
    Malformed(String),

    /// The selected text column does not exist.
    #[error("column '{column}' not found (available: {})", available.join(", "))]
    MissingColumn {
        column: String,
        available: Vec<String>,
    },
}

impl From<csv::Error> for InputError {
    fn from(err: csv::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}

/// Errors that abort an analysis run.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The uploaded table is unusable.
    #[error(transparent)]
    Input(#[from] InputError),

    /// A model failed to load at startup.
    #[error("{stage} model unavailable: {source}")]
    ModelUnavailable {
        stage: Stage,
        #[source]
        source: ProviderError,
    },

    /// A model failed on a record during a run.
    #[error("{stage} model failed on {record}: {source}")]
    Model {
        stage: Stage,
        record: RecordId,
        #[source]
        source: ProviderError,
    },

    /// Embeddings of one run do not share a dimension.
    #[error("embedding dimension mismatch on {record}: expected {expected}, found {found}")]
    DimensionMismatch {
        record: RecordId,
        expected: usize,
        found: usize,
    },

    /// An embedding contains NaN or infinite components.
    #[error("embedding of {0} contains non-finite values")]
    NonFiniteEmbedding(RecordId),

    /// Clustering returned no assignment for a record.
    #[error("no theme assigned to {0}")]
    Unassigned(RecordId),

    /// A caller-supplied parameter is out of range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The lemmatization lexicon could not be read.
    #[error("lexicon error: {0}")]
    Lexicon(String),

    /// Export failed.
    #[error("export failed: {0}")]
    Export(String),
}

impl AnalysisError {
    /// Whether the error comes from a failing model rather than the input.
    pub fn is_model_failure(&self) -> bool {
        matches!(self, Self::ModelUnavailable { .. } | Self::Model { .. })
    }

    /// Whether the error is an internal consistency fault.
    pub fn is_consistency_fault(&self) -> bool {
        matches!(
            self,
            Self::DimensionMismatch { .. }
                | Self::NonFiniteEmbedding(_)
                | Self::Unassigned(_)
                | Self::Export(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_column_lists_available() {
        let err = InputError::MissingColumn {
            column: "avis".into(),
            available: vec!["id".into(), "comment".into()],
        };
        assert_eq!(
            err.to_string(),
            "column 'avis' not found (available: id, comment)"
        );
    }

    #[test]
    fn model_error_names_stage_and_record() {
        let err = AnalysisError::Model {
            stage: Stage::Sentiment,
            record: RecordId(4),
            source: ProviderError::Inference("timeout".into()),
        };
        assert_eq!(
            err.to_string(),
            "sentiment model failed on row-4: inference failed: timeout"
        );
        assert!(err.is_model_failure());
    }
}
