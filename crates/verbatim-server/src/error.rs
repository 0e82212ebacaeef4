//! API error types with JSON responses.

use axum::{
    Json,
    extract::rejection::{BytesRejection, JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use verbatim_analysis::{AnalysisError, InputError};

/// API error that can be returned from handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Bad request (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The request could not be extracted (body too large, wrong content type, ...).
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    /// Internal server error (500).
    #[error("internal error: {0}")]
    Internal(String),

    /// Analysis error.
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

impl ApiError {
    /// Get the error code string for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Rejected { status, .. } => match *status {
                StatusCode::PAYLOAD_TOO_LARGE => "PAYLOAD_TOO_LARGE",
                StatusCode::UNSUPPORTED_MEDIA_TYPE => "UNSUPPORTED_MEDIA_TYPE",
                _ => "INVALID_REQUEST",
            },
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Analysis(e) => match e {
                AnalysisError::Input(InputError::MissingColumn { .. }) => "MISSING_COLUMN",
                AnalysisError::Input(InputError::Malformed(_)) => "MALFORMED_INPUT",
                AnalysisError::InvalidParameter(_) => "INVALID_PARAMETER",
                AnalysisError::ModelUnavailable { .. } => "MODEL_UNAVAILABLE",
                AnalysisError::Model { .. } => "MODEL_FAILURE",
                AnalysisError::DimensionMismatch { .. }
                | AnalysisError::NonFiniteEmbedding(_)
                | AnalysisError::Unassigned(_) => "INCONSISTENT_EMBEDDINGS",
                AnalysisError::Export(_) => "EXPORT_ERROR",
                AnalysisError::Lexicon(_) => "INTERNAL_ERROR",
            },
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Rejected { status, .. } => *status,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Analysis(e) => match e {
                AnalysisError::Input(_) | AnalysisError::InvalidParameter(_) => {
                    StatusCode::BAD_REQUEST
                }
                e if e.is_model_failure() => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

/// JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error details.
    pub error: ErrorDetails,
}

/// Error details within the response.
#[derive(Debug, Serialize)]
pub struct ErrorDetails {
    /// Error code (e.g., "MISSING_COLUMN", "MODEL_FAILURE").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "Request failed");
        } else {
            tracing::debug!(code = self.code(), error = %self, "Request rejected");
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code: self.code().to_string(),
                message: self.to_string(),
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;
