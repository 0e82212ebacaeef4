//! Analysis endpoints.
//!
//! Both endpoints run the whole pipeline on a blocking thread and return the
//! result in the requested format:
//!
//! - `json` (default): records, theme summaries and the aggregate report
//! - `csv`: one line per record
//! - `report`: the plain-text summary

use axum::{
    Json, Router,
    body::Bytes,
    extract::{
        Query, State,
        rejection::{BytesRejection, JsonRejection, QueryRejection},
    },
    http::header,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::{Deserialize, Serialize};
use verbatim_analysis::{
    Analysis, AnalysisResult, DEFAULT_EXAMPLE_LIMIT, Facet, Pipeline, Table, examples_containing,
    to_csv, to_text_report,
};
use verbatim_core::{CommentRow, RecordId};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// File name suggested for CSV downloads.
const CSV_FILENAME: &str = "verbatim-analysis.csv";

// =============================================================================
// Request types
// =============================================================================

/// Output format of an analysis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
    Report,
}

/// One comment in a JSON upload.
#[derive(Debug, Clone, Deserialize)]
pub struct RowInput {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

/// Example lookup attached to an analysis request.
#[derive(Debug, Clone, Deserialize)]
pub struct ExploreRequest {
    pub facet: Facet,
    pub value: String,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// JSON analysis request body.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeRequest {
    /// Comments in upload order.
    pub rows: Vec<RowInput>,
    #[serde(default)]
    pub n_themes: Option<usize>,
    #[serde(default)]
    pub n_subthemes: Option<usize>,
    #[serde(default)]
    pub explore: Option<ExploreRequest>,
}

/// Query string of `POST /analyses`.
#[derive(Debug, Default, Deserialize)]
pub struct FormatQuery {
    #[serde(default)]
    pub format: ExportFormat,
}

/// Query string of `POST /analyses/csv`.
#[derive(Debug, Deserialize)]
pub struct CsvQuery {
    /// Column holding the comment text.
    pub text_column: String,
    #[serde(default)]
    pub date_column: Option<String>,
    #[serde(default)]
    pub n_themes: Option<usize>,
    #[serde(default)]
    pub n_subthemes: Option<usize>,
    #[serde(default)]
    pub format: ExportFormat,
    #[serde(default)]
    pub facet: Option<Facet>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl CsvQuery {
    fn explore(&self) -> ApiResult<Option<ExploreRequest>> {
        match (self.facet, &self.value) {
            (Some(facet), Some(value)) => Ok(Some(ExploreRequest {
                facet,
                value: value.clone(),
                limit: self.limit,
            })),
            (None, None) => Ok(None),
            _ => Err(ApiError::BadRequest(
                "facet and value must be given together".to_string(),
            )),
        }
    }
}

// =============================================================================
// Response types
// =============================================================================

/// A comment matching an example lookup.
#[derive(Debug, Serialize)]
pub struct ExampleComment {
    pub id: RecordId,
    pub text: String,
}

/// Result of an example lookup.
#[derive(Debug, Serialize)]
pub struct ExamplesResponse {
    pub facet: Facet,
    pub value: String,
    pub comments: Vec<ExampleComment>,
}

/// JSON analysis response.
#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    #[serde(flatten)]
    pub analysis: Analysis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub examples: Option<ExamplesResponse>,
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /analyses - Analyse comments sent as JSON.
async fn analyze_rows(
    State(state): State<AppState>,
    query: Result<Query<FormatQuery>, QueryRejection>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Query(query) = query?;
    let Json(request) = payload?;
    validate_explore(request.explore.as_ref())?;

    let params = state
        .pipeline()
        .resolve_params(request.n_themes, request.n_subthemes)?;
    let rows: Vec<CommentRow> = request
        .rows
        .into_iter()
        .enumerate()
        .map(|(row, input)| CommentRow {
            id: RecordId::from_row(row),
            text: input.text,
            date: input.date,
        })
        .collect();

    tracing::info!(
        rows = rows.len(),
        n_themes = params.n_themes,
        n_subthemes = params.n_subthemes,
        "Analysing JSON upload"
    );
    let analysis = run_blocking(&state, move |pipeline| pipeline.run(rows, params)).await?;
    render(analysis, query.format, request.explore)
}

/// POST /analyses/csv - Analyse a CSV upload.
async fn analyze_csv(
    State(state): State<AppState>,
    query: Result<Query<CsvQuery>, QueryRejection>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Response> {
    let Query(query) = query?;
    let body = body?;
    let explore = query.explore()?;
    validate_explore(explore.as_ref())?;

    let params = state
        .pipeline()
        .resolve_params(query.n_themes, query.n_subthemes)?;

    tracing::info!(
        bytes = body.len(),
        text_column = %query.text_column,
        n_themes = params.n_themes,
        n_subthemes = params.n_subthemes,
        "Analysing CSV upload"
    );
    let text_column = query.text_column.clone();
    let date_column = query.date_column.clone();
    let analysis = run_blocking(&state, move |pipeline| {
        let table = Table::from_csv(body.as_ref())?;
        pipeline.run_table(&table, &text_column, date_column.as_deref(), params)
    })
    .await?;

    render(analysis, query.format, explore)
}

// =============================================================================
// Helpers
// =============================================================================

fn validate_explore(explore: Option<&ExploreRequest>) -> ApiResult<()> {
    match explore {
        Some(explore) if explore.value.trim().is_empty() => Err(ApiError::BadRequest(
            "explore value must not be empty".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Runs an analysis on the blocking pool; model calls may block on I/O.
async fn run_blocking<F>(state: &AppState, job: F) -> ApiResult<Analysis>
where
    F: FnOnce(&Pipeline) -> AnalysisResult<Analysis> + Send + 'static,
{
    let pipeline = state.pipeline_handle();
    let analysis = tokio::task::spawn_blocking(move || job(&pipeline))
        .await
        .map_err(|e| ApiError::Internal(format!("analysis task failed: {}", e)))??;

    tracing::info!(
        records = analysis.records.len(),
        dropped = analysis.dropped_rows,
        themes = analysis.themes.len(),
        "Analysis complete"
    );
    Ok(analysis)
}

fn render(
    analysis: Analysis,
    format: ExportFormat,
    explore: Option<ExploreRequest>,
) -> ApiResult<Response> {
    match format {
        ExportFormat::Json => {
            let examples = explore.map(|explore| {
                let limit = explore.limit.unwrap_or(DEFAULT_EXAMPLE_LIMIT);
                let comments = examples_containing(
                    &analysis.records,
                    explore.facet,
                    &explore.value,
                    limit,
                )
                .into_iter()
                .map(|record| ExampleComment {
                    id: record.id,
                    text: record.raw_text.clone(),
                })
                .collect();
                ExamplesResponse {
                    facet: explore.facet,
                    value: explore.value,
                    comments,
                }
            });
            Ok(Json(AnalysisResponse { analysis, examples }).into_response())
        }
        ExportFormat::Csv => {
            let body = to_csv(&analysis.records)?;
            let disposition = format!("attachment; filename=\"{}\"", CSV_FILENAME);
            Ok((
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                body,
            )
                .into_response())
        }
        ExportFormat::Report => {
            let body = to_text_report(&analysis.records, &analysis.labels);
            Ok((
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                body,
            )
                .into_response())
        }
    }
}

/// Build analysis routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/analyses", post(analyze_rows))
        .route("/analyses/csv", post(analyze_csv))
}
