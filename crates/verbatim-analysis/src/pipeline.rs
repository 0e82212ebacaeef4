//! End-to-end analysis of uploaded comments.
//!
//! ```text
//! rows -> drop blank text -> normalize -> (embed || score) -> cluster
//!      -> records -> report
//! ```
//!
//! Every stage consumes and produces owned collections in input order.
//! Embedding and sentiment scoring are independent and run side by side
//! with `rayon::join`; within each stage records are processed in parallel.

use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use verbatim_core::{
    CommentRow, EmbeddingProvider, NormalizedText, Record, RecordId, Sentiment, ThemeLabels,
};

use crate::clustering::{ClusterParams, HierarchicalClusterer, ThemeSummary};
use crate::error::{AnalysisError, AnalysisResult, Stage};
use crate::input::Table;
use crate::kmeans::KMeansConfig;
use crate::normalize::Normalizer;
use crate::report::{Report, ReportAssembler};
use crate::sentiment::SentimentScorer;

/// Default upper bound on themes and sub-themes per request.
pub const DEFAULT_MAX_THEMES: usize = 50;

/// Settings shared by every run of a [`Pipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub kmeans: KMeansConfig,
    /// Parameters used when a request does not choose its own.
    pub default_params: ClusterParams,
    /// Largest accepted `n_themes` and `n_subthemes`.
    pub max_themes: usize,
    /// Cap on report frequency tables (`None` keeps every value).
    pub frequency_limit: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            kmeans: KMeansConfig::default(),
            default_params: ClusterParams::default(),
            max_themes: DEFAULT_MAX_THEMES,
            frequency_limit: None,
        }
    }
}

/// Result of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub params: ClusterParams,
    /// Enriched records in row order.
    pub records: Vec<Record>,
    pub labels: ThemeLabels,
    pub themes: Vec<ThemeSummary>,
    pub report: Report,
    /// Rows skipped because their text was missing or blank.
    pub dropped_rows: usize,
}

impl Analysis {
    fn empty(params: ClusterParams, dropped_rows: usize) -> Self {
        Self {
            params,
            records: Vec::new(),
            labels: ThemeLabels {
                themes: Vec::new(),
                subthemes: Vec::new(),
            },
            themes: Vec::new(),
            report: Report::default(),
            dropped_rows,
        }
    }
}

/// A surviving input row.
struct Comment {
    id: RecordId,
    raw_text: String,
    date: Option<String>,
}

/// Runs the full analysis with model handles created once at startup.
#[derive(Clone)]
pub struct Pipeline {
    normalizer: Normalizer,
    embedder: Arc<dyn EmbeddingProvider>,
    scorer: SentimentScorer,
    clusterer: HierarchicalClusterer,
    reports: ReportAssembler,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        normalizer: Normalizer,
        embedder: Arc<dyn EmbeddingProvider>,
        scorer: SentimentScorer,
        config: PipelineConfig,
    ) -> Self {
        let mut reports = ReportAssembler::new();
        if let Some(limit) = config.frequency_limit {
            reports = reports.with_frequency_limit(limit);
        }

        Self {
            normalizer,
            embedder,
            scorer,
            clusterer: HierarchicalClusterer::new(config.kmeans),
            reports,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Dimension of the embedding model.
    pub fn embedding_dimension(&self) -> usize {
        self.embedder.dimension()
    }

    /// Name of the embedding backend.
    pub fn embedding_backend(&self) -> &str {
        self.embedder.name()
    }

    /// Name of the sentiment backend.
    pub fn sentiment_backend(&self) -> &str {
        self.scorer.model_name()
    }

    /// Resolves optional request parameters against the defaults and limits.
    pub fn resolve_params(
        &self,
        n_themes: Option<usize>,
        n_subthemes: Option<usize>,
    ) -> AnalysisResult<ClusterParams> {
        let params = ClusterParams::new(
            n_themes.unwrap_or(self.config.default_params.n_themes),
            n_subthemes.unwrap_or(self.config.default_params.n_subthemes),
        )?;

        if params.n_themes > self.config.max_themes {
            return Err(AnalysisError::InvalidParameter(format!(
                "n_themes must be at most {}",
                self.config.max_themes
            )));
        }
        if params.n_subthemes > self.config.max_themes {
            return Err(AnalysisError::InvalidParameter(format!(
                "n_subthemes must be at most {}",
                self.config.max_themes
            )));
        }
        Ok(params)
    }

    /// Analyses a parsed table.
    pub fn run_table(
        &self,
        table: &Table,
        text_column: &str,
        date_column: Option<&str>,
        params: ClusterParams,
    ) -> AnalysisResult<Analysis> {
        let rows = table.comment_rows(text_column, date_column)?;
        self.run(rows, params)
    }

    /// Analyses comment rows.
    ///
    /// Rows with missing or blank text are dropped. Any model failure aborts
    /// the whole run.
    pub fn run(&self, rows: Vec<CommentRow>, params: ClusterParams) -> AnalysisResult<Analysis> {
        params.validate()?;

        let total_rows = rows.len();
        let comments: Vec<Comment> = rows
            .into_iter()
            .filter_map(|row| {
                let raw_text = row.usable_text()?.to_string();
                Some(Comment {
                    id: row.id,
                    raw_text,
                    date: row.date,
                })
            })
            .collect();
        let dropped_rows = total_rows - comments.len();

        if comments.is_empty() {
            tracing::info!(rows = total_rows, "No usable comments, returning empty analysis");
            return Ok(Analysis::empty(params, dropped_rows));
        }

        let normalized: Vec<NormalizedText> = comments
            .par_iter()
            .map(|c| self.normalizer.normalize(&c.raw_text))
            .collect();

        let (embeddings, sentiments) = rayon::join(
            || self.embed_all(&comments, &normalized),
            || self.score_all(&comments, &normalized),
        );
        let embeddings = embeddings?;
        let sentiments = sentiments?;

        let points: Vec<(RecordId, Vec<f32>)> = comments
            .iter()
            .map(|c| c.id)
            .zip(embeddings)
            .collect();
        let outcome = self.clusterer.cluster(&points, params)?;

        let mut records = Vec::with_capacity(comments.len());
        for (((comment, text), (id, embedding)), sentiment) in comments
            .into_iter()
            .zip(normalized)
            .zip(points)
            .zip(sentiments)
        {
            let assignment = outcome
                .assignment(id)
                .ok_or(AnalysisError::Unassigned(id))?;
            records.push(Record::assemble(
                comment.id,
                comment.raw_text,
                comment.date,
                text,
                embedding,
                sentiment,
                assignment,
            ));
        }

        let report = self.reports.assemble(&records);

        tracing::info!(
            rows = total_rows,
            records = records.len(),
            dropped = dropped_rows,
            themes = params.n_themes,
            subthemes = params.n_subthemes,
            "Analysis complete"
        );

        Ok(Analysis {
            params,
            records,
            labels: ThemeLabels::ordinal(params.n_themes, params.n_subthemes),
            themes: outcome.themes,
            report,
            dropped_rows,
        })
    }

    fn embed_all(
        &self,
        comments: &[Comment],
        normalized: &[NormalizedText],
    ) -> AnalysisResult<Vec<Vec<f32>>> {
        comments
            .par_iter()
            .zip(normalized)
            .map(|(comment, text)| {
                self.embedder
                    .embed(&text.lemma_text())
                    .map_err(|source| AnalysisError::Model {
                        stage: Stage::Embedding,
                        record: comment.id,
                        source,
                    })
            })
            .collect()
    }

    fn score_all(
        &self,
        comments: &[Comment],
        normalized: &[NormalizedText],
    ) -> AnalysisResult<Vec<Sentiment>> {
        comments
            .par_iter()
            .zip(normalized)
            .map(|(comment, text)| {
                self.scorer
                    .score(&text.cleaned_text)
                    .map_err(|source| AnalysisError::Model {
                        stage: Stage::Sentiment,
                        record: comment.id,
                        source,
                    })
            })
            .collect()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("embedder", &self.embedder.name())
            .field("scorer", &self.scorer)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashingEmbedder;
    use crate::lemma::LexiconLemmatizer;
    use crate::sentiment::LexiconStarModel;
    use verbatim_core::SentimentLabel;

    fn pipeline() -> Pipeline {
        let normalizer = Normalizer::new(Arc::new(LexiconLemmatizer::builtin())).unwrap();
        Pipeline::new(
            normalizer,
            Arc::new(HashingEmbedder::default()),
            SentimentScorer::new(Arc::new(LexiconStarModel::builtin())),
            PipelineConfig::default(),
        )
    }

    #[test]
    fn blank_rows_are_dropped_and_ids_kept() {
        let rows = vec![
            CommentRow::new(0, "Livraison rapide, très satisfait"),
            CommentRow::new(1, "   "),
            CommentRow::new(2, "Colis cassé, horrible"),
        ];
        let analysis = pipeline()
            .run(rows, ClusterParams::new(2, 1).unwrap())
            .unwrap();

        assert_eq!(analysis.dropped_rows, 1);
        let ids: Vec<RecordId> = analysis.records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![RecordId(0), RecordId(2)]);
        assert_eq!(analysis.records[0].sentiment_label, SentimentLabel::Positive);
        assert_eq!(analysis.records[1].sentiment_label, SentimentLabel::Negative);
        assert_eq!(analysis.report.total_records, 2);
        assert_eq!(analysis.labels.themes.len(), 2);
    }

    #[test]
    fn all_blank_is_empty_analysis() {
        let rows = vec![CommentRow::new(0, ""), CommentRow::new(1, "\t")];
        let analysis = pipeline().run(rows, ClusterParams::default()).unwrap();
        assert!(analysis.records.is_empty());
        assert!(analysis.themes.is_empty());
        assert_eq!(analysis.dropped_rows, 2);
    }

    #[test]
    fn resolve_params_applies_defaults_and_limits() {
        let p = pipeline();
        assert_eq!(p.resolve_params(None, None).unwrap(), ClusterParams::default());
        assert_eq!(
            p.resolve_params(Some(7), None).unwrap(),
            ClusterParams {
                n_themes: 7,
                n_subthemes: 3
            }
        );
        assert!(p.resolve_params(Some(0), None).is_err());
        assert!(p.resolve_params(Some(51), None).is_err());
        assert!(p.resolve_params(None, Some(51)).is_err());
    }

    #[test]
    fn embedding_uses_lemmas() {
        let p = pipeline();
        let analysis = p
            .run(
                vec![CommentRow::new(0, "Les produits sont arrivés")],
                ClusterParams::new(1, 1).unwrap(),
            )
            .unwrap();
        let expected = HashingEmbedder::default().embed("produit arrivés").unwrap();
        assert_eq!(analysis.records[0].embedding, expected);
        assert_eq!(p.embedding_dimension(), expected.len());
    }
}
