//! Hierarchical theme clustering.
//!
//! Two levels of seeded K-Means:
//! 1. All embeddings are grouped into exactly `n_themes` themes
//! 2. The members of each theme are grouped into `n_subthemes` sub-themes,
//!    independently per theme and in parallel
//!
//! A theme with fewer members than `n_subthemes` is not sub-clustered: every
//! member gets sub-theme 0 (the single-group fallback).

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use verbatim_core::types::theme_label;
use verbatim_core::{RecordId, ThemeAssignment};

use crate::error::{AnalysisError, AnalysisResult};
use crate::kmeans::{DEFAULT_SEED, KMeans, KMeansConfig};

/// Default number of themes.
pub const DEFAULT_THEMES: usize = 5;

/// Default number of sub-themes per theme.
pub const DEFAULT_SUBTHEMES: usize = 3;

/// Parameters of one clustering run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterParams {
    pub n_themes: usize,
    pub n_subthemes: usize,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            n_themes: DEFAULT_THEMES,
            n_subthemes: DEFAULT_SUBTHEMES,
        }
    }
}

impl ClusterParams {
    /// Creates parameters, rejecting zero counts.
    pub fn new(n_themes: usize, n_subthemes: usize) -> AnalysisResult<Self> {
        let params = Self {
            n_themes,
            n_subthemes,
        };
        params.validate()?;
        Ok(params)
    }

    /// Checks that both counts are at least one.
    pub fn validate(&self) -> AnalysisResult<()> {
        if self.n_themes == 0 {
            return Err(AnalysisError::InvalidParameter(
                "n_themes must be at least 1".into(),
            ));
        }
        if self.n_subthemes == 0 {
            return Err(AnalysisError::InvalidParameter(
                "n_subthemes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Summary of one theme after clustering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeSummary {
    pub theme_id: usize,
    pub label: String,
    /// Number of records in the theme.
    pub size: usize,
    /// Whether the theme was too small to be sub-clustered.
    pub fallback: bool,
}

/// Result of hierarchical clustering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterOutcome {
    /// Theme and sub-theme of every input record.
    pub assignments: BTreeMap<RecordId, ThemeAssignment>,
    /// One summary per theme id in `[0, n_themes)`, empty themes included.
    pub themes: Vec<ThemeSummary>,
}

impl ClusterOutcome {
    /// Returns true if no record was clustered.
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Assignment of one record.
    pub fn assignment(&self, id: RecordId) -> Option<ThemeAssignment> {
        self.assignments.get(&id).copied()
    }
}

/// Groups embeddings into themes and sub-themes.
#[derive(Debug, Clone)]
pub struct HierarchicalClusterer {
    kmeans: KMeansConfig,
}

impl Default for HierarchicalClusterer {
    fn default() -> Self {
        Self::new(KMeansConfig::default())
    }
}

impl HierarchicalClusterer {
    /// Creates a clusterer. Main and sub-theme runs share the configuration,
    /// seed included.
    pub fn new(kmeans: KMeansConfig) -> Self {
        Self { kmeans }
    }

    /// Creates a clusterer with default settings and the given seed.
    pub fn with_seed(seed: u64) -> Self {
        Self::new(KMeansConfig {
            seed,
            ..KMeansConfig::default()
        })
    }

    /// Seed of both clustering levels.
    pub fn seed(&self) -> u64 {
        self.kmeans.seed
    }

    /// Clusters `records` into themes and sub-themes.
    ///
    /// Every embedding must share one dimension and contain finite values;
    /// vectors are never truncated or padded. Zero records give an empty
    /// outcome without running K-Means.
    pub fn cluster(
        &self,
        records: &[(RecordId, Vec<f32>)],
        params: ClusterParams,
    ) -> AnalysisResult<ClusterOutcome> {
        params.validate()?;

        if records.is_empty() {
            tracing::debug!("No records to cluster");
            return Ok(ClusterOutcome::default());
        }

        validate_embeddings(records)?;

        let points: Vec<Vec<f32>> = records.iter().map(|(_, e)| e.clone()).collect();
        let theme_labels = KMeans::new(params.n_themes, self.kmeans)
            .fit(&points)
            .map(|fit| fit.labels)
            .unwrap_or_default();

        // Member indices of each theme, in input order.
        let mut members: Vec<Vec<usize>> = vec![Vec::new(); params.n_themes];
        for (index, &theme_id) in theme_labels.iter().enumerate() {
            members[theme_id].push(index);
        }

        let sub_labels: Vec<(Vec<usize>, bool)> = members
            .par_iter()
            .map(|indices| self.subcluster(&points, indices, params.n_subthemes))
            .collect();

        let mut assignments = BTreeMap::new();
        let mut themes = Vec::with_capacity(params.n_themes);

        for (theme_id, (indices, (labels, fallback))) in
            members.iter().zip(sub_labels).enumerate()
        {
            for (&index, subtheme_id) in indices.iter().zip(labels) {
                assignments.insert(
                    records[index].0,
                    ThemeAssignment {
                        theme_id,
                        subtheme_id,
                    },
                );
            }
            themes.push(ThemeSummary {
                theme_id,
                label: theme_label(theme_id),
                size: indices.len(),
                fallback,
            });
        }

        tracing::info!(
            records = records.len(),
            themes = params.n_themes,
            subthemes = params.n_subthemes,
            fallback_themes = themes.iter().filter(|t| t.fallback).count(),
            "Clustered records into themes"
        );

        Ok(ClusterOutcome {
            assignments,
            themes,
        })
    }

    /// Sub-theme labels for the members of one theme, plus whether the
    /// single-group fallback applied.
    fn subcluster(
        &self,
        points: &[Vec<f32>],
        indices: &[usize],
        n_subthemes: usize,
    ) -> (Vec<usize>, bool) {
        if indices.len() < n_subthemes {
            return (vec![0; indices.len()], true);
        }

        let theme_points: Vec<Vec<f32>> = indices.iter().map(|&i| points[i].clone()).collect();
        let labels = KMeans::new(n_subthemes, self.kmeans)
            .fit(&theme_points)
            .map(|fit| fit.labels)
            .unwrap_or_else(|| vec![0; indices.len()]);
        (labels, false)
    }
}

/// Checks that every embedding has the first record's dimension and only
/// finite components.
fn validate_embeddings(records: &[(RecordId, Vec<f32>)]) -> AnalysisResult<()> {
    let expected = records.first().map_or(0, |(_, e)| e.len());

    for (id, embedding) in records {
        if embedding.len() != expected {
            return Err(AnalysisError::DimensionMismatch {
                record: *id,
                expected,
                found: embedding.len(),
            });
        }
        if embedding.iter().any(|v| !v.is_finite()) {
            return Err(AnalysisError::NonFiniteEmbedding(*id));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(row: u64, embedding: &[f32]) -> (RecordId, Vec<f32>) {
        (RecordId(row), embedding.to_vec())
    }

    fn two_groups() -> Vec<(RecordId, Vec<f32>)> {
        vec![
            record(0, &[0.0, 0.0]),
            record(1, &[0.1, 0.0]),
            record(2, &[0.0, 0.1]),
            record(3, &[10.0, 10.0]),
            record(4, &[10.1, 10.0]),
            record(5, &[10.0, 10.1]),
        ]
    }

    #[test]
    fn every_record_gets_a_theme() {
        let records = two_groups();
        let outcome = HierarchicalClusterer::default()
            .cluster(&records, ClusterParams::new(2, 2).unwrap())
            .unwrap();

        assert_eq!(outcome.assignments.len(), records.len());
        for (id, _) in &records {
            let assignment = outcome.assignment(*id).unwrap();
            assert!(assignment.theme_id < 2);
            assert!(assignment.subtheme_id < 2);
        }
        assert_eq!(
            outcome.assignment(RecordId(0)).unwrap().theme_id,
            outcome.assignment(RecordId(2)).unwrap().theme_id
        );
        assert_ne!(
            outcome.assignment(RecordId(0)).unwrap().theme_id,
            outcome.assignment(RecordId(3)).unwrap().theme_id
        );
    }

    #[test]
    fn summaries_cover_every_theme() {
        let outcome = HierarchicalClusterer::default()
            .cluster(&two_groups(), ClusterParams::new(2, 2).unwrap())
            .unwrap();

        assert_eq!(outcome.themes.len(), 2);
        assert_eq!(outcome.themes[0].label, "Theme 0");
        assert_eq!(outcome.themes.iter().map(|t| t.size).sum::<usize>(), 6);
        assert!(outcome.themes.iter().all(|t| !t.fallback));
    }

    #[test]
    fn small_theme_falls_back_to_single_group() {
        let records = vec![
            record(0, &[0.0, 0.0]),
            record(1, &[0.1, 0.0]),
            record(2, &[0.2, 0.1]),
            record(3, &[0.1, 0.2]),
            record(4, &[50.0, 50.0]),
        ];
        let outcome = HierarchicalClusterer::default()
            .cluster(&records, ClusterParams::new(2, 3).unwrap())
            .unwrap();

        let lone = outcome.assignment(RecordId(4)).unwrap();
        assert_eq!(lone.subtheme_id, 0);
        assert!(outcome.themes[lone.theme_id].fallback);
        assert_eq!(outcome.themes[lone.theme_id].size, 1);
    }

    #[test]
    fn two_member_theme_falls_back_to_single_group() {
        let records = vec![
            record(0, &[0.0, 0.0]),
            record(1, &[0.1, 0.0]),
            record(2, &[0.2, 0.1]),
            record(3, &[0.1, 0.2]),
            record(4, &[50.0, 50.0]),
            record(5, &[50.1, 50.0]),
        ];
        let outcome = HierarchicalClusterer::default()
            .cluster(&records, ClusterParams::new(2, 3).unwrap())
            .unwrap();

        let pair = outcome.assignment(RecordId(4)).unwrap();
        assert_eq!(outcome.assignment(RecordId(5)).unwrap(), pair);
        assert_eq!(pair.subtheme_id, 0);
        assert_eq!(outcome.themes[pair.theme_id].size, 2);
        assert!(outcome.themes[pair.theme_id].fallback);

        let big = outcome.assignment(RecordId(0)).unwrap().theme_id;
        assert!(!outcome.themes[big].fallback);
    }

    #[test]
    fn more_themes_than_records() {
        let records = vec![record(0, &[0.0]), record(1, &[1.0])];
        let outcome = HierarchicalClusterer::default()
            .cluster(&records, ClusterParams::new(4, 2).unwrap())
            .unwrap();

        assert_eq!(outcome.assignments.len(), 2);
        assert_eq!(outcome.themes.len(), 4);
        assert!(outcome.themes.iter().any(|t| t.size == 0));
    }

    #[test]
    fn empty_input_is_empty_outcome() {
        let outcome = HierarchicalClusterer::default()
            .cluster(&[], ClusterParams::default())
            .unwrap();
        assert!(outcome.is_empty());
        assert!(outcome.themes.is_empty());
    }

    #[test]
    fn deterministic_for_same_input() {
        let clusterer = HierarchicalClusterer::with_seed(7);
        let params = ClusterParams::new(2, 2).unwrap();
        let a = clusterer.cluster(&two_groups(), params).unwrap();
        let b = clusterer.cluster(&two_groups(), params).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let records = vec![record(0, &[0.0, 1.0]), record(1, &[0.0, 1.0, 2.0])];
        let err = HierarchicalClusterer::default()
            .cluster(&records, ClusterParams::default())
            .unwrap_err();

        match err {
            AnalysisError::DimensionMismatch {
                record,
                expected,
                found,
            } => {
                assert_eq!(record, RecordId(1));
                assert_eq!(expected, 2);
                assert_eq!(found, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn nan_is_rejected() {
        let records = vec![record(0, &[0.0]), record(1, &[f32::NAN])];
        let err = HierarchicalClusterer::default()
            .cluster(&records, ClusterParams::default())
            .unwrap_err();
        assert!(matches!(err, AnalysisError::NonFiniteEmbedding(RecordId(1))));
    }

    #[test]
    fn huge_finite_components_are_clustered() {
        let records = vec![
            record(0, &[1e20, 0.0]),
            record(1, &[-1e20, 0.0]),
            record(2, &[0.0, 1e20]),
        ];
        let outcome = HierarchicalClusterer::default()
            .cluster(&records, ClusterParams::new(2, 1).unwrap())
            .unwrap();

        assert_eq!(outcome.assignments.len(), 3);
        assert_eq!(outcome.themes.iter().map(|t| t.size).sum::<usize>(), 3);
    }

    #[test]
    fn zero_counts_are_invalid() {
        assert!(matches!(
            ClusterParams::new(0, 3),
            Err(AnalysisError::InvalidParameter(_))
        ));
        assert!(matches!(
            ClusterParams::new(3, 0),
            Err(AnalysisError::InvalidParameter(_))
        ));
    }

    #[test]
    fn seed_is_shared_by_both_levels() {
        assert_eq!(HierarchicalClusterer::default().seed(), DEFAULT_SEED);
        assert_eq!(HierarchicalClusterer::with_seed(3).seed(), 3);
    }
}
