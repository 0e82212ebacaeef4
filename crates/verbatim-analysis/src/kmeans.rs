//! Seeded K-Means clustering.
//!
//! Lloyd's algorithm with k-means++ initialization. All randomness comes
//! from a `StdRng` seeded with [`KMeansConfig::seed`], so identical input in
//! identical order always yields identical labels.
//!
//! ## Algorithm
//!
//! 1. Pick the first centroid uniformly, then each next centroid with
//!    probability proportional to its squared distance to the closest
//!    centroid chosen so far (k-means++)
//! 2. Assign each point to its nearest centroid (lowest index wins ties)
//! 3. Move each centroid to the mean of its points; an empty cluster keeps
//!    its previous centroid
//! 4. Stop when no centroid moves more than `tolerance`, or after `max_iter`
//!
//! Steps 1-4 are repeated `n_init` times with different draws from the same
//! seeded generator; the run with the lowest inertia wins (earliest on ties).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Default seed, shared by main and sub-theme clustering.
pub const DEFAULT_SEED: u64 = 42;

/// Default number of restarts.
pub const DEFAULT_N_INIT: usize = 10;

/// Default iteration cap per restart.
pub const DEFAULT_MAX_ITER: usize = 300;

/// Default centroid movement tolerance.
pub const DEFAULT_TOLERANCE: f32 = 1e-4;

/// Configuration for [`KMeans`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KMeansConfig {
    /// Seed of the random generator.
    pub seed: u64,
    /// Number of independent restarts.
    pub n_init: usize,
    /// Maximum Lloyd iterations per restart.
    pub max_iter: usize,
    /// Convergence threshold on centroid movement (Euclidean).
    pub tolerance: f32,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            n_init: DEFAULT_N_INIT,
            max_iter: DEFAULT_MAX_ITER,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

/// Result of a K-Means fit.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansFit {
    /// Cluster of each input point, in `[0, k)`.
    pub labels: Vec<usize>,
    /// Final centroids, `k` rows.
    pub centroids: Vec<Vec<f32>>,
    /// Sum of squared distances of points to their centroid.
    pub inertia: f64,
    /// Lloyd iterations of the winning restart.
    pub n_iter: usize,
}

impl KMeansFit {
    /// Number of points in each cluster.
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.centroids.len()];
        for &label in &self.labels {
            sizes[label] += 1;
        }
        sizes
    }
}

/// K-Means over dense row vectors.
///
/// # Example
///
/// ```
/// use verbatim_analysis::kmeans::{KMeans, KMeansConfig};
///
/// let points = vec![
///     vec![0.0, 0.0],
///     vec![0.1, 0.0],
///     vec![5.0, 5.0],
///     vec![5.1, 5.0],
/// ];
/// let fit = KMeans::new(2, KMeansConfig::default()).fit(&points).unwrap();
/// assert_eq!(fit.labels[0], fit.labels[1]);
/// assert_ne!(fit.labels[0], fit.labels[2]);
/// ```
#[derive(Debug, Clone)]
pub struct KMeans {
    k: usize,
    config: KMeansConfig,
}

impl KMeans {
    /// Creates a K-Means model with `k` clusters.
    pub fn new(k: usize, config: KMeansConfig) -> Self {
        Self { k, config }
    }

    /// Number of clusters.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Fits the model.
    ///
    /// Returns `None` when there are no points or `k == 0`. Rows are assumed
    /// to share one dimension; callers validate that beforehand.
    ///
    /// With fewer distinct points than `k`, the surplus centroids duplicate
    /// chosen points and stay empty.
    pub fn fit(&self, points: &[Vec<f32>]) -> Option<KMeansFit> {
        if points.is_empty() || self.k == 0 {
            return None;
        }

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut best: Option<KMeansFit> = None;

        for _ in 0..self.config.n_init.max(1) {
            let centroids = self.init_centroids(points, &mut rng);
            let fit = self.lloyd(points, centroids);

            let better = match &best {
                Some(current) => fit.inertia < current.inertia,
                None => true,
            };
            if better {
                best = Some(fit);
            }
        }

        best
    }

    /// k-means++ seeding.
    fn init_centroids(&self, points: &[Vec<f32>], rng: &mut StdRng) -> Vec<Vec<f32>> {
        let n = points.len();
        let mut centroids = Vec::with_capacity(self.k);

        let first = rng.gen_range(0..n);
        centroids.push(points[first].clone());

        let mut min_distances: Vec<f64> = points
            .iter()
            .map(|p| squared_distance(p, &centroids[0]))
            .collect();

        while centroids.len() < self.k {
            let total: f64 = min_distances.iter().sum();

            let chosen = if total.is_finite() && total > 0.0 {
                let target = rng.gen_range(0.0..total);
                let mut cumulative = 0.0;
                let mut chosen = n - 1;
                for (i, &d) in min_distances.iter().enumerate() {
                    cumulative += d;
                    if cumulative > target && d > 0.0 {
                        chosen = i;
                        break;
                    }
                }
                chosen
            } else {
                // Every point already coincides with a centroid, or the
                // distances are too large to sample from.
                first
            };

            let centroid = points[chosen].clone();
            for (d, p) in min_distances.iter_mut().zip(points) {
                let dist = squared_distance(p, &centroid);
                if dist < *d {
                    *d = dist;
                }
            }
            centroids.push(centroid);
        }

        centroids
    }

    /// Lloyd iterations from the given centroids.
    fn lloyd(&self, points: &[Vec<f32>], mut centroids: Vec<Vec<f32>>) -> KMeansFit {
        let mut labels = assign_labels(points, &centroids);
        let mut n_iter = 0;

        let tolerance = f64::from(self.config.tolerance);
        for iter in 0..self.config.max_iter {
            let updated = update_centroids(points, &labels, &centroids);
            let converged = centroids
                .iter()
                .zip(&updated)
                .all(|(old, new)| squared_distance(old, new) <= tolerance * tolerance);

            centroids = updated;
            labels = assign_labels(points, &centroids);
            n_iter = iter + 1;

            if converged {
                break;
            }
        }

        let inertia = points
            .iter()
            .zip(&labels)
            .map(|(p, &label)| squared_distance(p, &centroids[label]))
            .sum();

        KMeansFit {
            labels,
            centroids,
            inertia,
            n_iter,
        }
    }
}

/// Squared Euclidean distance, accumulated in `f64` so finite `f32`
/// components never overflow.
pub fn squared_distance(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = f64::from(x) - f64::from(y);
            d * d
        })
        .sum()
}

/// Index of the nearest centroid for every point; ties go to the lowest index.
fn assign_labels(points: &[Vec<f32>], centroids: &[Vec<f32>]) -> Vec<usize> {
    points
        .iter()
        .map(|p| {
            let mut best = 0;
            let mut best_dist = f64::INFINITY;
            for (k, c) in centroids.iter().enumerate() {
                let dist = squared_distance(p, c);
                if dist < best_dist {
                    best_dist = dist;
                    best = k;
                }
            }
            best
        })
        .collect()
}

/// Mean of the points of each cluster; empty clusters keep their centroid.
fn update_centroids(
    points: &[Vec<f32>],
    labels: &[usize],
    previous: &[Vec<f32>],
) -> Vec<Vec<f32>> {
    let dim = previous.first().map_or(0, Vec::len);
    let mut sums = vec![vec![0.0f64; dim]; previous.len()];
    let mut counts = vec![0usize; previous.len()];

    for (p, &label) in points.iter().zip(labels) {
        counts[label] += 1;
        for (s, &v) in sums[label].iter_mut().zip(p) {
            *s += f64::from(v);
        }
    }

    sums.into_iter()
        .zip(counts)
        .zip(previous)
        .map(|((sum, count), prev)| {
            if count == 0 {
                prev.clone()
            } else {
                sum.into_iter().map(|s| (s / count as f64) as f32).collect()
            }
        })
        .collect()
}
