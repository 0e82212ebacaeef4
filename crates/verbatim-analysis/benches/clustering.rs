//! Clustering Benchmark
//!
//! Measures hierarchical theme clustering and the full pipeline on
//! synthetic comment sets of increasing size.

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use verbatim_analysis::verbatim_core::{CommentRow, EmbeddingProvider, RecordId};
use verbatim_analysis::{
    ClusterParams, HashingEmbedder, HierarchicalClusterer, LexiconLemmatizer, LexiconStarModel,
    Normalizer, Pipeline, PipelineConfig, SentimentScorer,
};

/// Vocabulary for synthetic comments
const WORDS: &[&str] = &[
    "livraison",
    "rapide",
    "colis",
    "cassé",
    "prix",
    "cher",
    "service",
    "client",
    "excellent",
    "retard",
    "qualité",
    "produit",
    "remboursement",
    "application",
    "bug",
    "interface",
    "super",
    "horrible",
    "commande",
    "magasin",
];

/// Generates a synthetic comment of 5-15 words
fn generate_comment(rng: &mut impl Rng) -> String {
    let len = rng.gen_range(5..16);
    (0..len)
        .map(|_| WORDS[rng.gen_range(0..WORDS.len())])
        .collect::<Vec<_>>()
        .join(" ")
}

fn generate_rows(size: usize) -> Vec<CommentRow> {
    let mut rng = StdRng::seed_from_u64(1);
    (0..size)
        .map(|row| CommentRow::new(row, generate_comment(&mut rng)))
        .collect()
}

/// Benchmarks clustering alone on precomputed embeddings
fn clustering_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("hierarchical_clustering");
    let embedder = HashingEmbedder::default();
    let clusterer = HierarchicalClusterer::default();
    let params = ClusterParams::default();

    for size in [100, 1000, 5000] {
        let points: Vec<(RecordId, Vec<f32>)> = generate_rows(size)
            .into_iter()
            .filter_map(|row| {
                let text = row.text?;
                embedder.embed(&text).ok().map(|e| (row.id, e))
            })
            .collect();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("records", size), &points, |b, points| {
            b.iter(|| black_box(clusterer.cluster(points, params).unwrap()))
        });
    }

    group.finish();
}

/// Benchmarks the full pipeline with local models
fn pipeline_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.sample_size(10);

    let normalizer = Normalizer::new(Arc::new(LexiconLemmatizer::builtin())).unwrap();
    let pipeline = Pipeline::new(
        normalizer,
        Arc::new(HashingEmbedder::default()),
        SentimentScorer::new(Arc::new(LexiconStarModel::builtin())),
        PipelineConfig::default(),
    );

    for size in [100, 1000] {
        let rows = generate_rows(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("rows", size), &rows, |b, rows| {
            b.iter(|| black_box(pipeline.run(rows.clone(), ClusterParams::default()).unwrap()))
        });
    }

    group.finish();
}

criterion_group!(benches, clustering_benchmark, pipeline_benchmark);
criterion_main!(benches);
