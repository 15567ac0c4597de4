use chrono::Utc;
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use synapse_core::{PatternType, PredictionConfig, TemporalPattern};
use synapse_learn::{LensMatches, Predictor};

fn rows(pattern_type: PatternType, slot: &str, categories: usize) -> Vec<TemporalPattern> {
    let now = Utc::now();
    (0..categories)
        .map(|i| TemporalPattern {
            pattern_type,
            time_slot: slot.to_string(),
            category: format!("W{}+W{}", i, i + 1),
            frequency: 1.0 / (i + 1) as f64,
            sample_count: 10,
            updated_at: now,
        })
        .collect()
}

fn bench_rank_all_lenses(c: &mut Criterion) {
    let config = PredictionConfig::default();
    let matches = LensMatches {
        hourly: rows(PatternType::Hourly, "9", 12),
        daily: rows(PatternType::Daily, "0", 12),
        sequential: rows(PatternType::Sequential, "W0+W1", 12),
        external: rows(PatternType::External, "external", 4),
    };

    c.bench_function("rank_4_lenses_40_rows", |b| {
        b.iter(|| Predictor::rank(&config, black_box(&matches)));
    });
}

fn bench_rank_single_lens(c: &mut Criterion) {
    let config = PredictionConfig::default();
    let matches = LensMatches {
        hourly: rows(PatternType::Hourly, "9", 3),
        ..LensMatches::default()
    };

    c.bench_function("rank_hourly_only", |b| {
        b.iter(|| Predictor::rank(&config, black_box(&matches)));
    });
}

criterion_group!(benches, bench_rank_all_lenses, bench_rank_single_lens);
criterion_main!(benches);
