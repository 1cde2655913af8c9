// Classification hot path benchmarks
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use spamguard::{
    config::MlConfig,
    ml::{
        fit_artifact, seed::seed_comments, ClassifierEngine, FeatureExtractor, ModelFamily,
        PredictionExplainer, TrainingSample,
    },
    CommentRecord, GLOBAL_SCOPE,
};
use std::sync::Arc;

fn sample_comments(n: usize) -> Vec<CommentRecord> {
    let seeds = seed_comments();
    (0..n).map(|i| seeds[i % seeds.len()].0.clone()).collect()
}

fn seed_samples(extractor: &FeatureExtractor) -> Vec<TrainingSample> {
    seed_comments()
        .into_iter()
        .map(|(comment, label)| {
            TrainingSample::new(extractor.extract(&comment), comment.content, label)
        })
        .collect()
}

fn feature_extraction(c: &mut Criterion) {
    let extractor = FeatureExtractor::default();
    let spam = CommentRecord::new(
        "BUY VIAGRA NOW! Visit http://pills.ru and http://deals.cn <a href='x'>here</a>",
        "SPAMMER99",
        "203.0.113.50",
        1,
    )
    .with_email("promo@tempmail.com");
    let ham = CommentRecord::new(
        "Thanks for the detailed writeup, it answered the question I had about sharding.",
        "Alex",
        "198.51.100.2",
        1,
    )
    .with_user_agent("Mozilla/5.0");

    c.bench_function("extract_spam_comment", |b| {
        b.iter(|| extractor.extract(black_box(&spam)))
    });
    c.bench_function("extract_ham_comment", |b| {
        b.iter(|| extractor.extract(black_box(&ham)))
    });
}

fn batch_extraction(c: &mut Criterion) {
    let extractor = FeatureExtractor::default();
    let mut group = c.benchmark_group("extract_batch");

    for size in [10usize, 100, 1000].iter() {
        let comments = sample_comments(*size);
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &comments, |b, comments| {
            b.iter(|| extractor.extract_batch(black_box(comments)))
        });
    }
    group.finish();
}

fn prediction(c: &mut Criterion) {
    let extractor = FeatureExtractor::default();
    let explainer = PredictionExplainer::new();
    let comment = &sample_comments(1)[0];
    let features = extractor.extract(comment);

    let rules = ClassifierEngine::new(ModelFamily::Tabular);
    c.bench_function("predict_rule_based", |b| {
        b.iter(|| rules.predict(black_box(&features), None))
    });

    let config = MlConfig {
        min_samples_for_retrain: 10,
        ..Default::default()
    };
    let samples = seed_samples(&extractor);
    for family in [ModelFamily::Tabular, ModelFamily::Text] {
        let config = MlConfig {
            model_family: family,
            ..config.clone()
        };
        let engine = ClassifierEngine::new(family);
        if let Ok(artifact) = fit_artifact(&config, GLOBAL_SCOPE, &samples) {
            let _ = engine.activate(Arc::new(artifact));
        }

        c.bench_function(&format!("predict_{}_model", family), |b| {
            b.iter(|| engine.predict(black_box(&features), Some(&comment.content)))
        });
    }

    let result = rules.predict(&features, None);
    c.bench_function("explain_prediction", |b| {
        b.iter(|| explainer.explain_detailed(black_box(&features), black_box(&result)))
    });
}

fn training(c: &mut Criterion) {
    let extractor = FeatureExtractor::default();
    let samples = seed_samples(&extractor);
    let mut group = c.benchmark_group("fit_artifact");
    group.sample_size(10);

    for family in [ModelFamily::Tabular, ModelFamily::Text] {
        let config = MlConfig {
            model_family: family,
            min_samples_for_retrain: 10,
            ..Default::default()
        };
        group.bench_with_input(BenchmarkId::from_parameter(family), &samples, |b, samples| {
            b.iter(|| fit_artifact(&config, GLOBAL_SCOPE, black_box(samples)))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    feature_extraction,
    batch_extraction,
    prediction,
    training
);
criterion_main!(benches);
