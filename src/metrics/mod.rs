//! Prometheus metrics for the classification engine.
//!
//! Metrics are created eagerly and updated from the hot path regardless of
//! registration; `init_metrics` only attaches them to the exported registry.
//!
//! # Example
//! ```no_run
//! use spamguard::metrics::{init_metrics, gather_metrics};
//!
//! init_metrics().expect("metrics registration");
//! println!("{}", gather_metrics());
//! ```

use lazy_static::lazy_static;
use prometheus::{
    core::Collector, CounterVec, Histogram, HistogramOpts, IntCounter, Opts, Registry,
};

const NAMESPACE: &str = "spamguard";

lazy_static! {
    /// Registry exported by `gather_metrics`
    pub static ref PROMETHEUS_REGISTRY: Registry = Registry::new();

    /// Classifications served
    ///
    /// Labels: mode, label
    pub static ref PREDICTIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("predictions_total", "Total number of comment classifications")
            .namespace(NAMESPACE),
        &["mode", "label"]
    ).expect("Failed to create PREDICTIONS_TOTAL metric");

    /// Model inferences that degraded to the rule-based path
    pub static ref INFERENCE_FALLBACKS_TOTAL: IntCounter = IntCounter::with_opts(
        Opts::new(
            "inference_fallbacks_total",
            "Model inference failures recovered by rule-based scoring"
        )
        .namespace(NAMESPACE)
    ).expect("Failed to create INFERENCE_FALLBACKS_TOTAL metric");

    /// Training runs by outcome
    ///
    /// Labels: outcome (success, insufficient_data, single_class, store_error, error)
    pub static ref TRAINING_RUNS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("training_runs_total", "Total number of training runs")
            .namespace(NAMESPACE),
        &["outcome"]
    ).expect("Failed to create TRAINING_RUNS_TOTAL metric");

    /// Moderator feedback received
    ///
    /// Labels: scope_kind (global, site)
    pub static ref FEEDBACK_TOTAL: CounterVec = CounterVec::new(
        Opts::new("feedback_total", "Total number of feedback corrections")
            .namespace(NAMESPACE),
        &["scope_kind"]
    ).expect("Failed to create FEEDBACK_TOTAL metric");

    /// Time spent inside `ClassifierEngine::predict`
    pub static ref PREDICTION_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "prediction_duration_seconds",
            "Comment classification latency in seconds"
        )
        .namespace(NAMESPACE)
        .buckets(vec![0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1])
    ).expect("Failed to create PREDICTION_DURATION metric");
}

fn register<C>(collector: C) -> Result<(), prometheus::Error>
where
    C: Collector + 'static,
{
    match PROMETHEUS_REGISTRY.register(Box::new(collector)) {
        Ok(()) | Err(prometheus::Error::AlreadyReg) => Ok(()),
        Err(e) => Err(e),
    }
}

/// Register all metrics with the exported registry. Safe to call twice.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    register(PREDICTIONS_TOTAL.clone())?;
    register(INFERENCE_FALLBACKS_TOTAL.clone())?;
    register(TRAINING_RUNS_TOTAL.clone())?;
    register(FEEDBACK_TOTAL.clone())?;
    register(PREDICTION_DURATION.clone())?;

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Render the registry in the Prometheus text format
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = PROMETHEUS_REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Metrics output was not UTF-8: {}", e);
        String::from("# Error encoding metrics\n")
    })
}

/// Label value for the feedback counter
pub fn scope_kind(scope_id: &str) -> &'static str {
    if scope_id == crate::GLOBAL_SCOPE {
        "global"
    } else {
        "site"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_metrics().unwrap();
        init_metrics().unwrap();
    }

    #[test]
    fn test_gather_contains_namespace() {
        init_metrics().unwrap();
        TRAINING_RUNS_TOTAL.with_label_values(&["success"]).inc();
        let output = gather_metrics();
        assert!(output.contains("spamguard_training_runs_total"));
    }

    #[test]
    fn test_scope_kind() {
        assert_eq!(scope_kind("global"), "global");
        assert_eq!(scope_kind("site-42"), "site");
    }
}
