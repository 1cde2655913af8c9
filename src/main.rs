use spamguard::{
    config::Config,
    scheduler::RetrainScheduler,
    state::create_store,
    SpamService, GLOBAL_SCOPE,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Using default configuration");
        Config::default()
    });

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("spamguard={}", config.observability.log_level).into()
    });
    let registry = tracing_subscriber::registry().with(filter);
    if config.observability.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting SpamGuard v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Model family: {}", config.ml.model_family);

    // Initialize Prometheus metrics
    if config.observability.prometheus_enabled {
        if let Err(e) = spamguard::metrics::init_metrics() {
            tracing::warn!("Failed to initialize metrics: {}", e);
            tracing::warn!("Continuing without metrics");
        } else {
            tracing::info!("✅ Prometheus metrics initialized");
        }
    } else {
        tracing::info!("⚠️  Prometheus metrics disabled in configuration");
    }

    // Initialize storage backend
    tracing::info!("Storage backend: {:?}", config.storage.backend);
    let store = create_store(&config.storage)?;
    tracing::info!("✅ Model store initialized");

    let service = Arc::new(SpamService::new(config.ml.clone(), store));
    service.initialize().await;

    // Bootstrap the global model from the built-in corpus
    if !service.engines().engine_for(GLOBAL_SCOPE).has_model() {
        let seeded = service.seed_global();
        let result = service.retrain(GLOBAL_SCOPE).await;
        if result.success {
            tracing::info!("✅ Global model bootstrapped from {} seed comments", seeded);
        } else {
            tracing::warn!("⚠️  Global model not bootstrapped: {}", result.message);
            tracing::warn!("   Serving rule-based classification until enough feedback arrives");
        }
    }

    let mut scheduler = RetrainScheduler::new(config.scheduler.clone(), service.clone()).await?;
    scheduler.start().await?;

    let health = service.health();
    tracing::info!(
        model_status = %health.model_status,
        active_version = ?health.active_version,
        "🚀 SpamGuard ready"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    scheduler.shutdown().await?;
    tracing::info!("SpamGuard stopped");
    Ok(())
}
