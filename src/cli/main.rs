use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use spamguard::{
    config::{Config, StorageBackend},
    ml::seed::seed_comments,
    state::create_store,
    CommentRecord, Label, SpamService, GLOBAL_SCOPE,
};
use std::path::PathBuf;
use validator::Validate;

#[derive(Parser)]
#[command(name = "spamguard-cli")]
#[command(about = "SpamGuard command line tools", long_about = None)]
struct Cli {
    /// Override the model store directory
    #[arg(short, long, env = "SPAMGUARD_STORE")]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a comment read from a JSON file
    Classify {
        #[arg(short, long, value_name = "COMMENT_JSON")]
        file: PathBuf,

        #[arg(short = 'S', long, default_value = GLOBAL_SCOPE)]
        scope: String,
    },

    /// Train and store a new model for a scope
    Train {
        #[arg(short = 'S', long, default_value = GLOBAL_SCOPE)]
        scope: String,

        /// Include the built-in bootstrap corpus
        #[arg(long)]
        seed: bool,

        /// JSON array of comments, each with a `label` of "spam" or "ham"
        #[arg(short, long)]
        data: Option<PathBuf>,
    },

    /// Show model status for a scope
    Stats {
        #[arg(short = 'S', long, default_value = GLOBAL_SCOPE)]
        scope: String,
    },

    /// Print Prometheus metrics collected by this process
    Metrics,
}

#[derive(Deserialize)]
struct LabelledComment {
    #[serde(flatten)]
    comment: CommentRecord,
    label: Label,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spamguard=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(path) = cli.store {
        config.storage.backend = StorageBackend::Sled;
        config.storage.model_storage_location = path;
    }

    match cli.command {
        Commands::Classify { file, scope } => {
            let service = open_service(&config, &scope).await?;

            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let comment: CommentRecord =
                serde_json::from_str(&raw).context("Comment file is not a valid comment")?;
            comment.validate().context("Comment failed validation")?;

            let analysis = service.analyze(&scope, &comment);
            println!("{}", serde_json::to_string_pretty(&analysis)?);
        }

        Commands::Train { scope, seed, data } => {
            let service = open_service(&config, &scope).await?;

            if seed {
                let n = service.import_labelled(&scope, &seed_comments());
                println!("Loaded {} seed comments", n);
            }
            if let Some(path) = data {
                let raw = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                let labelled: Vec<LabelledComment> =
                    serde_json::from_str(&raw).context("Training file is not a labelled comment list")?;
                for (i, entry) in labelled.iter().enumerate() {
                    entry
                        .comment
                        .validate()
                        .with_context(|| format!("Comment {} failed validation", i))?;
                }
                let pairs: Vec<(CommentRecord, Label)> =
                    labelled.into_iter().map(|e| (e.comment, e.label)).collect();
                let n = service.import_labelled(&scope, &pairs);
                println!("Loaded {} labelled comments", n);
            }

            let result = service.retrain(&scope).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
            if !result.success {
                anyhow::bail!("Training did not produce a model");
            }
        }

        Commands::Stats { scope } => {
            let service = open_service(&config, &scope).await?;
            println!("{}", serde_json::to_string_pretty(&service.stats(&scope))?);
            println!("{}", serde_json::to_string_pretty(&service.health())?);
        }

        Commands::Metrics => {
            spamguard::metrics::init_metrics()?;
            print!("{}", spamguard::metrics::gather_metrics());
        }
    }

    Ok(())
}

/// Service over the configured store with the stored models for `scope`
/// and the global scope activated
async fn open_service(config: &Config, scope: &str) -> anyhow::Result<SpamService> {
    let store = create_store(&config.storage)?;
    let service = SpamService::new(config.ml.clone(), store);
    service.initialize().await;
    if scope != GLOBAL_SCOPE {
        service
            .reload_if_newer(scope)
            .await
            .with_context(|| format!("Failed to load model for scope {}", scope))?;
    }
    Ok(service)
}
