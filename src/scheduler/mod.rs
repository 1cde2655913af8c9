//! Background retraining driven by tokio-cron-scheduler.
//!
//! On every tick the scheduler retrains each scope whose feedback counter
//! reached the retrain threshold, then reloads the global artifact if
//! another process stored a newer one.
//!
//! # Example
//!
//! ```no_run
//! use spamguard::config::{MlConfig, SchedulerConfig};
//! use spamguard::scheduler::RetrainScheduler;
//! use spamguard::{InMemoryModelStore, SpamService};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = Arc::new(SpamService::new(
//!         MlConfig::default(),
//!         Arc::new(InMemoryModelStore::new()),
//!     ));
//!     let config = SchedulerConfig { enabled: true, ..Default::default() };
//!     let mut scheduler = RetrainScheduler::new(config, service).await?;
//!
//!     scheduler.start().await?;
//!     tokio::time::sleep(tokio::time::Duration::from_secs(60)).await;
//!     scheduler.shutdown().await?;
//!     Ok(())
//! }
//! ```

mod core;
mod error;
mod tasks;

pub use core::RetrainScheduler;
pub use error::{SchedulerError, SchedulerResult};
pub use tasks::{retrain_due_scopes, SweepReport};
