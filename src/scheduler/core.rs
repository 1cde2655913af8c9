//! Cron-driven retrain scheduler

use super::error::{SchedulerError, SchedulerResult};
use super::tasks::retrain_due_scopes;
use crate::config::SchedulerConfig;
use crate::ml::SpamService;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use tracing::{debug, info, warn};

/// Periodically retrains due scopes in the background
pub struct RetrainScheduler {
    config: SchedulerConfig,
    scheduler: JobScheduler,
    service: Arc<SpamService>,
    running: bool,
}

impl RetrainScheduler {
    pub async fn new(config: SchedulerConfig, service: Arc<SpamService>) -> SchedulerResult<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| SchedulerError::StartupFailed(e.to_string()))?;

        Ok(Self {
            config,
            scheduler,
            service,
            running: false,
        })
    }

    /// Register the sweep job and start ticking. No-op when disabled.
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if !self.config.enabled {
            info!("Retrain scheduler is disabled in configuration");
            return Ok(());
        }
        if self.running {
            warn!("Retrain scheduler is already running");
            return Ok(());
        }

        let service = self.service.clone();
        let job = Job::new_async(self.config.retrain_cron.as_str(), move |_uuid, _l| {
            let service = service.clone();
            Box::pin(async move {
                let start = std::time::Instant::now();
                let report = retrain_due_scopes(&service).await;
                debug!(
                    retrained = report.retrained.len(),
                    failed = report.failed.len(),
                    reloaded_global = report.reloaded_global,
                    duration_ms = start.elapsed().as_millis(),
                    "Retrain sweep finished"
                );
            })
        })
        .map_err(|e: JobSchedulerError| SchedulerError::JobCreationFailed(e.to_string()))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| SchedulerError::JobCreationFailed(e.to_string()))?;
        self.scheduler
            .start()
            .await
            .map_err(|e| SchedulerError::StartupFailed(e.to_string()))?;

        self.running = true;
        info!(cron = %self.config.retrain_cron, "Retrain scheduler started");
        Ok(())
    }

    pub async fn shutdown(&mut self) -> SchedulerResult<()> {
        if !self.running {
            return Ok(());
        }

        self.scheduler
            .shutdown()
            .await
            .map_err(|e| SchedulerError::ShutdownFailed(e.to_string()))?;
        self.running = false;

        info!("Retrain scheduler shut down");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}
