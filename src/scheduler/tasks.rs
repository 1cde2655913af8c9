//! Work performed on each scheduler tick

use crate::ml::SpamService;
use crate::GLOBAL_SCOPE;
use serde::Serialize;
use tracing::{debug, info, warn};

/// What one sweep did
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    /// Scopes that were due and retrained successfully
    pub retrained: Vec<String>,
    /// Scopes that were due but whose retrain was refused or failed
    pub failed: Vec<String>,
    /// A newer global artifact was picked up from the store
    pub reloaded_global: bool,
}

/// Retrain every scope whose feedback counter reached the threshold, then
/// pick up a newer global artifact written by another process.
pub async fn retrain_due_scopes(service: &SpamService) -> SweepReport {
    let mut report = SweepReport::default();

    let due = service.due_scopes();
    if due.is_empty() {
        debug!("No scopes due for retraining");
    }

    for scope_id in due {
        let result = service.retrain(&scope_id).await;
        if result.success {
            info!(scope_id = %scope_id, version = ?result.version, "Scheduled retrain finished");
            report.retrained.push(scope_id);
        } else {
            warn!(scope_id = %scope_id, reason = %result.message, "Scheduled retrain did not produce a model");
            report.failed.push(scope_id);
        }
    }

    match service.reload_if_newer(GLOBAL_SCOPE).await {
        Ok(reloaded) => report.reloaded_global = reloaded,
        Err(e) => warn!(error = %e, "Failed to check for a newer global model"),
    }

    report
}
