use crate::models::{FeedbackRecord, Label};
use dashmap::DashMap;
use parking_lot::RwLock;
use uuid::Uuid;

/// Collects label corrections per scope and decides when a retrain is due
#[derive(Debug)]
pub struct FeedbackAccumulator {
    retrain_threshold: usize,
    /// Corrections not yet consumed by a retrain, per scope
    pending: DashMap<String, usize>,
    /// Append-only history
    log: RwLock<Vec<FeedbackRecord>>,
}

impl FeedbackAccumulator {
    pub fn new(retrain_threshold: usize) -> Self {
        Self {
            retrain_threshold: retrain_threshold.max(1),
            pending: DashMap::new(),
            log: RwLock::new(Vec::new()),
        }
    }

    pub fn retrain_threshold(&self) -> usize {
        self.retrain_threshold
    }

    /// Append a correction and report whether the scope is now due
    pub fn record(
        &self,
        comment_id: Uuid,
        old_label: Label,
        corrected_label: Label,
        scope_id: &str,
    ) -> bool {
        self.append(comment_id, old_label, corrected_label, scope_id);
        *self.pending.entry(scope_id.to_string()).or_insert(0) += 1;

        let due = self.should_retrain(scope_id);
        tracing::debug!(
            scope_id = %scope_id,
            %comment_id,
            pending = self.pending(scope_id),
            due,
            "Feedback recorded"
        );
        due
    }

    /// Log a changed verdict on an already counted comment. The pending
    /// counter is left alone.
    pub fn record_revision(
        &self,
        comment_id: Uuid,
        old_label: Label,
        corrected_label: Label,
        scope_id: &str,
    ) {
        self.append(comment_id, old_label, corrected_label, scope_id);
        tracing::debug!(scope_id = %scope_id, %comment_id, "Feedback revised");
    }

    fn append(&self, comment_id: Uuid, old_label: Label, corrected_label: Label, scope_id: &str) {
        self.log.write().push(FeedbackRecord::new(
            comment_id,
            scope_id,
            old_label,
            corrected_label,
        ));
    }

    pub fn should_retrain(&self, scope_id: &str) -> bool {
        self.pending(scope_id) >= self.retrain_threshold
    }

    pub fn pending(&self, scope_id: &str) -> usize {
        self.pending.get(scope_id).map(|c| *c).unwrap_or(0)
    }

    /// Subtract the corrections a successful retrain used, saturating at zero
    pub fn mark_consumed(&self, scope_id: &str, consumed: usize) {
        if let Some(mut counter) = self.pending.get_mut(scope_id) {
            *counter = counter.saturating_sub(consumed);
        }
    }

    /// Scopes at or above the threshold, sorted for stable iteration
    pub fn due_scopes(&self) -> Vec<String> {
        let mut scopes: Vec<String> = self
            .pending
            .iter()
            .filter(|entry| *entry.value() >= self.retrain_threshold)
            .map(|entry| entry.key().clone())
            .collect();
        scopes.sort();
        scopes
    }

    pub fn records_for(&self, scope_id: &str) -> Vec<FeedbackRecord> {
        self.log
            .read()
            .iter()
            .filter(|r| r.scope_id == scope_id)
            .cloned()
            .collect()
    }

    pub fn total_records(&self) -> usize {
        self.log.read().len()
    }
}
