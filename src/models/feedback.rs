use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Label;

/// A moderator correction of a previous classification. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedbackRecord {
    pub comment_id: Uuid,
    pub scope_id: String,
    pub old_label: Label,
    pub corrected_label: Label,
    pub recorded_at: DateTime<Utc>,
}

impl FeedbackRecord {
    pub fn new(
        comment_id: Uuid,
        scope_id: impl Into<String>,
        old_label: Label,
        corrected_label: Label,
    ) -> Self {
        Self {
            comment_id,
            scope_id: scope_id.into(),
            old_label,
            corrected_label,
            recorded_at: Utc::now(),
        }
    }

    /// Whether the moderator agreed with the original prediction
    pub fn confirms_prediction(&self) -> bool {
        self.old_label == self.corrected_label
    }
}

/// Lifecycle of an analyzed comment with respect to training
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", content = "label", rename_all = "snake_case")]
pub enum CommentState {
    /// Classified, no feedback yet
    Analyzed(Label),
    /// A corrected label has been recorded
    FeedbackReceived(Label),
    /// Feedback pushed the scope over its retrain threshold
    RetrainQueued,
    /// Feedback recorded, threshold not reached
    Idle,
    /// Used by a successful retrain
    Consumed,
}

impl CommentState {
    /// Transition after feedback, given whether a retrain is now due
    pub fn after_feedback(self, queued: bool) -> Self {
        match self {
            CommentState::Consumed => CommentState::Consumed,
            _ if queued => CommentState::RetrainQueued,
            _ => CommentState::Idle,
        }
    }

    pub fn is_consumed(&self) -> bool {
        matches!(self, CommentState::Consumed)
    }
}
