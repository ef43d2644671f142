//! History domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::event::ExecutionStatus;
use super::ids::ActionId;

/// A recorded execution, previews already redacted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub action_id: ActionId,
    pub timestamp: DateTime<Utc>,
    /// Wall-clock duration in seconds
    pub duration: f64,
    pub input_preview: String,
    pub output_preview: String,
    pub model_id: String,
    pub status: ExecutionStatus,
}
