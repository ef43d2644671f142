//! Domain events
//!
//! Events decouple side effects (history, hotkey re-registration, settings
//! persistence) from the code that triggers them. They are immutable and
//! fire-and-forget.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use super::ids::{ActionId, ConnectionId};

/// Final status of an execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Success,
    Error,
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionStatus::Success => write!(f, "success"),
            ExecutionStatus::Error => write!(f, "error"),
        }
    }
}

/// Payload of [`DomainEvent::ExecutionCompleted`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionCompleted {
    pub action_id: ActionId,
    /// Empty for executions that never touched a connection
    pub connection_id: ConnectionId,
    pub model_id: String,
    pub duration: Duration,
    /// Redacted prefix of the substituted prompt
    pub input_preview: String,
    /// Redacted prefix of the accumulated response
    pub output_preview: String,
    pub status: ExecutionStatus,
}

/// Event variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    ExecutionCompleted(ExecutionCompleted),
    ActionChanged,
    ConnectionChanged { connection_id: ConnectionId },
    SettingsChanged,
}

/// Variant discriminant used as the event bus subscription key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ExecutionCompleted,
    ActionChanged,
    ConnectionChanged,
    SettingsChanged,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A timestamped domain event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

impl DomainEvent {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            timestamp: Utc::now(),
            payload,
        }
    }

    pub fn execution_completed(completed: ExecutionCompleted) -> Self {
        Self::new(EventPayload::ExecutionCompleted(completed))
    }

    pub fn action_changed() -> Self {
        Self::new(EventPayload::ActionChanged)
    }

    pub fn connection_changed(connection_id: ConnectionId) -> Self {
        Self::new(EventPayload::ConnectionChanged { connection_id })
    }

    pub fn settings_changed() -> Self {
        Self::new(EventPayload::SettingsChanged)
    }

    pub fn kind(&self) -> EventKind {
        match self.payload {
            EventPayload::ExecutionCompleted(_) => EventKind::ExecutionCompleted,
            EventPayload::ActionChanged => EventKind::ActionChanged,
            EventPayload::ConnectionChanged { .. } => EventKind::ConnectionChanged,
            EventPayload::SettingsChanged => EventKind::SettingsChanged,
        }
    }

    /// Returns the execution payload if this is an `ExecutionCompleted` event
    pub fn as_execution_completed(&self) -> Option<&ExecutionCompleted> {
        match &self.payload {
            EventPayload::ExecutionCompleted(completed) => Some(completed),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_payload() {
        assert_eq!(DomainEvent::action_changed().kind(), EventKind::ActionChanged);
        assert_eq!(DomainEvent::settings_changed().kind(), EventKind::SettingsChanged);
        assert_eq!(
            DomainEvent::connection_changed(ConnectionId::new("c1")).kind(),
            EventKind::ConnectionChanged
        );
        assert!(DomainEvent::action_changed().as_execution_completed().is_none());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ExecutionStatus::Error).unwrap(),
            "\"error\""
        );
        assert_eq!(ExecutionStatus::Success.to_string(), "success");
    }
}
