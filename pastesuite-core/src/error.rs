//! Pipeline error types
//!
//! Every validation failure carries a category for programmatic handling and
//! a human-readable message for display.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::ids::{ConnectionId, ProviderId};

/// Result type alias for pipeline operations
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// A required capture (e.g. clipboard image) was unavailable
    MissingInput,
    /// No connection or binding is configured
    MissingConfig,
    /// The connection lacks a capability the action requires
    CapabilityMismatch,
    /// No secret for a provider that requires authentication
    AuthMissing,
    /// Raised by a provider while streaming
    ProviderError,
    Unknown,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::MissingInput => "missing_input",
            ErrorCategory::MissingConfig => "missing_config",
            ErrorCategory::CapabilityMismatch => "capability_mismatch",
            ErrorCategory::AuthMissing => "auth_missing",
            ErrorCategory::ProviderError => "provider_error",
            ErrorCategory::Unknown => "unknown",
        }
    }

    /// True for failures caused by the caller's input or configuration
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ErrorCategory::ProviderError | ErrorCategory::Unknown)
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured error produced by pipeline validation
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{category}: {message}")]
pub struct PipelineError {
    pub category: ErrorCategory,
    pub message: String,
    pub connection_id: Option<ConnectionId>,
    pub provider_id: Option<ProviderId>,
}

impl PipelineError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            connection_id: None,
            provider_id: None,
        }
    }

    pub fn missing_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::MissingInput, message)
    }

    pub fn missing_config(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::MissingConfig, message)
    }

    pub fn capability_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::CapabilityMismatch, message)
    }

    pub fn auth_missing(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::AuthMissing, message)
    }

    pub fn with_connection(mut self, connection_id: ConnectionId) -> Self {
        self.connection_id = Some(connection_id);
        self
    }

    pub fn with_provider(mut self, provider_id: ProviderId) -> Self {
        self.provider_id = Some(provider_id);
        self
    }
}
