//! Connection domain types
//!
//! A connection binds a provider and model to a set of capabilities. It only
//! references its secret; the secret value lives in the secret store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::capability::Capability;
use super::ids::{ConnectionId, ProviderId};

/// Where the model list entry for a connection came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelSource {
    #[default]
    Curated,
    Custom,
}

/// Configured binding to a provider/model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ConnectionRecord")]
pub struct Connection {
    pub connection_id: ConnectionId,
    pub provider_id: ProviderId,
    pub capabilities: Vec<Capability>,
    pub model_id: String,
    pub model_source: ModelSource,

    /// Overrides the provider's default endpoint
    pub endpoint_url: Option<String>,
    pub deployment_alias: Option<String>,
    pub system_prompt: Option<String>,
    pub transcription_hint: Option<String>,

    // Health-check bookkeeping, not used by the pipeline
    pub is_healthy: bool,
    pub last_health_check: Option<DateTime<Utc>>,

    /// Reference to the secret store entry, never the secret itself
    pub secret_ref: Option<String>,
}

impl Connection {
    pub fn new(
        provider_id: impl Into<ProviderId>,
        model_id: impl Into<String>,
        capabilities: Vec<Capability>,
    ) -> Self {
        Self {
            connection_id: ConnectionId::generate(),
            provider_id: provider_id.into(),
            capabilities,
            model_id: model_id.into(),
            model_source: ModelSource::default(),
            endpoint_url: None,
            deployment_alias: None,
            system_prompt: None,
            transcription_hint: None,
            is_healthy: false,
            last_health_check: None,
            secret_ref: None,
        }
    }

    pub fn with_id(mut self, connection_id: impl Into<ConnectionId>) -> Self {
        self.connection_id = connection_id.into();
        self
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}

/// Capabilities as stored by any schema version: a list or a bare string
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredCapabilities {
    List(Vec<String>),
    Single(String),
}

/// On-disk shape of a connection, tolerant of older schemas
#[derive(Debug, Deserialize)]
struct ConnectionRecord {
    #[serde(default = "ConnectionId::generate")]
    connection_id: ConnectionId,
    provider_id: ProviderId,
    #[serde(default)]
    capabilities: Option<StoredCapabilities>,
    /// Older schemas recorded a single capability
    #[serde(default)]
    capability: Option<String>,
    #[serde(default)]
    model_id: String,
    #[serde(default)]
    model_source: ModelSource,
    #[serde(default)]
    endpoint_url: Option<String>,
    /// Older alias of `endpoint_url`
    #[serde(default)]
    endpoint: Option<String>,
    #[serde(default)]
    deployment_alias: Option<String>,
    #[serde(default)]
    system_prompt: Option<String>,
    #[serde(default)]
    transcription_hint: Option<String>,
    #[serde(default)]
    is_healthy: bool,
    #[serde(default)]
    last_health_check: Option<DateTime<Utc>>,
    #[serde(default)]
    secret_ref: Option<String>,
}

impl From<ConnectionRecord> for Connection {
    fn from(record: ConnectionRecord) -> Self {
        let raw = match (record.capabilities, record.capability) {
            (Some(StoredCapabilities::List(list)), _) => list,
            (Some(StoredCapabilities::Single(one)), _) => vec![one],
            (None, Some(one)) => vec![one],
            (None, None) => vec![Capability::Llm.to_string()],
        };

        let mut capabilities = Vec::with_capacity(raw.len());
        for name in raw {
            match name.parse::<Capability>() {
                Ok(capability) if !capabilities.contains(&capability) => {
                    capabilities.push(capability)
                }
                Ok(_) => {}
                Err(e) => warn!(
                    "Ignoring capability on connection {}: {}",
                    record.connection_id, e
                ),
            }
        }

        Self {
            connection_id: record.connection_id,
            provider_id: record.provider_id,
            capabilities,
            model_id: record.model_id,
            model_source: record.model_source,
            endpoint_url: record.endpoint_url.or(record.endpoint),
            deployment_alias: record.deployment_alias,
            system_prompt: record.system_prompt,
            transcription_hint: record.transcription_hint,
            is_healthy: record.is_healthy,
            last_health_check: record.last_health_check,
            secret_ref: record.secret_ref,
        }
    }
}
