//! Action domain types
//!
//! An action is a unit of work bound to a trigger (chord panel entry or
//! direct hotkey). Actions are read-only to the execution pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::capability::{Capability, CapabilityRequirement, InputRequirement};
use super::ids::{ActionId, ConnectionId};

/// Whether an action ships with the application or was created by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    #[serde(rename = "builtin")]
    BuiltIn,
    #[serde(rename = "custom")]
    UserDefined,
}

/// How an action produces its output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionMode {
    AiTransform,
    LocalTransform,
    #[serde(alias = "static_paste")]
    StaticTextPaste,
    PromptPrefillOnly,
}

impl ActionMode {
    /// Modes that are resolved locally and never reach a provider
    pub fn is_local(&self) -> bool {
        !matches!(self, ActionMode::AiTransform)
    }
}

/// Kind of local text transform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocalTransformKind {
    /// Replace every match of the pattern
    #[default]
    Regex,
    /// Replace the first match on each line, like `s/pattern/replacement/`
    Sed,
}

/// Pattern/replacement transform applied without any provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalTransformConfig {
    #[serde(rename = "type", default)]
    pub kind: LocalTransformKind,
    pub pattern: String,
    pub replacement: String,
}

/// Action definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub id: ActionId,
    pub kind: ActionKind,
    pub mode: ActionMode,

    /// UI text catalog key for the display name
    #[serde(default)]
    pub display_key: String,
    #[serde(default)]
    pub description_key: String,
    #[serde(default)]
    pub icon: Option<String>,

    #[serde(default)]
    pub enabled: bool,
    /// Ordering within the selection panel
    #[serde(default)]
    pub sequence: u32,

    /// Direct hotkey binding, e.g. `Ctrl+Alt+T`
    #[serde(default)]
    pub direct_hotkey: Option<String>,
    #[serde(default)]
    pub panel_quick_key: Option<u8>,

    #[serde(default)]
    pub capability_requirements: Vec<CapabilityRequirement>,
    #[serde(default)]
    pub input_requirements: Vec<InputRequirement>,

    /// Connection this action is bound to; falls back to the routing default
    #[serde(default, alias = "llm_connection_id")]
    pub connection_id: Option<ConnectionId>,
    #[serde(default)]
    pub stt_connection_id: Option<ConnectionId>,

    #[serde(default)]
    pub prompt_template: Option<String>,
    #[serde(default)]
    pub static_text_template: Option<String>,
    #[serde(default)]
    pub local_transform_config: Option<LocalTransformConfig>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Action {
    /// Creates a disabled action with no requirements or bindings
    pub fn new(id: impl Into<ActionId>, kind: ActionKind, mode: ActionMode) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            kind,
            mode,
            display_key: String::new(),
            description_key: String::new(),
            icon: None,
            enabled: false,
            sequence: 0,
            direct_hotkey: None,
            panel_quick_key: None,
            capability_requirements: Vec::new(),
            input_requirements: Vec::new(),
            connection_id: None,
            stt_connection_id: None,
            prompt_template: None,
            static_text_template: None,
            local_transform_config: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true if the action lists `capability` among its requirements
    pub fn requires(&self, capability: Capability) -> bool {
        self.capability_requirements
            .iter()
            .any(|r| r.capability == capability)
    }

    /// The capability used to pick a default connection.
    ///
    /// First declared requirement, or `llm` when the action declares none.
    pub fn primary_capability(&self) -> Capability {
        self.capability_requirements
            .first()
            .map(|r| r.capability)
            .unwrap_or(Capability::Llm)
    }

    /// Direct hotkey binding if the action is enabled and bound
    pub fn active_hotkey(&self) -> Option<&str> {
        if !self.enabled {
            return None;
        }
        self.direct_hotkey
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
    }
}
