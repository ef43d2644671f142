//! Application settings
//!
//! Settings are stored as a single JSON document. Connections live here as
//! metadata only; secrets are kept in the secret store.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use super::capability::Capability;
use super::connection::Connection;
use super::ids::{ConnectionId, ProviderId};

pub const DEFAULT_CHORD: &str = "Ctrl+V,V";
pub const DEFAULT_CHORD_TIMEOUT_MS: u64 = 500;
pub const DEFAULT_OCR_PROVIDER: &str = "tesseract";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MainTriggerConfig {
    /// Chord opening the selection panel, e.g. `Ctrl+V,V`
    pub chord: String,
    /// Maximum delay between the two chord key presses
    pub second_v_timeout_ms: u64,
}

impl Default for MainTriggerConfig {
    fn default() -> Self {
        Self {
            chord: DEFAULT_CHORD.to_string(),
            second_v_timeout_ms: DEFAULT_CHORD_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HotkeysConfig {
    pub main_trigger: MainTriggerConfig,
}

/// System-wide default connection per capability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingDefaults {
    pub default_llm_connection_id: Option<ConnectionId>,
    pub default_stt_connection_id: Option<ConnectionId>,
    pub default_ocr_connection_id: Option<ConnectionId>,
    /// Provider used to read text out of clipboard images
    pub ocr_provider_id: ProviderId,
}

impl Default for RoutingDefaults {
    fn default() -> Self {
        Self {
            default_llm_connection_id: None,
            default_stt_connection_id: None,
            default_ocr_connection_id: None,
            ocr_provider_id: ProviderId::new(DEFAULT_OCR_PROVIDER),
        }
    }
}

impl RoutingDefaults {
    pub fn default_connection_for(&self, capability: Capability) -> Option<&ConnectionId> {
        let id = match capability {
            Capability::Llm => self.default_llm_connection_id.as_ref(),
            Capability::Stt => self.default_stt_connection_id.as_ref(),
            Capability::Ocr => self.default_ocr_connection_id.as_ref(),
            Capability::Embedding | Capability::Tts => None,
        };
        id.filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub enabled: bool,
    pub max_entries: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_entries: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PrivacyConfig {
    pub trust_notice_ack_for_direct_ai: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub debug_payload_logging: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub theme: String,
    pub language: String,
    pub ui_opacity: f32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            theme: "system".to_string(),
            language: "en".to_string(),
            ui_opacity: 0.95,
        }
    }
}

/// Root settings document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub schema_version: u32,
    pub app: AppConfig,
    pub hotkeys: HotkeysConfig,
    pub routing_defaults: RoutingDefaults,
    pub history: HistoryConfig,
    pub privacy: PrivacyConfig,
    pub diagnostics: DiagnosticsConfig,
    pub connections: Vec<Connection>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: 1,
            app: AppConfig::default(),
            hotkeys: HotkeysConfig::default(),
            routing_defaults: RoutingDefaults::default(),
            history: HistoryConfig::default(),
            privacy: PrivacyConfig::default(),
            diagnostics: DiagnosticsConfig::default(),
            connections: Vec::new(),
        }
    }
}

impl Settings {
    /// Looks up a connection by id
    pub fn connection(&self, id: &ConnectionId) -> Option<&Connection> {
        self.connections.iter().find(|c| &c.connection_id == id)
    }

    pub fn default_connection_for(&self, capability: Capability) -> Option<&ConnectionId> {
        self.routing_defaults.default_connection_for(capability)
    }

    /// Loads settings from `path`, falling back to defaults if the file is
    /// missing or unreadable
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            info!("No settings file at {}, using defaults", path.display());
            return Self::default();
        }

        match Self::read(path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Failed to load settings, using defaults: {:#}", e);
                Self::default()
            }
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("Invalid settings in {}", path.display()))
    }

    /// Writes settings as pretty JSON, readable by the current user only
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Err(e) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)) {
                warn!("Failed to restrict permissions on {}: {}", path.display(), e);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.hotkeys.main_trigger.chord, "Ctrl+V,V");
        assert_eq!(settings.hotkeys.main_trigger.second_v_timeout_ms, 500);
        assert!(!settings.history.enabled);
        assert_eq!(settings.routing_defaults.ocr_provider_id.as_str(), "tesseract");
        assert!(settings.default_connection_for(Capability::Llm).is_none());
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        let json = r#"{
            "routing_defaults": {"default_llm_connection_id": "c1"},
            "connections": [
                {"connection_id": "c1", "provider_id": "openai", "capability": "llm", "model_id": "gpt-4o"}
            ]
        }"#;
        let settings: Settings = serde_json::from_str(json).unwrap();

        assert_eq!(settings.schema_version, 1);
        let default = settings.default_connection_for(Capability::Llm).unwrap();
        assert_eq!(default.as_str(), "c1");
        let conn = settings.connection(default).unwrap();
        assert_eq!(conn.capabilities, vec![Capability::Llm]);
        assert!(settings.default_connection_for(Capability::Tts).is_none());
    }

    #[test]
    fn test_empty_default_id_is_ignored() {
        let mut settings = Settings::default();
        settings.routing_defaults.default_llm_connection_id = Some(ConnectionId::new(""));
        assert!(settings.default_connection_for(Capability::Llm).is_none());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut settings = Settings::default();
        settings.history.enabled = true;
        settings.save(&path).unwrap();

        let loaded = Settings::load(&path);
        assert!(loaded.history.enabled);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert_eq!(Settings::load(&path), Settings::default());
    }
}
