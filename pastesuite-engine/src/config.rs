//! Engine configuration
//!
//! File locations and resource limits for the engine. Everything the user
//! edits (hotkeys, connections, routing defaults) lives in [`Settings`]
//! instead.
//!
//! [`Settings`]: pastesuite_core::domain::settings::Settings

use std::path::PathBuf;
use std::time::Duration;

const ENV_PREFIX: &str = "PASTE_SUITE_AI_";
const APP_DIR: &str = "PasteSuiteAI";

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Settings document (connections, routing defaults, hotkeys)
    pub settings_path: PathBuf,

    /// Action catalog document
    pub actions_path: PathBuf,

    /// Maximum number of triggers executing at once
    pub max_parallel_triggers: usize,

    /// Maximum number of history entries kept in memory
    pub history_capacity: usize,

    /// Per-request timeout for provider calls
    pub request_timeout: Duration,

    /// Command that sends the copy shortcut to the focused window, used
    /// when no primary selection is available
    pub copy_command: Option<String>,
}

impl EngineConfig {
    /// Creates a configuration rooted at `config_dir`
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        let config_dir = config_dir.into();
        Self {
            settings_path: config_dir.join("settings.json"),
            actions_path: config_dir.join("actions.json"),
            max_parallel_triggers: 4,
            history_capacity: 50,
            request_timeout: Duration::from_secs(60),
            copy_command: None,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables (all optional):
    /// - PASTE_SUITE_AI_SETTINGS_PATH (default: <config dir>/PasteSuiteAI/settings.json)
    /// - PASTE_SUITE_AI_ACTIONS_PATH (default: <config dir>/PasteSuiteAI/actions.json)
    /// - PASTE_SUITE_AI_MAX_PARALLEL_TRIGGERS (default: 4)
    /// - PASTE_SUITE_AI_HISTORY_CAPACITY (default: 50)
    /// - PASTE_SUITE_AI_REQUEST_TIMEOUT (seconds, default: 60)
    /// - PASTE_SUITE_AI_COPY_COMMAND (e.g. `xdotool key ctrl+c`, default: unset)
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(path) = env_var("SETTINGS_PATH") {
            config.settings_path = PathBuf::from(path);
        }

        if let Some(path) = env_var("ACTIONS_PATH") {
            config.actions_path = PathBuf::from(path);
        }

        if let Some(value) = env_var("MAX_PARALLEL_TRIGGERS") {
            config.max_parallel_triggers = value.parse().map_err(|_| {
                anyhow::anyhow!("{ENV_PREFIX}MAX_PARALLEL_TRIGGERS must be a number, got {value:?}")
            })?;
        }

        if let Some(value) = env_var("HISTORY_CAPACITY") {
            config.history_capacity = value.parse().map_err(|_| {
                anyhow::anyhow!("{ENV_PREFIX}HISTORY_CAPACITY must be a number, got {value:?}")
            })?;
        }

        if let Some(value) = env_var("REQUEST_TIMEOUT") {
            let secs: u64 = value.parse().map_err(|_| {
                anyhow::anyhow!("{ENV_PREFIX}REQUEST_TIMEOUT must be a number of seconds, got {value:?}")
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }

        config.copy_command = env_var("COPY_COMMAND");

        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.settings_path.as_os_str().is_empty() {
            anyhow::bail!("settings_path cannot be empty");
        }

        if self.actions_path.as_os_str().is_empty() {
            anyhow::bail!("actions_path cannot be empty");
        }

        if self.settings_path == self.actions_path {
            anyhow::bail!("settings_path and actions_path must be different files");
        }

        if self.max_parallel_triggers == 0 {
            anyhow::bail!("max_parallel_triggers must be greater than 0");
        }

        if self.request_timeout.as_secs() == 0 {
            anyhow::bail!("request_timeout must be greater than 0");
        }

        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(base.join(APP_DIR))
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}{name}"))
        .ok()
        .filter(|v| !v.trim().is_empty())
}
