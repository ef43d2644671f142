//! CLI configuration

use anyhow::Result;
use pastesuite_engine::EngineConfig;
use std::path::PathBuf;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub engine: EngineConfig,
}

impl Config {
    /// Engine configuration from the environment, re-rooted at `config_dir`
    /// when one is given
    pub fn load(config_dir: Option<PathBuf>) -> Result<Self> {
        let mut engine = EngineConfig::from_env()?;
        if let Some(dir) = config_dir {
            let rooted = EngineConfig::new(dir);
            engine.settings_path = rooted.settings_path;
            engine.actions_path = rooted.actions_path;
        }
        engine.validate()?;
        Ok(Self { engine })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir_overrides_paths() {
        let config = Config::load(Some(PathBuf::from("/tmp/pastesuite-test"))).unwrap();
        assert_eq!(
            config.engine.settings_path,
            PathBuf::from("/tmp/pastesuite-test/settings.json")
        );
        assert_eq!(
            config.engine.actions_path,
            PathBuf::from("/tmp/pastesuite-test/actions.json")
        );
    }
}
