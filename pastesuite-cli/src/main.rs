//! PasteSuite CLI
//!
//! Command-line front end for the PasteSuite engine: run actions, inspect
//! the catalog and providers, manage API keys and drive the trigger agent.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "pastesuite")]
#[command(about = "PasteSuite AI text actions", long_about = None)]
struct Cli {
    /// Directory holding settings.json and actions.json
    #[arg(long, env = "PASTE_SUITE_AI_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pastesuite=info,pastesuite_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config_dir)?;

    handle_command(cli.command, &config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listen_defaults_to_system_keyboard() {
        let cli = Cli::try_parse_from(["pastesuite", "listen"]).unwrap();
        assert!(matches!(cli.command, Commands::Listen { script: false }));

        let cli = Cli::try_parse_from(["pastesuite", "listen", "--script"]).unwrap();
        assert!(matches!(cli.command, Commands::Listen { script: true }));
    }
}
