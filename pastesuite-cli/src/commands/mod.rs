//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod actions;
mod listen;
mod providers;
mod run;
mod secret;

pub use actions::ActionCommands;
pub use secret::SecretCommands;

use anyhow::Result;
use clap::Subcommand;
use pastesuite_engine::service::InputCapture;
use pastesuite_engine::trigger::InputHook;
use pastesuite_engine::{AppServices, Collaborators, TriggerObserver};
use std::sync::Arc;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run one action and stream its output to stdout
    Run {
        /// Action id, e.g. paste_plain
        action_id: String,
        /// Use this text as the selection instead of the system clipboard
        #[arg(long, conflicts_with = "stdin")]
        text: Option<String>,
        /// Read the selection from stdin
        #[arg(long)]
        stdin: bool,
    },
    /// Action catalog
    Actions {
        #[command(subcommand)]
        command: ActionCommands,
    },
    /// List registered providers
    Providers,
    /// API key management
    Secret {
        #[command(subcommand)]
        command: SecretCommands,
    },
    /// Listen for chords and hotkeys until Ctrl+C
    Listen {
        /// Read key events from stdin instead of the system keyboard
        #[arg(long)]
        script: bool,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Run {
            action_id,
            text,
            stdin,
        } => run::handle_run_command(&action_id, text, stdin, config),
        Commands::Actions { command } => actions::handle_action_command(command, config),
        Commands::Providers => providers::list_providers(config),
        Commands::Secret { command } => secret::handle_secret_command(command),
        Commands::Listen { script } => listen::handle_listen_command(config, script),
    }
}

/// Builds the application with system collaborators, overriding input
/// capture when `input` is given
pub(crate) fn build_app(
    config: &Config,
    hook: Arc<dyn InputHook>,
    input: Option<Arc<dyn InputCapture>>,
    observer: Option<TriggerObserver>,
) -> Result<AppServices> {
    let mut collaborators = Collaborators::system(&config.engine, hook);
    if let Some(input) = input {
        collaborators.input = input;
    }
    AppServices::build(config.engine.clone(), collaborators, observer)
}
