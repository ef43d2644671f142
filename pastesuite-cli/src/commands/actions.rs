//! Action command handlers
//!
//! Lists and toggles actions in the catalog.

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use pastesuite_core::domain::action::Action;
use pastesuite_core::domain::ids::ActionId;
use pastesuite_engine::trigger::ChannelHook;
use std::sync::Arc;

use super::build_app;
use crate::config::Config;

/// Action subcommands
#[derive(Subcommand)]
pub enum ActionCommands {
    /// List all actions in panel order
    List,
    /// Enable an action
    Enable { action_id: String },
    /// Disable an action
    Disable { action_id: String },
}

pub fn handle_action_command(command: ActionCommands, config: &Config) -> Result<()> {
    let app = build_app(config, Arc::new(ChannelHook::new()), None, None)?;

    match command {
        ActionCommands::List => {
            let mut actions = app.catalog.get_all_actions();
            actions.sort_by_key(|a| a.sequence);
            list_actions(&actions);
            Ok(())
        }
        ActionCommands::Enable { action_id } => set_enabled(&app, &action_id, true),
        ActionCommands::Disable { action_id } => set_enabled(&app, &action_id, false),
    }
}

fn list_actions(actions: &[Action]) {
    if actions.is_empty() {
        println!("{}", "No actions in the catalog.".yellow());
        return;
    }

    println!("{}", format!("Found {} action(s):", actions.len()).bold());
    println!();
    for action in actions {
        print_action_summary(action);
    }
}

fn print_action_summary(action: &Action) {
    let state = if action.enabled {
        "enabled".green()
    } else {
        "disabled".dimmed()
    };

    println!("  {} {} ({})", "▸".cyan(), action.id.as_str().bold(), state);
    println!("    Mode:         {:?}", action.mode);
    if let Some(hotkey) = &action.direct_hotkey {
        println!("    Hotkey:       {}", hotkey);
    }
    if let Some(connection) = &action.connection_id {
        println!("    Connection:   {}", connection);
    }
    println!(
        "    Updated:      {}",
        action
            .updated_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    println!();
}

fn set_enabled(app: &pastesuite_engine::AppServices, action_id: &str, enabled: bool) -> Result<()> {
    let id = ActionId::new(action_id);
    let Some(mut action) = app.catalog.get_action(&id) else {
        anyhow::bail!("Action not found: {}", id);
    };
    action.enabled = enabled;
    app.catalog.update(action)?;

    let state = if enabled { "enabled" } else { "disabled" };
    println!("{} Action {} {}", "✓".green(), id.as_str().bold(), state);
    Ok(())
}
