//! Secret command handlers
//!
//! Stores and removes connection API keys in the OS keyring.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use pastesuite_core::domain::ids::ConnectionId;
use pastesuite_engine::service::secrets::API_KEY;
use pastesuite_engine::service::{KeyringSecretStore, SecretStore};
use std::io::BufRead;

/// Secret subcommands
#[derive(Subcommand)]
pub enum SecretCommands {
    /// Store the API key for a connection
    Set {
        connection_id: String,
        /// Key value; read from the first line of stdin when omitted
        value: Option<String>,
    },
    /// Remove the API key for a connection
    Delete { connection_id: String },
}

pub fn handle_secret_command(command: SecretCommands) -> Result<()> {
    let store = KeyringSecretStore::new();

    match command {
        SecretCommands::Set {
            connection_id,
            value,
        } => {
            let value = match value {
                Some(value) => value,
                None => read_line()?,
            };
            let value = value.trim();
            if value.is_empty() {
                anyhow::bail!("API key cannot be empty");
            }

            let id = ConnectionId::new(connection_id);
            store.save(&id, API_KEY, value)?;
            println!("{} API key stored for {}", "✓".green(), id.as_str().bold());
            Ok(())
        }
        SecretCommands::Delete { connection_id } => {
            let id = ConnectionId::new(connection_id);
            if store.delete(&id, API_KEY)? {
                println!("{} API key removed for {}", "✓".green(), id.as_str().bold());
            } else {
                println!("{}", format!("No API key stored for {}.", id).yellow());
            }
            Ok(())
        }
    }
}

fn read_line() -> Result<String> {
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read API key from stdin")?;
    Ok(line)
}
