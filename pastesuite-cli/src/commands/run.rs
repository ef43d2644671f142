//! Run command handler
//!
//! Executes a single action and streams its chunks to stdout as they arrive.

use anyhow::{Context, Result};
use colored::*;
use pastesuite_core::domain::event::ExecutionStatus;
use pastesuite_core::domain::ids::ActionId;
use pastesuite_engine::service::{InputCapture, StaticCapture};
use pastesuite_engine::trigger::ChannelHook;
use std::io::{Read, Write};
use std::sync::Arc;

use super::build_app;
use crate::config::Config;

pub fn handle_run_command(
    action_id: &str,
    text: Option<String>,
    stdin: bool,
    config: &Config,
) -> Result<()> {
    let selection = match (text, stdin) {
        (Some(text), _) => Some(text),
        (None, true) => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read stdin")?;
            Some(buffer)
        }
        (None, false) => None,
    };
    let input = selection.map(|text| {
        Arc::new(StaticCapture::new().with_selection(text)) as Arc<dyn InputCapture>
    });

    let app = build_app(config, Arc::new(ChannelHook::new()), input, None)?;
    let action_id = ActionId::new(action_id);
    let Some(action) = app.catalog.get_action(&action_id) else {
        anyhow::bail!("Action not found: {}", action_id);
    };

    let mut stream = match app.pipeline.execute(&action) {
        Ok(stream) => stream,
        Err(error) => {
            eprintln!(
                "{} {} {}",
                "✗".red(),
                format!("[{}]", error.category).red().bold(),
                error.message
            );
            anyhow::bail!("Action {} could not run", action_id);
        }
    };

    let mut stdout = std::io::stdout().lock();
    for chunk in stream.by_ref() {
        stdout.write_all(chunk.as_bytes())?;
        stdout.flush()?;
    }
    writeln!(stdout)?;

    if stream.status() == ExecutionStatus::Error {
        anyhow::bail!("Action {} failed while streaming", action_id);
    }
    Ok(())
}
