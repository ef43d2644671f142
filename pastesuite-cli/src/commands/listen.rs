//! Listen command handler
//!
//! By default the trigger agent runs on the system keyboard hook until
//! Ctrl+C. With `--script` it runs on a channel hook fed from stdin, one step
//! per line:
//!
//! ```text
//! press ctrl
//! press v
//! release v
//! wait 100
//! ```
//!
//! Blank lines and lines starting with `#` are ignored. Trigger outcomes are
//! printed as they happen.

use anyhow::{Context, Result};
use colored::*;
use pastesuite_engine::trigger::{self, ChannelHook, Key, KeyEvent};
use pastesuite_engine::{AppServices, TriggerObserver, TriggerOutcome};
use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::build_app;
use crate::config::Config;

/// One line of a key script
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptStep {
    Press(Key),
    Release(Key),
    Wait(Duration),
}

/// Parses one script line; `Ok(None)` for blanks and comments
pub fn parse_step(line: &str) -> Result<Option<ScriptStep>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (verb, arg) = line
        .split_once(char::is_whitespace)
        .map(|(verb, arg)| (verb, arg.trim()))
        .unwrap_or((line, ""));
    let step = match verb.to_ascii_lowercase().as_str() {
        "press" => ScriptStep::Press(arg.parse()?),
        "release" => ScriptStep::Release(arg.parse()?),
        "wait" => {
            let ms: u64 = arg
                .parse()
                .with_context(|| format!("wait needs milliseconds, got {arg:?}"))?;
            ScriptStep::Wait(Duration::from_millis(ms))
        }
        other => anyhow::bail!("Unknown step {other:?}, expected press, release or wait"),
    };
    Ok(Some(step))
}

pub fn handle_listen_command(config: &Config, script: bool) -> Result<()> {
    if script {
        return listen_to_script(config);
    }

    let app = build_app(config, trigger::system_hook(), None, Some(observer()))?;
    app.start()?;
    announce(&app);
    println!("{}", "Press Ctrl+C to stop".dimmed());

    tokio::runtime::Runtime::new()
        .context("Failed to create signal runtime")?
        .block_on(tokio::signal::ctrl_c())
        .context("Failed to wait for Ctrl+C")?;

    shutdown(&app, config);
    Ok(())
}

fn listen_to_script(config: &Config) -> Result<()> {
    let hook = Arc::new(ChannelHook::new());
    let sender = hook.sender();
    let app = build_app(config, hook, None, Some(observer()))?;
    app.start()?;
    announce(&app);

    let stdin = std::io::stdin();
    for (number, line) in stdin.lock().lines().enumerate() {
        let line = line.context("Failed to read key script")?;
        let step = parse_step(&line).with_context(|| format!("line {}", number + 1))?;
        let Some(step) = step else {
            continue;
        };

        debug!("Script step {:?}", step);
        match step {
            ScriptStep::Press(key) => sender.send(KeyEvent::press(key))?,
            ScriptStep::Release(key) => sender.send(KeyEvent::release(key))?,
            ScriptStep::Wait(duration) => std::thread::sleep(duration),
        }
    }

    shutdown(&app, config);
    Ok(())
}

fn observer() -> TriggerObserver {
    Arc::new(|outcome: &TriggerOutcome| print_outcome(outcome))
}

fn announce(app: &AppServices) {
    println!(
        "{}",
        format!("Listening with {} direct hotkey(s)", app.agent.hotkeys().len()).bold()
    );
}

fn shutdown(app: &AppServices, config: &Config) {
    app.stop();
    if !app.agent.wait_idle(config.engine.request_timeout) {
        warn!("Gave up waiting for running actions");
    }
}

fn print_outcome(outcome: &TriggerOutcome) {
    match outcome {
        TriggerOutcome::SurfaceRequested => {
            println!("  {} {}", "▸".cyan(), "Selection surface requested".bold());
        }
        TriggerOutcome::Completed {
            action_id,
            output,
            status,
        } => {
            println!("  {} {} ({})", "▸".cyan(), action_id.as_str().bold(), status);
            println!("    {}", output);
        }
        TriggerOutcome::UnknownAction(action_id) => {
            println!("  {} {}", "▸".cyan(), format!("Unknown action {}", action_id).yellow());
        }
        TriggerOutcome::Rejected { action_id, error } => {
            println!(
                "  {} {} {} {}",
                "▸".cyan(),
                action_id.as_str().bold(),
                format!("[{}]", error.category).red(),
                error.message
            );
        }
    }
}
