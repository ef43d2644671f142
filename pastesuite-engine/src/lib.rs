//! PasteSuite Engine
//!
//! Runs actions against the selected text or clipboard and turns key
//! presses into triggers.
//!
//! Architecture:
//! - Configuration: file locations and limits, from environment or defaults
//! - Services: execution pipeline, input capture, secrets, catalog, settings, history
//! - Event bus and handlers: side effects of executions and edits
//! - Trigger agent: chord and direct-hotkey detection, bounded dispatch
//! - App: the composition root wiring all of the above

pub mod app;
pub mod config;
pub mod event_bus;
pub mod handlers;
pub mod redact;
pub mod service;
pub mod trigger;

pub use app::{AppServices, Collaborators, TriggerObserver, TriggerOutcome, TriggerRunner};
pub use config::EngineConfig;
pub use event_bus::EventBus;
