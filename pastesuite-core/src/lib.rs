//! PasteSuite Core
//!
//! Core types shared by the PasteSuite crates.
//!
//! This crate contains:
//! - Domain types: actions, connections, capabilities, settings, events
//! - The structured pipeline error returned by every validation step

pub mod domain;
pub mod error;

pub use error::{ErrorCategory, PipelineError, PipelineResult};
