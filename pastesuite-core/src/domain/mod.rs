//! Core domain types
//!
//! These types are shared between the engine (which executes actions), the
//! provider adapters (which stream text) and the CLI (which displays them).

pub mod action;
pub mod capability;
pub mod connection;
pub mod event;
pub mod history;
pub mod ids;
pub mod input;
pub mod settings;
