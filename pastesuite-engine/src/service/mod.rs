//! Services used by the engine
//!
//! The pipeline and the collaborators it reads from: input capture, secrets,
//! the action catalog, the settings store and the in-memory history.

pub mod catalog;
pub mod history;
pub mod input;
pub mod pipeline;
pub mod secrets;
pub mod settings;

pub use catalog::ActionCatalog;
pub use history::HistoryRepository;
pub use input::{ArboardCapture, CommandCopyTrigger, CopyTrigger, InputCapture, StaticCapture};
#[cfg(feature = "native-input")]
pub use input::EnigoCopyTrigger;
pub use pipeline::{ExecutionPipeline, ExecutionStream, PipelineContext};
pub use secrets::{InMemorySecretStore, KeyringSecretStore, SecretError, SecretStore};
pub use settings::SettingsStore;
