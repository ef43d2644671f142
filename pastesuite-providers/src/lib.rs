//! PasteSuite Providers
//!
//! Capability infrastructure for the PasteSuite execution pipeline.
//! It includes:
//! - The streaming and OCR capability traits
//! - The capability registry keyed by exact provider id
//! - Built-in provider adapters (cloud vendors, local endpoints, a mock, Tesseract)

pub mod capability;
pub mod providers;
pub mod registry;

pub use capability::{
    ChunkStream, DEFAULT_TEMPERATURE, Message, OcrEngine, ProviderConfig, ProviderError, Role,
    StreamChunk, TextStreamer,
};
pub use providers::builtin_registry;
pub use registry::{
    CapabilityFactory, CapabilityRegistry, ProviderClass, ProviderRegistration, RegistryError,
};
