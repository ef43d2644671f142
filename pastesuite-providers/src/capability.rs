//! Capability traits
//!
//! A provider adapter implements one capability behind a small trait:
//! [`TextStreamer`] for chat-style text generation and [`OcrEngine`] for
//! reading text out of images. Instances are stateless; the registry builds
//! a fresh one per execution.

use pastesuite_core::domain::input::ClipboardImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sampling temperature used for every request
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A chat message sent to a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// One piece of a streamed response
///
/// Adapters end a clean stream with a `done` chunk whose content is empty.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StreamChunk {
    pub content: String,
    pub done: bool,
}

impl StreamChunk {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            done: false,
        }
    }

    pub fn done() -> Self {
        Self {
            content: String::new(),
            done: true,
        }
    }
}

/// Per-request configuration built by the pipeline from a connection
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub model_id: String,
    /// Empty for providers that do not require authentication
    pub api_key: String,
    pub endpoint_url: Option<String>,
    pub system_prompt: Option<String>,
    pub temperature: f32,
}

impl ProviderConfig {
    pub fn new(model_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            api_key: api_key.into(),
            endpoint_url: None,
            system_prompt: None,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    /// Endpoint override, or `default` when the connection has none
    pub fn endpoint_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.endpoint_url
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .unwrap_or(default)
            .trim_end_matches('/')
    }

    /// System prompt if one is configured and non-blank
    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt
            .as_deref()
            .filter(|p| !p.trim().is_empty())
    }
}

/// Errors raised by provider adapters
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport failure (connect, timeout, TLS)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered with a non-success status
    #[error("{provider} API error (status {status}): {message}")]
    Api {
        provider: &'static str,
        status: u16,
        message: String,
    },

    /// Provider reported an error inside the stream
    #[error("{provider} stream error: {message}")]
    Stream {
        provider: &'static str,
        message: String,
    },

    /// Reading the response body failed
    #[error("Failed to read response: {0}")]
    Io(#[from] std::io::Error),
}

/// Lazy, single-pass sequence of chunks
pub type ChunkStream = Box<dyn Iterator<Item = Result<StreamChunk, ProviderError>> + Send>;

/// Streams text for a list of messages
pub trait TextStreamer: Send + Sync {
    /// Opens a streaming request.
    ///
    /// Transport and authentication failures are returned either here or as
    /// an `Err` item from the stream; a clean stream ends with
    /// [`StreamChunk::done`].
    fn stream(
        &self,
        messages: Vec<Message>,
        config: ProviderConfig,
    ) -> Result<ChunkStream, ProviderError>;
}

/// Reads text out of an image
pub trait OcrEngine: Send + Sync {
    /// Returns the recognized text.
    ///
    /// Failures come back as an `Error: ...` string rather than an error
    /// value; callers treat any returned string as usable text.
    fn extract_text(&self, image: &ClipboardImage) -> String;
}
