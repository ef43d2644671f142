//! Built-in provider adapters

pub mod anthropic;
pub mod google;
pub mod mistral;
pub mod mock;
pub mod openai;
pub mod sse;
pub mod tesseract;

use reqwest::blocking::{Client, Response};
use std::time::Duration;
use tracing::warn;

use crate::capability::ProviderError;
use crate::registry::{CapabilityRegistry, ProviderClass, ProviderRegistration};

pub use anthropic::AnthropicStreamer;
pub use google::GoogleStreamer;
pub use mock::MockProvider;
pub use openai::ChatCompletionsStreamer;
pub use tesseract::TesseractOcr;

/// Builds the registry of every built-in adapter.
///
/// All HTTP adapters share one client whose per-request timeout is `timeout`.
pub fn builtin_registry(timeout: Duration) -> CapabilityRegistry {
    let client = http_client(timeout);
    let mut registry = CapabilityRegistry::new();

    let c = client.clone();
    registry.register(ProviderRegistration::text(
        "openai",
        "OpenAI",
        ProviderClass::Cloud,
        true,
        move || Box::new(ChatCompletionsStreamer::openai(c.clone())),
    ));

    let c = client.clone();
    registry.register(ProviderRegistration::text(
        "openai_compatible",
        "OpenAI-compatible (local)",
        ProviderClass::Local,
        false,
        move || Box::new(ChatCompletionsStreamer::openai_compatible(c.clone())),
    ));

    let c = client.clone();
    registry.register(ProviderRegistration::text(
        "anthropic",
        "Anthropic",
        ProviderClass::Cloud,
        true,
        move || Box::new(AnthropicStreamer::new(c.clone())),
    ));

    let c = client.clone();
    registry.register(ProviderRegistration::text(
        "google",
        "Google Gemini",
        ProviderClass::Cloud,
        true,
        move || Box::new(GoogleStreamer::new(c.clone())),
    ));

    let c = client;
    registry.register(ProviderRegistration::text(
        "mistral",
        "Mistral",
        ProviderClass::Cloud,
        true,
        move || Box::new(mistral::streamer(c.clone())),
    ));

    registry.register(ProviderRegistration::text(
        "mock",
        "Mock",
        ProviderClass::Local,
        false,
        || Box::new(MockProvider::new()),
    ));

    registry.register(ProviderRegistration::ocr(
        "tesseract",
        "Tesseract OCR",
        ProviderClass::Local,
        false,
        || Box::new(TesseractOcr::new()),
    ));

    registry
}

fn http_client(timeout: Duration) -> Client {
    match Client::builder().timeout(timeout).build() {
        Ok(client) => client,
        Err(e) => {
            warn!("Failed to build HTTP client with timeout, using defaults: {}", e);
            Client::new()
        }
    }
}

/// Turns a non-success response into [`ProviderError::Api`]
pub(crate) fn ensure_success(
    response: Response,
    provider: &'static str,
) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .text()
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(ProviderError::Api {
        provider,
        status: status.as_u16(),
        message,
    })
}
