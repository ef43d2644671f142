//! Anthropic Messages API

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::io::BufReader;
use tracing::debug;

use super::ensure_success;
use super::sse::{Frame, SseChunks, SseEvent};
use crate::capability::{
    ChunkStream, Message, ProviderConfig, ProviderError, Role, TextStreamer,
};

pub const ANTHROPIC_ENDPOINT: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;
const PROVIDER: &str = "anthropic";

pub struct AnthropicStreamer {
    client: Client,
}

impl AnthropicStreamer {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    stream: bool,
}

fn build_request<'a>(messages: &'a [Message], config: &'a ProviderConfig) -> MessagesRequest<'a> {
    MessagesRequest {
        model: &config.model_id,
        max_tokens: MAX_TOKENS,
        system: config.system_prompt(),
        // the system prompt has its own top-level slot
        messages: messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| WireMessage {
                role: m.role.as_str(),
                content: &m.content,
            })
            .collect(),
        temperature: config.temperature,
        stream: true,
    }
}

#[derive(Debug, Deserialize)]
struct StreamEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    delta: Option<TextDelta>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct TextDelta {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

fn decode_event(event: &SseEvent) -> Result<Frame, ProviderError> {
    if event.data.trim().is_empty() {
        return Ok(Frame::Skip);
    }

    let parsed: StreamEvent =
        serde_json::from_str(&event.data).map_err(|e| ProviderError::Stream {
            provider: PROVIDER,
            message: format!("Malformed event: {}", e),
        })?;

    match parsed.kind.as_str() {
        "content_block_delta" => Ok(parsed
            .delta
            .filter(|d| d.kind == "text_delta")
            .and_then(|d| d.text)
            .map(Frame::Text)
            .unwrap_or(Frame::Skip)),
        "message_stop" => Ok(Frame::Done),
        "error" => Err(ProviderError::Stream {
            provider: PROVIDER,
            message: parsed
                .error
                .map(|e| e.message)
                .unwrap_or_else(|| "Unknown error".to_string()),
        }),
        _ => Ok(Frame::Skip),
    }
}

impl TextStreamer for AnthropicStreamer {
    fn stream(
        &self,
        messages: Vec<Message>,
        config: ProviderConfig,
    ) -> Result<ChunkStream, ProviderError> {
        let url = format!("{}/messages", config.endpoint_or(ANTHROPIC_ENDPOINT));
        debug!("Opening anthropic stream for model {}", config.model_id);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &config.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&build_request(&messages, &config))
            .send()?;
        let response = ensure_success(response, PROVIDER)?;

        Ok(Box::new(SseChunks::new(BufReader::new(response), decode_event)))
    }
}
