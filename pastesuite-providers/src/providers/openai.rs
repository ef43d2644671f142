//! OpenAI chat completions
//!
//! The same wire format is spoken by OpenAI, Mistral and most self-hosted
//! servers (Ollama, LM Studio, vLLM), so one adapter covers all of them.

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::io::BufReader;
use tracing::debug;

use super::ensure_success;
use super::sse::{Frame, SseChunks, SseEvent};
use crate::capability::{
    ChunkStream, Message, ProviderConfig, ProviderError, Role, TextStreamer,
};

pub const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1";
pub const LOCAL_ENDPOINT: &str = "http://localhost:11434/v1";

/// Streaming client for `/chat/completions`
pub struct ChatCompletionsStreamer {
    client: Client,
    provider: &'static str,
    default_endpoint: &'static str,
}

impl ChatCompletionsStreamer {
    pub fn new(client: Client, provider: &'static str, default_endpoint: &'static str) -> Self {
        Self {
            client,
            provider,
            default_endpoint,
        }
    }

    pub fn openai(client: Client) -> Self {
        Self::new(client, "openai", OPENAI_ENDPOINT)
    }

    /// Local server; the bearer header is omitted when no key is configured
    pub fn openai_compatible(client: Client) -> Self {
        Self::new(client, "openai_compatible", LOCAL_ENDPOINT)
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    stream: bool,
}

fn build_request<'a>(messages: &'a [Message], config: &'a ProviderConfig) -> ChatRequest<'a> {
    let mut wire = Vec::with_capacity(messages.len() + 1);
    if let Some(system) = config.system_prompt() {
        wire.push(ChatMessage {
            role: Role::System.as_str(),
            content: system,
        });
    }
    wire.extend(messages.iter().map(|m| ChatMessage {
        role: m.role.as_str(),
        content: &m.content,
    }));

    ChatRequest {
        model: &config.model_id,
        messages: wire,
        temperature: config.temperature,
        stream: true,
    }
}

#[derive(Debug, Default, Deserialize)]
struct CompletionChunk {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

fn decode_event(provider: &'static str, event: &SseEvent) -> Result<Frame, ProviderError> {
    let data = event.data.trim();
    if data == "[DONE]" {
        return Ok(Frame::Done);
    }
    if data.is_empty() {
        return Ok(Frame::Skip);
    }

    let chunk: CompletionChunk = serde_json::from_str(data).map_err(|e| ProviderError::Stream {
        provider,
        message: format!("Malformed chunk: {}", e),
    })?;

    if let Some(error) = chunk.error {
        return Err(ProviderError::Stream {
            provider,
            message: error.message,
        });
    }

    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta.content)
        .map(Frame::Text)
        .unwrap_or(Frame::Skip))
}

impl TextStreamer for ChatCompletionsStreamer {
    fn stream(
        &self,
        messages: Vec<Message>,
        config: ProviderConfig,
    ) -> Result<ChunkStream, ProviderError> {
        let url = format!("{}/chat/completions", config.endpoint_or(self.default_endpoint));
        debug!("Opening {} stream for model {}", self.provider, config.model_id);

        let mut request = self.client.post(&url).json(&build_request(&messages, &config));
        if !config.api_key.is_empty() {
            request = request.bearer_auth(&config.api_key);
        }

        let response = ensure_success(request.send()?, self.provider)?;
        let provider = self.provider;
        Ok(Box::new(SseChunks::new(
            BufReader::new(response),
            move |event: &SseEvent| decode_event(provider, event),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::StreamChunk;
    use std::io::Cursor;

    fn event(data: &str) -> SseEvent {
        SseEvent {
            event: None,
            data: data.to_string(),
        }
    }

    #[test]
    fn test_request_puts_system_prompt_first() {
        let mut config = ProviderConfig::new("gpt-4o", "sk-test");
        config.system_prompt = Some("Be terse.".to_string());
        let messages = vec![Message::user("Hello")];

        let body = serde_json::to_value(build_request(&messages, &config)).unwrap();
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["stream"], true);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "Be terse.");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "Hello");
    }

    #[test]
    fn test_request_without_system_prompt() {
        let config = ProviderConfig::new("llama3", "");
        let messages = vec![Message::user("Hi")];
        let body = serde_json::to_value(build_request(&messages, &config)).unwrap();
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_decode_delta_and_done() {
        let text = r#"{"choices":[{"delta":{"content":"Hi"}}]}"#;
        assert_eq!(
            decode_event("openai", &event(text)).unwrap(),
            Frame::Text("Hi".to_string())
        );

        let role_only = r#"{"choices":[{"delta":{"role":"assistant"}}]}"#;
        assert_eq!(decode_event("openai", &event(role_only)).unwrap(), Frame::Skip);
        assert_eq!(decode_event("openai", &event("[DONE]")).unwrap(), Frame::Done);
    }

    #[test]
    fn test_decode_error_payload() {
        let err = decode_event(
            "mistral",
            &event(r#"{"error":{"message":"rate limited"}}"#),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "mistral stream error: rate limited");
        assert!(decode_event("openai", &event("{oops")).is_err());
    }

    #[test]
    fn test_full_body() {
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hello\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\" world\"}}]}\n\n",
            "data: [DONE]\n\n",
        );
        let chunks: Vec<StreamChunk> = SseChunks::new(Cursor::new(body), |e: &SseEvent| {
            decode_event("openai", e)
        })
        .map(|c| c.unwrap())
        .collect();
        assert_eq!(
            chunks,
            vec![
                StreamChunk::text("Hello"),
                StreamChunk::text(" world"),
                StreamChunk::done()
            ]
        );
    }
}
