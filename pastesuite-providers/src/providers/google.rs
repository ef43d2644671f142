//! Google Gemini `streamGenerateContent`

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::io::BufReader;
use tracing::debug;

use super::ensure_success;
use super::sse::{Frame, SseChunks, SseEvent};
use crate::capability::{
    ChunkStream, Message, ProviderConfig, ProviderError, Role, TextStreamer,
};

pub const GOOGLE_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
const MAX_OUTPUT_TOKENS: u32 = 4096;
const PROVIDER: &str = "google";

pub struct GoogleStreamer {
    client: Client,
}

impl GoogleStreamer {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

fn build_request(messages: &[Message], config: &ProviderConfig) -> GenerateRequest {
    let contents = messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| Content {
            role: match m.role {
                Role::Assistant => "model",
                _ => "user",
            },
            parts: vec![Part {
                text: m.content.clone(),
            }],
        })
        .collect();

    GenerateRequest {
        contents,
        system_instruction: config.system_prompt().map(|text| SystemInstruction {
            parts: vec![Part {
                text: text.to_string(),
            }],
        }),
        generation_config: GenerationConfig {
            temperature: config.temperature,
            max_output_tokens: MAX_OUTPUT_TOKENS,
        },
    }
}

#[derive(Debug, Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
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

    let chunk: GenerateChunk =
        serde_json::from_str(&event.data).map_err(|e| ProviderError::Stream {
            provider: PROVIDER,
            message: format!("Malformed chunk: {}", e),
        })?;

    if let Some(error) = chunk.error {
        return Err(ProviderError::Stream {
            provider: PROVIDER,
            message: error.message,
        });
    }

    let text: String = chunk
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().map(|p| p.text).collect())
        .unwrap_or_default();
    Ok(Frame::Text(text))
}

impl TextStreamer for GoogleStreamer {
    fn stream(
        &self,
        messages: Vec<Message>,
        config: ProviderConfig,
    ) -> Result<ChunkStream, ProviderError> {
        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            config.endpoint_or(GOOGLE_ENDPOINT),
            config.model_id
        );
        debug!("Opening google stream for model {}", config.model_id);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &config.api_key)
            .json(&build_request(&messages, &config))
            .send()?;
        let response = ensure_success(response, PROVIDER)?;

        // the body simply ends after the last candidate
        Ok(Box::new(SseChunks::new(BufReader::new(response), decode_event)))
    }
}
