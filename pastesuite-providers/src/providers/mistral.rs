//! Mistral chat completions

use reqwest::blocking::Client;

use super::openai::ChatCompletionsStreamer;

pub const MISTRAL_ENDPOINT: &str = "https://api.mistral.ai/v1";

/// Mistral speaks the OpenAI chat-completions format
pub fn streamer(client: Client) -> ChatCompletionsStreamer {
    ChatCompletionsStreamer::new(client, "mistral", MISTRAL_ENDPOINT)
}
