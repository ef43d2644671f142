//! Deterministic provider used for demos and tests

use std::thread;
use std::time::Duration;

use crate::capability::{ChunkStream, Message, ProviderConfig, ProviderError, StreamChunk, TextStreamer};

pub const MOCK_RESPONSE: &str = "This is a mock response from PasteSuiteAI.";
const DEFAULT_DELAY: Duration = Duration::from_millis(10);

/// Streams the words of [`MOCK_RESPONSE`], each followed by a space
#[derive(Debug, Clone)]
pub struct MockProvider {
    delay: Duration,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            delay: DEFAULT_DELAY,
        }
    }

    /// Pause before each chunk, simulating network latency
    pub fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TextStreamer for MockProvider {
    fn stream(
        &self,
        _messages: Vec<Message>,
        _config: ProviderConfig,
    ) -> Result<ChunkStream, ProviderError> {
        let delay = self.delay;
        let words = MOCK_RESPONSE
            .split_whitespace()
            .map(|word| StreamChunk::text(format!("{} ", word)))
            .chain(std::iter::once(StreamChunk::done()))
            .map(move |chunk| {
                if !delay.is_zero() {
                    thread::sleep(delay);
                }
                Ok::<_, ProviderError>(chunk)
            });
        Ok(Box::new(words))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_stream() {
        let provider = MockProvider::with_delay(Duration::ZERO);
        let chunks: Vec<StreamChunk> = provider
            .stream(vec![Message::user("anything")], ProviderConfig::new("mock", ""))
            .unwrap()
            .map(|c| c.unwrap())
            .collect();

        assert_eq!(chunks.len(), 8);
        assert_eq!(chunks[0], StreamChunk::text("This "));
        assert!(chunks.last().unwrap().done);

        let text: String = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(text.trim_end(), MOCK_RESPONSE);
    }

    #[test]
    fn test_each_call_is_a_fresh_stream() {
        let provider = MockProvider::with_delay(Duration::ZERO);
        let first = provider
            .stream(Vec::new(), ProviderConfig::new("mock", ""))
            .unwrap()
            .count();
        let second = provider
            .stream(Vec::new(), ProviderConfig::new("mock", ""))
            .unwrap()
            .count();
        assert_eq!(first, second);
    }
}
