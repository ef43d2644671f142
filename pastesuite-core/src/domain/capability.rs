//! Capability domain types
//!
//! A capability is a named ability that a connection may support and an
//! action may require.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A named provider ability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    /// Speech to text
    Stt,
    /// Text generation / chat
    Llm,
    /// Optical character recognition
    Ocr,
    Embedding,
    /// Text to speech
    Tts,
}

impl Capability {
    pub const ALL: [Capability; 5] = [
        Capability::Stt,
        Capability::Llm,
        Capability::Ocr,
        Capability::Embedding,
        Capability::Tts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Stt => "stt",
            Capability::Llm => "llm",
            Capability::Ocr => "ocr",
            Capability::Embedding => "embedding",
            Capability::Tts => "tts",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        Capability::ALL
            .into_iter()
            .find(|c| c.as_str() == lowered)
            .ok_or_else(|| format!("Unknown capability: {}", s))
    }
}

/// A capability an action needs, with the minimum ordinal it was introduced at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityRequirement {
    pub capability: Capability,
    #[serde(default)]
    pub min_sequence: u32,
}

impl CapabilityRequirement {
    pub fn new(capability: Capability) -> Self {
        Self {
            capability,
            min_sequence: 0,
        }
    }
}

/// Kind of input an action consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Text,
    Image,
    AudioStream,
    AudioFile,
    FileRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputRequirement {
    #[serde(rename = "type")]
    pub kind: InputKind,
}
