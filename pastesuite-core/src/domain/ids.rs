//! Identifier newtypes
//!
//! Serialized as plain strings so the JSON files stay readable.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Stable identifier of an action (built-ins use readable ids like `paste_plain`)
    ActionId
);

string_id!(
    /// Opaque, globally unique identifier of a configured connection
    ConnectionId
);

string_id!(
    /// Identifier of a provider adapter in the capability registry
    ProviderId
);

impl ConnectionId {
    /// Generates a fresh random connection id
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl ActionId {
    /// Generates a fresh random action id
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_serialize_as_plain_strings() {
        let id = ConnectionId::new("conn-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"conn-1\"");

        let parsed: ProviderId = serde_json::from_str("\"openai\"").unwrap();
        assert_eq!(parsed.as_str(), "openai");
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(ConnectionId::generate(), ConnectionId::generate());
        assert!(!ActionId::generate().is_empty());
    }
}
