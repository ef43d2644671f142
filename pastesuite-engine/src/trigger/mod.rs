//! Trigger agent and its parts

pub mod agent;
pub mod chord;
pub mod dispatch;
pub mod hook;
pub mod keys;
#[cfg(feature = "native-input")]
pub mod native;

pub use agent::TriggerAgent;
pub use dispatch::{Trigger, TriggerDispatcher, TriggerHandler};
pub use hook::{ChannelHook, InputHook, KeySink};
pub use keys::{ChordSpec, Hotkey, Key, KeyEvent, Modifier, NamedKey};
#[cfg(feature = "native-input")]
pub use native::RdevHook;

use std::sync::Arc;

/// The hook that listens to the real keyboard, when this build has one
pub fn system_hook() -> Arc<dyn InputHook> {
    #[cfg(feature = "native-input")]
    {
        Arc::new(RdevHook::new())
    }
    #[cfg(not(feature = "native-input"))]
    {
        tracing::warn!("Built without native-input; the key hook only receives fed events");
        Arc::new(ChannelHook::new())
    }
}
