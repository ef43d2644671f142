//! Event bus
//!
//! Synchronous, in-process publish/subscribe keyed by event variant.
//! Handlers run on the publisher's thread in registration order. There is
//! no queue and no replay: an event published before a handler subscribes
//! is never seen by it.

use pastesuite_core::domain::event::{DomainEvent, EventKind};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, RwLock};
use tracing::{debug, error, warn};

/// Subscribed callback
pub type Handler = Arc<dyn Fn(&DomainEvent) -> anyhow::Result<()> + Send + Sync>;

#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<HashMap<EventKind, Vec<Handler>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for events of `kind`
    pub fn subscribe<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(&DomainEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let mut handlers = match self.handlers.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        handlers.entry(kind).or_default().push(Arc::new(handler));
        debug!("Subscribed handler to {}", kind);
    }

    /// Invokes every handler registered for the event's variant.
    ///
    /// A handler that fails or panics is logged; the remaining handlers still
    /// run and nothing propagates to the publisher.
    pub fn publish(&self, event: &DomainEvent) {
        let kind = event.kind();
        // the lock is not held while handlers run, so a handler may subscribe
        let handlers: Vec<Handler> = {
            let map = match self.handlers.read() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            map.get(&kind).cloned().unwrap_or_default()
        };

        for handler in handlers {
            match panic::catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("{} handler failed: {:#}", kind, e),
                Err(_) => error!("{} handler panicked", kind),
            }
        }
    }

    /// Number of handlers currently registered for `kind`
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        match self.handlers.read() {
            Ok(map) => map.get(&kind).map_or(0, Vec::len),
            Err(poisoned) => poisoned.into_inner().get(&kind).map_or(0, Vec::len),
        }
    }
}
