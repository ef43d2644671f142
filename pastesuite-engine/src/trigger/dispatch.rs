//! Trigger dispatch
//!
//! Hands fired triggers to a bounded worker pool so the input hook thread
//! never blocks. Each trigger runs on the runtime's blocking pool because the
//! pipeline streams over blocking HTTP.

use pastesuite_core::domain::ids::ActionId;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::{Builder, Runtime};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

const IDLE_POLL: Duration = Duration::from_millis(10);

/// What the agent detected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// The chord: open the selection surface
    Chord,
    /// A direct hotkey bound to an action
    Action(ActionId),
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Chord => write!(f, "chord"),
            Trigger::Action(id) => write!(f, "action {}", id),
        }
    }
}

pub type TriggerHandler = Arc<dyn Fn(Trigger) + Send + Sync>;

pub struct TriggerDispatcher {
    runtime: Runtime,
    semaphore: Arc<Semaphore>,
    capacity: usize,
    handler: TriggerHandler,
}

impl TriggerDispatcher {
    /// Creates a dispatcher running at most `max_parallel` triggers at once
    pub fn new(max_parallel: usize, handler: TriggerHandler) -> std::io::Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(max_parallel.max(1))
            .thread_name("pastesuite-trigger")
            .enable_all()
            .build()?;

        Ok(Self {
            runtime,
            semaphore: Arc::new(Semaphore::new(max_parallel)),
            capacity: max_parallel,
            handler,
        })
    }

    /// Schedules `trigger` and returns immediately.
    ///
    /// Returns false when every worker is busy; the trigger is dropped.
    pub fn dispatch(&self, trigger: Trigger) -> bool {
        let permit = match self.semaphore.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                warn!("Max parallel triggers reached, skipping {}", trigger);
                return false;
            }
        };

        debug!("Dispatching {}", trigger);
        let handler = self.handler.clone();
        self.runtime.spawn_blocking(move || {
            let _permit = permit;
            handler(trigger);
        });
        true
    }

    /// Number of triggers that could start right now
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Blocks until no trigger is running or `timeout` passes; returns
    /// false on timeout
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.available() < self.capacity {
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(IDLE_POLL);
        }
        true
    }

    /// Waits up to `timeout` for running triggers, then abandons them
    pub fn shutdown(self, timeout: Duration) {
        self.runtime.shutdown_timeout(timeout);
    }
}
