//! Raw input hook
//!
//! An [`InputHook`] owns the thread that receives key events from the
//! platform and forwards each one to a sink. [`ChannelHook`] takes its events
//! from an mpsc channel, so any producer (a platform adapter, a CLI script,
//! a test) can drive the agent.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info};

use super::keys::KeyEvent;

/// Callback invoked on the hook thread for every event
pub type KeySink = Arc<dyn Fn(KeyEvent) + Send + Sync>;

pub trait InputHook: Send + Sync {
    /// Starts delivering events to `sink`; a no-op if already running
    fn start(&self, sink: KeySink) -> anyhow::Result<()>;

    /// Stops delivery and waits for the hook thread; a no-op if not running
    fn stop(&self);

    fn is_running(&self) -> bool;
}

const POLL_INTERVAL: Duration = Duration::from_millis(50);

struct Running {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Hook fed from an in-process channel
pub struct ChannelHook {
    sender: Sender<KeyEvent>,
    receiver: Arc<Mutex<Receiver<KeyEvent>>>,
    running: Mutex<Option<Running>>,
}

impl ChannelHook {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
            running: Mutex::new(None),
        }
    }

    /// Producer side of the hook.
    ///
    /// Events sent while stopped are delivered once the hook starts again;
    /// events sent before `stop` are delivered before it returns.
    pub fn sender(&self) -> Sender<KeyEvent> {
        self.sender.clone()
    }
}

impl Default for ChannelHook {
    fn default() -> Self {
        Self::new()
    }
}

impl InputHook for ChannelHook {
    fn start(&self, sink: KeySink) -> anyhow::Result<()> {
        let mut running = self
            .running
            .lock()
            .map_err(|_| anyhow::anyhow!("hook state lock poisoned"))?;
        if let Some(current) = running.as_ref() {
            if !current.handle.is_finished() {
                debug!("Input hook already running");
                return Ok(());
            }
        }

        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = stop.clone();
        let receiver = self.receiver.clone();

        let handle = thread::Builder::new()
            .name("input-hook".to_string())
            .spawn(move || {
                let Ok(rx) = receiver.lock() else {
                    return;
                };
                while !thread_stop.load(Ordering::SeqCst) {
                    match rx.recv_timeout(POLL_INTERVAL) {
                        Ok(event) => sink(event),
                        Err(RecvTimeoutError::Timeout) => continue,
                        Err(RecvTimeoutError::Disconnected) => return,
                    }
                }
                // deliver what was sent before the stop
                while let Ok(event) = rx.try_recv() {
                    sink(event);
                }
            })?;

        info!("Input hook started");
        *running = Some(Running { stop, handle });
        Ok(())
    }

    fn stop(&self) {
        let taken = match self.running.lock() {
            Ok(mut running) => running.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        if let Some(running) = taken {
            running.stop.store(true, Ordering::SeqCst);
            if running.handle.join().is_err() {
                error!("Input hook thread panicked");
            }
            info!("Input hook stopped");
        }
    }

    fn is_running(&self) -> bool {
        match self.running.lock() {
            Ok(running) => running.as_ref().is_some_and(|r| !r.handle.is_finished()),
            Err(_) => false,
        }
    }
}

impl Drop for ChannelHook {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trigger::keys::Key;
    use std::time::Instant;

    fn wait_for(mut done: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !done() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
    }

    fn counting_sink() -> (KeySink, Arc<Mutex<usize>>) {
        let count = Arc::new(Mutex::new(0));
        let c = count.clone();
        let sink: KeySink = Arc::new(move |_| *c.lock().unwrap() += 1);
        (sink, count)
    }

    #[test]
    fn test_events_reach_sink() {
        let hook = ChannelHook::new();
        let (sink, count) = counting_sink();
        hook.start(sink).unwrap();
        assert!(hook.is_running());

        hook.sender().send(KeyEvent::press(Key::Char('a'))).unwrap();
        hook.sender().send(KeyEvent::release(Key::Char('a'))).unwrap();
        wait_for(|| *count.lock().unwrap() == 2);
        assert_eq!(*count.lock().unwrap(), 2);

        hook.stop();
        assert!(!hook.is_running());
    }

    #[test]
    fn test_start_twice_keeps_one_thread() {
        let hook = ChannelHook::new();
        let (first, first_count) = counting_sink();
        let (second, second_count) = counting_sink();
        hook.start(first).unwrap();
        hook.start(second).unwrap();

        hook.sender().send(KeyEvent::press(Key::Char('a'))).unwrap();
        wait_for(|| *first_count.lock().unwrap() == 1);
        assert_eq!(*first_count.lock().unwrap(), 1);
        assert_eq!(*second_count.lock().unwrap(), 0);
    }

    #[test]
    fn test_stop_is_idempotent_and_restartable() {
        let hook = ChannelHook::new();
        hook.stop();

        let (sink, count) = counting_sink();
        hook.start(sink.clone()).unwrap();
        hook.stop();
        hook.stop();
        assert!(!hook.is_running());

        hook.start(sink).unwrap();
        hook.sender().send(KeyEvent::press(Key::Char('b'))).unwrap();
        wait_for(|| *count.lock().unwrap() == 1);
        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[test]
    fn test_stop_drains_pending_events() {
        let hook = ChannelHook::new();
        let (sink, count) = counting_sink();
        let sender = hook.sender();
        for _ in 0..5 {
            sender.send(KeyEvent::press(Key::Char('c'))).unwrap();
        }

        hook.start(sink).unwrap();
        hook.stop();
        assert_eq!(*count.lock().unwrap(), 5);
    }
}
