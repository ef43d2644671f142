//! OS keyboard hook
//!
//! [`RdevHook`] listens to the system-wide key stream through `rdev`. The
//! listener only observes events and never swallows them, so the chord
//! (`Ctrl+V,V`) keeps pasting normally in the focused application.
//!
//! `rdev::listen` blocks its thread for the life of the process and cannot
//! be cancelled, so the listener thread is spawned once and `stop` only
//! detaches the sink.

use std::sync::mpsc;
use std::sync::{Arc, Mutex, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info};

use super::hook::{InputHook, KeySink};
use super::keys::{Key, KeyEvent, Modifier, NamedKey};

/// How long `start` waits for the listener to report a setup failure
const STARTUP_GRACE: Duration = Duration::from_millis(200);

/// Hook over the platform's global key events
#[derive(Default)]
pub struct RdevHook {
    sink: Arc<RwLock<Option<KeySink>>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl RdevHook {
    pub fn new() -> Self {
        Self::default()
    }

    fn listener_alive(&self) -> bool {
        match self.listener.lock() {
            Ok(listener) => listener.as_ref().is_some_and(|h| !h.is_finished()),
            Err(_) => false,
        }
    }

    fn set_sink(&self, sink: Option<KeySink>) {
        match self.sink.write() {
            Ok(mut current) => *current = sink,
            Err(poisoned) => *poisoned.into_inner() = sink,
        }
    }

    fn has_sink(&self) -> bool {
        match self.sink.read() {
            Ok(current) => current.is_some(),
            Err(poisoned) => poisoned.into_inner().is_some(),
        }
    }
}

impl InputHook for RdevHook {
    fn start(&self, sink: KeySink) -> anyhow::Result<()> {
        if self.has_sink() && self.listener_alive() {
            debug!("Keyboard hook already running");
            return Ok(());
        }
        self.set_sink(Some(sink));

        let mut listener = self
            .listener
            .lock()
            .map_err(|_| anyhow::anyhow!("hook state lock poisoned"))?;
        if listener.as_ref().is_some_and(|h| !h.is_finished()) {
            info!("Keyboard hook resumed");
            return Ok(());
        }

        let (failed_tx, failed_rx) = mpsc::channel();
        let shared = self.sink.clone();
        let handle = thread::Builder::new()
            .name("keyboard-hook".to_string())
            .spawn(move || {
                let result = rdev::listen(move |event| {
                    let Some(event) = map_event(&event) else {
                        return;
                    };
                    let sink = match shared.read() {
                        Ok(sink) => sink.clone(),
                        Err(_) => None,
                    };
                    if let Some(sink) = sink {
                        sink(event);
                    }
                });
                if let Err(e) = result {
                    let _ = failed_tx.send(format!("{:?}", e));
                }
            })?;

        if let Ok(reason) = failed_rx.recv_timeout(STARTUP_GRACE) {
            self.set_sink(None);
            anyhow::bail!("Keyboard hook failed to start: {}", reason);
        }

        info!("Keyboard hook started");
        *listener = Some(handle);
        Ok(())
    }

    fn stop(&self) {
        if self.has_sink() {
            self.set_sink(None);
            info!("Keyboard hook stopped");
        }
    }

    fn is_running(&self) -> bool {
        self.has_sink() && self.listener_alive()
    }
}

impl Drop for RdevHook {
    fn drop(&mut self) {
        // the listener thread outlives the hook; it just has nowhere to deliver
        self.set_sink(None);
    }
}

fn map_event(event: &rdev::Event) -> Option<KeyEvent> {
    match &event.event_type {
        rdev::EventType::KeyPress(key) => map_key(*key).map(KeyEvent::press),
        rdev::EventType::KeyRelease(key) => map_key(*key).map(KeyEvent::release),
        _ => None,
    }
}

/// Maps an `rdev` key; left and right modifiers collapse into one
pub fn map_key(key: rdev::Key) -> Option<Key> {
    use rdev::Key as K;

    let mapped = match key {
        K::ControlLeft | K::ControlRight => Key::Modifier(Modifier::Ctrl),
        K::ShiftLeft | K::ShiftRight => Key::Modifier(Modifier::Shift),
        K::Alt | K::AltGr => Key::Modifier(Modifier::Alt),
        K::MetaLeft | K::MetaRight => Key::Modifier(Modifier::Meta),

        K::Return | K::KpReturn => Key::Named(NamedKey::Enter),
        K::Escape => Key::Named(NamedKey::Escape),
        K::Tab => Key::Named(NamedKey::Tab),
        K::Space => Key::Named(NamedKey::Space),
        K::Backspace => Key::Named(NamedKey::Backspace),
        K::Delete | K::KpDelete => Key::Named(NamedKey::Delete),
        K::Insert => Key::Named(NamedKey::Insert),
        K::UpArrow => Key::Named(NamedKey::Up),
        K::DownArrow => Key::Named(NamedKey::Down),
        K::LeftArrow => Key::Named(NamedKey::Left),
        K::RightArrow => Key::Named(NamedKey::Right),
        K::Home => Key::Named(NamedKey::Home),
        K::End => Key::Named(NamedKey::End),
        K::PageUp => Key::Named(NamedKey::PageUp),
        K::PageDown => Key::Named(NamedKey::PageDown),
        K::F1 => Key::Named(NamedKey::F(1)),
        K::F2 => Key::Named(NamedKey::F(2)),
        K::F3 => Key::Named(NamedKey::F(3)),
        K::F4 => Key::Named(NamedKey::F(4)),
        K::F5 => Key::Named(NamedKey::F(5)),
        K::F6 => Key::Named(NamedKey::F(6)),
        K::F7 => Key::Named(NamedKey::F(7)),
        K::F8 => Key::Named(NamedKey::F(8)),
        K::F9 => Key::Named(NamedKey::F(9)),
        K::F10 => Key::Named(NamedKey::F(10)),
        K::F11 => Key::Named(NamedKey::F(11)),
        K::F12 => Key::Named(NamedKey::F(12)),

        other => Key::Char(key_char(other)?),
    };
    Some(mapped)
}

fn key_char(key: rdev::Key) -> Option<char> {
    use rdev::Key as K;

    let c = match key {
        K::KeyA => 'a',
        K::KeyB => 'b',
        K::KeyC => 'c',
        K::KeyD => 'd',
        K::KeyE => 'e',
        K::KeyF => 'f',
        K::KeyG => 'g',
        K::KeyH => 'h',
        K::KeyI => 'i',
        K::KeyJ => 'j',
        K::KeyK => 'k',
        K::KeyL => 'l',
        K::KeyM => 'm',
        K::KeyN => 'n',
        K::KeyO => 'o',
        K::KeyP => 'p',
        K::KeyQ => 'q',
        K::KeyR => 'r',
        K::KeyS => 's',
        K::KeyT => 't',
        K::KeyU => 'u',
        K::KeyV => 'v',
        K::KeyW => 'w',
        K::KeyX => 'x',
        K::KeyY => 'y',
        K::KeyZ => 'z',
        K::Num0 | K::Kp0 => '0',
        K::Num1 | K::Kp1 => '1',
        K::Num2 | K::Kp2 => '2',
        K::Num3 | K::Kp3 => '3',
        K::Num4 | K::Kp4 => '4',
        K::Num5 | K::Kp5 => '5',
        K::Num6 | K::Kp6 => '6',
        K::Num7 | K::Kp7 => '7',
        K::Num8 | K::Kp8 => '8',
        K::Num9 | K::Kp9 => '9',
        K::Minus | K::KpMinus => '-',
        K::Equal => '=',
        K::KpPlus => '+',
        K::KpMultiply => '*',
        K::KpDivide | K::Slash => '/',
        K::Comma => ',',
        K::Dot => '.',
        K::SemiColon => ';',
        K::Quote => '\'',
        K::BackQuote => '`',
        K::BackSlash | K::IntlBackslash => '\\',
        K::LeftBracket => '[',
        K::RightBracket => ']',
        _ => return None,
    };
    Some(c)
}
