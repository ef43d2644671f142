//! Chord state machine
//!
//! Recognizes "hold modifier, press key twice within the timeout". A second
//! press that arrives too late does not reset the machine; it becomes the
//! new first press, so the user can complete the pair with one more press.

use std::time::{Duration, Instant};
use tracing::debug;

use super::keys::{ChordSpec, Key, KeyAction, KeyEvent, Modifier, Modifiers};

/// Keys that may be pressed between the two chord presses
const PASS_THROUGH: [Modifier; 2] = [Modifier::Shift, Modifier::Alt];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChordState {
    Idle,
    ModifierHeld,
    FirstPressed { at: Instant },
}

#[derive(Debug, Clone)]
pub struct ChordMachine {
    spec: ChordSpec,
    timeout: Duration,
    modifier_held: bool,
    first_press: Option<Instant>,
    /// Every modifier currently down, used for direct hotkey matching
    held: Modifiers,
}

impl ChordMachine {
    pub fn new(spec: ChordSpec, timeout: Duration) -> Self {
        Self {
            spec,
            timeout,
            modifier_held: false,
            first_press: None,
            held: Modifiers::empty(),
        }
    }

    pub fn spec(&self) -> ChordSpec {
        self.spec
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn state(&self) -> ChordState {
        match (self.modifier_held, self.first_press) {
            (false, _) => ChordState::Idle,
            (true, None) => ChordState::ModifierHeld,
            (true, Some(at)) => ChordState::FirstPressed { at },
        }
    }

    /// Modifiers currently held down
    pub fn held(&self) -> Modifiers {
        self.held
    }

    /// Feeds one event; returns true when the chord fires
    pub fn handle(&mut self, event: &KeyEvent) -> bool {
        match event.action {
            KeyAction::Press => self.on_press(event.key, event.at),
            KeyAction::Release => {
                self.on_release(event.key);
                false
            }
        }
    }

    fn on_press(&mut self, key: Key, at: Instant) -> bool {
        if let Key::Modifier(m) = key {
            self.held.insert(m);
            if m == self.spec.modifier {
                self.modifier_held = true;
                return false;
            }
        }

        if key == self.spec.key {
            if !self.modifier_held {
                self.reset();
                return false;
            }

            match self.first_press {
                None => {
                    self.first_press = Some(at);
                    debug!("Chord: first {} pressed", self.spec.key);
                }
                Some(first) => {
                    let elapsed = at.saturating_duration_since(first);
                    if elapsed <= self.timeout {
                        debug!("Chord: triggered after {:?}", elapsed);
                        self.reset();
                        return true;
                    }
                    debug!("Chord: {:?} exceeds timeout, restarting pair", elapsed);
                    self.first_press = Some(at);
                }
            }
            return false;
        }

        let pass_through = key
            .as_modifier()
            .is_some_and(|m| PASS_THROUGH.contains(&m));
        if !pass_through {
            self.reset();
        }
        false
    }

    fn on_release(&mut self, key: Key) {
        if let Key::Modifier(m) = key {
            self.held.remove(m);
            if m == self.spec.modifier {
                self.modifier_held = false;
                self.reset();
            }
        }
    }

    /// Clears the pending first press; the modifier may still be held
    fn reset(&mut self) {
        self.first_press = None;
    }
}
