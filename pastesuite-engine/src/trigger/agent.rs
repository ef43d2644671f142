//! Trigger agent
//!
//! Turns raw key events into chord and direct-hotkey triggers. The chord
//! state is mutated under one lock on the hook thread; the lock is released
//! before a trigger is dispatched.

use pastesuite_core::domain::action::Action;
use pastesuite_core::domain::ids::ActionId;
use pastesuite_core::domain::settings::{DEFAULT_CHORD, HotkeysConfig};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::chord::ChordMachine;
use super::dispatch::{Trigger, TriggerDispatcher};
use super::hook::{InputHook, KeySink};
use super::keys::{ChordSpec, Hotkey, KeyEvent};

struct AgentInner {
    chord: Mutex<ChordMachine>,
    hotkeys: RwLock<HashMap<Hotkey, ActionId>>,
    dispatcher: TriggerDispatcher,
}

impl AgentInner {
    fn on_event(&self, event: KeyEvent) {
        let (fired, held) = {
            let mut chord = match self.chord.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            (chord.handle(&event), chord.held())
        };

        let trigger = if fired {
            Some(Trigger::Chord)
        } else if event.is_press() && event.key.as_modifier().is_none() {
            let hotkey = Hotkey::new(held, event.key);
            let hotkeys = match self.hotkeys.read() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            hotkeys.get(&hotkey).cloned().map(Trigger::Action)
        } else {
            None
        };

        if let Some(trigger) = trigger {
            info!("Trigger fired: {}", trigger);
            self.dispatcher.dispatch(trigger);
        }
    }
}

pub struct TriggerAgent {
    hook: Arc<dyn InputHook>,
    inner: Arc<AgentInner>,
}

impl TriggerAgent {
    pub fn new(
        hook: Arc<dyn InputHook>,
        chord: ChordSpec,
        timeout: Duration,
        dispatcher: TriggerDispatcher,
    ) -> Self {
        Self {
            hook,
            inner: Arc::new(AgentInner {
                chord: Mutex::new(ChordMachine::new(chord, timeout)),
                hotkeys: RwLock::new(HashMap::new()),
                dispatcher,
            }),
        }
    }

    /// Creates an agent using the chord configured in settings
    pub fn from_config(
        hook: Arc<dyn InputHook>,
        config: &HotkeysConfig,
        dispatcher: TriggerDispatcher,
    ) -> Self {
        let (chord, timeout) = chord_from_config(config);
        Self::new(hook, chord, timeout, dispatcher)
    }

    /// Starts the input hook; calling it while running has no effect
    pub fn start(&self) -> anyhow::Result<()> {
        let inner = self.inner.clone();
        let sink: KeySink = Arc::new(move |event| inner.on_event(event));
        self.hook.start(sink)
    }

    /// Stops the input hook and forgets any half-entered chord
    pub fn stop(&self) {
        self.hook.stop();
        let mut chord = match self.inner.chord.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *chord = ChordMachine::new(chord.spec(), chord.timeout());
    }

    pub fn is_running(&self) -> bool {
        self.hook.is_running()
    }

    /// Waits for dispatched triggers to finish; false if `timeout` passed
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        self.inner.dispatcher.wait_idle(timeout)
    }

    /// Replaces the chord definition, e.g. after a settings change
    pub fn reconfigure(&self, config: &HotkeysConfig) {
        let (spec, timeout) = chord_from_config(config);
        let mut chord = match self.inner.chord.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if chord.spec() != spec || chord.timeout() != timeout {
            info!("Chord set to {} ({:?})", spec, timeout);
            *chord = ChordMachine::new(spec, timeout);
        }
    }

    /// Rebuilds the direct-hotkey mapping from `actions`.
    ///
    /// Only enabled actions with a binding are registered. Malformed or
    /// duplicate bindings are logged and skipped. Returns the number of
    /// registered hotkeys.
    pub fn update_actions(&self, actions: &[Action]) -> usize {
        let mut mapping = HashMap::new();

        for action in actions {
            let Some(binding) = action.active_hotkey() else {
                continue;
            };

            let hotkey: Hotkey = match binding.parse() {
                Ok(hotkey) => hotkey,
                Err(e) => {
                    warn!("Skipping hotkey {:?} for action {}: {}", binding, action.id, e);
                    continue;
                }
            };

            match mapping.entry(hotkey) {
                Entry::Vacant(slot) => {
                    debug!("Registered hotkey {} -> {}", hotkey, action.id);
                    slot.insert(action.id.clone());
                }
                Entry::Occupied(existing) => warn!(
                    "Skipping hotkey {} for action {}: already bound to {}",
                    hotkey,
                    action.id,
                    existing.get()
                ),
            }
        }

        let count = mapping.len();
        let mut hotkeys = match self.inner.hotkeys.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *hotkeys = mapping;
        info!("Registered {} direct hotkey(s)", count);
        count
    }

    /// Current hotkey bindings
    pub fn hotkeys(&self) -> Vec<(Hotkey, ActionId)> {
        let hotkeys = match self.inner.hotkeys.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        hotkeys.iter().map(|(k, v)| (*k, v.clone())).collect()
    }

    /// Feeds one event as if it came from the hook
    pub fn handle_event(&self, event: KeyEvent) {
        self.inner.on_event(event);
    }
}

fn chord_from_config(config: &HotkeysConfig) -> (ChordSpec, Duration) {
    let timeout = Duration::from_millis(config.main_trigger.second_v_timeout_ms);
    let spec = match config.main_trigger.chord.parse() {
        Ok(spec) => spec,
        Err(e) => {
            warn!(
                "Invalid chord {:?}, using {}: {}",
                config.main_trigger.chord, DEFAULT_CHORD, e
            );
            ChordSpec::default()
        }
    };
    (spec, timeout)
}
