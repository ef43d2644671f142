//! Application root
//!
//! The one place where services are built and wired together. Platform
//! collaborators (secret store, input capture, key hook, providers) are
//! passed in so tests and the CLI can swap them.

use anyhow::Context;
use pastesuite_core::PipelineError;
use pastesuite_core::domain::event::ExecutionStatus;
use pastesuite_core::domain::ids::ActionId;
use pastesuite_providers::{CapabilityRegistry, builtin_registry};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::event_bus::EventBus;
use crate::handlers::{ActionSync, ChordSync, HistoryRecorder, SettingsPersister};
use crate::service::{
    ActionCatalog, ArboardCapture, CommandCopyTrigger, CopyTrigger, ExecutionPipeline,
    HistoryRepository, InputCapture, KeyringSecretStore, SecretStore, SettingsStore,
};
#[cfg(feature = "native-input")]
use crate::service::EnigoCopyTrigger;
use crate::trigger::{InputHook, Trigger, TriggerAgent, TriggerDispatcher};

/// Platform-facing dependencies of the engine
pub struct Collaborators {
    pub secrets: Arc<dyn SecretStore>,
    pub input: Arc<dyn InputCapture>,
    pub hook: Arc<dyn InputHook>,
    pub registry: CapabilityRegistry,
}

impl Collaborators {
    /// OS keyring, system clipboard and the built-in providers
    ///
    /// The copy shortcut is sent by `copy_command` when configured, otherwise
    /// by the native input backend if this build has one.
    pub fn system(config: &EngineConfig, hook: Arc<dyn InputHook>) -> Self {
        let capture = match copy_trigger(config) {
            Some(copy) => ArboardCapture::new().with_copy_trigger(copy),
            None => ArboardCapture::new(),
        };

        Self {
            secrets: Arc::new(KeyringSecretStore::new()),
            input: Arc::new(capture),
            hook,
            registry: builtin_registry(config.request_timeout),
        }
    }
}

fn copy_trigger(config: &EngineConfig) -> Option<Box<dyn CopyTrigger>> {
    if let Some(copy) = config.copy_command.as_deref().and_then(CommandCopyTrigger::parse) {
        debug!("Copy shortcut sent by {:?}", copy);
        return Some(Box::new(copy));
    }
    #[cfg(feature = "native-input")]
    {
        Some(Box::new(EnigoCopyTrigger))
    }
    #[cfg(not(feature = "native-input"))]
    {
        None
    }
}

/// What handling a trigger led to
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerOutcome {
    /// The chord asked for the selection surface
    SurfaceRequested,
    Completed {
        action_id: ActionId,
        output: String,
        status: ExecutionStatus,
    },
    UnknownAction(ActionId),
    Rejected {
        action_id: ActionId,
        error: PipelineError,
    },
}

/// Called with the outcome of every dispatched trigger
pub type TriggerObserver = Arc<dyn Fn(&TriggerOutcome) + Send + Sync>;

/// Runs triggers against the catalog and pipeline
#[derive(Clone)]
pub struct TriggerRunner {
    pipeline: Arc<ExecutionPipeline>,
    catalog: Arc<ActionCatalog>,
}

impl TriggerRunner {
    pub fn new(pipeline: Arc<ExecutionPipeline>, catalog: Arc<ActionCatalog>) -> Self {
        Self { pipeline, catalog }
    }

    /// Handles one trigger to completion, draining the action's stream
    pub fn on_trigger(&self, trigger: Trigger) -> TriggerOutcome {
        let action_id = match trigger {
            Trigger::Chord => {
                info!("Selection surface requested");
                return TriggerOutcome::SurfaceRequested;
            }
            Trigger::Action(action_id) => action_id,
        };

        let Some(action) = self.catalog.get_action(&action_id) else {
            warn!("Action not found for trigger: {}", action_id);
            return TriggerOutcome::UnknownAction(action_id);
        };

        let mut stream = match self.pipeline.execute(&action) {
            Ok(stream) => stream,
            Err(error) => {
                warn!("Action {} validation failed: {}", action_id, error);
                return TriggerOutcome::Rejected { action_id, error };
            }
        };

        let output: String = stream.by_ref().collect();
        info!(
            "Action {} executed: {} chars ({})",
            action_id,
            output.chars().count(),
            stream.status()
        );
        TriggerOutcome::Completed {
            action_id,
            output,
            status: stream.status(),
        }
    }
}

/// Every service, wired
pub struct AppServices {
    pub config: EngineConfig,
    pub bus: Arc<EventBus>,
    pub secrets: Arc<dyn SecretStore>,
    pub settings: Arc<SettingsStore>,
    pub catalog: Arc<ActionCatalog>,
    pub history: Arc<HistoryRepository>,
    pub registry: Arc<CapabilityRegistry>,
    pub pipeline: Arc<ExecutionPipeline>,
    pub runner: TriggerRunner,
    pub agent: Arc<TriggerAgent>,
}

impl AppServices {
    /// Builds and wires all services.
    ///
    /// `observer`, if given, sees the outcome of every trigger the agent
    /// dispatches.
    pub fn build(
        config: EngineConfig,
        collaborators: Collaborators,
        observer: Option<TriggerObserver>,
    ) -> anyhow::Result<Self> {
        config.validate().context("Invalid engine configuration")?;
        let Collaborators {
            secrets,
            input,
            hook,
            registry,
        } = collaborators;

        let bus = Arc::new(EventBus::new());
        let settings = Arc::new(SettingsStore::load(
            &config.settings_path,
            bus.clone(),
            secrets.clone(),
        ));
        let catalog = Arc::new(ActionCatalog::load(&config.actions_path, bus.clone()));
        let history = Arc::new(HistoryRepository::new(config.history_capacity));
        let registry = Arc::new(registry);
        info!("{} providers registered", registry.list_all().len());

        let pipeline = Arc::new(ExecutionPipeline::new(
            settings.clone(),
            registry.clone(),
            secrets.clone(),
            input,
            bus.clone(),
        ));
        let runner = TriggerRunner::new(pipeline.clone(), catalog.clone());

        let handler_runner = runner.clone();
        let dispatcher = TriggerDispatcher::new(
            config.max_parallel_triggers,
            Arc::new(move |trigger: Trigger| {
                debug!("Handling {}", trigger);
                let outcome = handler_runner.on_trigger(trigger);
                if let Some(observer) = &observer {
                    observer(&outcome);
                }
            }),
        )
        .context("Failed to start trigger workers")?;

        let agent = Arc::new(TriggerAgent::from_config(
            hook,
            &settings.snapshot().hotkeys,
            dispatcher,
        ));
        agent.update_actions(&catalog.get_all_actions());

        HistoryRecorder::new(history.clone(), settings.clone()).subscribe(&bus);
        ActionSync::new(&agent, catalog.clone()).subscribe(&bus);
        SettingsPersister::new(settings.clone()).subscribe(&bus);
        ChordSync::new(&agent, settings.clone()).subscribe(&bus);

        info!("Services initialized");
        Ok(Self {
            config,
            bus,
            secrets,
            settings,
            catalog,
            history,
            registry,
            pipeline,
            runner,
            agent,
        })
    }

    /// Starts listening for key events
    pub fn start(&self) -> anyhow::Result<()> {
        self.agent.start().context("Failed to start input hook")
    }

    pub fn stop(&self) {
        self.agent.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{InMemorySecretStore, StaticCapture};
    use crate::trigger::{ChannelHook, Key, KeyEvent, Modifier};
    use pastesuite_core::ErrorCategory;
    use pastesuite_core::domain::action::{Action, ActionKind, ActionMode};
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    fn wait_for(mut done: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !done() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    fn build(dir: &std::path::Path) -> (AppServices, Arc<Mutex<Vec<TriggerOutcome>>>) {
        let outcomes = Arc::new(Mutex::new(Vec::new()));
        let o = outcomes.clone();
        let collaborators = Collaborators {
            secrets: Arc::new(InMemorySecretStore::new()),
            input: Arc::new(StaticCapture::new().with_selection("Hello")),
            hook: Arc::new(ChannelHook::new()),
            registry: builtin_registry(Duration::from_secs(5)),
        };
        let observer: TriggerObserver =
            Arc::new(move |outcome: &TriggerOutcome| o.lock().unwrap().push(outcome.clone()));
        let app = AppServices::build(EngineConfig::new(dir), collaborators, Some(observer)).unwrap();
        (app, outcomes)
    }

    fn press(app: &AppServices, key: Key) {
        app.agent.handle_event(KeyEvent::press(key));
    }

    #[test]
    fn test_builtin_plain_paste_runs() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = build(dir.path());

        let outcome = app.runner.on_trigger(Trigger::Action(ActionId::new("paste_plain")));
        assert_eq!(
            outcome,
            TriggerOutcome::Completed {
                action_id: ActionId::new("paste_plain"),
                output: "Hello".to_string(),
                status: ExecutionStatus::Success,
            }
        );
        assert!(dir.path().join("actions.json").exists());
    }

    #[test]
    fn test_unconfigured_actions_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = build(dir.path());

        assert_eq!(
            app.runner.on_trigger(Trigger::Action(ActionId::new("missing"))),
            TriggerOutcome::UnknownAction(ActionId::new("missing"))
        );

        // no clipboard image
        match app.runner.on_trigger(Trigger::Action(ActionId::new("ocr_paste"))) {
            TriggerOutcome::Rejected { error, .. } => {
                assert_eq!(error.category, ErrorCategory::MissingInput)
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_new_hotkey_is_live_after_add() {
        let dir = tempfile::tempdir().unwrap();
        let (app, outcomes) = build(dir.path());

        let mut action = Action::new("sign", ActionKind::UserDefined, ActionMode::StaticTextPaste);
        action.enabled = true;
        action.direct_hotkey = Some("Ctrl+Alt+S".to_string());
        action.static_text_template = Some("Regards".to_string());
        app.catalog.add(action).unwrap();
        assert_eq!(app.agent.hotkeys().len(), 1);

        press(&app, Key::Modifier(Modifier::Ctrl));
        press(&app, Key::Modifier(Modifier::Alt));
        press(&app, Key::Char('s'));

        wait_for(|| !outcomes.lock().unwrap().is_empty());
        assert_eq!(
            outcomes.lock().unwrap()[0],
            TriggerOutcome::Completed {
                action_id: ActionId::new("sign"),
                output: "Regards".to_string(),
                status: ExecutionStatus::Success,
            }
        );
    }

    #[test]
    fn test_chord_reaches_observer_and_follows_settings() {
        let dir = tempfile::tempdir().unwrap();
        let (app, outcomes) = build(dir.path());

        app.settings.update(|s| s.hotkeys.main_trigger.chord = "Alt+X,X".to_string());
        assert!(dir.path().join("settings.json").exists());

        // the default chord no longer fires
        press(&app, Key::Modifier(Modifier::Ctrl));
        press(&app, Key::Char('v'));
        press(&app, Key::Char('v'));
        app.agent.handle_event(KeyEvent::release(Key::Modifier(Modifier::Ctrl)));

        press(&app, Key::Modifier(Modifier::Alt));
        press(&app, Key::Char('x'));
        press(&app, Key::Char('x'));

        wait_for(|| !outcomes.lock().unwrap().is_empty());
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(*outcomes.lock().unwrap(), vec![TriggerOutcome::SurfaceRequested]);
    }

    #[test]
    fn test_history_records_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = build(dir.path());
        let plain = Trigger::Action(ActionId::new("paste_plain"));

        app.runner.on_trigger(plain.clone());
        assert!(app.history.is_empty());

        app.settings.update(|s| s.history.enabled = true);
        app.runner.on_trigger(plain);
        let entries = app.history.recent(5);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].output_preview, "Hello");
    }
}
