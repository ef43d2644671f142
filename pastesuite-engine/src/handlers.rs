//! Side-effect handlers
//!
//! Each handler reacts to one kind of domain event. They are wired onto the
//! event bus by the application root.

use pastesuite_core::domain::event::{DomainEvent, EventKind, EventPayload};
use pastesuite_core::domain::history::HistoryEntry;
use std::sync::{Arc, Weak};
use tracing::debug;

use crate::event_bus::EventBus;
use crate::redact;
use crate::service::{ActionCatalog, HistoryRepository, SettingsStore};
use crate::trigger::TriggerAgent;

/// Records completed executions while history is enabled in settings
pub struct HistoryRecorder {
    history: Arc<HistoryRepository>,
    settings: Arc<SettingsStore>,
}

impl HistoryRecorder {
    pub fn new(history: Arc<HistoryRepository>, settings: Arc<SettingsStore>) -> Self {
        Self { history, settings }
    }

    pub fn handle(&self, event: &DomainEvent) -> anyhow::Result<()> {
        let Some(completed) = event.as_execution_completed() else {
            return Ok(());
        };
        if !self.settings.snapshot().history.enabled {
            return Ok(());
        }

        self.history.add(HistoryEntry {
            action_id: completed.action_id.clone(),
            timestamp: event.timestamp,
            duration: completed.duration.as_secs_f64(),
            input_preview: redact::redact(&completed.input_preview),
            output_preview: redact::redact(&completed.output_preview),
            model_id: completed.model_id.clone(),
            status: completed.status,
        });
        debug!("Recorded history for {}", completed.action_id);
        Ok(())
    }

    pub fn subscribe(self, bus: &EventBus) {
        bus.subscribe(EventKind::ExecutionCompleted, move |event| self.handle(event));
    }
}

/// Keeps the trigger agent's hotkeys in line with the catalog.
///
/// Holds the agent weakly: the agent owns the dispatcher, which reaches the
/// bus through the pipeline.
pub struct ActionSync {
    agent: Weak<TriggerAgent>,
    catalog: Arc<ActionCatalog>,
}

impl ActionSync {
    pub fn new(agent: &Arc<TriggerAgent>, catalog: Arc<ActionCatalog>) -> Self {
        Self {
            agent: Arc::downgrade(agent),
            catalog,
        }
    }

    pub fn handle(&self, _event: &DomainEvent) -> anyhow::Result<()> {
        if let Some(agent) = self.agent.upgrade() {
            agent.update_actions(&self.catalog.get_all_actions());
        }
        Ok(())
    }

    pub fn subscribe(self, bus: &EventBus) {
        bus.subscribe(EventKind::ActionChanged, move |event| self.handle(event));
    }
}

/// Writes settings to disk whenever they or a connection change
pub struct SettingsPersister {
    settings: Arc<SettingsStore>,
}

impl SettingsPersister {
    pub fn new(settings: Arc<SettingsStore>) -> Self {
        Self { settings }
    }

    pub fn handle(&self, event: &DomainEvent) -> anyhow::Result<()> {
        if let EventPayload::ConnectionChanged { connection_id } = &event.payload {
            debug!("Persisting settings after change to {}", connection_id);
        }
        self.settings.save()
    }

    pub fn subscribe(self, bus: &EventBus) {
        let handler = Arc::new(self);
        for kind in [EventKind::SettingsChanged, EventKind::ConnectionChanged] {
            let handler = handler.clone();
            bus.subscribe(kind, move |event| handler.handle(event));
        }
    }
}

/// Re-arms the chord when the hotkey settings change
pub struct ChordSync {
    agent: Weak<TriggerAgent>,
    settings: Arc<SettingsStore>,
}

impl ChordSync {
    pub fn new(agent: &Arc<TriggerAgent>, settings: Arc<SettingsStore>) -> Self {
        Self {
            agent: Arc::downgrade(agent),
            settings,
        }
    }

    pub fn handle(&self, _event: &DomainEvent) -> anyhow::Result<()> {
        if let Some(agent) = self.agent.upgrade() {
            agent.reconfigure(&self.settings.snapshot().hotkeys);
        }
        Ok(())
    }

    pub fn subscribe(self, bus: &EventBus) {
        bus.subscribe(EventKind::SettingsChanged, move |event| self.handle(event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::secrets::InMemorySecretStore;
    use pastesuite_core::domain::event::{ExecutionCompleted, ExecutionStatus};
    use pastesuite_core::domain::ids::{ActionId, ConnectionId};
    use pastesuite_core::domain::settings::Settings;
    use std::time::Duration;

    fn completed(input: &str) -> DomainEvent {
        DomainEvent::execution_completed(ExecutionCompleted {
            action_id: ActionId::new("a"),
            connection_id: ConnectionId::new("c1"),
            model_id: "gpt-4o".to_string(),
            duration: Duration::from_millis(1500),
            input_preview: input.to_string(),
            output_preview: "done".to_string(),
            status: ExecutionStatus::Success,
        })
    }

    fn settings_store(path: &std::path::Path, bus: Arc<EventBus>) -> Arc<SettingsStore> {
        Arc::new(SettingsStore::with_settings(
            path,
            Settings::default(),
            bus,
            Arc::new(InMemorySecretStore::new()),
        ))
    }

    #[test]
    fn test_history_respects_enabled_flag() {
        let bus = Arc::new(EventBus::new());
        let settings = settings_store(std::path::Path::new("unused.json"), bus.clone());
        let history = Arc::new(HistoryRepository::new(10));
        HistoryRecorder::new(history.clone(), settings.clone()).subscribe(&bus);

        bus.publish(&completed("first"));
        assert!(history.is_empty());

        // update publishes SettingsChanged, which has no subscriber here
        settings.update(|s| s.history.enabled = true);
        bus.publish(&completed("password=hunter2"));

        let entries = history.recent(10);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].input_preview, "[REDACTED]");
        assert_eq!(entries[0].duration, 1.5);
        assert_eq!(entries[0].model_id, "gpt-4o");
    }

    #[test]
    fn test_settings_persisted_on_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let bus = Arc::new(EventBus::new());
        let settings = settings_store(&path, bus.clone());
        SettingsPersister::new(settings.clone()).subscribe(&bus);

        settings.update(|s| s.history.max_entries = 25);
        assert_eq!(Settings::load(&path).history.max_entries, 25);

        std::fs::remove_file(&path).unwrap();
        bus.publish(&DomainEvent::connection_changed(ConnectionId::new("c1")));
        assert!(path.exists());
    }
}
