//! Settings store
//!
//! Single owner of the settings document. Readers take an immutable
//! [`Arc<Settings>`] snapshot, so an execution keeps the view it validated
//! against even if settings change mid-stream. Writers swap in a new snapshot
//! and publish the matching change event; persisting to disk is left to the
//! event handlers.

use anyhow::Context;
use pastesuite_core::domain::connection::Connection;
use pastesuite_core::domain::event::DomainEvent;
use pastesuite_core::domain::ids::ConnectionId;
use pastesuite_core::domain::settings::Settings;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

use super::secrets::{API_KEY, SecretStore};
use crate::event_bus::EventBus;

pub struct SettingsStore {
    path: PathBuf,
    current: RwLock<Arc<Settings>>,
    bus: Arc<EventBus>,
    secrets: Arc<dyn SecretStore>,
}

impl SettingsStore {
    /// Loads settings from `path`; a missing or broken file yields defaults
    pub fn load(path: impl Into<PathBuf>, bus: Arc<EventBus>, secrets: Arc<dyn SecretStore>) -> Self {
        let path = path.into();
        let settings = Settings::load(&path);
        info!(
            "Loaded settings from {} ({} connections)",
            path.display(),
            settings.connections.len()
        );
        Self::with_settings(path, settings, bus, secrets)
    }

    pub fn with_settings(
        path: impl Into<PathBuf>,
        settings: Settings,
        bus: Arc<EventBus>,
        secrets: Arc<dyn SecretStore>,
    ) -> Self {
        Self {
            path: path.into(),
            current: RwLock::new(Arc::new(settings)),
            bus,
            secrets,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current settings; later writes do not affect the returned value
    pub fn snapshot(&self) -> Arc<Settings> {
        match self.current.read() {
            Ok(current) => current.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Applies `f` to a copy of the settings and publishes `SettingsChanged`
    pub fn update<F>(&self, f: F) -> Arc<Settings>
    where
        F: FnOnce(&mut Settings),
    {
        let next = self.replace(f);
        self.bus.publish(&DomainEvent::settings_changed());
        next
    }

    /// Adds or replaces a connection by id and publishes `ConnectionChanged`
    pub fn upsert_connection(&self, connection: Connection) {
        let id = connection.connection_id.clone();
        self.replace(|settings| {
            match settings
                .connections
                .iter_mut()
                .find(|c| c.connection_id == connection.connection_id)
            {
                Some(existing) => *existing = connection,
                None => settings.connections.push(connection),
            }
        });
        info!("Connection {} saved", id);
        self.bus.publish(&DomainEvent::connection_changed(id));
    }

    /// Removes a connection and its stored secret.
    ///
    /// Routing defaults pointing at the connection are cleared. Returns false
    /// if the connection did not exist.
    pub fn remove_connection(&self, id: &ConnectionId) -> bool {
        let mut removed = false;
        self.replace(|settings| {
            let before = settings.connections.len();
            settings.connections.retain(|c| &c.connection_id != id);
            removed = settings.connections.len() != before;

            let routing = &mut settings.routing_defaults;
            for slot in [
                &mut routing.default_llm_connection_id,
                &mut routing.default_stt_connection_id,
                &mut routing.default_ocr_connection_id,
            ] {
                if slot.as_ref() == Some(id) {
                    *slot = None;
                }
            }
        });

        if !removed {
            return false;
        }

        if let Err(e) = self.secrets.delete(id, API_KEY) {
            warn!("Failed to delete secret for {}: {}", id, e);
        }
        info!("Connection {} removed", id);
        self.bus.publish(&DomainEvent::connection_changed(id.clone()));
        true
    }

    /// Writes the current snapshot to disk
    pub fn save(&self) -> anyhow::Result<()> {
        self.snapshot()
            .save(&self.path)
            .with_context(|| format!("Failed to persist settings to {}", self.path.display()))
    }

    fn replace<F>(&self, f: F) -> Arc<Settings>
    where
        F: FnOnce(&mut Settings),
    {
        let mut current = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut next = Settings::clone(&current);
        f(&mut next);
        let next = Arc::new(next);
        *current = next.clone();
        next
    }
}
