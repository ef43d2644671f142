//! Action catalog
//!
//! Persists action definitions as a JSON document and keeps the built-in
//! actions present. Every edit is saved immediately and announced with
//! `ActionChanged`, also when the save fails.

use anyhow::Context;
use pastesuite_core::domain::action::{
    Action, ActionKind, ActionMode, LocalTransformConfig, LocalTransformKind,
};
use pastesuite_core::domain::capability::{Capability, CapabilityRequirement};
use pastesuite_core::domain::event::DomainEvent;
use pastesuite_core::domain::ids::ActionId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, error, info, warn};

use crate::event_bus::EventBus;

const CATALOG_VERSION: u32 = 1;
const PASTE_PLAIN: &str = "paste_plain";
const PASTE_PLAIN_DISPLAY_KEY: &str = "builtin.paste_plain_unformatted_text";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CatalogDocument {
    #[serde(default = "catalog_version")]
    catalog_version: u32,
    /// Older files stored the list under `hotkeys`
    #[serde(default, alias = "hotkeys")]
    actions: Vec<Action>,
}

fn catalog_version() -> u32 {
    CATALOG_VERSION
}

impl Default for CatalogDocument {
    fn default() -> Self {
        Self {
            catalog_version: CATALOG_VERSION,
            actions: Vec::new(),
        }
    }
}

pub struct ActionCatalog {
    path: PathBuf,
    document: RwLock<CatalogDocument>,
    bus: Arc<EventBus>,
}

impl ActionCatalog {
    /// Loads the catalog from `path`.
    ///
    /// A missing file is seeded with the built-in actions and written out.
    /// An unreadable file is logged and replaced in memory by the built-ins
    /// but left untouched on disk.
    pub fn load(path: impl Into<PathBuf>, bus: Arc<EventBus>) -> Self {
        let path = path.into();
        let catalog = Self {
            document: RwLock::new(CatalogDocument::default()),
            path,
            bus,
        };

        if !catalog.path.exists() {
            info!("No action catalog at {}, seeding built-ins", catalog.path.display());
            catalog.write().actions = builtin_actions();
            catalog.persist();
            return catalog;
        }

        match read_document(&catalog.path) {
            Ok(document) => {
                *catalog.write() = document;
                let cleaned = catalog.cleanup();
                let restored = catalog.ensure_builtins();
                if cleaned || restored {
                    catalog.persist();
                }
            }
            Err(e) => {
                error!("Failed to load action catalog: {:#}", e);
                catalog.write().actions = builtin_actions();
            }
        }

        info!(
            "Loaded {} actions from {}",
            catalog.read().actions.len(),
            catalog.path.display()
        );
        catalog
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get_all_actions(&self) -> Vec<Action> {
        self.read().actions.clone()
    }

    pub fn get_action(&self, id: &ActionId) -> Option<Action> {
        self.read().actions.iter().find(|a| &a.id == id).cloned()
    }

    /// Adds a new action; fails if the id is taken
    pub fn add(&self, action: Action) -> anyhow::Result<()> {
        {
            let mut document = self.write();
            if document.actions.iter().any(|a| a.id == action.id) {
                anyhow::bail!("Action {} already exists", action.id);
            }
            debug!("Adding action {}", action.id);
            document.actions.push(action);
        }
        self.commit()
    }

    /// Replaces the action with the same id; returns false if there is none
    pub fn update(&self, mut action: Action) -> anyhow::Result<bool> {
        {
            let mut document = self.write();
            let Some(existing) = document.actions.iter_mut().find(|a| a.id == action.id) else {
                warn!("Attempted to update non-existent action {}", action.id);
                return Ok(false);
            };
            action.created_at = existing.created_at;
            action.updated_at = chrono::Utc::now();
            *existing = action;
        }
        self.commit()?;
        Ok(true)
    }

    /// Removes an action; returns false if there was none
    pub fn delete(&self, id: &ActionId) -> anyhow::Result<bool> {
        {
            let mut document = self.write();
            let before = document.actions.len();
            document.actions.retain(|a| &a.id != id);
            if document.actions.len() == before {
                return Ok(false);
            }
        }
        self.commit()?;
        Ok(true)
    }

    /// Writes the catalog to disk
    pub fn save(&self) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&*self.read()).context("Failed to serialize action catalog")?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }

    /// Saves, then publishes `ActionChanged` whether or not the save worked;
    /// the in-memory catalog is what this process runs from
    fn commit(&self) -> anyhow::Result<()> {
        let saved = self.save();
        self.bus.publish(&DomainEvent::action_changed());
        saved
    }

    fn persist(&self) {
        if let Err(e) = self.save() {
            error!("Failed to save action catalog: {:#}", e);
        }
    }

    /// Drops stray copies of the plain-paste built-in and duplicate ids
    fn cleanup(&self) -> bool {
        let mut document = self.write();
        let before = document.actions.len();

        let mut seen = HashSet::new();
        document.actions.retain(|a| {
            let stray_plain = a.display_key == PASTE_PLAIN_DISPLAY_KEY && a.id.as_str() != PASTE_PLAIN;
            !stray_plain && seen.insert(a.id.clone())
        });

        let removed = before - document.actions.len();
        if removed > 0 {
            info!("Removed {} legacy or duplicate actions", removed);
        }
        removed > 0
    }

    /// Appends built-ins missing from the catalog
    fn ensure_builtins(&self) -> bool {
        let mut document = self.write();
        let existing: HashSet<ActionId> = document.actions.iter().map(|a| a.id.clone()).collect();

        let mut restored = false;
        for builtin in builtin_actions() {
            if !existing.contains(&builtin.id) {
                info!("Restoring missing built-in action {}", builtin.id);
                document.actions.push(builtin);
                restored = true;
            }
        }
        restored
    }

    fn read(&self) -> RwLockReadGuard<'_, CatalogDocument> {
        self.document.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, CatalogDocument> {
        self.document.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn read_document(path: &Path) -> anyhow::Result<CatalogDocument> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid action catalog in {}", path.display()))
}

/// Actions shipped with the application
pub fn builtin_actions() -> Vec<Action> {
    let mut paste_plain = Action::new(PASTE_PLAIN, ActionKind::BuiltIn, ActionMode::LocalTransform);
    paste_plain.display_key = PASTE_PLAIN_DISPLAY_KEY.to_string();
    paste_plain.description_key = "builtin.paste_plain_desc".to_string();
    paste_plain.enabled = true;
    paste_plain.sequence = 0;
    paste_plain.local_transform_config = Some(LocalTransformConfig {
        kind: LocalTransformKind::Regex,
        pattern: ".*".to_string(),
        replacement: "$0".to_string(),
    });

    let mut ocr_paste = Action::new("ocr_paste", ActionKind::BuiltIn, ActionMode::AiTransform);
    ocr_paste.display_key = "builtin.paste_image_to_text_ocr".to_string();
    ocr_paste.description_key = "builtin.paste_image_to_text_ocr_desc".to_string();
    ocr_paste.sequence = 1;
    ocr_paste.capability_requirements = vec![CapabilityRequirement {
        capability: Capability::Ocr,
        min_sequence: 1,
    }];

    let mut stt_paste = Action::new("stt_paste", ActionKind::BuiltIn, ActionMode::AiTransform);
    stt_paste.display_key = "builtin.paste_audio_microphone_to_text".to_string();
    stt_paste.description_key = "builtin.paste_audio_microphone_to_text_desc".to_string();
    stt_paste.sequence = 2;
    stt_paste.capability_requirements = vec![CapabilityRequirement {
        capability: Capability::Stt,
        min_sequence: 1,
    }];

    vec![paste_plain, ocr_paste, stt_paste]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pastesuite_core::domain::event::EventKind;
    use std::sync::Mutex;

    fn counting_bus() -> (Arc<EventBus>, Arc<Mutex<usize>>) {
        let bus = Arc::new(EventBus::new());
        let count = Arc::new(Mutex::new(0));
        let c = count.clone();
        bus.subscribe(EventKind::ActionChanged, move |_| {
            *c.lock().unwrap() += 1;
            Ok(())
        });
        (bus, count)
    }

    #[test]
    fn test_failed_save_still_publishes_change() {
        let dir = tempfile::tempdir().unwrap();
        // a file where the parent directory should be
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let (bus, count) = counting_bus();
        let catalog = ActionCatalog::load(blocker.join("actions.json"), bus);

        let mut action = Action::new("sign", ActionKind::UserDefined, ActionMode::StaticTextPaste);
        action.direct_hotkey = Some("Ctrl+Alt+S".to_string());
        assert!(catalog.add(action).is_err());

        assert!(catalog.get_action(&ActionId::new("sign")).is_some());
        assert_eq!(*count.lock().unwrap(), 1);
    }

    fn ids(catalog: &ActionCatalog) -> Vec<String> {
        catalog
            .get_all_actions()
            .into_iter()
            .map(|a| a.id.to_string())
            .collect()
    }

    #[test]
    fn test_missing_file_seeds_builtins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("actions.json");
        let (bus, _) = counting_bus();

        let catalog = ActionCatalog::load(&path, bus);
        assert_eq!(ids(&catalog), vec!["paste_plain", "ocr_paste", "stt_paste"]);
        assert!(path.exists());

        let plain = catalog.get_action(&ActionId::new("paste_plain")).unwrap();
        assert!(plain.enabled);
        assert_eq!(plain.mode, ActionMode::LocalTransform);
        assert!(!catalog.get_action(&ActionId::new("ocr_paste")).unwrap().enabled);
    }

    #[test]
    fn test_legacy_document_is_migrated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("actions.json");
        std::fs::write(
            &path,
            r#"{"catalog_version": 1, "hotkeys": [
                {"id": "custom-1", "kind": "custom", "mode": "static_paste", "static_text_template": "hi"},
                {"id": "custom-1", "kind": "custom", "mode": "local_transform"},
                {"id": "5b8e", "kind": "builtin", "mode": "local_transform",
                 "display_key": "builtin.paste_plain_unformatted_text"}
            ]}"#,
        )
        .unwrap();
        let (bus, count) = counting_bus();

        let catalog = ActionCatalog::load(&path, bus);
        assert_eq!(
            ids(&catalog),
            vec!["custom-1", "paste_plain", "ocr_paste", "stt_paste"]
        );
        let custom = catalog.get_action(&ActionId::new("custom-1")).unwrap();
        assert_eq!(custom.mode, ActionMode::StaticTextPaste);
        // loading is not an edit
        assert_eq!(*count.lock().unwrap(), 0);

        let saved = std::fs::read_to_string(&path).unwrap();
        assert!(saved.contains("\"actions\""));
        assert!(!saved.contains("\"hotkeys\""));
    }

    #[test]
    fn test_corrupt_file_falls_back_to_builtins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("actions.json");
        std::fs::write(&path, "{ not json").unwrap();
        let (bus, _) = counting_bus();

        let catalog = ActionCatalog::load(&path, bus);
        assert_eq!(catalog.get_all_actions().len(), 3);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn test_crud_saves_and_publishes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("actions.json");
        let (bus, count) = counting_bus();
        let catalog = ActionCatalog::load(&path, bus.clone());

        let mut action = Action::new("shout", ActionKind::UserDefined, ActionMode::AiTransform);
        action.prompt_template = Some("Shout: {selected_text}".to_string());
        catalog.add(action.clone()).unwrap();
        assert!(catalog.add(action.clone()).is_err());
        assert_eq!(*count.lock().unwrap(), 1);

        action.enabled = true;
        assert!(catalog.update(action).unwrap());
        assert!(catalog.get_action(&ActionId::new("shout")).unwrap().enabled);

        let missing = Action::new("nope", ActionKind::UserDefined, ActionMode::AiTransform);
        assert!(!catalog.update(missing).unwrap());

        assert!(catalog.delete(&ActionId::new("shout")).unwrap());
        assert!(!catalog.delete(&ActionId::new("shout")).unwrap());
        assert_eq!(*count.lock().unwrap(), 3);

        let reloaded = ActionCatalog::load(&path, bus);
        assert!(reloaded.get_action(&ActionId::new("shout")).is_none());
        assert_eq!(reloaded.get_all_actions().len(), 3);
    }
}
