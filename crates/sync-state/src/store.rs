//! Mutex-guarded load/save for every state file. The atomic-update
//! rule (spec.md §4.5): read, transform in memory, write to a sibling
//! temp file, fsync, rename over the target. No in-place edits.

use std::path::Path;
use std::sync::Mutex;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::StateError;
use crate::layout::StateLayout;

/// Intra-process serialization point for all state mutations (spec.md
/// §5 "Shared resources" — state files are the only shared mutable
/// resource, and are always touched through this mutex).
pub struct StateStore {
    layout: StateLayout,
    guard: Mutex<()>,
}

impl StateStore {
    pub fn new(layout: StateLayout) -> Self {
        Self {
            layout,
            guard: Mutex::new(()),
        }
    }

    pub fn layout(&self) -> &StateLayout {
        &self.layout
    }

    /// Load a JSON state file, returning `None` when it doesn't exist
    /// yet (first run).
    pub fn load<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>, StateError> {
        let _lock = self.guard.lock().unwrap();
        load_uncontended(path)
    }

    /// Transform the current value of a state file under the lock and
    /// persist the result atomically. `default` supplies the value
    /// used when the file doesn't exist yet.
    pub fn update<T, F>(&self, path: &Path, default: impl FnOnce() -> T, transform: F) -> Result<T, StateError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut T),
    {
        let _lock = self.guard.lock().unwrap();
        let mut value = load_uncontended(path)?.unwrap_or_else(default);
        transform(&mut value);
        save_uncontended(path, &value)?;
        Ok(value)
    }

    pub fn save<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), StateError> {
        let _lock = self.guard.lock().unwrap();
        save_uncontended(path, value)
    }
}

fn load_uncontended<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StateError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path).map_err(|e| StateError::Read {
        path: path.display().to_string(),
        source: e,
    })?;
    let value = serde_json::from_str(&raw)?;
    Ok(Some(value))
}

fn save_uncontended<T: Serialize>(path: &Path, value: &T) -> Result<(), StateError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StateError::Read {
            path: parent.display().to_string(),
            source: e,
        })?;
    }
    let bytes = serde_json::to_vec_pretty(value)?;
    sync_platform::atomic_write(path, &bytes).map_err(|e| StateError::Write {
        path: path.display().to_string(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AggregateState;
    use tempfile::tempdir;

    #[test]
    fn load_missing_file_returns_none() {
        let dir = tempdir().unwrap();
        let layout = StateLayout::new(dir.path());
        let store = StateStore::new(layout);
        let loaded: Option<AggregateState> = store.load(&store.layout().aggregate_state_path()).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let layout = StateLayout::new(dir.path());
        let store = StateStore::new(layout);
        let state = AggregateState::new("2026-01-01T00:00:00Z");
        let path = store.layout().aggregate_state_path();
        store.save(&path, &state).unwrap();

        let loaded: AggregateState = store.load(&path).unwrap().unwrap();
        assert_eq!(loaded.last_updated, "2026-01-01T00:00:00Z");
    }

    #[test]
    fn update_applies_transform_and_persists() {
        let dir = tempdir().unwrap();
        let layout = StateLayout::new(dir.path());
        let store = StateStore::new(layout);
        let path = store.layout().aggregate_state_path();

        store
            .update(
                &path,
                || AggregateState::new("2026-01-01T00:00:00Z"),
                |s| s.total_files_tracked += 1,
            )
            .unwrap();
        let updated = store
            .update(
                &path,
                || AggregateState::new("2026-01-01T00:00:00Z"),
                |s| s.total_files_tracked += 1,
            )
            .unwrap();

        assert_eq!(updated.total_files_tracked, 2);
    }
}
