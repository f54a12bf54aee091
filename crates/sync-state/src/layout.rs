//! On-disk state layout (spec.md §6):
//! `state/high-level/{backup-state,yesterday-backup-state,
//! permanent-deletions-history,directory-state}.json`;
//! `state/current/<shard-key>.state.json`;
//! `state/archived/<name>_<ts>.state.json`;
//! `state/s3/{s3-cache,s3-report}.json`; `state/recovery-audit.jsonl`.

use std::path::{Path, PathBuf};

use crate::error::StateError;

#[derive(Debug, Clone)]
pub struct StateLayout {
    root: PathBuf,
}

impl StateLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn sentinel_path(&self) -> PathBuf {
        self.root.join("sync.lock")
    }

    pub fn aggregate_state_path(&self) -> PathBuf {
        self.root.join("high-level").join("backup-state.json")
    }

    pub fn yesterday_state_path(&self) -> PathBuf {
        self.root.join("high-level").join("yesterday-backup-state.json")
    }

    pub fn permanent_deletions_path(&self) -> PathBuf {
        self.root
            .join("high-level")
            .join("permanent-deletions-history.json")
    }

    pub fn directory_state_path(&self) -> PathBuf {
        self.root.join("high-level").join("directory-state.json")
    }

    /// `shard_key` is the shard's url-safe directory key, e.g. `root`
    /// or `A__sub`.
    pub fn shard_state_path(&self, shard_key: &str) -> PathBuf {
        self.root
            .join("current")
            .join(format!("{shard_key}.state.json"))
    }

    pub fn archived_shard_path(&self, shard_key: &str, timestamp: &str) -> PathBuf {
        self.root
            .join("archived")
            .join(format!("{shard_key}_{timestamp}.state.json"))
    }

    pub fn s3_cache_path(&self) -> PathBuf {
        self.root.join("s3").join("s3-cache.json")
    }

    pub fn s3_report_path(&self) -> PathBuf {
        self.root.join("s3").join("s3-report.json")
    }

    pub fn recovery_audit_path(&self) -> PathBuf {
        self.root.join("recovery-audit.jsonl")
    }

    /// Every on-disk shard-state file under `current/`, paired with the
    /// shard key recovered from its filename (spec.md §4.7 step 2).
    pub fn list_shard_state_files(&self) -> Result<Vec<(String, PathBuf)>, StateError> {
        let dir = self.root.join("current");
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        for entry in std::fs::read_dir(&dir).map_err(|e| StateError::Read {
            path: dir.display().to_string(),
            source: e,
        })? {
            let entry = entry.map_err(|e| StateError::Read {
                path: dir.display().to_string(),
                source: e,
            })?;
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if let Some(shard_key) = name.strip_suffix(".state.json") {
                out.push((shard_key.to_string(), path));
            }
        }
        Ok(out)
    }

    pub fn ensure_directories(&self) -> std::io::Result<()> {
        for sub in ["high-level", "current", "archived", "s3"] {
            std::fs::create_dir_all(self.root.join(sub))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_rooted_correctly() {
        let layout = StateLayout::new("/var/sync/state");
        assert_eq!(
            layout.aggregate_state_path(),
            PathBuf::from("/var/sync/state/high-level/backup-state.json")
        );
        assert_eq!(
            layout.shard_state_path("root"),
            PathBuf::from("/var/sync/state/current/root.state.json")
        );
        assert_eq!(
            layout.archived_shard_path("root", "20260101T000000Z"),
            PathBuf::from("/var/sync/state/archived/root_20260101T000000Z.state.json")
        );
    }

    #[test]
    fn lists_shard_state_files_by_recovered_key() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StateLayout::new(dir.path());
        layout.ensure_directories().unwrap();
        std::fs::write(layout.shard_state_path("root"), "{}").unwrap();
        std::fs::write(layout.shard_state_path("A__sub"), "{}").unwrap();

        let mut found = layout
            .list_shard_state_files()
            .unwrap()
            .into_iter()
            .map(|(key, _)| key)
            .collect::<Vec<_>>();
        found.sort();
        assert_eq!(found, vec!["A__sub".to_string(), "root".to_string()]);
    }

    #[test]
    fn lists_no_shard_state_files_when_current_dir_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StateLayout::new(dir.path());
        assert!(layout.list_shard_state_files().unwrap().is_empty());
    }
}
