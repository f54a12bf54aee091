//! Trigger-file discovery: walk the mount once, collecting
//! directories containing `backupthisdir.txt` or `backupalldirs.txt`,
//! deep-wins on tie-break.

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;
use walkdir::WalkDir;

use crate::types::{RawTriggerMode, TriggerEntry};
use crate::{DEEP_TRIGGER_FILE, SHALLOW_TRIGGER_FILE};

#[derive(Debug, Error)]
pub enum DiscoverError {
    #[error("mount directory {0} does not exist or is not a directory")]
    MissingMount(String),
}

/// Walk `mount` once and return the deduplicated, deep-wins set of
/// trigger directories. `walkdir` does not follow symlinks by default,
/// which is what prevents symlink-loop traversal (spec.md §4.1 edge
/// case) — we rely on that default rather than tracking device+inode
/// ourselves.
pub fn discover_triggers(mount: &Path) -> Result<Vec<TriggerEntry>, DiscoverError> {
    if !mount.is_dir() {
        return Err(DiscoverError::MissingMount(mount.display().to_string()));
    }

    let mut modes: HashMap<std::path::PathBuf, RawTriggerMode> = HashMap::new();

    for entry in WalkDir::new(mount)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        let parent = match entry.path().parent() {
            Some(p) => p.to_path_buf(),
            None => continue,
        };

        let found_mode = if name == DEEP_TRIGGER_FILE {
            Some(RawTriggerMode::Deep)
        } else if name == SHALLOW_TRIGGER_FILE {
            Some(RawTriggerMode::Shallow)
        } else {
            None
        };

        if let Some(found_mode) = found_mode {
            modes
                .entry(parent)
                .and_modify(|existing| {
                    // Deep wins when both trigger files coexist.
                    if found_mode == RawTriggerMode::Deep {
                        *existing = RawTriggerMode::Deep;
                    }
                })
                .or_insert(found_mode);
        }
    }

    Ok(modes
        .into_iter()
        .map(|(directory, mode)| TriggerEntry { directory, mode })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn finds_shallow_and_deep_triggers() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("A");
        let b = dir.path().join("B");
        fs::create_dir_all(&a).unwrap();
        fs::create_dir_all(&b).unwrap();
        fs::write(a.join(SHALLOW_TRIGGER_FILE), "").unwrap();
        fs::write(b.join(DEEP_TRIGGER_FILE), "").unwrap();

        let triggers = discover_triggers(dir.path()).unwrap();
        assert_eq!(triggers.len(), 2);
        let a_mode = triggers.iter().find(|t| t.directory == a).unwrap().mode;
        let b_mode = triggers.iter().find(|t| t.directory == b).unwrap().mode;
        assert_eq!(a_mode, RawTriggerMode::Shallow);
        assert_eq!(b_mode, RawTriggerMode::Deep);
    }

    #[test]
    fn deep_wins_when_both_triggers_present() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(SHALLOW_TRIGGER_FILE), "").unwrap();
        fs::write(dir.path().join(DEEP_TRIGGER_FILE), "").unwrap();

        let triggers = discover_triggers(dir.path()).unwrap();
        assert_eq!(triggers.len(), 1);
        assert_eq!(triggers[0].mode, RawTriggerMode::Deep);
    }

    #[test]
    fn trigger_at_mount_root_is_valid() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(SHALLOW_TRIGGER_FILE), "").unwrap();

        let triggers = discover_triggers(dir.path()).unwrap();
        assert_eq!(triggers.len(), 1);
        assert_eq!(triggers[0].directory, dir.path());
    }

    #[test]
    fn empty_mount_yields_empty_set() {
        let dir = tempdir().unwrap();
        let triggers = discover_triggers(dir.path()).unwrap();
        assert!(triggers.is_empty());
    }

    #[test]
    fn missing_mount_is_an_error() {
        let err = discover_triggers(Path::new("/does/not/exist")).unwrap_err();
        assert!(matches!(err, DiscoverError::MissingMount(_)));
    }
}
