//! Process-level exclusive lock on a sentinel file, so only one
//! backup process runs against a mount at a time (spec.md §4.5,
//! §5 "Scheduling").

use std::fs::File;
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::StateError;

pub struct ProcessLock {
    path: PathBuf,
    _file: File,
}

impl ProcessLock {
    pub fn acquire(sentinel: &Path) -> Result<Self, StateError> {
        if let Some(parent) = sentinel.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StateError::LockIo {
                path: sentinel.display().to_string(),
                source: e,
            })?;
        }

        let file = File::create(sentinel).map_err(|e| StateError::LockIo {
            path: sentinel.display().to_string(),
            source: e,
        })?;

        file.try_lock_exclusive()
            .map_err(|_| StateError::AlreadyLocked(sentinel.display().to_string()))?;

        Ok(Self {
            path: sentinel.to_path_buf(),
            _file: file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ProcessLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self._file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn second_acquire_fails_while_first_is_held() {
        let dir = tempdir().unwrap();
        let sentinel = dir.path().join("sync.lock");

        let first = ProcessLock::acquire(&sentinel).unwrap();
        let second = ProcessLock::acquire(&sentinel);
        assert!(second.is_err());
        drop(first);

        let third = ProcessLock::acquire(&sentinel);
        assert!(third.is_ok());
    }
}
