//! Crash-safe atomic file writes: temp file in the same directory,
//! fsync the file, rename over the target, fsync the directory.
//!
//! Mirrors the write-ahead-log blob write pattern used elsewhere in
//! this codebase's lineage, generalized to arbitrary JSON state files.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AtomicWriteError {
    #[error("failed to create parent directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write temp file {path}: {source}")]
    WriteTemp {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to rename {from} to {to}: {source}")]
    Rename {
        from: String,
        to: String,
        #[source]
        source: std::io::Error,
    },
}

/// Write `contents` to `target` atomically: write to a sibling
/// `<target>.tmp-<pid>`, fsync it, rename over `target`, then fsync
/// the containing directory so the rename itself survives a crash.
///
/// Never leaves a partially-written file observable at `target`.
pub fn atomic_write(target: &Path, contents: &[u8]) -> Result<(), AtomicWriteError> {
    let parent = target.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|source| AtomicWriteError::CreateDir {
        path: parent.display().to_string(),
        source,
    })?;

    let tmp_path = parent.join(format!(
        ".{}.tmp-{}",
        target
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "state".to_string()),
        std::process::id()
    ));

    {
        let mut file: File = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)
            .map_err(|source| AtomicWriteError::WriteTemp {
                path: tmp_path.display().to_string(),
                source,
            })?;
        file.write_all(contents)
            .map_err(|source| AtomicWriteError::WriteTemp {
                path: tmp_path.display().to_string(),
                source,
            })?;
        file.sync_all().map_err(|source| AtomicWriteError::WriteTemp {
            path: tmp_path.display().to_string(),
            source,
        })?;
    }

    fs::rename(&tmp_path, target).map_err(|source| AtomicWriteError::Rename {
        from: tmp_path.display().to_string(),
        to: target.display().to_string(),
        source,
    })?;

    // Best-effort directory fsync so the rename is itself durable.
    if let Ok(dir_file) = File::open(parent) {
        let _ = dir_file.sync_all();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn writes_and_replaces_contents() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("state.json");

        atomic_write(&target, b"{\"a\":1}").unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"{\"a\":1}");

        atomic_write(&target, b"{\"a\":2}").unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"{\"a\":2}");
    }

    #[test]
    fn no_temp_file_left_behind() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("nested").join("state.json");
        atomic_write(&target, b"{}").unwrap();

        let entries: Vec<_> = fs::read_dir(target.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("a").join("b").join("c").join("state.json");
        atomic_write(&target, b"{}").unwrap();
        assert!(target.exists());
    }
}
