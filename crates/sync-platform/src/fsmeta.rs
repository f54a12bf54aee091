//! mtime/size metadata for a regular file.

use std::fs;
use std::path::Path;
use std::time::UNIX_EPOCH;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FsMetaError {
    #[error("failed to stat {path}: {source}")]
    Stat {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// `(size in bytes, mtime as POSIX epoch seconds)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub size: u64,
    pub mtime: i64,
}

pub fn file_size_and_mtime(path: &Path) -> Result<FileStat, FsMetaError> {
    let meta = fs::metadata(path).map_err(|source| FsMetaError::Stat {
        path: path.display().to_string(),
        source,
    })?;
    let mtime = meta
        .modified()
        .map_err(|source| FsMetaError::Stat {
            path: path.display().to_string(),
            source,
        })?
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);

    Ok(FileStat {
        size: meta.len(),
        mtime,
    })
}
