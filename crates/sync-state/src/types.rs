//! Persisted state shapes. Every top-level file carries
//! `state_file_version` and `last_updated` (spec.md §4.5).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::STATE_FILE_VERSION;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMetadataEntry {
    pub mtime: i64,
    pub size: u64,
    pub checksum: String,
}

/// Per-shard metadata: `relative_path -> last-known metadata`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShardState {
    pub state_file_version: u64,
    pub last_updated: String,
    pub shard_key: String,
    pub entries: HashMap<String, FileMetadataEntry>,
}

impl ShardState {
    pub fn new(shard_key: impl Into<String>, last_updated: impl Into<String>) -> Self {
        Self {
            state_file_version: STATE_FILE_VERSION,
            last_updated: last_updated.into(),
            shard_key: shard_key.into(),
            entries: HashMap::new(),
        }
    }
}

/// Aggregate run-level counters and the set of known shard keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateState {
    pub state_file_version: u64,
    pub last_updated: String,
    pub shard_keys: Vec<String>,
    pub total_files_tracked: u64,
    pub total_bytes_tracked: u64,
    pub last_run_completed_at: Option<String>,
}

impl AggregateState {
    pub fn new(last_updated: impl Into<String>) -> Self {
        Self {
            state_file_version: STATE_FILE_VERSION,
            last_updated: last_updated.into(),
            shard_keys: Vec::new(),
            total_files_tracked: 0,
            total_bytes_tracked: 0,
            last_run_completed_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedFileEntry {
    pub component: String,
    pub relative_path: String,
    pub deleted_at: String,
    pub size: u64,
    pub checksum: String,
    pub source_directory: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedDirectoryEntry {
    pub component: String,
    pub deleted_at: String,
    pub retention_expiry: String,
}

/// "Yesterday" state: the tombstone queue awaiting retention GC
/// (spec.md §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YesterdayState {
    pub state_file_version: u64,
    pub last_updated: String,
    pub deleted_files: Vec<DeletedFileEntry>,
    pub deleted_directories: Vec<DeletedDirectoryEntry>,
}

impl YesterdayState {
    pub fn new(last_updated: impl Into<String>) -> Self {
        Self {
            state_file_version: STATE_FILE_VERSION,
            last_updated: last_updated.into(),
            deleted_files: Vec::new(),
            deleted_directories: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermanentDeletionRecord {
    pub component: String,
    pub relative_path: String,
    pub original_deleted_at: String,
    pub permanently_deleted_at: String,
    pub size: u64,
    pub checksum: String,
    pub source_directory: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermanentDeletionsHistory {
    pub state_file_version: u64,
    pub last_updated: String,
    pub records: Vec<PermanentDeletionRecord>,
}

impl PermanentDeletionsHistory {
    pub fn new(last_updated: impl Into<String>) -> Self {
        Self {
            state_file_version: STATE_FILE_VERSION,
            last_updated: last_updated.into(),
            records: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentHistoryRecord {
    pub timestamp: String,
    pub orphaned_dirs: Vec<String>,
    pub objects_moved: u64,
    pub objects_failed: u64,
    pub bytes_moved: u64,
    pub duration_ms: u64,
    pub status: String,
}

/// Forced-alignment bookkeeping: history (bounded) plus running totals
/// (spec.md §4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryState {
    pub state_file_version: u64,
    pub last_updated: String,
    pub alignment_history: Vec<AlignmentHistoryRecord>,
    pub total_objects_moved: u64,
    pub total_bytes_moved: u64,
}

impl DirectoryState {
    pub fn new(last_updated: impl Into<String>) -> Self {
        Self {
            state_file_version: STATE_FILE_VERSION,
            last_updated: last_updated.into(),
            alignment_history: Vec::new(),
            total_objects_moved: 0,
            total_bytes_moved: 0,
        }
    }

    /// Push a new record, trimming the history to `max_len` entries.
    pub fn push_record(&mut self, record: AlignmentHistoryRecord, max_len: usize) {
        self.total_objects_moved += record.objects_moved;
        self.total_bytes_moved += record.bytes_moved;
        self.alignment_history.push(record);
        if self.alignment_history.len() > max_len {
            let overflow = self.alignment_history.len() - max_len;
            self.alignment_history.drain(0..overflow);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryAuditRecord {
    pub file_type: String,
    pub decision: String,
    pub reason: String,
    pub local_age_s: Option<i64>,
    pub s3_age_s: Option<i64>,
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_state_bounds_history_length() {
        let mut state = DirectoryState::new("2026-01-01T00:00:00Z");
        for i in 0..5 {
            state.push_record(
                AlignmentHistoryRecord {
                    timestamp: format!("t{i}"),
                    orphaned_dirs: vec![],
                    objects_moved: 1,
                    objects_failed: 0,
                    bytes_moved: 100,
                    duration_ms: 1,
                    status: "ok".into(),
                },
                3,
            );
        }
        assert_eq!(state.alignment_history.len(), 3);
        assert_eq!(state.total_objects_moved, 5);
        assert_eq!(state.total_bytes_moved, 500);
        assert_eq!(state.alignment_history[0].timestamp, "t2");
    }
}
