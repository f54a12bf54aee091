//! Process-wide run counters, updated with atomic adds from worker
//! tasks (spec.md §5 "Process-wide state").

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct RunStats {
    pub files_new: AtomicU64,
    pub files_modified: AtomicU64,
    pub files_unchanged: AtomicU64,
    pub files_deleted: AtomicU64,
    pub bytes_uploaded: AtomicU64,
    pub errors: AtomicU64,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_new(&self, bytes: u64) {
        self.files_new.fetch_add(1, Ordering::Relaxed);
        self.bytes_uploaded.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_modified(&self, bytes: u64) {
        self.files_modified.fetch_add(1, Ordering::Relaxed);
        self.bytes_uploaded.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_unchanged(&self) {
        self.files_unchanged.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_deleted(&self) {
        self.files_deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RunStatsSnapshot {
        RunStatsSnapshot {
            files_new: self.files_new.load(Ordering::Relaxed),
            files_modified: self.files_modified.load(Ordering::Relaxed),
            files_unchanged: self.files_unchanged.load(Ordering::Relaxed),
            files_deleted: self.files_deleted.load(Ordering::Relaxed),
            bytes_uploaded: self.bytes_uploaded.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStatsSnapshot {
    pub files_new: u64,
    pub files_modified: u64,
    pub files_unchanged: u64,
    pub files_deleted: u64,
    pub bytes_uploaded: u64,
    pub errors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let stats = RunStats::new();
        stats.record_new(100);
        stats.record_modified(50);
        stats.record_unchanged();
        stats.record_error();

        let snap = stats.snapshot();
        assert_eq!(snap.files_new, 1);
        assert_eq!(snap.files_modified, 1);
        assert_eq!(snap.files_unchanged, 1);
        assert_eq!(snap.bytes_uploaded, 150);
        assert_eq!(snap.errors, 1);
    }
}
