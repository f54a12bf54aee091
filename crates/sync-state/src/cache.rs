//! The in-memory object-store cache: loaded once per run as an
//! immutable set (spec.md §5 "Shared resources"), with a freshness
//! window governing when a new remote scan is required (§4.5).

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::STATE_FILE_VERSION;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectCache {
    pub state_file_version: u64,
    pub last_updated: String,
    pub scanned_at: String,
    pub keys: HashSet<String>,
}

impl ObjectCache {
    pub fn new(scanned_at: impl Into<String>, keys: HashSet<String>) -> Self {
        let scanned_at = scanned_at.into();
        Self {
            state_file_version: STATE_FILE_VERSION,
            last_updated: scanned_at.clone(),
            scanned_at,
            keys,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// True when `scanned_at` is within `refresh_hours` of `now`; a
    /// stale cache must be rebuilt before being trusted.
    pub fn is_fresh(&self, now: DateTime<Utc>, refresh_hours: i64) -> bool {
        let Ok(scanned_at) = sync_platform::parse_iso8601(&self.scanned_at) else {
            return false;
        };
        let age = now.signed_duration_since(scanned_at);
        age >= chrono::Duration::zero() && age <= chrono::Duration::hours(refresh_hours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sync_platform::format_iso8601;

    #[test]
    fn fresh_cache_within_window_is_fresh() {
        let now = Utc::now();
        let scanned_at = now - chrono::Duration::hours(1);
        let cache = ObjectCache::new(format_iso8601(scanned_at), HashSet::new());
        assert!(cache.is_fresh(now, 6));
    }

    #[test]
    fn stale_cache_outside_window_is_not_fresh() {
        let now = Utc::now();
        let scanned_at = now - chrono::Duration::hours(10);
        let cache = ObjectCache::new(format_iso8601(scanned_at), HashSet::new());
        assert!(!cache.is_fresh(now, 6));
    }

    #[test]
    fn contains_reflects_key_membership() {
        let mut keys = HashSet::new();
        keys.insert("current_state/root/file.txt".to_string());
        let cache = ObjectCache::new(format_iso8601(Utc::now()), keys);
        assert!(cache.contains("current_state/root/file.txt"));
        assert!(!cache.contains("missing"));
    }
}
