//! Tombstone retention GC (spec.md §4.6). `00:00:00` disables cleanup
//! entirely. Versioned objects are retained indefinitely — version
//! retention is reserved, not implemented (spec.md §9 open question).

use chrono::{DateTime, Utc};
use sync_platform::RetentionPeriod;
use sync_state::{DeletedFileEntry, PermanentDeletionRecord};
use tracing::info;

use crate::error::EngineError;
use crate::keys::deleted_key;
use sync_objectstore::ObjectStore;
use sync_scanner::Component;

pub struct GcOutcome {
    pub retained: Vec<DeletedFileEntry>,
    pub purged: Vec<PermanentDeletionRecord>,
}

/// Sweep `deleted_files`, permanently deleting any tombstone whose
/// retention period has elapsed.
pub async fn run_retention_gc(
    store: &dyn ObjectStore,
    deleted_files: Vec<DeletedFileEntry>,
    retention: RetentionPeriod,
    now: DateTime<Utc>,
    prefix: &str,
    dry_run: bool,
) -> Result<GcOutcome, EngineError> {
    if retention.is_disabled() {
        return Ok(GcOutcome {
            retained: deleted_files,
            purged: Vec::new(),
        });
    }

    let duration = retention.to_chrono_duration();
    let mut retained = Vec::new();
    let mut purged = Vec::new();

    for entry in deleted_files {
        let deleted_at = match sync_platform::parse_iso8601(&entry.deleted_at) {
            Ok(ts) => ts,
            Err(_) => {
                retained.push(entry);
                continue;
            }
        };

        if now.signed_duration_since(deleted_at) < duration {
            retained.push(entry);
            continue;
        }

        let component = Component::Rel(std::path::PathBuf::from(entry.component.clone()));
        let component = if entry.component == "root" {
            Component::Root
        } else {
            component
        };
        let key = deleted_key(prefix, &component, &entry.relative_path);

        if !dry_run {
            store.delete(&key).await?;
        }
        info!("permanently deleted tombstone {key} past retention");

        purged.push(PermanentDeletionRecord {
            component: entry.component,
            relative_path: entry.relative_path,
            original_deleted_at: entry.deleted_at,
            permanently_deleted_at: sync_platform::format_iso8601(now),
            size: entry.size,
            checksum: entry.checksum,
            source_directory: entry.source_directory,
        });
    }

    Ok(GcOutcome { retained, purged })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sync_objectstore::{ObjectMeta, ObjectStoreError, PutOutcome};
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeStore {
        deletes: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ObjectStore for FakeStore {
        async fn put(&self, _local: &Path, _key: &str, _verify: bool) -> Result<PutOutcome, ObjectStoreError> {
            unimplemented!()
        }
        async fn get(&self, _key: &str, _local: &Path) -> Result<(), ObjectStoreError> {
            unimplemented!()
        }
        async fn exists(&self, _key: &str) -> Result<bool, ObjectStoreError> {
            unimplemented!()
        }
        async fn list(&self, _prefix: &str, _recursive: bool) -> Result<Vec<ObjectMeta>, ObjectStoreError> {
            unimplemented!()
        }
        async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
            self.deletes.lock().unwrap().push(key.to_string());
            Ok(())
        }
        async fn move_object(&self, _src: &str, _dst: &str) -> Result<(), ObjectStoreError> {
            unimplemented!()
        }
        async fn put_parallel(
            &self,
            _files: Vec<(PathBuf, String)>,
            _verify: bool,
            _workers: usize,
        ) -> Result<Vec<Result<PutOutcome, ObjectStoreError>>, ObjectStoreError> {
            unimplemented!()
        }
    }

    fn entry(deleted_at: DateTime<Utc>) -> DeletedFileEntry {
        DeletedFileEntry {
            component: "root".to_string(),
            relative_path: "a.txt".to_string(),
            deleted_at: sync_platform::format_iso8601(deleted_at),
            size: 1,
            checksum: "c".to_string(),
            source_directory: "/mnt".to_string(),
        }
    }

    #[tokio::test]
    async fn disabled_retention_keeps_everything() {
        let store = FakeStore::default();
        let now = Utc::now();
        let outcome = run_retention_gc(
            &store,
            vec![entry(now - chrono::Duration::days(365))],
            RetentionPeriod::parse("00:00:00").unwrap(),
            now,
            "backups",
            false,
        )
        .await
        .unwrap();
        assert_eq!(outcome.retained.len(), 1);
        assert!(outcome.purged.is_empty());
    }

    #[tokio::test]
    async fn expired_tombstone_is_purged() {
        let store = FakeStore::default();
        let now = Utc::now();
        let outcome = run_retention_gc(
            &store,
            vec![entry(now - chrono::Duration::days(10))],
            RetentionPeriod::parse("07:00:00").unwrap(),
            now,
            "backups",
            false,
        )
        .await
        .unwrap();
        assert!(outcome.retained.is_empty());
        assert_eq!(outcome.purged.len(), 1);
        assert_eq!(store.deletes.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn fresh_tombstone_is_retained() {
        let store = FakeStore::default();
        let now = Utc::now();
        let outcome = run_retention_gc(
            &store,
            vec![entry(now - chrono::Duration::hours(1))],
            RetentionPeriod::parse("07:00:00").unwrap(),
            now,
            "backups",
            false,
        )
        .await
        .unwrap();
        assert_eq!(outcome.retained.len(), 1);
        assert!(outcome.purged.is_empty());
    }
}
