//! Forced-alignment reconciler (spec.md §4.7): the only unconditional
//! remote scan in the system. Exclusive with a normal backup run in
//! the same invocation.

use std::collections::HashSet;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tracing::warn;

use sync_objectstore::{ObjectMeta, ObjectStore};
use sync_scanner::{discover_triggers, expand_deep, filter_hierarchy, Component, Shard};
use sync_state::{AlignmentHistoryRecord, DeletedFileEntry, ShardState, StateLayout, StateStore};

use crate::error::EngineError;
use crate::keys::{deleted_key, key_matches_any_component};
use crate::shard_key::shard_key;

#[derive(Debug, Clone)]
pub struct OrphanedObject {
    pub key: String,
    pub size: u64,
}

/// An on-disk shard whose component is no longer in the active set.
#[derive(Debug, Clone)]
pub struct OrphanedShard {
    pub shard_key: String,
    pub path: PathBuf,
    pub state: ShardState,
}

/// Step 1-3: discover the active set, split the cached live-object
/// listing into orphaned vs. still-active, and load every on-disk
/// shard state whose component fell out of the active set.
pub fn find_orphans(
    mount: &std::path::Path,
    cache_listing: &[ObjectMeta],
    prefix: &str,
    state_store: &StateStore,
) -> Result<(Vec<Shard>, Vec<OrphanedObject>, Vec<OrphanedShard>), EngineError> {
    let triggers = discover_triggers(mount)?;
    let filtered = filter_hierarchy(triggers);
    let shards = expand_deep(mount, filtered);

    let active_components: Vec<Component> = shards.iter().map(|s| s.component.clone()).collect();

    // The empty/root component is orphaned iff the mount itself isn't
    // an active trigger (spec.md §4.7 step 3).
    let root_is_active = active_components.iter().any(|c| *c == Component::Root);
    let active_components: Vec<Component> = if root_is_active {
        active_components
    } else {
        active_components
            .into_iter()
            .filter(|c| *c != Component::Root)
            .collect()
    };

    let mut orphans = Vec::new();
    for meta in cache_listing {
        if !meta.key.contains("current_state/") {
            continue;
        }
        if !key_matches_any_component(&meta.key, prefix, &active_components) {
            orphans.push(OrphanedObject {
                key: meta.key.clone(),
                size: meta.size,
            });
        }
    }

    let active_shard_keys: HashSet<String> = active_components.iter().map(shard_key).collect();

    let mut orphaned_shards = Vec::new();
    for (key, path) in state_store.layout().list_shard_state_files()? {
        if active_shard_keys.contains(&key) {
            continue;
        }
        if let Some(state) = state_store.load::<ShardState>(&path)? {
            orphaned_shards.push(OrphanedShard {
                shard_key: key,
                path,
                state,
            });
        }
    }

    Ok((shards, orphans, orphaned_shards))
}

pub struct AlignmentRunOutcome {
    pub record: AlignmentHistoryRecord,
    pub tombstones: Vec<DeletedFileEntry>,
}

/// Step 4-5: move every orphaned live object into the deleted
/// namespace (recording a tombstone with the real metadata pulled from
/// the matching orphaned shard), then archive each orphaned shard's
/// state file under `archived/`.
pub async fn reconcile_orphans(
    store: &dyn ObjectStore,
    orphans: &[OrphanedObject],
    orphaned_shards: &[OrphanedShard],
    layout: &StateLayout,
    prefix: &str,
    now: DateTime<Utc>,
    started: std::time::Instant,
    dry_run: bool,
) -> Result<AlignmentRunOutcome, EngineError> {
    let mut moved = 0u64;
    let mut failed = 0u64;
    let mut bytes_moved = 0u64;
    let mut tombstones = Vec::new();
    let mut orphaned_dirs = HashSet::new();

    for orphan in orphans {
        let Some(rest) = orphan.key.split("current_state/").nth(1) else {
            continue;
        };
        let mut parts = rest.splitn(2, '/');
        let Some(component) = parts.next() else { continue };
        let Some(relative_path) = parts.next() else { continue };

        orphaned_dirs.insert(component.to_string());

        let component_value = if component == "root" {
            Component::Root
        } else {
            Component::Rel(std::path::PathBuf::from(component))
        };
        let dst = deleted_key(prefix, &component_value, relative_path);

        // Exact-depth match: the orphaned shard whose key corresponds
        // to this object's component carries the real checksum/size
        // (spec.md §4.7 step 4).
        let component_key = shard_key(&component_value);
        let entry = orphaned_shards
            .iter()
            .find(|s| s.shard_key == component_key)
            .and_then(|s| s.state.entries.get(relative_path));
        let checksum = entry.map(|e| e.checksum.clone()).unwrap_or_default();
        let size = entry.map(|e| e.size).unwrap_or(orphan.size);

        if dry_run {
            moved += 1;
            bytes_moved += size;
        } else if let Err(e) = store.move_object(&orphan.key, &dst).await {
            warn!("forced alignment: failed to move orphan {}: {e}", orphan.key);
            failed += 1;
            continue;
        } else {
            moved += 1;
            bytes_moved += size;
        }

        tombstones.push(DeletedFileEntry {
            component: component.to_string(),
            relative_path: relative_path.to_string(),
            deleted_at: sync_platform::format_iso8601(now),
            size,
            checksum,
            source_directory: format!("<orphaned:{component}>"),
        });
    }

    for shard in orphaned_shards {
        if dry_run {
            continue;
        }
        let timestamp = now.format("%Y%m%dT%H%M%SZ").to_string();
        let dst = layout.archived_shard_path(&shard.shard_key, &timestamp);
        if let Some(parent) = dst.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!("forced alignment: failed to create archive dir {}: {e}", parent.display());
                continue;
            }
        }
        if let Err(e) = std::fs::rename(&shard.path, &dst) {
            warn!(
                "forced alignment: failed to archive orphaned shard {} ({}): {e}",
                shard.shard_key,
                shard.path.display()
            );
        }
    }

    let record = AlignmentHistoryRecord {
        timestamp: sync_platform::format_iso8601(now),
        orphaned_dirs: orphaned_dirs.into_iter().collect(),
        objects_moved: moved,
        objects_failed: failed,
        bytes_moved,
        duration_ms: started.elapsed().as_millis() as u64,
        status: if failed == 0 { "ok".to_string() } else { "partial".to_string() },
    };

    Ok(AlignmentRunOutcome { record, tombstones })
}
