//! Top-level run control flow (spec.md §4.8, §5): state recovery,
//! then alignment XOR backup, then retention GC, then a state
//! snapshot upload. Alignment and backup are mutually exclusive in a
//! single invocation.

use std::time::Instant;

use chrono::Utc;
use tracing::{info, warn};

use sync_config::Config;
use sync_objectstore::ObjectStore;
use sync_scanner::{discover_triggers, expand_deep, filter_hierarchy};
use sync_state::{
    AggregateState, DirectoryState, PermanentDeletionsHistory, ProcessLock, ShardState,
    StateLayout, StateStore, YesterdayState,
};

use crate::alignment::{find_orphans, reconcile_orphans};
use crate::cache::load_or_refresh;
use crate::engine::{process_shard, ShardRunOptions};
use crate::error::EngineError;
use crate::keys::{current_state_root_prefix, state_backup_key};
use crate::recovery::recover_state_file;
use crate::retention::run_retention_gc;
use crate::shard_key::shard_key;
use crate::stats::RunStats;

/// The outcome callers actually want: run statistics plus whether the
/// invocation did alignment or a normal backup.
pub struct OrchestratorOutcome {
    pub stats: crate::stats::RunStatsSnapshot,
    pub ran_alignment: bool,
    pub recovery_audit: Vec<sync_state::RecoveryAuditRecord>,
}

pub async fn run(
    cfg: &Config,
    store: &dyn ObjectStore,
    state_root: &std::path::Path,
) -> Result<OrchestratorOutcome, EngineError> {
    let layout = StateLayout::new(state_root);
    layout.ensure_directories().ok();
    let _lock = ProcessLock::acquire(&layout.sentinel_path())?;

    let state_store = StateStore::new(layout.clone());
    let now = Utc::now();
    let run_stats = RunStats::new();

    let recovery_audit = recover_high_level_state(store, &layout, cfg, now).await?;

    if cfg.force_alignment_mode {
        run_alignment(cfg, store, &state_store, now).await?;

        // Best-effort: refresh the cache again now that orphans have
        // moved, so the next normal run doesn't start from a listing
        // that still shows the just-reconciled objects (spec.md §4.7
        // step 7). A failure here doesn't fail the alignment itself.
        if let Err(e) = load_or_refresh(
            store,
            &state_store,
            &layout,
            &cfg.s3_prefix,
            now,
            cfg.filesystem_scan_refresh_hours as i64,
            true,
        )
        .await
        {
            warn!("post-alignment cache refresh failed: {e}");
        }

        return Ok(OrchestratorOutcome {
            stats: run_stats.snapshot(),
            ran_alignment: true,
            recovery_audit,
        });
    }

    let triggers = discover_triggers(&cfg.mount_dir)?;
    let filtered = filter_hierarchy(triggers);
    let shards = expand_deep(&cfg.mount_dir, filtered);

    if shards.is_empty() {
        info!("no active triggers found under {}; nothing to back up", cfg.mount_dir.display());
        return Ok(OrchestratorOutcome {
            stats: run_stats.snapshot(),
            ran_alignment: false,
            recovery_audit,
        });
    }

    let mut yesterday: YesterdayState = state_store
        .load(&layout.yesterday_state_path())?
        .unwrap_or_else(|| YesterdayState::new(sync_platform::now_iso8601()));
    let mut aggregate: AggregateState = state_store
        .load(&layout.aggregate_state_path())?
        .unwrap_or_else(|| AggregateState::new(sync_platform::now_iso8601()));

    let now_str = sync_platform::format_iso8601(now);
    let object_cache = load_or_refresh(
        store,
        &state_store,
        &layout,
        &cfg.s3_prefix,
        now,
        cfg.filesystem_scan_refresh_hours as i64,
        cfg.force_filesystem_scan_refresh,
    )
    .await?;
    let cache_contains = |key: &str| object_cache.contains(key);

    for shard in &shards {
        let key = shard_key(&shard.component);
        let prior: Option<ShardState> = state_store.load(&layout.shard_state_path(&key))?;

        let options = ShardRunOptions {
            prefix: &cfg.s3_prefix,
            checksum_algorithm: cfg.checksum_algorithm,
            integrity_mode: cfg.integrity_mode,
            strict_extensions: &cfg.strict_extensions,
            cache_loaded: true,
            cache_contains: &cache_contains,
            dry_run: cfg.dry_run,
            now_iso8601: &now_str,
        };

        let outcome = process_shard(store, &run_stats, shard, prior, &options).await?;
        yesterday.deleted_files.extend(outcome.deleted);

        if !cfg.dry_run {
            state_store.save(&layout.shard_state_path(&key), &outcome.shard_state)?;
        }
        if !aggregate.shard_keys.contains(&key) {
            aggregate.shard_keys.push(key);
        }
    }

    let gc_outcome = run_retention_gc(
        store,
        std::mem::take(&mut yesterday.deleted_files),
        cfg.deleted_file_retention,
        now,
        &cfg.s3_prefix,
        cfg.dry_run,
    )
    .await?;
    yesterday.deleted_files = gc_outcome.retained;
    yesterday.last_updated = now_str.clone();

    let mut permanent_deletions: PermanentDeletionsHistory = state_store
        .load(&layout.permanent_deletions_path())?
        .unwrap_or_else(|| PermanentDeletionsHistory::new(now_str.clone()));
    permanent_deletions.records.extend(gc_outcome.purged);
    permanent_deletions.last_updated = now_str.clone();

    aggregate.last_updated = now_str.clone();
    aggregate.last_run_completed_at = Some(now_str.clone());

    if !cfg.dry_run {
        state_store.save(&layout.aggregate_state_path(), &aggregate)?;
        state_store.save(&layout.yesterday_state_path(), &yesterday)?;
        state_store.save(&layout.permanent_deletions_path(), &permanent_deletions)?;

        upload_state_snapshot(store, &layout.aggregate_state_path(), &cfg.s3_prefix, "backup-state").await?;
        upload_state_snapshot(store, &layout.yesterday_state_path(), &cfg.s3_prefix, "yesterday-backup-state").await?;
        upload_state_snapshot(
            store,
            &layout.permanent_deletions_path(),
            &cfg.s3_prefix,
            "permanent-deletions-history",
        )
        .await?;
    }

    Ok(OrchestratorOutcome {
        stats: run_stats.snapshot(),
        ran_alignment: false,
        recovery_audit,
    })
}

async fn recover_high_level_state(
    store: &dyn ObjectStore,
    layout: &StateLayout,
    cfg: &Config,
    now: chrono::DateTime<Utc>,
) -> Result<Vec<sync_state::RecoveryAuditRecord>, EngineError> {
    let mut records = Vec::new();
    for (local_path, remote_name, file_type) in [
        (layout.aggregate_state_path(), "backup-state", "aggregate"),
        (layout.yesterday_state_path(), "yesterday-backup-state", "yesterday"),
        (
            layout.permanent_deletions_path(),
            "permanent-deletions-history",
            "permanent_deletions",
        ),
        (layout.directory_state_path(), "directory-state", "directory_state"),
    ] {
        let remote_key = state_backup_key(&cfg.s3_prefix, remote_name);
        let (_, record) = recover_state_file(store, &remote_key, &local_path, file_type, now).await?;
        records.push(record);
    }
    Ok(records)
}

async fn run_alignment(
    cfg: &Config,
    store: &dyn ObjectStore,
    state_store: &StateStore,
    now: chrono::DateTime<Utc>,
) -> Result<(), EngineError> {
    let started = Instant::now();
    let listing = store.list(&current_state_root_prefix(&cfg.s3_prefix), true).await?;
    let (_shards, orphans, orphaned_shards) =
        find_orphans(&cfg.mount_dir, &listing, &cfg.s3_prefix, state_store)?;
    let layout = state_store.layout();
    let outcome = reconcile_orphans(
        store,
        &orphans,
        &orphaned_shards,
        layout,
        &cfg.s3_prefix,
        now,
        started,
        cfg.dry_run,
    )
    .await?;
    let mut directory_state: DirectoryState = state_store
        .load(&layout.directory_state_path())?
        .unwrap_or_else(|| DirectoryState::new(sync_platform::now_iso8601()));
    directory_state.push_record(outcome.record, cfg.alignment_history_retention);
    directory_state.last_updated = sync_platform::format_iso8601(now);

    let mut yesterday: YesterdayState = state_store
        .load(&layout.yesterday_state_path())?
        .unwrap_or_else(|| YesterdayState::new(sync_platform::now_iso8601()));
    yesterday.deleted_files.extend(outcome.tombstones);
    yesterday.last_updated = sync_platform::format_iso8601(now);

    if !cfg.dry_run {
        state_store.save(&layout.directory_state_path(), &directory_state)?;
        state_store.save(&layout.yesterday_state_path(), &yesterday)?;
    }

    Ok(())
}

async fn upload_state_snapshot(
    store: &dyn ObjectStore,
    local_path: &std::path::Path,
    prefix: &str,
    name: &str,
) -> Result<(), EngineError> {
    let key = state_backup_key(prefix, name);
    store.put(local_path, &key, false).await?;
    Ok(())
}
