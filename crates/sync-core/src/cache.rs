//! The S3-verified object cache (spec.md §4.2, §4.5): a freshness-
//! windowed snapshot of every live key under `current_state/`, loaded
//! once per run and consulted by [`crate::engine::process_shard`] so
//! that a metadata match without a corresponding live object still
//! forces re-processing instead of trusting stale local state.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use sync_objectstore::ObjectStore;
use sync_state::{ObjectCache, StateLayout, StateStore};

use crate::error::EngineError;
use crate::keys::current_state_root_prefix;

/// Load the persisted cache, refreshing it from a live listing when
/// missing, stale, or when a refresh is forced.
pub async fn load_or_refresh(
    store: &dyn ObjectStore,
    state_store: &StateStore,
    layout: &StateLayout,
    prefix: &str,
    now: DateTime<Utc>,
    refresh_hours: i64,
    force_refresh: bool,
) -> Result<ObjectCache, EngineError> {
    let existing: Option<ObjectCache> = state_store.load(&layout.s3_cache_path())?;

    if !force_refresh {
        if let Some(cache) = &existing {
            if cache.is_fresh(now, refresh_hours) {
                return Ok(cache.clone());
            }
        }
    }

    let listing = store.list(&current_state_root_prefix(prefix), true).await?;
    let keys: HashSet<String> = listing.into_iter().map(|meta| meta.key).collect();

    let cache = ObjectCache::new(sync_platform::now_iso8601(), keys);
    state_store.save(&layout.s3_cache_path(), &cache)?;
    Ok(cache)
}
