//! Change detection predicate (spec.md §4.2). Metadata-only fast path,
//! falling through to content digesting only when the predicate can't
//! prove the file is unchanged.

use sync_config::IntegrityMode;

/// The prior shard-metadata entry for a file, as persisted in state.
#[derive(Debug, Clone)]
pub struct PriorEntry {
    pub mtime: i64,
    pub size: u64,
    pub checksum: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeDecision {
    /// Metadata and cache both confirm nothing to do.
    Unchanged { cached_checksum: String },
    /// Content must be re-digested and compared.
    NeedsProcessing,
}

/// `cache_entry_exists` reports whether the derived expected object
/// key is present in the loaded object cache; `cache_loaded` is false
/// when no cache snapshot is available this run (in which case
/// metadata alone is trusted, per spec.md §4.2 step 4).
pub fn detect_change(
    current_mtime: i64,
    current_size: u64,
    prior: Option<&PriorEntry>,
    integrity_mode: IntegrityMode,
    extension_in_strict_set: bool,
    cache_loaded: bool,
    cache_entry_exists: bool,
) -> ChangeDecision {
    if integrity_mode == IntegrityMode::Strict {
        return ChangeDecision::NeedsProcessing;
    }
    if integrity_mode == IntegrityMode::Hybrid && extension_in_strict_set {
        return ChangeDecision::NeedsProcessing;
    }

    let Some(prior) = prior else {
        return ChangeDecision::NeedsProcessing;
    };

    let metadata_matches = prior.mtime == current_mtime && prior.size == current_size;
    if !metadata_matches {
        return ChangeDecision::NeedsProcessing;
    }

    if !cache_loaded {
        return ChangeDecision::Unchanged {
            cached_checksum: prior.checksum.clone(),
        };
    }

    if cache_entry_exists {
        ChangeDecision::Unchanged {
            cached_checksum: prior.checksum.clone(),
        }
    } else {
        // Scope-expansion-bug fix: metadata matches but the object is
        // missing from the cache, so the upload is re-issued instead
        // of silently trusting stale local metadata.
        ChangeDecision::NeedsProcessing
    }
}
