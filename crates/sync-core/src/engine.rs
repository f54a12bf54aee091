//! Per-shard state machine (spec.md §4.3): `Absent -> New -> Live ->
//! {Unchanged, Modified, Deleted}`. A modified file's old version must
//! finish moving into `versions_<comp>/` before the new content is
//! uploaded; a failed move skips the file for this run rather than
//! risking the only previous copy.

use std::collections::HashMap;

use tracing::{error, warn};

use sync_checksum::{compute_digest, detect_change, ChangeDecision, FileTransition, PriorEntry};
use sync_config::{ChecksumAlgorithm, IntegrityMode};
use sync_objectstore::{ObjectStore, PutOutcome};
use sync_scanner::{list_shard_files, Shard};
use sync_state::{DeletedFileEntry, FileMetadataEntry, ShardState};

use crate::error::EngineError;
use crate::keys::{current_key, deleted_key, versions_key};
use crate::shard_key::shard_key;
use crate::stats::RunStats;

pub struct ShardRunOutcome {
    pub shard_state: ShardState,
    pub deleted: Vec<DeletedFileEntry>,
    /// This shard's backing directory vanished since discovery; the
    /// caller should record a directory-deletion tombstone instead of
    /// per-file ones.
    pub directory_missing: bool,
}

pub struct ShardRunOptions<'a> {
    pub prefix: &'a str,
    pub checksum_algorithm: ChecksumAlgorithm,
    pub integrity_mode: IntegrityMode,
    pub strict_extensions: &'a [String],
    pub cache_loaded: bool,
    pub cache_contains: &'a dyn Fn(&str) -> bool,
    pub dry_run: bool,
    pub now_iso8601: &'a str,
}

pub async fn process_shard(
    store: &dyn ObjectStore,
    stats: &RunStats,
    shard: &Shard,
    prior: Option<ShardState>,
    options: &ShardRunOptions<'_>,
) -> Result<ShardRunOutcome, EngineError> {
    let key = shard_key(&shard.component);
    let mut prior = prior.unwrap_or_else(|| ShardState::new(key.clone(), options.now_iso8601));

    if !shard.directory.is_dir() {
        let deleted = prior
            .entries
            .iter()
            .map(|(rel, meta)| DeletedFileEntry {
                component: shard.component.as_key_infix(),
                relative_path: rel.clone(),
                deleted_at: options.now_iso8601.to_string(),
                size: meta.size,
                checksum: meta.checksum.clone(),
                source_directory: shard.directory.display().to_string(),
            })
            .collect();
        prior.entries.clear();
        prior.last_updated = options.now_iso8601.to_string();
        return Ok(ShardRunOutcome {
            shard_state: prior,
            deleted,
            directory_missing: true,
        });
    }

    let files = list_shard_files(shard);
    let mut seen_rel = std::collections::HashSet::new();
    let mut new_entries: HashMap<String, FileMetadataEntry> = HashMap::new();

    for (abs, rel) in &files {
        let rel_str = rel.to_string_lossy().replace('\\', "/");
        seen_rel.insert(rel_str.clone());

        let current = match sync_platform::file_size_and_mtime(abs) {
            Ok(stat) => stat,
            Err(e) => {
                warn!("skipping {}: {e}", abs.display());
                stats.record_error();
                if let Some(prior_entry) = prior.entries.get(&rel_str) {
                    new_entries.insert(rel_str, prior_entry.clone());
                }
                continue;
            }
        };

        let prior_entry = prior.entries.get(&rel_str).map(|e| PriorEntry {
            mtime: e.mtime,
            size: e.size,
            checksum: e.checksum.clone(),
        });

        let extension_in_strict_set = rel
            .extension()
            .map(|ext| {
                let dotted = format!(".{}", ext.to_string_lossy());
                options
                    .strict_extensions
                    .iter()
                    .any(|e| e.eq_ignore_ascii_case(&dotted))
            })
            .unwrap_or(false);

        let expected_key = current_key(options.prefix, &shard.component, &rel_str);
        let cache_hit = (options.cache_contains)(&expected_key);

        let decision = detect_change(
            current.mtime,
            current.size,
            prior_entry.as_ref(),
            options.integrity_mode,
            extension_in_strict_set,
            options.cache_loaded,
            cache_hit,
        );

        if let ChangeDecision::Unchanged { cached_checksum } = &decision {
            stats.record_unchanged();
            new_entries.insert(
                rel_str,
                FileMetadataEntry {
                    mtime: current.mtime,
                    size: current.size,
                    checksum: cached_checksum.clone(),
                },
            );
            continue;
        }

        let fresh_digest = compute_digest(abs, options.checksum_algorithm, current.size, current.mtime)?;
        let transition = sync_checksum::transition::classify(
            &decision,
            prior_entry.as_ref().map(|p| p.checksum.as_str()),
            Some(fresh_digest.as_str()),
        );

        match transition {
            FileTransition::Unchanged => unreachable!("Unchanged is handled above"),
            FileTransition::New => {
                if !options.dry_run {
                    put_verified(store, abs, &expected_key).await?;
                }
                stats.record_new(current.size);
                new_entries.insert(
                    rel_str,
                    FileMetadataEntry {
                        mtime: current.mtime,
                        size: current.size,
                        checksum: fresh_digest,
                    },
                );
            }
            FileTransition::Modified => {
                let version_dst = versions_key(options.prefix, &shard.component, &rel_str);
                if !options.dry_run {
                    if let Err(e) = store.move_object(&expected_key, &version_dst).await {
                        error!("versioning move failed for {expected_key}, skipping this file's upload: {e}");
                        stats.record_error();
                        if let Some(prior_entry) = prior.entries.get(&rel_str) {
                            new_entries.insert(rel_str, prior_entry.clone());
                        }
                        continue;
                    }
                    put_verified(store, abs, &expected_key).await?;
                }
                stats.record_modified(current.size);
                new_entries.insert(
                    rel_str,
                    FileMetadataEntry {
                        mtime: current.mtime,
                        size: current.size,
                        checksum: fresh_digest,
                    },
                );
            }
            FileTransition::Deleted => unreachable!("a file present in this run's walk is never Deleted"),
        }
    }

    let mut deleted = Vec::new();
    for (rel, meta) in prior.entries.iter() {
        if seen_rel.contains(rel) {
            continue;
        }
        let dst = deleted_key(options.prefix, &shard.component, rel);
        let src = current_key(options.prefix, &shard.component, rel);
        if !options.dry_run {
            if let Err(e) = store.move_object(&src, &dst).await {
                warn!("deletion move failed for {src}: {e}");
                stats.record_error();
                continue;
            }
        }
        stats.record_deleted();
        deleted.push(DeletedFileEntry {
            component: shard.component.as_key_infix(),
            relative_path: rel.clone(),
            deleted_at: options.now_iso8601.to_string(),
            size: meta.size,
            checksum: meta.checksum.clone(),
            source_directory: shard.directory.display().to_string(),
        });
    }

    prior.entries = new_entries;
    prior.last_updated = options.now_iso8601.to_string();

    Ok(ShardRunOutcome {
        shard_state: prior,
        deleted,
        directory_missing: false,
    })
}

async fn put_verified(store: &dyn ObjectStore, local: &std::path::Path, key: &str) -> Result<PutOutcome, EngineError> {
    store.put(local, key, true).await.map_err(EngineError::from)
}
