//! State recovery (spec.md §4.8): on startup, reconcile each managed
//! state file against its remote snapshot before anything else runs.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::info;

use sync_objectstore::ObjectStore;
use sync_platform::validate_state_envelope;
use sync_state::RecoveryAuditRecord;

use crate::error::EngineError;

const SKEW_SECONDS: i64 = 3600;
const NEWER_THRESHOLD_HOURS: i64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryDecision {
    UseRemote,
    InitializeEmpty,
    KeepLocal,
}

struct Validated {
    age_seconds: i64,
    last_updated: DateTime<Utc>,
}

fn validate(raw: &str, now: DateTime<Utc>) -> Option<Validated> {
    let value: Value = validate_state_envelope(raw, SKEW_SECONDS).ok()?;
    let last_updated = value.get("last_updated")?.as_str()?;
    let last_updated = sync_platform::parse_iso8601(last_updated).ok()?;
    Some(Validated {
        age_seconds: now.signed_duration_since(last_updated).num_seconds(),
        last_updated,
    })
}

/// Decide which copy of a state file wins, per the six-way table in
/// spec.md §4.8.
pub fn decide(local_raw: Option<&str>, remote_raw: Option<&str>, now: DateTime<Utc>) -> (RecoveryDecision, String, RecoveryAuditRecord) {
    let local = local_raw.and_then(|r| validate(r, now));
    let remote = remote_raw.and_then(|r| validate(r, now));

    let (decision, reason) = match (&local, &remote) {
        (None, Some(_)) => (RecoveryDecision::UseRemote, "local invalid, remote valid"),
        (None, None) => (RecoveryDecision::InitializeEmpty, "both invalid"),
        (Some(_), None) => (RecoveryDecision::KeepLocal, "remote invalid, local valid"),
        (Some(l), Some(r)) => {
            if r.last_updated.signed_duration_since(l.last_updated) > chrono::Duration::hours(NEWER_THRESHOLD_HOURS) {
                (RecoveryDecision::UseRemote, "remote newer by more than 2h, recovery scenario")
            } else {
                (RecoveryDecision::KeepLocal, "remote not newer enough, likely clock skew")
            }
        }
    };

    let record = RecoveryAuditRecord {
        file_type: String::new(),
        decision: format!("{decision:?}"),
        reason: reason.to_string(),
        local_age_s: local.as_ref().map(|v| v.age_seconds),
        s3_age_s: remote.as_ref().map(|v| v.age_seconds),
        timestamp: sync_platform::format_iso8601(now),
    };

    (decision, reason.to_string(), record)
}

/// Download the remote snapshot for `name`, apply the recovery
/// decision against `local_path`, and return the audit record plus
/// whether the local file was overwritten.
pub async fn recover_state_file(
    store: &dyn ObjectStore,
    remote_key: &str,
    local_path: &std::path::Path,
    file_type: &str,
    now: DateTime<Utc>,
) -> Result<(RecoveryDecision, RecoveryAuditRecord), EngineError> {
    let local_raw = std::fs::read_to_string(local_path).ok();

    let remote_raw = {
        let tmp = local_path.with_extension("recovery-download.tmp");
        match store.get(remote_key, &tmp).await {
            Ok(()) => {
                let contents = std::fs::read_to_string(&tmp).ok();
                let _ = std::fs::remove_file(&tmp);
                contents
            }
            Err(_) => None,
        }
    };

    let (decision, _reason, mut record) = decide(local_raw.as_deref(), remote_raw.as_deref(), now);
    record.file_type = file_type.to_string();

    match decision {
        RecoveryDecision::UseRemote => {
            if let Some(remote) = remote_raw {
                if local_path.exists() {
                    let backup = local_path.with_extension(format!(
                        "pre-recovery-{}",
                        now.format("%Y%m%dT%H%M%SZ")
                    ));
                    let _ = std::fs::rename(local_path, backup);
                }
                if let Some(parent) = local_path.parent() {
                    std::fs::create_dir_all(parent).ok();
                }
                std::fs::write(local_path, remote).map_err(|e| {
                    EngineError::Metadata(sync_platform::FsMetaError::Stat {
                        path: local_path.display().to_string(),
                        source: e,
                    })
                })?;
            }
        }
        RecoveryDecision::InitializeEmpty => {
            info!("{file_type}: both local and remote invalid, starting empty");
        }
        RecoveryDecision::KeepLocal => {}
    }

    Ok((decision, record))
}
