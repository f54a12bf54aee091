//! The validated configuration struct itself. Read once at startup and
//! passed around as an immutable value thereafter (spec.md §5
//! "Process-wide state").

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sync_platform::RetentionPeriod;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChecksumAlgorithm {
    Md5,
    Sha256,
    Mtime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegrityMode {
    Fast,
    Strict,
    Hybrid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackupStrategy {
    Incremental,
    Mirror,
}

/// Fully validated run configuration. `mount_dir` is locked immutable
/// after load (spec.md §5).
#[derive(Debug, Clone)]
pub struct Config {
    pub s3_bucket: String,
    pub s3_prefix: String,
    pub aws_region: String,
    pub aws_profile: Option<String>,
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub aws_session_token: Option<String>,

    pub backup_backend: String,
    pub backup_strategy: BackupStrategy,
    pub preserve_directory_paths: bool,
    pub backup_organization: String,

    pub checksum_algorithm: ChecksumAlgorithm,
    pub integrity_mode: IntegrityMode,
    pub strict_extensions: Vec<String>,

    pub deleted_file_retention: RetentionPeriod,

    pub dry_run: bool,
    pub mount_dir: PathBuf,

    pub force_alignment_mode: bool,
    pub alignment_history_retention: usize,

    pub filesystem_scan_refresh_hours: u64,
    pub force_filesystem_scan_refresh: bool,

    pub audit_system_enabled: bool,

    pub log_level: String,
    pub max_log_size_mb: u64,

    pub s3_cache_file: PathBuf,
    pub s3_report_file: PathBuf,
    pub s3_inspect_log_file: PathBuf,
    pub detailed_s3_report: bool,
}

impl Config {
    /// The mount-relative component for a file directly under the
    /// mount root, used as the `<comp>` infix (spec.md §3).
    pub const ROOT_COMPONENT: &'static str = "root";
}
