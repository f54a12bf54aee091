//! Schema enforcement for the raw KEY=VALUE map, mirroring the
//! validator-derived style used elsewhere in this codebase's config
//! layer.

use std::collections::HashMap;
use std::path::PathBuf;

use once_cell::sync::Lazy;
use regex::Regex;
use sync_platform::RetentionPeriod;
use thiserror::Error;

use crate::types::{BackupStrategy, ChecksumAlgorithm, Config, IntegrityMode};

static BUCKET_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9.-]{1,61}[a-z0-9]$").unwrap());
static AWS_REGION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z]{2}-[a-z]+-[0-9]+$").unwrap());

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("required key `{0}` is missing")]
    MissingRequired(&'static str),
    #[error("S3_BUCKET `{0}` is not a valid bucket name")]
    InvalidBucketName(String),
    #[error("AWS_REGION `{0}` does not match ^[a-z]{{2}}-[a-z]+-[0-9]+$")]
    InvalidRegion(String),
    #[error("CHECKSUM_ALGORITHM `{0}` must be one of md5, sha256, mtime")]
    InvalidChecksumAlgorithm(String),
    #[error("INTEGRITY_MODE `{0}` must be one of fast, strict, hybrid")]
    InvalidIntegrityMode(String),
    #[error("BACKUP_STRATEGY `{0}` must be one of incremental, mirror")]
    InvalidBackupStrategy(String),
    #[error("DELETED_FILE_RETENTION is invalid: {0}")]
    InvalidRetention(#[from] sync_platform::retention::RetentionParseError),
    #[error("MOUNT_DIR `{0}` must be an absolute path")]
    MountDirNotAbsolute(String),
    #[error("boolean key `{key}` has value `{value}`, expected true/false")]
    InvalidBoolean { key: &'static str, value: String },
    #[error("integer key `{key}` has value `{value}`")]
    InvalidInteger { key: &'static str, value: String },
}

fn get<'a>(map: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    map.get(key).map(|s| s.as_str())
}

fn get_required<'a>(
    map: &'a HashMap<String, String>,
    key: &'static str,
) -> Result<&'a str, ValidationError> {
    get(map, key).ok_or(ValidationError::MissingRequired(key))
}

fn parse_bool(map: &HashMap<String, String>, key: &'static str, default: bool) -> Result<bool, ValidationError> {
    match get(map, key) {
        None => Ok(default),
        Some(v) => match v.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            other => Err(ValidationError::InvalidBoolean {
                key,
                value: other.to_string(),
            }),
        },
    }
}

fn parse_u64(map: &HashMap<String, String>, key: &'static str, default: u64) -> Result<u64, ValidationError> {
    match get(map, key) {
        None => Ok(default),
        Some(v) => v.parse().map_err(|_| ValidationError::InvalidInteger {
            key,
            value: v.to_string(),
        }),
    }
}

fn parse_usize(map: &HashMap<String, String>, key: &'static str, default: usize) -> Result<usize, ValidationError> {
    match get(map, key) {
        None => Ok(default),
        Some(v) => v.parse().map_err(|_| ValidationError::InvalidInteger {
            key,
            value: v.to_string(),
        }),
    }
}

/// Validate and build a [`Config`] from the raw (already whitelist- and
/// injection-filtered) KEY=VALUE map produced by [`crate::loader`].
pub fn validate(map: &HashMap<String, String>) -> Result<Config, ValidationError> {
    let s3_bucket = get_required(map, "S3_BUCKET")?.to_string();
    if !BUCKET_NAME_RE.is_match(&s3_bucket) {
        return Err(ValidationError::InvalidBucketName(s3_bucket));
    }

    let aws_region = get_required(map, "AWS_REGION")?.to_string();
    if !AWS_REGION_RE.is_match(&aws_region) {
        return Err(ValidationError::InvalidRegion(aws_region));
    }

    let checksum_algorithm = match get(map, "CHECKSUM_ALGORITHM").unwrap_or("sha256") {
        "md5" => ChecksumAlgorithm::Md5,
        "sha256" => ChecksumAlgorithm::Sha256,
        "mtime" => ChecksumAlgorithm::Mtime,
        other => return Err(ValidationError::InvalidChecksumAlgorithm(other.to_string())),
    };

    let integrity_mode = match get(map, "INTEGRITY_MODE").unwrap_or("fast") {
        "fast" => IntegrityMode::Fast,
        "strict" => IntegrityMode::Strict,
        "hybrid" => IntegrityMode::Hybrid,
        other => return Err(ValidationError::InvalidIntegrityMode(other.to_string())),
    };

    let backup_strategy = match get(map, "BACKUP_STRATEGY").unwrap_or("incremental") {
        "incremental" => BackupStrategy::Incremental,
        "mirror" => BackupStrategy::Mirror,
        other => return Err(ValidationError::InvalidBackupStrategy(other.to_string())),
    };

    let strict_extensions = get(map, "STRICT_EXTENSIONS")
        .unwrap_or("")
        .split(',')
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect();

    let deleted_file_retention =
        RetentionPeriod::parse(get(map, "DELETED_FILE_RETENTION").unwrap_or("30:00:00"))?;

    let mount_dir_raw = get_required(map, "MOUNT_DIR")?;
    let mount_dir = PathBuf::from(mount_dir_raw);
    if !mount_dir.is_absolute() {
        return Err(ValidationError::MountDirNotAbsolute(mount_dir_raw.to_string()));
    }

    let state_dir = mount_dir.join(".backup-state");

    Ok(Config {
        s3_bucket,
        s3_prefix: get(map, "S3_PREFIX").unwrap_or("").to_string(),
        aws_region,
        aws_profile: get(map, "AWS_PROFILE").map(str::to_string),
        aws_access_key_id: get(map, "AWS_ACCESS_KEY_ID").map(str::to_string),
        aws_secret_access_key: get(map, "AWS_SECRET_ACCESS_KEY").map(str::to_string),
        aws_session_token: get(map, "AWS_SESSION_TOKEN").map(str::to_string),

        backup_backend: get(map, "BACKUP_BACKEND").unwrap_or("s3").to_string(),
        backup_strategy,
        preserve_directory_paths: parse_bool(map, "PRESERVE_DIRECTORY_PATHS", true)?,
        backup_organization: get(map, "BACKUP_ORGANIZATION").unwrap_or("").to_string(),

        checksum_algorithm,
        integrity_mode,
        strict_extensions,

        deleted_file_retention,

        dry_run: parse_bool(map, "DRY_RUN", false)?,
        mount_dir,

        force_alignment_mode: parse_bool(map, "FORCE_ALIGNMENT_MODE", false)?,
        alignment_history_retention: parse_usize(map, "ALIGNMENT_HISTORY_RETENTION", 100)?,

        filesystem_scan_refresh_hours: parse_u64(map, "FILESYSTEM_SCAN_REFRESH_HOURS", 6)?,
        force_filesystem_scan_refresh: parse_bool(map, "FORCE_FILESYSTEM_SCAN_REFRESH", false)?,

        audit_system_enabled: parse_bool(map, "AUDIT_SYSTEM_ENABLED", true)?,

        log_level: get(map, "LOG_LEVEL").unwrap_or("info").to_string(),
        max_log_size_mb: parse_u64(map, "MAX_LOG_SIZE", 100)?,

        s3_cache_file: PathBuf::from(
            get(map, "S3_CACHE_FILE")
                .map(str::to_string)
                .unwrap_or_else(|| state_dir.join("s3/s3-cache.json").display().to_string()),
        ),
        s3_report_file: PathBuf::from(
            get(map, "S3_REPORT_FILE")
                .map(str::to_string)
                .unwrap_or_else(|| state_dir.join("s3/s3-report.json").display().to_string()),
        ),
        s3_inspect_log_file: PathBuf::from(
            get(map, "S3_INSPECT_LOG_FILE")
                .map(str::to_string)
                .unwrap_or_else(|| state_dir.join("s3/inspect.log").display().to_string()),
        ),
        detailed_s3_report: parse_bool(map, "DETAILED_S3_REPORT", false)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_map() -> HashMap<String, String> {
        let mut m = HashMap::new();
        m.insert("S3_BUCKET".to_string(), "my-bucket".to_string());
        m.insert("AWS_REGION".to_string(), "us-east-1".to_string());
        m.insert("MOUNT_DIR".to_string(), "/mnt/data".to_string());
        m
    }

    #[test]
    fn validates_minimal_config() {
        let cfg = validate(&base_map()).unwrap();
        assert_eq!(cfg.s3_bucket, "my-bucket");
        assert_eq!(cfg.checksum_algorithm, ChecksumAlgorithm::Sha256);
    }

    #[test]
    fn rejects_missing_bucket() {
        let mut m = base_map();
        m.remove("S3_BUCKET");
        assert!(matches!(
            validate(&m),
            Err(ValidationError::MissingRequired("S3_BUCKET"))
        ));
    }

    #[test]
    fn rejects_bad_region() {
        let mut m = base_map();
        m.insert("AWS_REGION".to_string(), "US-EAST-1".to_string());
        assert!(matches!(validate(&m), Err(ValidationError::InvalidRegion(_))));
    }

    #[test]
    fn rejects_relative_mount_dir() {
        let mut m = base_map();
        m.insert("MOUNT_DIR".to_string(), "relative/path".to_string());
        assert!(matches!(
            validate(&m),
            Err(ValidationError::MountDirNotAbsolute(_))
        ));
    }

    #[test]
    fn parses_strict_extensions_list() {
        let mut m = base_map();
        m.insert("STRICT_EXTENSIONS".to_string(), ".sqlite, .db".to_string());
        let cfg = validate(&m).unwrap();
        assert_eq!(cfg.strict_extensions, vec![".sqlite", ".db"]);
    }
}
