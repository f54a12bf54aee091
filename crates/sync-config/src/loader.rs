//! Whitelisted `KEY=VALUE` configuration file reader (spec.md §6).
//!
//! This is the external collaborator spec.md §1 says the core never
//! touches directly — `sync-core` only ever sees the validated
//! [`crate::Config`] this loader (via [`crate::validation::validate`])
//! produces.

use std::collections::HashMap;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::{info, warn};

use crate::types::Config;
use crate::validation::{self, ValidationError};

const WHITELIST: &[&str] = &[
    "S3_BUCKET",
    "S3_PREFIX",
    "AWS_REGION",
    "AWS_PROFILE",
    "AWS_ACCESS_KEY_ID",
    "AWS_SECRET_ACCESS_KEY",
    "AWS_SESSION_TOKEN",
    "BACKUP_BACKEND",
    "BACKUP_STRATEGY",
    "PRESERVE_DIRECTORY_PATHS",
    "BACKUP_ORGANIZATION",
    "CHECKSUM_ALGORITHM",
    "INTEGRITY_MODE",
    "STRICT_EXTENSIONS",
    "DELETED_FILE_RETENTION",
    "DRY_RUN",
    "MOUNT_DIR",
    "FORCE_ALIGNMENT_MODE",
    "ALIGNMENT_HISTORY_RETENTION",
    "FILESYSTEM_SCAN_REFRESH_HOURS",
    "FORCE_FILESYSTEM_SCAN_REFRESH",
    "AUDIT_SYSTEM_ENABLED",
    "LOG_LEVEL",
    "MAX_LOG_SIZE",
    "S3_CACHE_FILE",
    "S3_REPORT_FILE",
    "S3_INSPECT_LOG_FILE",
    "DETAILED_S3_REPORT",
];

static DANGEROUS_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"\$\(").unwrap(),   // command substitution
        Regex::new(r"`").unwrap(),      // backticks
        Regex::new(r";").unwrap(),      // unescaped statement separator
        Regex::new(r"\|").unwrap(),     // pipes
        Regex::new(r">>").unwrap(),     // append redirection
        Regex::new(r"<<").unwrap(),     // heredoc
        Regex::new(r"\$\{[^}]*:[^}]*\}").unwrap(), // complex ${...} expansion
    ]
});

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("configuration file {0} is executable, refusing to load")]
    ExecutableConfigFile(String),
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: malformed KEY=VALUE: {raw:?}")]
    Malformed { line: usize, raw: String },
    #[error("line {line}: value for `{key}` contains a rejected shell metacharacter")]
    RejectedValue { line: usize, key: String },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("failed to back up {path}: {source}")]
    Backup {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: sync_platform::AtomicWriteError,
    },
}

/// Load, parse, whitelist-filter, and validate a configuration file.
pub fn load_config_file(path: &Path) -> Result<Config, LoaderError> {
    let metadata = fs::metadata(path).map_err(|source| LoaderError::Read {
        path: path.display().to_string(),
        source,
    })?;
    if metadata.permissions().mode() & 0o111 != 0 {
        return Err(LoaderError::ExecutableConfigFile(path.display().to_string()));
    }

    let contents = fs::read_to_string(path).map_err(|source| LoaderError::Read {
        path: path.display().to_string(),
        source,
    })?;

    let map = parse_key_value(&contents)?;
    Ok(validation::validate(&map)?)
}

/// Flip `FORCE_ALIGNMENT_MODE` back to `false` in place once a forced
/// alignment run has completed, so the next invocation runs a normal
/// backup (spec.md §4.7 step 7). A timestamped backup of the whole
/// file is written first; the line's original quoting style (bare,
/// single-quoted, or double-quoted) is preserved. Returns `false`
/// without touching anything if the key isn't present.
pub fn disable_force_alignment_mode(path: &Path, now: DateTime<Utc>) -> Result<bool, LoaderError> {
    let contents = fs::read_to_string(path).map_err(|source| LoaderError::Read {
        path: path.display().to_string(),
        source,
    })?;

    let mut changed = false;
    let mut rewritten: Vec<String> = Vec::with_capacity(contents.lines().count());

    for raw_line in contents.lines() {
        let trimmed = raw_line.trim();
        if let Some((key, value)) = trimmed.split_once('=') {
            if key.trim() == "FORCE_ALIGNMENT_MODE" {
                let value = value.trim();
                let quote = match value.as_bytes() {
                    [first, .., last] if *first == b'"' && *last == b'"' => Some('"'),
                    [first, .., last] if *first == b'\'' && *last == b'\'' => Some('\''),
                    _ => None,
                };
                rewritten.push(match quote {
                    Some(q) => format!("FORCE_ALIGNMENT_MODE={q}false{q}"),
                    None => "FORCE_ALIGNMENT_MODE=false".to_string(),
                });
                changed = true;
                continue;
            }
        }
        rewritten.push(raw_line.to_string());
    }

    if !changed {
        return Ok(false);
    }

    let backup_path = path.with_file_name(format!(
        "{}.bak-{}",
        path.file_name().unwrap_or_default().to_string_lossy(),
        now.format("%Y%m%dT%H%M%SZ")
    ));
    fs::copy(path, &backup_path).map_err(|source| LoaderError::Backup {
        path: backup_path.display().to_string(),
        source,
    })?;

    let mut new_contents = rewritten.join("\n");
    if contents.ends_with('\n') {
        new_contents.push('\n');
    }

    sync_platform::atomic_write(path, new_contents.as_bytes()).map_err(|source| LoaderError::Write {
        path: path.display().to_string(),
        source,
    })?;

    info!("disabled FORCE_ALIGNMENT_MODE in {} after backing it up to {}", path.display(), backup_path.display());
    Ok(true)
}

/// Parse a `KEY=VALUE` document, stripping quotes, trimming whitespace,
/// rejecting command-injection-prone values, warning on (and dropping)
/// unknown keys.
fn parse_key_value(contents: &str) -> Result<HashMap<String, String>, LoaderError> {
    let mut map = HashMap::new();

    for (idx, raw_line) in contents.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            return Err(LoaderError::Malformed {
                line: line_no,
                raw: raw_line.to_string(),
            });
        };

        let key = key.trim();
        let value = strip_quotes(value.trim());

        if !WHITELIST.contains(&key) {
            warn!("ignoring unknown configuration key `{key}` at line {line_no}");
            continue;
        }

        if DANGEROUS_PATTERNS.iter().any(|re| re.is_match(&value)) {
            return Err(LoaderError::RejectedValue {
                line: line_no,
                key: key.to_string(),
            });
        }

        map.insert(key.to_string(), value);
    }

    Ok(map)
}

fn strip_quotes(value: &str) -> String {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        let last = bytes[bytes.len() - 1];
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return value[1..value.len() - 1].to_string();
        }
    }
    value.to_string()
}
