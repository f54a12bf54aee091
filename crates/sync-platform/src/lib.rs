//! Platform utilities: file metadata, atomic writes, timestamps, JSON
//! validation. Shared by every other crate in the workspace.

pub mod atomic;
pub mod fsmeta;
pub mod human;
pub mod iso8601;
pub mod json;
pub mod retention;

pub use atomic::{atomic_write, AtomicWriteError};
pub use fsmeta::{file_size_and_mtime, FileStat, FsMetaError};
pub use human::human_size;
pub use iso8601::{format_iso8601, is_not_future, now_iso8601, parse_iso8601, Iso8601Error};
pub use json::{validate_state_envelope, JsonStateError};
pub use retention::{RetentionParseError, RetentionPeriod};
