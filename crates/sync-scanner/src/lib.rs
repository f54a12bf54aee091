//! Filesystem scanner (spec.md §4.1): trigger-file discovery,
//! hierarchy filtering, deep-directory expansion, and per-shard file
//! enumeration.

pub mod component;
pub mod discover;
pub mod expand;
pub mod files;
pub mod hierarchy;
pub mod types;

pub use component::s3_component;
pub use discover::{discover_triggers, DiscoverError};
pub use expand::expand_deep;
pub use files::list_shard_files;
pub use hierarchy::filter_hierarchy;
pub use types::{Component, Mode, RawTriggerMode, Shard, TriggerEntry};

pub const SHALLOW_TRIGGER_FILE: &str = "backupthisdir.txt";
pub const DEEP_TRIGGER_FILE: &str = "backupalldirs.txt";
