pub mod cache;
pub mod error;
pub mod layout;
pub mod lock;
pub mod store;
pub mod types;

pub use cache::ObjectCache;
pub use error::StateError;
pub use layout::StateLayout;
pub use lock::ProcessLock;
pub use store::StateStore;
pub use types::{
    AggregateState, DeletedDirectoryEntry, DeletedFileEntry, DirectoryState, FileMetadataEntry,
    PermanentDeletionRecord, RecoveryAuditRecord, ShardState, YesterdayState,
};

pub const STATE_FILE_VERSION: u64 = 1;
