use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to read {path}: {source}")]
    Read {
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
    #[error("failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("{path} is not valid state: {source}")]
    InvalidEnvelope {
        path: String,
        #[source]
        source: sync_platform::JsonStateError,
    },
    #[error("another process already holds the state lock at {0}")]
    AlreadyLocked(String),
    #[error("failed to acquire the process lock at {path}: {source}")]
    LockIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
