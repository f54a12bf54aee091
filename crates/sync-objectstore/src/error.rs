use sync_resilience::Retryable;

/// Distinguishes transient failures (timeouts, 5xx, throttling) from
/// permanent ones (permission, missing key) per spec.md §4.4.
#[derive(Debug, thiserror::Error)]
pub enum ObjectStoreError {
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("transient backend error: {0}")]
    Transient(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("key not found: {0}")]
    NotFound(String),
    #[error("upload verification failed for {key}: expected {expected} bytes, server reports {actual}")]
    VerificationFailed {
        key: String,
        expected: u64,
        actual: u64,
    },
    #[error("other object-store error: {0}")]
    Other(String),
}

impl Retryable for ObjectStoreError {
    fn is_transient(&self) -> bool {
        matches!(self, ObjectStoreError::Timeout(_) | ObjectStoreError::Transient(_))
    }
}

impl From<opendal::Error> for ObjectStoreError {
    fn from(err: opendal::Error) -> Self {
        use opendal::ErrorKind;
        match err.kind() {
            ErrorKind::NotFound => ObjectStoreError::NotFound(err.to_string()),
            ErrorKind::PermissionDenied => ObjectStoreError::PermissionDenied(err.to_string()),
            ErrorKind::RateLimited
            | ErrorKind::Unexpected
            | ErrorKind::ConfigInvalid
                if err.is_temporary() =>
            {
                ObjectStoreError::Transient(err.to_string())
            }
            _ if err.is_temporary() => ObjectStoreError::Transient(err.to_string()),
            _ => ObjectStoreError::Other(err.to_string()),
        }
    }
}
