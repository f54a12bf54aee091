use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("mount directory is missing or unreadable: {0}")]
    MissingMount(String),
    #[error(transparent)]
    Discover(#[from] sync_scanner::DiscoverError),
    #[error(transparent)]
    Digest(#[from] sync_checksum::DigestError),
    #[error(transparent)]
    ObjectStore(#[from] sync_objectstore::ObjectStoreError),
    #[error(transparent)]
    State(#[from] sync_state::StateError),
    #[error(transparent)]
    Metadata(#[from] sync_platform::FsMetaError),
}
