//! Validated, immutable configuration (spec.md §6).
//!
//! `sync-core` only ever consumes [`Config`]. Everything else in this
//! crate — the KEY=VALUE file loader and its whitelist/command-injection
//! checks — is the external collaborator spec.md §1 calls out, kept in
//! its own crate so the boundary is a crate boundary, not just a
//! convention.

pub mod loader;
pub mod types;
pub mod validation;

pub use loader::{disable_force_alignment_mode, load_config_file, LoaderError};
pub use types::{BackupStrategy, ChecksumAlgorithm, Config, IntegrityMode};
pub use validation::validate;
