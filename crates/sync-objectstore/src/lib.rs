//! Typed object-store client (spec.md §4.4): `put`/`get`/`exists`/
//! `list`/`delete`/`move`, each with bounded retry and a per-operation
//! timeout, backed by [`opendal`] (learned from this pack's
//! `object_store`/`opendal` S3 adapters — the teacher repo has no S3
//! client of its own).

mod client;
mod error;

pub use client::{ObjectMeta, ObjectStore, OpendalObjectStore, PutOutcome};
pub use error::ObjectStoreError;
