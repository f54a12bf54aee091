//! Filesystem-safe key derived from a shard's component, used to name
//! its `state/current/<shard-key>.state.json` file (spec.md §3): the
//! URL-safe base64 encoding of the component's S3 path infix.

use base64::{engine::general_purpose, Engine as _};
use sync_scanner::Component;

pub fn shard_key(component: &Component) -> String {
    general_purpose::URL_SAFE_NO_PAD.encode(component.as_key_infix())
}
