//! `<comp>` derivation: the mount-relative path, or `Component::Root`
//! when the shard directory is the mount itself.

use std::path::Path;

use crate::types::Component;

pub fn s3_component(mount: &Path, directory: &Path) -> Component {
    if directory == mount {
        return Component::Root;
    }
    match directory.strip_prefix(mount) {
        Ok(rel) if !rel.as_os_str().is_empty() => Component::Rel(rel.to_path_buf()),
        _ => Component::Root,
    }
}
