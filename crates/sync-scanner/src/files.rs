//! Per-shard file enumeration. Scan depth is 1 for `Shallow` and
//! `DeepRoot` (immediate files only), unbounded for `DeepSubdir`
//! (spec.md §4.1).

use std::path::PathBuf;

use tracing::warn;
use walkdir::WalkDir;

use crate::types::{Mode, Shard};

/// `(absolute_path, path_relative_to_the_shard_root)` for every
/// regular file owned directly by this shard.
pub fn list_shard_files(shard: &Shard) -> Vec<(PathBuf, PathBuf)> {
    let max_depth = match shard.mode {
        Mode::Shallow | Mode::DeepRoot => 1,
        Mode::DeepSubdir => usize::MAX,
    };

    let mut files = Vec::new();

    for entry in WalkDir::new(&shard.directory)
        .follow_links(false)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|res| match res {
            Ok(e) => Some(e),
            Err(e) => {
                warn!("skipping unreadable path under {}: {e}", shard.directory.display());
                None
            }
        })
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if name == crate::SHALLOW_TRIGGER_FILE || name == crate::DEEP_TRIGGER_FILE {
            continue;
        }
        let abs = entry.path().to_path_buf();
        let rel = match abs.strip_prefix(&shard.directory) {
            Ok(r) => r.to_path_buf(),
            Err(_) => continue,
        };
        files.push((abs, rel));
    }

    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Component;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn shallow_shard_only_sees_immediate_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("f1"), "a").unwrap();
        fs::create_dir_all(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested/f2"), "b").unwrap();

        let shard = Shard {
            directory: dir.path().to_path_buf(),
            mode: Mode::Shallow,
            component: Component::Root,
        };
        let files = list_shard_files(&shard);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].1, PathBuf::from("f1"));
    }

    #[test]
    fn deep_subdir_shard_recurses_fully() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        fs::write(dir.path().join("a/f1"), "a").unwrap();
        fs::write(dir.path().join("a/b/f2"), "b").unwrap();

        let shard = Shard {
            directory: dir.path().join("a"),
            mode: Mode::DeepSubdir,
            component: Component::Rel(PathBuf::from("a")),
        };
        let files = list_shard_files(&shard);
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn trigger_files_themselves_are_excluded() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(crate::SHALLOW_TRIGGER_FILE), "").unwrap();
        fs::write(dir.path().join("real.txt"), "x").unwrap();

        let shard = Shard {
            directory: dir.path().to_path_buf(),
            mode: Mode::Shallow,
            component: Component::Root,
        };
        let files = list_shard_files(&shard);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].1, PathBuf::from("real.txt"));
    }
}
