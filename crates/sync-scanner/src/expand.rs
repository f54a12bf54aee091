//! Deep-directory expansion: a deep trigger becomes `(dir, DeepRoot)`
//! plus one `(child, DeepSubdir)` per immediate subdirectory
//! (spec.md §4.1) — this is what gives a deep tree per-shard state.

use std::fs;
use std::path::Path;

use tracing::warn;

use crate::component::s3_component;
use crate::types::{Mode, RawTriggerMode, Shard, TriggerEntry};

pub fn expand_deep(mount: &Path, entries: Vec<TriggerEntry>) -> Vec<Shard> {
    let mut shards = Vec::new();

    for entry in entries {
        match entry.mode {
            RawTriggerMode::Shallow => {
                shards.push(Shard {
                    component: s3_component(mount, &entry.directory),
                    directory: entry.directory,
                    mode: Mode::Shallow,
                });
            }
            RawTriggerMode::Deep => {
                shards.push(Shard {
                    component: s3_component(mount, &entry.directory),
                    directory: entry.directory.clone(),
                    mode: Mode::DeepRoot,
                });

                match fs::read_dir(&entry.directory) {
                    Ok(read_dir) => {
                        for child in read_dir.filter_map(|e| e.ok()) {
                            let child_path = child.path();
                            if child_path.is_dir() {
                                shards.push(Shard {
                                    component: s3_component(mount, &child_path),
                                    directory: child_path,
                                    mode: Mode::DeepSubdir,
                                });
                            }
                        }
                    }
                    Err(e) => {
                        // Permission errors per subtree are logged and
                        // skipped, never fatal (spec.md §4.1).
                        warn!(
                            "skipping deep expansion of {}: {e}",
                            entry.directory.display()
                        );
                    }
                }
            }
        }
    }

    shards
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn expands_deep_into_root_and_children() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("P");
        fs::create_dir_all(p.join("child1")).unwrap();
        fs::create_dir_all(p.join("child2")).unwrap();
        fs::write(p.join("file.txt"), "x").unwrap();

        let entries = vec![TriggerEntry {
            directory: p.clone(),
            mode: RawTriggerMode::Deep,
        }];
        let shards = expand_deep(dir.path(), entries);

        assert_eq!(shards.len(), 3);
        assert!(shards.iter().any(|s| s.mode == Mode::DeepRoot && s.directory == p));
        assert_eq!(
            shards.iter().filter(|s| s.mode == Mode::DeepSubdir).count(),
            2
        );
    }

    #[test]
    fn shallow_passes_through_unexpanded() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("A");
        fs::create_dir_all(&a).unwrap();

        let entries = vec![TriggerEntry {
            directory: a.clone(),
            mode: RawTriggerMode::Shallow,
        }];
        let shards = expand_deep(dir.path(), entries);

        assert_eq!(shards.len(), 1);
        assert_eq!(shards[0].mode, Mode::Shallow);
    }
}
