//! Hierarchy filter: a shallow trigger is dropped if any deep trigger
//! in the same set is an ancestor directory of it (spec.md §4.1).

use crate::types::{RawTriggerMode, TriggerEntry};

pub fn filter_hierarchy(entries: Vec<TriggerEntry>) -> Vec<TriggerEntry> {
    let deep_dirs: Vec<&std::path::Path> = entries
        .iter()
        .filter(|e| e.mode == RawTriggerMode::Deep)
        .map(|e| e.directory.as_path())
        .collect();

    entries
        .into_iter()
        .filter(|entry| {
            if entry.mode != RawTriggerMode::Shallow {
                return true;
            }
            !deep_dirs
                .iter()
                .any(|deep_dir| *deep_dir != entry.directory && entry.directory.starts_with(deep_dir))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn entry(path: &str, mode: RawTriggerMode) -> TriggerEntry {
        TriggerEntry {
            directory: PathBuf::from(path),
            mode,
        }
    }

    #[test]
    fn drops_shallow_descendant_of_deep_ancestor() {
        let entries = vec![
            entry("/mnt/P", RawTriggerMode::Deep),
            entry("/mnt/P/sub", RawTriggerMode::Shallow),
        ];
        let filtered = filter_hierarchy(entries);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].directory, PathBuf::from("/mnt/P"));
    }

    #[test]
    fn keeps_unrelated_shallow_and_deep() {
        let entries = vec![
            entry("/mnt/A", RawTriggerMode::Shallow),
            entry("/mnt/B", RawTriggerMode::Deep),
        ];
        let filtered = filter_hierarchy(entries);
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn shallow_at_same_path_as_deep_is_not_self_filtered() {
        // Hierarchy filtering only ever acts on *distinct* directories
        // after deep-wins tie-break has already collapsed same-path
        // duplicates in discover_triggers; this guards against an
        // accidental self-match regression.
        let entries = vec![entry("/mnt/A", RawTriggerMode::Shallow)];
        let filtered = filter_hierarchy(entries);
        assert_eq!(filtered.len(), 1);
    }
}
