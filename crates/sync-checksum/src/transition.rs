//! The per-file transition a sync run commits to, replacing stringly
//! "new"/"modified"/... flags with a matched sum type (spec.md §4.3,
//! §9 design notes).

use crate::detect::ChangeDecision;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileTransition {
    New,
    Modified,
    Unchanged,
    Deleted,
}

/// Resolve the transition for a file that was present in this run's
/// filesystem walk. `fresh_digest` is only consulted when `decision`
/// is `NeedsProcessing`; `prior_checksum` is `None` for a file with no
/// shard-metadata entry.
pub fn classify(
    decision: &ChangeDecision,
    prior_checksum: Option<&str>,
    fresh_digest: Option<&str>,
) -> FileTransition {
    if let ChangeDecision::Unchanged { .. } = decision {
        return FileTransition::Unchanged;
    }

    let Some(prior_checksum) = prior_checksum else {
        return FileTransition::New;
    };

    match fresh_digest {
        // Content digest matches the stored one even though the
        // object cache couldn't confirm presence: the live object is
        // gone, so this is a fresh put rather than a versioned move.
        Some(fresh) if fresh == prior_checksum => FileTransition::New,
        Some(_) => FileTransition::Modified,
        None => FileTransition::Modified,
    }
}
