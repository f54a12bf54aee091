//! Object-store key scheme (spec.md §6): `<prefix>/current_state/<comp>/<rel>`,
//! `<prefix>/yesterday_state/versions_<comp>/<rel>`,
//! `<prefix>/yesterday_state/deleted_<comp>/<rel>`,
//! `<prefix>/state_backups/<name>-LATEST.json`.

use sync_scanner::Component;

fn joined(prefix: &str, rest: &str) -> String {
    if prefix.is_empty() {
        rest.to_string()
    } else {
        format!("{}/{}", prefix.trim_end_matches('/'), rest)
    }
}

pub fn current_key(prefix: &str, component: &Component, relative_path: &str) -> String {
    joined(
        prefix,
        &format!("current_state/{}/{relative_path}", component.as_key_infix()),
    )
}

pub fn versions_key(prefix: &str, component: &Component, relative_path: &str) -> String {
    joined(
        prefix,
        &format!(
            "yesterday_state/versions_{}/{relative_path}",
            component.as_key_infix()
        ),
    )
}

pub fn deleted_key(prefix: &str, component: &Component, relative_path: &str) -> String {
    joined(
        prefix,
        &format!(
            "yesterday_state/deleted_{}/{relative_path}",
            component.as_key_infix()
        ),
    )
}

pub fn state_backup_key(prefix: &str, name: &str) -> String {
    joined(prefix, &format!("state_backups/{name}-LATEST.json"))
}

/// The whole `current_state/` root, for listings that scan every
/// active component at once (the cache refresh, forced alignment).
pub fn current_state_root_prefix(prefix: &str) -> String {
    joined(prefix, "current_state/")
}

/// The `current_state/<comp>/` prefix for `component`, with a
/// trailing slash so membership tests are exact-depth rather than
/// string-prefix (spec.md §4.7 step 3: "exact-depth directory
/// matching, not suffix matching").
pub fn current_component_prefix(prefix: &str, component: &Component) -> String {
    joined(prefix, &format!("current_state/{}/", component.as_key_infix()))
}

/// Whether `key` lives directly under one of the active components'
/// `current_state/` prefixes.
pub fn key_matches_any_component(key: &str, prefix: &str, components: &[Component]) -> bool {
    components
        .iter()
        .any(|c| key.starts_with(&current_component_prefix(prefix, c)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn root_component_maps_to_literal_root() {
        assert_eq!(
            current_key("backups", &Component::Root, "a.txt"),
            "backups/current_state/root/a.txt"
        );
    }

    #[test]
    fn rel_component_preserves_path() {
        assert_eq!(
            current_key("backups", &Component::Rel(PathBuf::from("A/sub")), "a.txt"),
            "backups/current_state/A/sub/a.txt"
        );
    }

    #[test]
    fn empty_prefix_has_no_leading_slash() {
        assert_eq!(
            current_key("", &Component::Root, "a.txt"),
            "current_state/root/a.txt"
        );
    }

    #[test]
    fn versions_and_deleted_keys_use_distinct_namespaces() {
        let comp = Component::Root;
        assert_eq!(
            versions_key("p", &comp, "a.txt"),
            "p/yesterday_state/versions_root/a.txt"
        );
        assert_eq!(
            deleted_key("p", &comp, "a.txt"),
            "p/yesterday_state/deleted_root/a.txt"
        );
    }

    #[test]
    fn key_matches_any_component_is_exact_depth() {
        let active = vec![Component::Rel(PathBuf::from("A"))];
        assert!(key_matches_any_component(
            "p/current_state/A/file.txt",
            "p",
            &active
        ));
        // "AB" must not match the "A" prefix (exact-depth, not suffix).
        assert!(!key_matches_any_component(
            "p/current_state/AB/file.txt",
            "p",
            &active
        ));
    }
}
