//! Session state directory naming and path sanitization.

use std::path::{Path, PathBuf};

use warden_core::dirs::WardenHome;

/// Sanitize a single path segment (an agent or session name) so it cannot
/// escape its parent directory or collide with a reserved name.
///
/// Keeps only ASCII alphanumerics, `-`, and `_`; everything else becomes
/// `_`. An empty result becomes `"_"`.
#[must_use]
pub fn sanitize_segment(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        "_".to_owned()
    } else {
        cleaned
    }
}

/// The host directory a session's state snapshot is extracted into:
/// `<data_root>/state/<sanitized-agent>/<sanitized-session>/`.
#[must_use]
pub fn state_dir(home: &WardenHome, agent_name: &str, session_name: &str) -> PathBuf {
    home.state_root()
        .join(sanitize_segment(agent_name))
        .join(sanitize_segment(session_name))
}

/// Check that `candidate` resolves to somewhere under `root` once both are
/// canonicalized (or, for paths that don't yet exist, lexically compared
/// after joining non-absolute candidates onto `root`).
#[must_use]
pub fn is_contained_within(root: &Path, candidate: &Path) -> bool {
    let resolved = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        root.join(candidate)
    };
    let expanded = resolved.canonicalize().unwrap_or(resolved);
    let root_expanded = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    expanded.starts_with(&root_expanded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_segment_strips_path_traversal() {
        assert_eq!(sanitize_segment("../../etc/passwd"), "______etc_passwd");
        assert_eq!(sanitize_segment(".."), "_");
        assert_eq!(sanitize_segment(""), "_");
    }

    #[test]
    fn sanitize_segment_preserves_safe_names() {
        assert_eq!(sanitize_segment("my-agent_v2"), "my-agent_v2");
    }

    #[test]
    fn state_dir_nests_under_sanitized_segments() {
        let home = WardenHome::from_path("/tmp/warden");
        let dir = state_dir(&home, "my-agent", "session one");
        assert_eq!(dir, PathBuf::from("/tmp/warden/state/my-agent/session_one"));
    }

    #[test]
    fn containment_rejects_escaping_paths() {
        let dir = tempfile::tempdir().unwrap();
        assert!(is_contained_within(dir.path(), Path::new("workspace/note.txt")));
        assert!(!is_contained_within(dir.path(), Path::new("/etc/passwd")));
    }
}
