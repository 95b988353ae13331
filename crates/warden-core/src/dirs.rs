//! Directory layout for Warden supervisor state.
//!
//! [`WardenHome`] is the one directory tree the supervisor writes to on the
//! host: the credential vault, the audit log, and per-session state
//! snapshots. Everything inside it is sensitive and kept at `0700`/`0600`.
//!
//! ```text
//! ~/.warden/                        (WardenHome)
//! ├── keys.enc                        (encrypted credential vault)
//! ├── audit.log                       (append-only, chain-linked audit entries)
//! ├── manifests/                      (loaded agent manifests)
//! ├── sessions/
//! │   └── <session-id>/
//! │       └── state.tar.gz            (working copy of a session's snapshot archive)
//! └── state/
//!     └── <sanitized-agent>/
//!         └── <sanitized-session>/    (last restored snapshot, extracted)
//! ```

use std::io;
use std::path::{Path, PathBuf};

use crate::ids::SessionId;

/// Global Warden home directory (`~/.warden/` or `$WARDEN_HOME`).
#[derive(Debug, Clone)]
pub struct WardenHome {
    root: PathBuf,
}

impl WardenHome {
    /// Resolve the home directory.
    ///
    /// Checks `$WARDEN_HOME` first, then falls back to `$HOME/.warden/`.
    ///
    /// # Errors
    ///
    /// Returns an error if `$WARDEN_HOME` is set but not absolute, or if
    /// neither `$WARDEN_HOME` nor `$HOME` is set.
    pub fn resolve() -> io::Result<Self> {
        let root = if let Ok(custom) = std::env::var("WARDEN_HOME") {
            let path = PathBuf::from(&custom);
            if !path.is_absolute() || custom.is_empty() {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "WARDEN_HOME must be an absolute path",
                ));
            }
            path
        } else {
            let home = std::env::var("HOME").map_err(|_| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    "neither WARDEN_HOME nor HOME environment variable is set",
                )
            })?;
            PathBuf::from(home).join(".warden")
        };

        Ok(Self { root })
    }

    /// Create from an explicit path (used in tests).
    #[must_use]
    pub fn from_path(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Ensure the directory structure exists with owner-only permissions.
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation or permission setting fails.
    pub fn ensure(&self) -> io::Result<()> {
        std::fs::create_dir_all(self.manifests_dir())?;
        std::fs::create_dir_all(self.sessions_dir())?;
        std::fs::create_dir_all(self.state_root())?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o700);
            std::fs::set_permissions(self.root(), perms.clone())?;
            std::fs::set_permissions(self.manifests_dir(), perms.clone())?;
            std::fs::set_permissions(self.sessions_dir(), perms.clone())?;
            std::fs::set_permissions(self.state_root(), perms)?;
        }
        Ok(())
    }

    /// Root directory path.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to the encrypted credential vault file.
    #[must_use]
    pub fn vault_path(&self) -> PathBuf {
        self.root.join("keys.enc")
    }

    /// Path to the append-only audit log file.
    #[must_use]
    pub fn audit_log_path(&self) -> PathBuf {
        self.root.join("audit.log")
    }

    /// Directory holding loaded agent manifests.
    #[must_use]
    pub fn manifests_dir(&self) -> PathBuf {
        self.root.join("manifests")
    }

    /// Directory holding per-session state directories.
    #[must_use]
    pub fn sessions_dir(&self) -> PathBuf {
        self.root.join("sessions")
    }

    /// Directory holding persisted session-state snapshots, laid out as
    /// `<sanitized-agent>/<sanitized-session>/` by the caller.
    #[must_use]
    pub fn state_root(&self) -> PathBuf {
        self.root.join("state")
    }

    /// Directory holding one session's working state prior to snapshotting
    /// (`workspace/`, `data/`, `output/`, `state/` live directly under it).
    #[must_use]
    pub fn session_dir(&self, id: SessionId) -> PathBuf {
        self.sessions_dir().join(id.to_string())
    }

    /// Path to a session's persisted state snapshot archive.
    #[must_use]
    pub fn snapshot_path(&self, id: SessionId) -> PathBuf {
        self.session_dir(id).join("state.tar.gz")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Serializes tests that mutate process-wide env vars.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn resolve_honors_warden_home() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        // SAFETY: serialized by ENV_MUTEX
        unsafe { std::env::set_var("WARDEN_HOME", dir.path()) };
        let home = WardenHome::resolve().unwrap();
        assert_eq!(home.root(), dir.path());
        unsafe { std::env::remove_var("WARDEN_HOME") };
    }

    #[test]
    fn resolve_rejects_relative_warden_home() {
        let _guard = ENV_MUTEX.lock().unwrap();
        unsafe { std::env::set_var("WARDEN_HOME", "relative/path") };
        let err = WardenHome::resolve().unwrap_err();
        assert!(err.to_string().contains("absolute"));
        unsafe { std::env::remove_var("WARDEN_HOME") };
    }

    #[test]
    fn ensure_creates_tree_with_owner_only_permissions() {
        let dir = tempfile::tempdir().unwrap();
        let home = WardenHome::from_path(dir.path());
        home.ensure().unwrap();

        assert!(home.manifests_dir().is_dir());
        assert!(home.sessions_dir().is_dir());
        assert!(home.state_root().is_dir());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(home.root()).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o700);
        }
    }

    #[test]
    fn session_dir_and_snapshot_path_are_scoped_per_session() {
        let home = WardenHome::from_path("/tmp/warden");
        let id = SessionId::new();
        assert_eq!(
            home.session_dir(id),
            PathBuf::from(format!("/tmp/warden/sessions/{id}"))
        );
        assert_eq!(
            home.snapshot_path(id),
            PathBuf::from(format!("/tmp/warden/sessions/{id}/state.tar.gz"))
        );
    }
}
