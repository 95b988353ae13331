//! Allowlist-based state snapshot and restore.
//!
//! State persistence is allowlist-based, not denylist-based: only the
//! subdirectories named in [`ALLOWED_SUBDIRS`] are ever archived, and
//! restore rejects anything a tar member could use to escape the
//! destination (absolute paths, `..` segments, symlinks, hardlinks).

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use tar::{Archive, Builder, EntryType};

use crate::error::{WorkspaceError, WorkspaceResult};

/// The only subdirectories of an agent's home ever included in a snapshot.
pub const ALLOWED_SUBDIRS: &[&str] = &["workspace", "data", "output", "state"];

/// Default cap on a snapshot's uncompressed size, in bytes (512 MiB).
pub const DEFAULT_MAX_SNAPSHOT_BYTES: u64 = 512 * 1024 * 1024;

/// Archive the allowlisted subdirectories of `agent_home` into a gzip-tar
/// at `archive_path`.
///
/// # Errors
///
/// Returns [`WorkspaceError::Io`] on any filesystem failure, or
/// [`WorkspaceError::SnapshotTooLarge`] if the archived content would
/// exceed `max_bytes`.
pub fn create_snapshot(
    agent_home: &Path,
    archive_path: &Path,
    agent: &str,
    session: &str,
    max_bytes: u64,
) -> WorkspaceResult<()> {
    if let Some(parent) = archive_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut total_bytes: u64 = 0;
    for subdir in ALLOWED_SUBDIRS {
        let path = agent_home.join(subdir);
        if path.is_dir() {
            total_bytes += directory_size(&path)?;
        }
    }
    if total_bytes > max_bytes {
        return Err(WorkspaceError::SnapshotTooLarge {
            agent: agent.to_owned(),
            session: session.to_owned(),
            limit_bytes: max_bytes,
        });
    }

    let file = File::create(archive_path)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = Builder::new(encoder);

    for subdir in ALLOWED_SUBDIRS {
        let path = agent_home.join(subdir);
        if path.is_dir() {
            builder.append_dir_all(subdir, &path)?;
        }
    }
    builder.finish()?;
    tracing::info!(agent, session, bytes = total_bytes, "state snapshot created");
    Ok(())
}

/// Extract a previously-created snapshot into `dest_dir`, rejecting any
/// member that is absolute, contains a `..` segment, or is a symlink or
/// hardlink.
///
/// # Errors
///
/// Returns [`WorkspaceError::RejectedMember`] if any member fails the
/// filter, or [`WorkspaceError::Io`] on a filesystem failure.
pub fn restore_snapshot(archive_path: &Path, dest_dir: &Path) -> WorkspaceResult<()> {
    std::fs::create_dir_all(dest_dir)?;

    let file = File::open(archive_path)?;
    let decoder = GzDecoder::new(file);
    let mut archive = Archive::new(decoder);

    for entry in archive.entries()? {
        let mut entry = entry?;
        let member_path = entry.path()?.into_owned();
        let member_str = member_path.display().to_string();

        if member_path.is_absolute() {
            return Err(WorkspaceError::RejectedMember {
                path: member_str,
                reason: "absolute path".to_owned(),
            });
        }
        if member_path.components().any(|c| c.as_os_str() == "..") {
            return Err(WorkspaceError::RejectedMember {
                path: member_str,
                reason: "contains a '..' segment".to_owned(),
            });
        }
        match entry.header().entry_type() {
            EntryType::Symlink | EntryType::Link => {
                return Err(WorkspaceError::RejectedMember {
                    path: member_str,
                    reason: "symlink and hardlink members are never restored".to_owned(),
                });
            },
            _ => {},
        }

        entry.unpack_in(dest_dir)?;
    }

    tracing::info!(dest = %dest_dir.display(), "state snapshot restored");
    Ok(())
}

fn directory_size(path: &Path) -> WorkspaceResult<u64> {
    let mut total = 0u64;
    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        let metadata = entry.metadata()?;
        if metadata.is_dir() {
            total += directory_size(&entry.path())?;
        } else {
            total += metadata.len();
        }
    }
    Ok(total)
}

/// Read an entire file into memory, used only by tests to assert byte
/// identity of restored content.
#[cfg(test)]
fn read_file(path: &Path) -> Vec<u8> {
    let mut buf = Vec::new();
    File::open(path).unwrap().read_to_end(&mut buf).unwrap();
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_file(path: &Path, contents: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        File::create(path).unwrap().write_all(contents.as_bytes()).unwrap();
    }

    #[test]
    fn snapshot_roundtrips_allowlisted_content_byte_identical() {
        let home = tempfile::tempdir().unwrap();
        write_file(&home.path().join("workspace/note.txt"), "hello world");

        let archive = tempfile::tempdir().unwrap().path().join("state.tar.gz");
        create_snapshot(
            home.path(),
            &archive,
            "agent",
            "session",
            DEFAULT_MAX_SNAPSHOT_BYTES,
        )
        .unwrap();

        let dest = tempfile::tempdir().unwrap();
        restore_snapshot(&archive, dest.path()).unwrap();

        assert_eq!(
            read_file(&dest.path().join("workspace/note.txt")),
            b"hello world"
        );
    }

    #[test]
    fn snapshot_excludes_non_allowlisted_subdirectories() {
        let home = tempfile::tempdir().unwrap();
        write_file(&home.path().join("workspace/note.txt"), "keep me");
        write_file(&home.path().join(".ssh/authorized_keys"), "ssh-rsa AAAA...");

        let archive = tempfile::tempdir().unwrap().path().join("state.tar.gz");
        create_snapshot(
            home.path(),
            &archive,
            "agent",
            "session",
            DEFAULT_MAX_SNAPSHOT_BYTES,
        )
        .unwrap();

        let dest = tempfile::tempdir().unwrap();
        restore_snapshot(&archive, dest.path()).unwrap();

        assert!(dest.path().join("workspace/note.txt").is_file());
        assert!(!dest.path().join(".ssh").exists());
    }

    #[test]
    fn create_snapshot_rejects_oversized_content() {
        let home = tempfile::tempdir().unwrap();
        write_file(&home.path().join("workspace/big.bin"), "x");

        let archive = tempfile::tempdir().unwrap().path().join("state.tar.gz");
        let err = create_snapshot(home.path(), &archive, "agent", "session", 0).unwrap_err();
        assert!(matches!(err, WorkspaceError::SnapshotTooLarge { .. }));
    }

    #[test]
    fn restore_rejects_absolute_path_members() {
        let archive = tempfile::tempdir().unwrap().path().join("evil.tar.gz");
        {
            let file = File::create(&archive).unwrap();
            let encoder = GzEncoder::new(file, Compression::default());
            let mut builder = Builder::new(encoder);
            let mut header = tar::Header::new_gnu();
            header.set_path("/etc/passwd").unwrap();
            header.set_size(0);
            header.set_cksum();
            builder.append(&header, std::io::empty()).unwrap();
            builder.finish().unwrap();
        }
        let dest = tempfile::tempdir().unwrap();
        let err = restore_snapshot(&archive, dest.path()).unwrap_err();
        assert!(matches!(err, WorkspaceError::RejectedMember { .. }));
    }

    #[test]
    fn restore_rejects_parent_traversal_members() {
        let archive = tempfile::tempdir().unwrap().path().join("evil.tar.gz");
        {
            let file = File::create(&archive).unwrap();
            let encoder = GzEncoder::new(file, Compression::default());
            let mut builder = Builder::new(encoder);
            let mut header = tar::Header::new_gnu();
            header.set_path("../outside.txt").unwrap();
            header.set_size(0);
            header.set_cksum();
            builder.append(&header, std::io::empty()).unwrap();
            builder.finish().unwrap();
        }
        let dest = tempfile::tempdir().unwrap();
        let err = restore_snapshot(&archive, dest.path()).unwrap_err();
        assert!(matches!(err, WorkspaceError::RejectedMember { .. }));
    }
}
