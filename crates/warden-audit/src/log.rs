//! Append-only audit log storage.
//!
//! One log file per supervisor instance, holding every entry across every
//! session it has run, one JSON object per line. Chain-head tracking lives
//! in memory and is rebuilt from the file tail on open.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use warden_core::ids::SessionId;
use warden_crypto::{ContentHash, KeyPair};

use crate::entry::{AuditAction, AuditEntry, AuditOutcome};
use crate::error::{AuditError, AuditResult};

/// An append-only, chain-linked audit log backed by a single file.
pub struct AuditLog {
    path: PathBuf,
    runtime_key: KeyPair,
    chain_head: ContentHash,
}

impl AuditLog {
    /// Open (creating if absent) the audit log at `path`, replaying its
    /// contents to recover the current chain head.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Io`] on a filesystem failure, or
    /// [`AuditError::Corrupt`]/[`AuditError::IntegrityViolation`] if
    /// existing entries fail to parse or don't chain correctly.
    pub fn open(path: impl Into<PathBuf>, runtime_key: KeyPair) -> AuditResult<Self> {
        let path = path.into();
        let chain_head = Self::replay_chain_head(&path)?;
        Ok(Self {
            path,
            runtime_key,
            chain_head,
        })
    }

    fn replay_chain_head(path: &Path) -> AuditResult<ContentHash> {
        let Ok(file) = File::open(path) else {
            return Ok(ContentHash::zero());
        };
        let mut head = ContentHash::zero();
        let mut previous: Option<AuditEntry> = None;
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: AuditEntry =
                serde_json::from_str(&line).map_err(|e| AuditError::Corrupt(e.to_string()))?;
            if let Some(prev) = &previous {
                if !entry.follows(prev) {
                    return Err(AuditError::IntegrityViolation {
                        entry_id: entry.id.to_string(),
                        reason: "previous_hash does not match the prior entry".to_owned(),
                    });
                }
            }
            head = entry.content_hash();
            previous = Some(entry);
        }
        Ok(head)
    }

    /// Append a new, signed, chain-linked entry recording `action`'s
    /// `outcome` for `session_id`.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Io`] if the entry cannot be appended.
    pub fn record(
        &mut self,
        session_id: SessionId,
        action: AuditAction,
        outcome: AuditOutcome,
    ) -> AuditResult<AuditEntry> {
        let entry = AuditEntry::create(session_id, action, outcome, self.chain_head, &self.runtime_key);
        self.append(&entry)?;
        self.chain_head = entry.content_hash();
        Ok(entry)
    }

    fn append(&self, entry: &AuditEntry) -> AuditResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = serde_json::to_string(entry).map_err(|e| AuditError::Corrupt(e.to_string()))?;
        writeln!(file, "{line}")?;
        file.flush()?;
        tracing::debug!(entry_id = %entry.id, "audit entry appended");
        Ok(())
    }

    /// Read every entry for `session_id`, in insertion order, verifying
    /// each entry's signature and chain linkage as it goes.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Corrupt`], [`AuditError::InvalidSignature`],
    /// or [`AuditError::IntegrityViolation`] if the log has been tampered
    /// with.
    pub fn session_entries(&self, session_id: SessionId) -> AuditResult<Vec<AuditEntry>> {
        let Ok(file) = File::open(&self.path) else {
            return Ok(Vec::new());
        };
        let mut entries = Vec::new();
        let mut previous: Option<AuditEntry> = None;
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: AuditEntry =
                serde_json::from_str(&line).map_err(|e| AuditError::Corrupt(e.to_string()))?;
            entry.verify_signature()?;
            if let Some(prev) = &previous {
                if entry.session_id == prev.session_id && !entry.follows(prev) {
                    return Err(AuditError::IntegrityViolation {
                        entry_id: entry.id.to_string(),
                        reason: "previous_hash does not match the prior entry".to_owned(),
                    });
                }
            }
            let belongs = entry.session_id == session_id;
            previous = Some(entry.clone());
            if belongs {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    /// The current chain head (content hash of the most recently appended
    /// entry, or the zero hash if the log is empty).
    #[must_use]
    pub fn chain_head(&self) -> ContentHash {
        self.chain_head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_then_session_entries_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let key = KeyPair::generate();
        let session = SessionId::new();

        let mut log = AuditLog::open(&path, key).unwrap();
        log.record(session, AuditAction::SessionReady, AuditOutcome::Success)
            .unwrap();
        log.record(session, AuditAction::SessionShutdown, AuditOutcome::Success)
            .unwrap();

        let entries = log.session_entries(session).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[1].follows(&entries[0]));
    }

    #[test]
    fn reopening_recovers_the_chain_head() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let session = SessionId::new();

        let head_after_first = {
            let mut log = AuditLog::open(&path, KeyPair::generate()).unwrap();
            log.record(session, AuditAction::SessionReady, AuditOutcome::Success)
                .unwrap();
            log.chain_head()
        };

        // Reopening with a fresh key still recovers the same chain head,
        // since chain linkage is independent of which key signs next.
        let reopened = AuditLog::open(&path, KeyPair::generate()).unwrap();
        assert_eq!(reopened.chain_head(), head_after_first);
    }

    #[test]
    fn session_entries_only_returns_matching_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let key = KeyPair::generate();
        let session_a = SessionId::new();
        let session_b = SessionId::new();

        let mut log = AuditLog::open(&path, key).unwrap();
        log.record(session_a, AuditAction::SessionReady, AuditOutcome::Success)
            .unwrap();
        log.record(session_b, AuditAction::SessionReady, AuditOutcome::Success)
            .unwrap();

        assert_eq!(log.session_entries(session_a).unwrap().len(), 1);
        assert_eq!(log.session_entries(session_b).unwrap().len(), 1);
    }

    #[test]
    fn corrupt_line_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        std::fs::write(&path, "not json\n").unwrap();
        let err = AuditLog::open(&path, KeyPair::generate()).unwrap_err();
        assert!(matches!(err, AuditError::Corrupt(_)));
    }
}
