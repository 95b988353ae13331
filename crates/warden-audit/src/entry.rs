//! Audit entry types and actions.
//!
//! Every security-relevant supervisor operation is recorded as an audit
//! entry. Entries are chain-linked — each carries the content hash of the
//! entry before it — and signed by the supervisor's runtime key, so a
//! tampered or reordered log is detectable without trusting the storage
//! medium.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use warden_core::ids::SessionId;
use warden_crypto::{ContentHash, KeyPair, PublicKey, Signature};

use crate::error::{AuditError, AuditResult};

/// A single audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unique entry identifier.
    pub id: Uuid,
    /// When this entry was created.
    pub timestamp: DateTime<Utc>,
    /// Session this entry belongs to.
    pub session_id: SessionId,
    /// The action being audited.
    pub action: AuditAction,
    /// Outcome of the action.
    pub outcome: AuditOutcome,
    /// Content hash of the previous entry in this log (chain linking).
    pub previous_hash: ContentHash,
    /// Runtime public key that signed this entry.
    pub runtime_key: PublicKey,
    /// Signature over the entry's canonical signing data.
    pub signature: Signature,
}

impl AuditEntry {
    /// Create and sign a new audit entry.
    #[must_use]
    pub fn create(
        session_id: SessionId,
        action: AuditAction,
        outcome: AuditOutcome,
        previous_hash: ContentHash,
        runtime_key: &KeyPair,
    ) -> Self {
        let mut entry = Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            session_id,
            action,
            outcome,
            previous_hash,
            runtime_key: runtime_key.export_public_key(),
            signature: Signature::from_bytes([0u8; 64]),
        };
        let signing_data = entry.signing_data();
        entry.signature = runtime_key.sign(&signing_data);
        entry
    }

    /// Canonical bytes this entry's signature covers.
    #[must_use]
    pub fn signing_data(&self) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(self.id.as_bytes());
        data.extend_from_slice(&self.timestamp.timestamp().to_le_bytes());
        data.extend_from_slice(self.session_id.to_string().as_bytes());
        if let Ok(action_json) = serde_json::to_vec(&self.action) {
            data.extend_from_slice(&action_json);
        }
        if let Ok(outcome_json) = serde_json::to_vec(&self.outcome) {
            data.extend_from_slice(&outcome_json);
        }
        data.extend_from_slice(self.previous_hash.as_bytes());
        data.extend_from_slice(self.runtime_key.as_bytes());
        data
    }

    /// Content hash of this entry, used as the next entry's `previous_hash`.
    #[must_use]
    pub fn content_hash(&self) -> ContentHash {
        ContentHash::hash(&self.signing_data())
    }

    /// Verify the entry's signature against its recorded runtime key.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::InvalidSignature`] if the signature does not
    /// match the entry contents.
    pub fn verify_signature(&self) -> AuditResult<()> {
        let signing_data = self.signing_data();
        self.runtime_key
            .verify(&signing_data, &self.signature)
            .map_err(|_| AuditError::InvalidSignature {
                entry_id: self.id.to_string(),
            })
    }

    /// Whether this entry's `previous_hash` matches `previous`'s content
    /// hash (chain linking).
    #[must_use]
    pub fn follows(&self, previous: &AuditEntry) -> bool {
        self.previous_hash == previous.content_hash()
    }
}

/// Security-relevant actions the supervisor audits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditAction {
    /// A sandbox was provisioned from the external provider.
    SandboxCreated {
        /// Sandbox template tag.
        template: String,
    },
    /// A sandbox was destroyed.
    SandboxDestroyed,
    /// A credential was resolved from the vault for a declared provider.
    CredentialResolved {
        /// Provider identifier.
        provider: String,
    },
    /// A credential was injected into a sandbox's route table.
    CredentialInjected {
        /// Provider identifier.
        provider: String,
        /// Loopback port the route was assigned.
        route_port: u16,
    },
    /// The credential proxy handled an upstream request.
    ProxyRequestHandled {
        /// Loopback port the request arrived on.
        route_port: u16,
        /// Upstream response status, if one was received.
        status: Option<u16>,
    },
    /// A sub-agent was spawned via delegation.
    DelegationRun {
        /// Sub-agent bundle URL.
        agent_url: String,
    },
    /// A message was forwarded into a delegated sub-session.
    DelegationMessage {
        /// Nested session id.
        session_id: String,
    },
    /// A delegated sub-session was stopped.
    DelegationStop {
        /// Nested session id.
        session_id: String,
    },
    /// A state snapshot was archived.
    SnapshotTaken {
        /// Owning agent name.
        agent: String,
        /// Owning session name.
        session: String,
    },
    /// A state snapshot was restored into a fresh sandbox.
    SnapshotRestored {
        /// Owning agent name.
        agent: String,
        /// Owning session name.
        session: String,
    },
    /// A manifest passed validation.
    ManifestValidated {
        /// Agent name declared by the manifest.
        agent_name: String,
    },
    /// A manifest was rejected by validation.
    ManifestRejected {
        /// Rejection reason.
        reason: String,
    },
    /// An agent session reached the Ready state.
    SessionReady,
    /// An agent session was shut down.
    SessionShutdown,
}

/// Outcome of an audited action.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum AuditOutcome {
    /// The action completed successfully.
    Success,
    /// The action failed.
    Failure {
        /// Human-readable failure reason.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_produces_a_verifiable_signature() {
        let key = KeyPair::generate();
        let entry = AuditEntry::create(
            SessionId::new(),
            AuditAction::SessionReady,
            AuditOutcome::Success,
            ContentHash::zero(),
            &key,
        );
        assert!(entry.verify_signature().is_ok());
    }

    #[test]
    fn tampering_with_action_breaks_the_signature() {
        let key = KeyPair::generate();
        let mut entry = AuditEntry::create(
            SessionId::new(),
            AuditAction::SessionReady,
            AuditOutcome::Success,
            ContentHash::zero(),
            &key,
        );
        entry.action = AuditAction::SessionShutdown;
        assert!(entry.verify_signature().is_err());
    }

    #[test]
    fn follows_checks_chain_linkage() {
        let key = KeyPair::generate();
        let first = AuditEntry::create(
            SessionId::new(),
            AuditAction::SandboxCreated {
                template: "default".to_owned(),
            },
            AuditOutcome::Success,
            ContentHash::zero(),
            &key,
        );
        let second = AuditEntry::create(
            first.session_id,
            AuditAction::SessionReady,
            AuditOutcome::Success,
            first.content_hash(),
            &key,
        );
        assert!(second.follows(&first));
        assert!(!first.follows(&second));
    }
}
