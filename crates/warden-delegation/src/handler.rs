//! Delegation Handler: the host-side table of `session-id -> nested Agent
//! Session`, driving `search`/`run`/`message`/`monitor`/`stop` semantics.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use warden_core::ids::SessionId;
use warden_manifest::Manifest;

use crate::error::{DelegationError, DelegationResult};

/// Maximum lines retained in a nested session's output ring.
pub const MAX_RING_LINES: usize = 1000;

/// One discovery match: a candidate bundle URL and its rank.
#[derive(Debug, Clone)]
pub struct DiscoveryMatch {
    /// Bundle URL of the candidate agent.
    pub agent_url: String,
    /// Match score. Semantic similarity when the embedding collaborator is
    /// available, or substring-overlap token count as a fallback.
    pub score: f32,
}

/// Stateless discovery lookup collaborator (out of scope to implement here;
/// the handler only calls it).
pub trait DiscoveryClient: Send + Sync {
    /// Ranked matches for a free-text query, best first.
    fn search(&self, query: &str) -> DelegationResult<Vec<DiscoveryMatch>>;

    /// The unfiltered candidate list, in the collaborator's native order.
    fn search_all(&self) -> DelegationResult<Vec<DiscoveryMatch>>;
}

/// Rank `candidates` against `query` by substring-match token overlap.
///
/// Used as the discovery fallback when the embedding-backed collaborator is
/// unavailable.
#[must_use]
pub fn substring_match_rank(query: &str, candidates: &[String], limit: usize) -> Vec<DiscoveryMatch> {
    let query_tokens: Vec<&str> = query.split_whitespace().collect();
    let mut scored: Vec<DiscoveryMatch> = candidates
        .iter()
        .map(|candidate| {
            let lower = candidate.to_lowercase();
            let overlap = query_tokens
                .iter()
                .filter(|t| lower.contains(&t.to_lowercase()))
                .count();
            DiscoveryMatch {
                agent_url: candidate.clone(),
                score: overlap as f32,
            }
        })
        .filter(|m| m.score > 0.0)
        .collect();
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit);
    scored
}

/// One decoded event forwarded from a nested session, mirroring the agent
/// process protocol minus the `ready` sentinel.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NestedEvent {
    /// A response chunk.
    Response {
        /// Response content.
        content: String,
        /// Correlation id, if any.
        message_id: Option<String>,
        /// Whether this is the terminal chunk.
        done: bool,
    },
    /// A visible action.
    Activity {
        /// Tool or action name.
        tool: String,
        /// Human-readable description.
        description: String,
        /// Correlation id, if any.
        message_id: Option<String>,
    },
    /// A reported error.
    Error {
        /// Error text.
        message: String,
    },
}

impl NestedEvent {
    /// Whether this event terminates a `message` stream.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, NestedEvent::Response { done: true, .. } | NestedEvent::Error { .. })
    }

    /// One-line textual rendering, for the output ring.
    #[must_use]
    pub fn to_ring_line(&self) -> String {
        match self {
            NestedEvent::Response { content, done, .. } => format!("response({done}): {content}"),
            NestedEvent::Activity { tool, description, .. } => format!("activity[{tool}]: {description}"),
            NestedEvent::Error { message } => format!("error: {message}"),
        }
    }
}

/// A running nested session, as seen by the Delegation Handler.
pub trait NestedSession: Send {
    /// Deliver a message to the nested session.
    fn send_message(&mut self, content: &str, message_id: &str) -> DelegationResult<()>;

    /// Block for up to `timeout` for the next event.
    fn next_event(&mut self, timeout: Duration) -> DelegationResult<Option<NestedEvent>>;

    /// Shut the nested session down.
    fn stop(&mut self);
}

/// Asks the host operator for a credential, returning `None` to decline.
pub trait CredentialPrompt: Send + Sync {
    /// Prompt for a credential for `provider`.
    fn prompt(&self, provider: &str) -> Option<String>;
}

/// Read/write access to the subset of the vault the handler needs.
pub trait VaultLookup: Send + Sync {
    /// Whether a credential for `provider` is already stored.
    fn has_credential(&self, provider: &str) -> bool;

    /// Persist a credential obtained interactively.
    fn store_credential(&self, provider: &str, key: &str);
}

/// Resolves a bundle URL into a validated manifest, and spawns the nested
/// session once credentials are resolved. Implemented by the Supervisor.
pub trait SessionSpawner: Send + Sync {
    /// Resolve and validate the sub-agent's manifest without starting
    /// anything.
    fn resolve_manifest(&self, agent_url: &str) -> DelegationResult<Manifest>;

    /// Spawn the nested session. Blocks until the nested agent is Ready.
    fn spawn(
        &self,
        agent_url: &str,
        manifest: &Manifest,
        state_dir: &Path,
        credentials: &HashMap<String, String>,
    ) -> DelegationResult<Box<dyn NestedSession>>;
}

struct NestedEntry {
    session: Box<dyn NestedSession>,
    agent_url: String,
    output_ring: VecDeque<String>,
}

/// A saved record of one spawned-and-still-known delegation mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingEntry {
    /// Nested session id.
    pub session_id: String,
    /// Bundle URL the session was spawned from.
    pub agent_url: String,
}

/// The host-side table of `session-id -> nested Agent Session`.
pub struct DelegationHandler {
    allowed_agents: Vec<String>,
    spawner: Arc<dyn SessionSpawner>,
    discovery: Arc<dyn DiscoveryClient>,
    credential_prompt: Arc<dyn CredentialPrompt>,
    vault: Arc<dyn VaultLookup>,
    state_root: PathBuf,
    input_mutex: Mutex<()>,
    sessions: Mutex<HashMap<SessionId, NestedEntry>>,
}

impl DelegationHandler {
    /// Construct a handler for a parent session whose manifest declares
    /// `allowed_agents` (empty means delegation is disabled).
    #[must_use]
    pub fn new(
        allowed_agents: Vec<String>,
        spawner: Arc<dyn SessionSpawner>,
        discovery: Arc<dyn DiscoveryClient>,
        credential_prompt: Arc<dyn CredentialPrompt>,
        vault: Arc<dyn VaultLookup>,
        state_root: PathBuf,
    ) -> Self {
        Self {
            allowed_agents,
            spawner,
            discovery,
            credential_prompt,
            vault,
            state_root,
            input_mutex: Mutex::new(()),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Up to five best matches for `query`.
    ///
    /// # Errors
    ///
    /// Propagates the discovery collaborator's error.
    pub fn search(&self, query: &str) -> DelegationResult<Vec<DiscoveryMatch>> {
        let mut matches = self.discovery.search(query)?;
        matches.truncate(5);
        Ok(matches)
    }

    /// The unfiltered candidate list.
    ///
    /// # Errors
    ///
    /// Propagates the discovery collaborator's error.
    pub fn search_all(&self) -> DelegationResult<Vec<DiscoveryMatch>> {
        self.discovery.search_all()
    }

    /// Spawn a nested agent session from `agent_url`.
    ///
    /// # Errors
    ///
    /// Returns [`DelegationError::AgentNotAllowed`] if the parent manifest's
    /// `allowed_agents` is empty or does not substring-match `agent_url`.
    /// Returns [`DelegationError::MissingCredential`] if a required
    /// credential is absent and the operator declines to supply it.
    pub fn run(&self, agent_url: &str) -> DelegationResult<SessionId> {
        if self.allowed_agents.is_empty()
            || !self.allowed_agents.iter().any(|a| agent_url.contains(a.as_str()))
        {
            return Err(DelegationError::AgentNotAllowed(agent_url.to_owned()));
        }

        let manifest = self.spawner.resolve_manifest(agent_url)?;

        // Interactive prompts (and the vault re-check that follows) are
        // serialized so concurrent `run` calls needing the same key
        // coalesce onto a single prompt.
        let credentials = {
            let _guard = self.input_mutex.lock().expect("input mutex poisoned");
            let mut resolved = HashMap::new();
            for key in &manifest.keys {
                let provider = key.provider.clone();
                if self.vault.has_credential(&provider) {
                    continue;
                }
                if let Some(value) = self.credential_prompt.prompt(&provider) {
                    self.vault.store_credential(&provider, &value);
                    resolved.insert(provider, value);
                } else {
                    return Err(DelegationError::MissingCredential(provider));
                }
            }
            resolved
        };

        let session_id = SessionId::new();
        let state_dir = self.state_root.join(session_id.to_string());
        let session = self
            .spawner
            .spawn(agent_url, &manifest, &state_dir, &credentials)
            .map_err(|e| DelegationError::SpawnFailed(e.to_string()))?;

        self.sessions.lock().expect("sessions mutex poisoned").insert(
            session_id,
            NestedEntry {
                session,
                agent_url: agent_url.to_owned(),
                output_ring: VecDeque::new(),
            },
        );

        Ok(session_id)
    }

    /// Forward `content` into `session_id`, invoking `on_event` for each
    /// streamed event until a terminal `Response{done: true}` or `Error`.
    ///
    /// # Errors
    ///
    /// Returns [`DelegationError::UnknownSession`] if `session_id` is not in
    /// the table.
    pub fn message(
        &self,
        session_id: SessionId,
        content: &str,
        message_id: &str,
        mut on_event: impl FnMut(&NestedEvent),
    ) -> DelegationResult<()> {
        let mut sessions = self.sessions.lock().expect("sessions mutex poisoned");
        let entry = sessions
            .get_mut(&session_id)
            .ok_or_else(|| DelegationError::UnknownSession(session_id.to_string()))?;

        entry.session.send_message(content, message_id)?;
        loop {
            let Some(event) = entry.session.next_event(Duration::from_secs(60))? else {
                continue;
            };
            push_ring(&mut entry.output_ring, event.to_ring_line());
            let terminal = event.is_terminal();
            on_event(&event);
            if terminal {
                return Ok(());
            }
        }
    }

    /// The current output ring content for `session_id`.
    ///
    /// # Errors
    ///
    /// Returns [`DelegationError::UnknownSession`] if `session_id` is not in
    /// the table.
    pub fn monitor(&self, session_id: SessionId) -> DelegationResult<Vec<String>> {
        let sessions = self.sessions.lock().expect("sessions mutex poisoned");
        let entry = sessions
            .get(&session_id)
            .ok_or_else(|| DelegationError::UnknownSession(session_id.to_string()))?;
        Ok(entry.output_ring.iter().cloned().collect())
    }

    /// Shut down and drop `session_id` from the table.
    ///
    /// # Errors
    ///
    /// Returns [`DelegationError::UnknownSession`] if `session_id` is not in
    /// the table.
    pub fn stop(&self, session_id: SessionId) -> DelegationResult<()> {
        let mut sessions = self.sessions.lock().expect("sessions mutex poisoned");
        let mut entry = sessions
            .remove(&session_id)
            .ok_or_else(|| DelegationError::UnknownSession(session_id.to_string()))?;
        entry.session.stop();
        Ok(())
    }

    /// Save the active mapping file and tear down every nested session.
    ///
    /// # Errors
    ///
    /// Returns [`DelegationError::Io`] if the mapping file cannot be written.
    pub fn shutdown(&self) -> DelegationResult<()> {
        let mut sessions = self.sessions.lock().expect("sessions mutex poisoned");
        let mapping: Vec<MappingEntry> = sessions
            .iter()
            .map(|(id, entry)| MappingEntry {
                session_id: id.to_string(),
                agent_url: entry.agent_url.clone(),
            })
            .collect();

        std::fs::create_dir_all(&self.state_root)?;
        let mapping_path = self.state_root.join("delegation_mapping.json");
        let json = serde_json::to_string_pretty(&mapping)
            .map_err(|e| DelegationError::Io(std::io::Error::other(e.to_string())))?;
        std::fs::write(mapping_path, json)?;

        for (_, mut entry) in sessions.drain() {
            entry.session.stop();
        }
        Ok(())
    }
}

fn push_ring(ring: &mut VecDeque<String>, line: String) {
    if ring.len() >= MAX_RING_LINES {
        ring.pop_front();
    }
    ring.push_back(line);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substring_match_rank_orders_by_overlap() {
        let candidates = vec![
            "https://bundles/x/python-reviewer".to_owned(),
            "https://bundles/x/rust-reviewer".to_owned(),
            "https://bundles/x/unrelated".to_owned(),
        ];
        let matches = substring_match_rank("rust reviewer", &candidates, 5);
        assert_eq!(matches[0].agent_url, "https://bundles/x/rust-reviewer");
    }

    #[test]
    fn substring_match_rank_respects_limit() {
        let candidates: Vec<String> = (0..10).map(|i| format!("agent-{i}-match")).collect();
        let matches = substring_match_rank("match", &candidates, 3);
        assert_eq!(matches.len(), 3);
    }

    #[test]
    fn nested_event_response_done_is_terminal() {
        let event = NestedEvent::Response {
            content: "done".to_owned(),
            message_id: None,
            done: true,
        };
        assert!(event.is_terminal());
    }

    #[test]
    fn nested_event_error_is_terminal() {
        let event = NestedEvent::Error {
            message: "boom".to_owned(),
        };
        assert!(event.is_terminal());
    }

    #[test]
    fn nested_event_partial_response_is_not_terminal() {
        let event = NestedEvent::Response {
            content: "partial".to_owned(),
            message_id: None,
            done: false,
        };
        assert!(!event.is_terminal());
    }

    #[test]
    fn push_ring_evicts_oldest_at_capacity() {
        let mut ring = VecDeque::new();
        for i in 0..(MAX_RING_LINES + 10) {
            push_ring(&mut ring, format!("line {i}"));
        }
        assert_eq!(ring.len(), MAX_RING_LINES);
        assert_eq!(ring.front().unwrap(), &format!("line {}", 10));
    }
}
