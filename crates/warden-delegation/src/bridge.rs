//! Host-side bridge: spawns the in-sandbox delegation proxy process, reads
//! tagged commands from its standard output, dispatches each to a
//! [`DelegationHandler`], and writes responses back to its standard input.
//!
//! Mirrors the supervisor's reader-thread pattern for Agent Sessions: a
//! long-lived reader thread drains the proxy's stdout, and a fresh thread
//! is spawned per incoming command so multiple `run` calls (which may block
//! on an interactive credential prompt) progress in parallel.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;

use crate::error::{DelegationError, DelegationResult};
use crate::handler::DelegationHandler;
use crate::protocol::{DelegationCommand, DelegationResponse, SearchMatch, TaggedCommand};

/// Owns the spawned delegation proxy child process for one sandbox.
pub struct DelegationBridge {
    child: Child,
}

impl DelegationBridge {
    /// Spawn `command` (the delegation proxy binary) and start draining its
    /// output against `handler`.
    ///
    /// # Errors
    ///
    /// Returns [`DelegationError::Io`] if the process cannot be spawned or
    /// its stdio cannot be piped.
    pub fn spawn(mut command: Command, handler: Arc<DelegationHandler>) -> DelegationResult<Self> {
        command.stdin(Stdio::piped()).stdout(Stdio::piped());
        let mut child = command.spawn()?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DelegationError::SpawnFailed("proxy stdout not piped".to_owned()))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| DelegationError::SpawnFailed("proxy stdin not piped".to_owned()))?;
        let stdin = Arc::new(Mutex::new(stdin));

        thread::spawn(move || reader_loop(stdout, handler, stdin));

        Ok(Self { child })
    }

    /// Whether the proxy process is still running.
    #[must_use]
    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Kill the proxy process.
    pub fn shutdown(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

impl Drop for DelegationBridge {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn reader_loop(
    stdout: impl std::io::Read,
    handler: Arc<DelegationHandler>,
    stdin: Arc<Mutex<ChildStdin>>,
) {
    let reader = BufReader::new(stdout);
    for line in reader.lines() {
        let Ok(line) = line else {
            break;
        };
        let Some(tagged) = TaggedCommand::parse_line(&line) else {
            continue;
        };
        let handler = Arc::clone(&handler);
        let stdin = Arc::clone(&stdin);
        thread::spawn(move || dispatch_one(tagged, &handler, &stdin));
    }
}

fn dispatch_one(tagged: TaggedCommand, handler: &DelegationHandler, stdin: &Mutex<ChildStdin>) {
    let request_id = tagged.request_id;
    match tagged.command {
        DelegationCommand::Search { query } => {
            let response = match handler.search(&query) {
                Ok(matches) => DelegationResponse::SearchResults {
                    request_id,
                    agents: matches
                        .into_iter()
                        .map(|m| SearchMatch {
                            agent_url: m.agent_url,
                            score: m.score,
                        })
                        .collect(),
                },
                Err(e) => error_response(request_id, &e),
            };
            write_reply(stdin, &response);
        }
        DelegationCommand::SearchAll => {
            let response = match handler.search_all() {
                Ok(matches) => DelegationResponse::SearchResults {
                    request_id,
                    agents: matches
                        .into_iter()
                        .map(|m| SearchMatch {
                            agent_url: m.agent_url,
                            score: m.score,
                        })
                        .collect(),
                },
                Err(e) => error_response(request_id, &e),
            };
            write_reply(stdin, &response);
        }
        DelegationCommand::Run { agent_url } => {
            let response = match handler.run(&agent_url) {
                Ok(session_id) => DelegationResponse::Run {
                    request_id,
                    session_id: session_id.to_string(),
                },
                Err(e) => error_response(request_id, &e),
            };
            write_reply(stdin, &response);
        }
        DelegationCommand::Message { session_id, content } => {
            let Ok(session_id) = session_id.parse() else {
                write_reply(
                    stdin,
                    &DelegationResponse::Error {
                        request_id,
                        message: "malformed session id".to_owned(),
                    },
                );
                return;
            };
            let result = handler.message(session_id, &content, &request_id.to_string(), |event| {
                let rendered = serde_json::to_value(event)
                    .unwrap_or_else(|_| serde_json::json!({ "rendered": event.to_ring_line() }));
                write_reply(
                    stdin,
                    &DelegationResponse::StreamEvent {
                        request_id,
                        event: rendered,
                        done: event.is_terminal(),
                    },
                );
            });
            if let Err(e) = result {
                write_reply(stdin, &error_response(request_id, &e));
            }
        }
        DelegationCommand::Monitor { session_id } => {
            let response = match session_id.parse() {
                Ok(id) => match handler.monitor(id) {
                    Ok(lines) => DelegationResponse::Monitor { request_id, lines },
                    Err(e) => error_response(request_id, &e),
                },
                Err(_) => DelegationResponse::Error {
                    request_id,
                    message: "malformed session id".to_owned(),
                },
            };
            write_reply(stdin, &response);
        }
        DelegationCommand::Stop { session_id } => {
            let response = match session_id.parse() {
                Ok(id) => match handler.stop(id) {
                    Ok(()) => DelegationResponse::Stopped { request_id },
                    Err(e) => error_response(request_id, &e),
                },
                Err(_) => DelegationResponse::Error {
                    request_id,
                    message: "malformed session id".to_owned(),
                },
            };
            write_reply(stdin, &response);
        }
    }
}

fn error_response(request_id: u64, error: &DelegationError) -> DelegationResponse {
    DelegationResponse::Error {
        request_id,
        message: error.to_string(),
    }
}

fn write_reply(stdin: &Mutex<ChildStdin>, response: &DelegationResponse) {
    let json = serde_json::to_string(response).expect("DelegationResponse always serializes");
    let mut stdin = stdin.lock().expect("stdin mutex poisoned");
    let _ = stdin.write_all(json.as_bytes());
    let _ = stdin.write_all(b"\n");
    let _ = stdin.flush();
}
