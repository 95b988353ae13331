//! The Agent Session as actually driven by the supervisor: a duplex JSON
//! conversation over a sandboxed command, rather than a local child
//! process.
//!
//! Reuses the wire protocol from `warden_session`, but sources bytes from
//! the sandbox provider's callback-driven `wait()` instead of a local
//! `std::process::Child`'s piped stdio, since the agent process actually
//! runs inside the remote sandbox.

use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use warden_session::{IncomingMessage, OutgoingMessage};

use crate::error::{SupervisorError, SupervisorResult};
use crate::provider::{CommandHandle, Sandbox};

const READER_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// A duplex JSON conversation with the agent process running inside a
/// sandbox.
pub struct RemoteAgentSession {
    sandbox: Arc<dyn Sandbox>,
    pid: u32,
    incoming: Receiver<IncomingMessage>,
    reader_handle: Option<JoinHandle<()>>,
    stderr_text: Arc<Mutex<String>>,
    alive: Arc<Mutex<bool>>,
    shut_down: bool,
}

impl RemoteAgentSession {
    /// Take ownership of an already-started agent command and begin
    /// draining its output on a dedicated thread.
    pub fn spawn(sandbox: Arc<dyn Sandbox>, mut command: Box<dyn CommandHandle>) -> Self {
        let pid = command.pid();
        let (tx, rx) = mpsc::channel();
        let stderr_text = Arc::new(Mutex::new(String::new()));
        let alive = Arc::new(Mutex::new(true));

        let stderr_clone = Arc::clone(&stderr_text);
        let alive_clone = Arc::clone(&alive);
        let reader_handle = thread::spawn(move || {
            let mut line_buf: Vec<u8> = Vec::new();
            let mut on_stdout = |chunk: &[u8]| {
                for &byte in chunk {
                    if byte == b'\n' {
                        let raw = std::mem::take(&mut line_buf);
                        if let Ok(line) = String::from_utf8(raw) {
                            if let Some(message) = IncomingMessage::parse_line(&line) {
                                let _ = tx.send(message);
                            }
                        }
                    } else {
                        line_buf.push(byte);
                    }
                }
            };
            let mut on_stderr = |chunk: &[u8]| {
                if let Ok(text) = std::str::from_utf8(chunk) {
                    stderr_clone.lock().expect("stderr mutex poisoned").push_str(text);
                }
            };
            let _ = command.wait(&mut on_stdout, &mut on_stderr);
            *alive_clone.lock().expect("alive mutex poisoned") = false;
        });

        Self {
            sandbox,
            pid,
            incoming: rx,
            reader_handle: Some(reader_handle),
            stderr_text,
            alive,
            shut_down: false,
        }
    }

    /// Send a message to the agent's standard input.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::Provider`] if the write fails.
    pub fn send_message(&self, content: &str, message_id: &str) -> SupervisorResult<()> {
        self.write_line(&OutgoingMessage::Message {
            content: content.to_owned(),
            message_id: message_id.to_owned(),
        })
    }

    /// Return the next decoded incoming line, or `None` on timeout.
    #[must_use]
    pub fn receive(&self, timeout: Duration) -> Option<IncomingMessage> {
        self.incoming.recv_timeout(timeout).ok()
    }

    /// Block until a `{type:"ready"}` line is observed, discarding any
    /// preceding non-ready lines.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::AgentNotReady`] if `timeout` elapses or
    /// the stream closes first.
    pub fn wait_ready(&self, timeout: Duration) -> SupervisorResult<()> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(SupervisorError::AgentNotReady);
            }
            match self.incoming.recv_timeout(remaining) {
                Ok(IncomingMessage::Ready) => return Ok(()),
                Ok(_) => continue,
                Err(_) => return Err(SupervisorError::AgentNotReady),
            }
        }
    }

    /// Whether the agent process has not exited and the reader has not
    /// closed.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        *self.alive.lock().expect("alive mutex poisoned")
    }

    /// Accumulated standard-error text for diagnostics.
    #[must_use]
    pub fn stderr(&self) -> String {
        self.stderr_text.lock().expect("stderr mutex poisoned").clone()
    }

    fn write_line(&self, message: &OutgoingMessage) -> SupervisorResult<()> {
        let json = serde_json::to_string(message).expect("OutgoingMessage always serializes");
        let mut bytes = json.into_bytes();
        bytes.push(b'\n');
        self.sandbox.send_stdin(self.pid, &bytes)?;
        Ok(())
    }

    /// Idempotent: sends `{type:"shutdown"}` if alive, then joins the
    /// reader thread with a bounded wait. Does not snapshot state, kill the
    /// credential proxy, or destroy the sandbox — that full sequence is
    /// composed by [`crate::supervisor`], which owns the sandbox-level
    /// context this type does not.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        if self.is_alive() {
            let _ = self.write_line(&OutgoingMessage::Shutdown);
        }

        if let Some(handle) = self.reader_handle.take() {
            let start = Instant::now();
            while !handle.is_finished() && start.elapsed() < READER_JOIN_TIMEOUT {
                thread::sleep(Duration::from_millis(50));
            }
            if handle.is_finished() {
                let _ = handle.join();
            }
            // Otherwise the reader is still blocked on the agent's stdout;
            // detach it and let sandbox teardown reap the underlying process.
        }
    }
}

impl Drop for RemoteAgentSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}
