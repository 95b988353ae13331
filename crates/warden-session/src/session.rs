//! Agent Session: a running agent process, duplex JSON over its stdio.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::{SessionError, SessionResult};
use crate::protocol::{IncomingMessage, OutgoingMessage};

const READER_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// One running agent process, wired up for line-delimited JSON over stdio.
pub struct AgentSession {
    child: Child,
    stdin: ChildStdin,
    incoming: Receiver<IncomingMessage>,
    reader_handle: Option<JoinHandle<()>>,
    stderr_text: Arc<Mutex<String>>,
    alive: Arc<std::sync::atomic::AtomicBool>,
    shut_down: bool,
}

impl AgentSession {
    /// Spawn `command` and wire up its stdio for the agent process protocol.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Io`] if the process cannot be spawned.
    pub fn spawn(mut command: Command) -> SessionResult<Self> {
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        let mut child = command.spawn()?;

        let stdin = child.stdin.take().ok_or(SessionError::Io(
            std::io::Error::other("child stdin was not piped"),
        ))?;
        let stdout = child.stdout.take().ok_or(SessionError::Io(
            std::io::Error::other("child stdout was not piped"),
        ))?;
        let stderr = child.stderr.take().ok_or(SessionError::Io(
            std::io::Error::other("child stderr was not piped"),
        ))?;

        let (tx, rx): (Sender<IncomingMessage>, Receiver<IncomingMessage>) = mpsc::channel();
        let alive = Arc::new(std::sync::atomic::AtomicBool::new(true));
        let reader_alive = Arc::clone(&alive);
        let reader_handle = thread::spawn(move || reader_loop(stdout, &tx, &reader_alive));

        let stderr_text = Arc::new(Mutex::new(String::new()));
        let stderr_text_writer = Arc::clone(&stderr_text);
        thread::spawn(move || stderr_loop(stderr, &stderr_text_writer));

        Ok(Self {
            child,
            stdin,
            incoming: rx,
            reader_handle: Some(reader_handle),
            stderr_text,
            alive,
            shut_down: false,
        })
    }

    /// Write a `message` line to the agent's standard input.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Io`] if the write fails.
    pub fn send_message(&mut self, content: impl Into<String>, message_id: impl Into<String>) -> SessionResult<()> {
        self.write_line(&OutgoingMessage::Message {
            content: content.into(),
            message_id: message_id.into(),
        })
    }

    /// Block until the next decoded incoming line arrives, or `timeout` elapses.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Timeout`] on expiry.
    pub fn receive(&self, timeout: Duration) -> SessionResult<IncomingMessage> {
        self.incoming
            .recv_timeout(timeout)
            .map_err(|e| match e {
                RecvTimeoutError::Timeout => SessionError::Timeout,
                RecvTimeoutError::Disconnected => SessionError::ExitedBeforeReady,
            })
    }

    /// Block until a `{type:"ready"}` line is observed, discarding any
    /// preceding non-ready lines.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Timeout`] if `timeout` elapses first, or
    /// [`SessionError::ExitedBeforeReady`] if the reader closes first.
    pub fn wait_ready(&self, timeout: Duration) -> SessionResult<()> {
        let deadline = std::time::Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            if remaining.is_zero() {
                return Err(SessionError::Timeout);
            }
            match self.incoming.recv_timeout(remaining) {
                Ok(msg) if msg.is_ready() => return Ok(()),
                Ok(_) => continue,
                Err(RecvTimeoutError::Timeout) => return Err(SessionError::Timeout),
                Err(RecvTimeoutError::Disconnected) => return Err(SessionError::ExitedBeforeReady),
            }
        }
    }

    /// Whether the process has not exited and the reader has not closed.
    #[must_use]
    pub fn is_alive(&mut self) -> bool {
        if !self.alive.load(std::sync::atomic::Ordering::SeqCst) {
            return false;
        }
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Accumulated standard-error text, for diagnostics.
    #[must_use]
    pub fn stderr(&self) -> String {
        self.stderr_text.lock().expect("stderr mutex poisoned").clone()
    }

    /// Idempotently shut down the agent: send `{type:"shutdown"}` and join
    /// the reader thread with a bounded wait.
    ///
    /// Snapshot, proxy teardown, and sandbox destruction are the caller's
    /// (the supervisor's) responsibility, since they require sandbox-level
    /// context this type does not own.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        if self.is_alive() {
            let _ = self.write_line(&OutgoingMessage::Shutdown);
        }

        if let Some(handle) = self.reader_handle.take() {
            let start = std::time::Instant::now();
            while !handle.is_finished() && start.elapsed() < READER_JOIN_TIMEOUT {
                thread::sleep(Duration::from_millis(20));
            }
            let _ = handle.join();
        }

        let _ = self.child.kill();
        let _ = self.child.wait();
    }

    fn write_line(&mut self, message: &OutgoingMessage) -> SessionResult<()> {
        let line = serde_json::to_string(message)
            .map_err(|e| SessionError::Io(std::io::Error::other(e.to_string())))?;
        writeln!(self.stdin, "{line}")?;
        self.stdin.flush()?;
        Ok(())
    }
}

impl Drop for AgentSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn reader_loop(
    stdout: impl std::io::Read,
    tx: &Sender<IncomingMessage>,
    alive: &Arc<std::sync::atomic::AtomicBool>,
) {
    let reader = BufReader::new(stdout);
    for line in reader.lines() {
        let Ok(line) = line else {
            break;
        };
        if let Some(message) = IncomingMessage::parse_line(&line) {
            if tx.send(message).is_err() {
                break;
            }
        }
    }
    alive.store(false, std::sync::atomic::Ordering::SeqCst);
}

fn stderr_loop(stderr: impl std::io::Read, text: &Arc<Mutex<String>>) {
    let reader = BufReader::new(stderr);
    for line in reader.lines() {
        let Ok(line) = line else {
            break;
        };
        let mut buf = text.lock().expect("stderr mutex poisoned");
        buf.push_str(&line);
        buf.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo_ready_command() -> Command {
        let mut command = Command::new("sh");
        command.arg("-c").arg(
            r#"echo '{"type":"ready"}'; read line; echo '{"type":"response","content":"ack","done":true}'"#,
        );
        command
    }

    #[test]
    fn wait_ready_observes_the_ready_line() {
        let session = AgentSession::spawn(echo_ready_command()).unwrap();
        session.wait_ready(Duration::from_secs(2)).unwrap();
    }

    #[test]
    fn send_message_then_receive_response() {
        let mut session = AgentSession::spawn(echo_ready_command()).unwrap();
        session.wait_ready(Duration::from_secs(2)).unwrap();
        session.send_message("hi", "m1").unwrap();
        let reply = session.receive(Duration::from_secs(2)).unwrap();
        match reply {
            IncomingMessage::Response { content, done, .. } => {
                assert_eq!(content, "ack");
                assert!(done);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn shutdown_is_idempotent() {
        let mut session = AgentSession::spawn(echo_ready_command()).unwrap();
        session.wait_ready(Duration::from_secs(2)).unwrap();
        session.shutdown();
        session.shutdown();
    }

    #[test]
    fn receive_times_out_when_no_output_is_pending() {
        let mut command = Command::new("sh");
        command.arg("-c").arg("sleep 2");
        let session = AgentSession::spawn(command).unwrap();
        let result = session.receive(Duration::from_millis(100));
        assert!(matches!(result, Err(SessionError::Timeout)));
    }
}
