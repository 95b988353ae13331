//! Terminal Session: a PTY-backed variant of the Agent Session.
//!
//! Binds a pseudo-terminal of a given size, forwards raw bytes in both
//! directions (no line protocol, no JSON framing), and supports resizing.
//! It otherwise participates in the same snapshot/proxy teardown sequence
//! on shutdown as the Agent Session.

use std::io::{Read, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};

use crate::error::{SessionError, SessionResult};

const READER_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// A running agent process bound to a pseudo-terminal.
pub struct TerminalSession {
    master: Box<dyn MasterPty + Send>,
    writer: Box<dyn Write + Send>,
    child: Box<dyn Child + Send + Sync>,
    incoming: Receiver<Vec<u8>>,
    reader_handle: Option<JoinHandle<()>>,
    alive: Arc<std::sync::atomic::AtomicBool>,
    shut_down: bool,
}

impl TerminalSession {
    /// Open a pseudo-terminal of `rows` x `cols` and spawn `command` attached
    /// to its slave end.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Pty`] if the PTY cannot be opened or the
    /// command cannot be spawned on it.
    pub fn spawn(command: CommandBuilder, rows: u16, cols: u16) -> SessionResult<Self> {
        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| SessionError::Pty(e.to_string()))?;

        let child = pair
            .slave
            .spawn_command(command)
            .map_err(|e| SessionError::Pty(e.to_string()))?;
        drop(pair.slave);

        let writer = pair
            .master
            .take_writer()
            .map_err(|e| SessionError::Pty(e.to_string()))?;
        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| SessionError::Pty(e.to_string()))?;

        let (tx, rx): (Sender<Vec<u8>>, Receiver<Vec<u8>>) = mpsc::channel();
        let alive = Arc::new(std::sync::atomic::AtomicBool::new(true));
        let reader_alive = Arc::clone(&alive);
        let reader_handle = thread::spawn(move || reader_loop(reader, &tx, &reader_alive));

        Ok(Self {
            master: pair.master,
            writer,
            child,
            incoming: rx,
            reader_handle: Some(reader_handle),
            alive,
            shut_down: false,
        })
    }

    /// Forward raw bytes to the PTY's input.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Io`] if the write fails.
    pub fn write_input(&mut self, bytes: &[u8]) -> SessionResult<()> {
        self.writer.write_all(bytes)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Block until the next chunk of PTY output arrives, or `timeout` elapses.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Timeout`] on expiry.
    pub fn read_output(&self, timeout: Duration) -> SessionResult<Vec<u8>> {
        self.incoming.recv_timeout(timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => SessionError::Timeout,
            RecvTimeoutError::Disconnected => SessionError::ExitedBeforeReady,
        })
    }

    /// Resize the pseudo-terminal.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Pty`] if the resize ioctl fails.
    pub fn resize(&self, cols: u16, rows: u16) -> SessionResult<()> {
        self.master
            .resize(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| SessionError::Pty(e.to_string()))
    }

    /// Whether the process has not exited and the reader has not closed.
    #[must_use]
    pub fn is_alive(&mut self) -> bool {
        if !self.alive.load(std::sync::atomic::Ordering::SeqCst) {
            return false;
        }
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Idempotently shut down: kill the child and join the reader thread.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        let _ = self.child.kill();
        let _ = self.child.wait();

        if let Some(handle) = self.reader_handle.take() {
            let start = std::time::Instant::now();
            while !handle.is_finished() && start.elapsed() < READER_JOIN_TIMEOUT {
                thread::sleep(Duration::from_millis(20));
            }
            let _ = handle.join();
        }
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn reader_loop(
    mut reader: Box<dyn Read + Send>,
    tx: &Sender<Vec<u8>>,
    alive: &Arc<std::sync::atomic::AtomicBool>,
) {
    let mut buf = [0u8; 4096];
    loop {
        match reader.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if tx.send(buf[..n].to_vec()).is_err() {
                    break;
                }
            }
        }
    }
    alive.store(false, std::sync::atomic::Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_bytes_echo_round_trip() {
        let command = CommandBuilder::new("cat");
        let mut session = TerminalSession::spawn(command, 24, 80).unwrap();
        session.write_input(b"hello\n").unwrap();
        let chunk = session.read_output(Duration::from_secs(2)).unwrap();
        assert!(chunk.starts_with(b"hello"));
    }

    #[test]
    fn resize_does_not_error() {
        let command = CommandBuilder::new("cat");
        let session = TerminalSession::spawn(command, 24, 80).unwrap();
        session.resize(100, 30).unwrap();
    }

    #[test]
    fn shutdown_is_idempotent() {
        let command = CommandBuilder::new("cat");
        let mut session = TerminalSession::spawn(command, 24, 80).unwrap();
        session.shutdown();
        session.shutdown();
    }
}
