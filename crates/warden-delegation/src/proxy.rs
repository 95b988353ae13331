//! In-sandbox Delegation Proxy: a Unix-domain-socket front end that
//! validates the fixed agent-facing command set and relays each accepted
//! command to the host over its own standard output, demultiplexing
//! responses written back on standard input by request id.
//!
//! One thread serves each client socket; a single thread drains host
//! replies from standard input and hands each one to the client thread
//! waiting on its request id.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

use crate::error::DelegationResult;
use crate::protocol::{DelegationCommand, DelegationResponse, TaggedCommand};

/// Default Unix-domain socket path the agent-facing side binds to, absent
/// an override. Fixed so the in-sandbox agent client and the spawned proxy
/// binary agree on it without further configuration.
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/.warden-delegate.sock";

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

fn next_request_id() -> u64 {
    NEXT_REQUEST_ID.fetch_add(1, Ordering::SeqCst)
}

type PendingTable = Mutex<HashMap<u64, Sender<DelegationResponse>>>;

/// Bind `socket_path` and relay agent commands to the host over stdio until
/// standard input closes.
///
/// # Errors
///
/// Returns [`crate::error::DelegationError::Io`] if `socket_path` cannot be
/// bound.
pub fn run<R: Read + Send + 'static, W: Write + Send + 'static>(
    socket_path: &Path,
    host_in: R,
    host_out: W,
) -> DelegationResult<()> {
    let _ = std::fs::remove_file(socket_path);
    let listener = UnixListener::bind(socket_path)?;
    tracing::info!(path = %socket_path.display(), "delegation proxy listening");

    let pending: Arc<PendingTable> = Arc::new(Mutex::new(HashMap::new()));
    let host_out = Arc::new(Mutex::new(host_out));

    let reply_pending = Arc::clone(&pending);
    thread::spawn(move || drain_host_replies(host_in, &reply_pending));

    for stream in listener.incoming() {
        let Ok(stream) = stream else {
            continue;
        };
        let pending = Arc::clone(&pending);
        let host_out = Arc::clone(&host_out);
        thread::spawn(move || serve_client(stream, &pending, &host_out));
    }
    Ok(())
}

fn drain_host_replies<R: Read>(host_in: R, pending: &PendingTable) {
    let reader = BufReader::new(host_in);
    for line in reader.lines() {
        let Ok(line) = line else {
            break;
        };
        let Some(response) = DelegationResponse::parse_line(&line) else {
            continue;
        };
        let request_id = response.request_id();
        let terminal = response.is_terminal();
        let sender = {
            let table = pending.lock().expect("pending table poisoned");
            table.get(&request_id).cloned()
        };
        if let Some(sender) = sender {
            let _ = sender.send(response);
        }
        if terminal {
            pending.lock().expect("pending table poisoned").remove(&request_id);
        }
    }
}

fn serve_client<W: Write>(stream: UnixStream, pending: &PendingTable, host_out: &Mutex<W>) {
    let mut writer = match stream.try_clone() {
        Ok(w) => w,
        Err(e) => {
            tracing::warn!(error = %e, "failed to clone delegation socket");
            return;
        }
    };
    let reader = BufReader::new(stream);

    for line in reader.lines() {
        let Ok(line) = line else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        let Some(command) = DelegationCommand::parse_line(&line) else {
            let _ = write_client_error(&mut writer, 0, "unknown command");
            continue;
        };

        let request_id = next_request_id();
        let (tx, rx) = mpsc::channel();
        pending.lock().expect("pending table poisoned").insert(request_id, tx);

        let tagged = TaggedCommand { request_id, command };
        if write_tagged(host_out, &tagged).is_err() {
            pending.lock().expect("pending table poisoned").remove(&request_id);
            break;
        }

        loop {
            let Ok(response) = rx.recv() else {
                break;
            };
            let terminal = response.is_terminal();
            if write_client_response(&mut writer, &response).is_err() {
                break;
            }
            if terminal {
                break;
            }
        }
    }
}

fn write_tagged<W: Write>(host_out: &Mutex<W>, tagged: &TaggedCommand) -> std::io::Result<()> {
    let json = serde_json::to_string(tagged).expect("TaggedCommand always serializes");
    let mut writer = host_out.lock().expect("host_out mutex poisoned");
    writer.write_all(json.as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()
}

fn write_client_response(stream: &mut UnixStream, response: &DelegationResponse) -> std::io::Result<()> {
    let json = serde_json::to_string(response).expect("DelegationResponse always serializes");
    stream.write_all(json.as_bytes())?;
    stream.write_all(b"\n")?;
    stream.flush()
}

fn write_client_error(stream: &mut UnixStream, request_id: u64, message: &str) -> std::io::Result<()> {
    write_client_response(
        stream,
        &DelegationResponse::Error {
            request_id,
            message: message.to_owned(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_request_id_is_monotonic() {
        let a = next_request_id();
        let b = next_request_id();
        assert!(b > a);
    }

    #[test]
    fn drain_host_replies_routes_by_request_id() {
        let pending: PendingTable = Mutex::new(HashMap::new());
        let (tx, rx) = mpsc::channel();
        pending.lock().unwrap().insert(9, tx);

        let input = b"{\"type\":\"stopped\",\"request_id\":9}\n".to_vec();
        drain_host_replies(std::io::Cursor::new(input), &pending);

        let response = rx.recv().unwrap();
        assert_eq!(response.request_id(), 9);
        assert!(pending.lock().unwrap().get(&9).is_none());
    }

    #[test]
    fn drain_host_replies_keeps_non_terminal_entry() {
        let pending: PendingTable = Mutex::new(HashMap::new());
        let (tx, rx) = mpsc::channel();
        pending.lock().unwrap().insert(5, tx);

        let input = b"{\"type\":\"stream_event\",\"request_id\":5,\"event\":{},\"done\":false}\n".to_vec();
        drain_host_replies(std::io::Cursor::new(input), &pending);

        let _ = rx.recv().unwrap();
        assert!(pending.lock().unwrap().get(&5).is_some());
    }
}
