//! Thread-per-connection HTTP/1.1 relay for the credential proxy.
//!
//! Each route owns a loopback listener. Accepted connections authenticate
//! with a shared session token, have malformed routing rejected up front,
//! and are relayed to a fixed upstream host with the real credential
//! injected — never the other way around.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use subtle::ConstantTimeEq;

use crate::error::ProxyResult;
use crate::route::{AuthStyle, Route, RouteTable};

const READ_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_CONTENT_LENGTH: u64 = 100 * 1024 * 1024;

const HOP_BY_HOP_HEADERS: &[&str] = &["host", "transfer-encoding", "connection", "proxy-connection"];

const RESPONSE_HEADER_ALLOWLIST: &[&str] = &[
    "content-type",
    "content-length",
    "content-encoding",
    "date",
    "server",
    "x-request-id",
    "retry-after",
    "cache-control",
];

/// Start one listener thread per route and block forever.
///
/// # Errors
///
/// Returns [`crate::error::ProxyError::Io`] if a route's loopback port
/// cannot be bound.
pub fn run(table: RouteTable) -> ProxyResult<()> {
    let mut handles = Vec::new();
    for route in table.routes {
        let listener = TcpListener::bind(("127.0.0.1", route.loopback_port))?;
        tracing::info!(port = route.loopback_port, upstream = %route.upstream_host, "credential proxy route listening");
        handles.push(thread::spawn(move || accept_loop(listener, route)));
    }
    for handle in handles {
        let _ = handle.join();
    }
    Ok(())
}

fn accept_loop(listener: TcpListener, route: Route) {
    for stream in listener.incoming() {
        let Ok(stream) = stream else {
            continue;
        };
        let route = route.clone();
        thread::spawn(move || {
            if let Err(e) = handle_connection(stream, &route) {
                tracing::warn!(port = route.loopback_port, error = %e, "connection handling failed");
            }
        });
    }
}

struct ParsedRequest {
    method: String,
    target: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

fn handle_connection(mut stream: TcpStream, route: &Route) -> ProxyResult<()> {
    stream.set_read_timeout(Some(READ_TIMEOUT))?;
    stream.set_write_timeout(Some(READ_TIMEOUT))?;

    let mut reader = BufReader::new(stream.try_clone()?);
    let request = match read_request(&mut reader) {
        Ok(ParseOutcome::Request(req)) => req,
        Ok(ParseOutcome::Rejected(status, reason)) => {
            write_status_only(&mut stream, status, reason)?;
            return Ok(());
        }
        Err(e) => {
            tracing::debug!(error = %e, "malformed request");
            write_status_only(&mut stream, 400, "Bad Request")?;
            return Ok(());
        }
    };

    if !authenticate(&request, route) {
        write_status_only(&mut stream, 403, "Forbidden")?;
        return Ok(());
    }

    match relay(&request, route) {
        Ok((status, headers, body)) => write_response(&mut stream, status, &headers, &body)?,
        Err(e) => {
            tracing::warn!(upstream = %route.upstream_host, error = %e, "upstream relay failed");
            write_status_only(&mut stream, 502, "Upstream connection failed")?;
        }
    }
    Ok(())
}

enum ParseOutcome {
    Request(ParsedRequest),
    Rejected(u16, &'static str),
}

fn read_request(reader: &mut BufReader<TcpStream>) -> std::io::Result<ParseOutcome> {
    let mut line_bytes = Vec::new();
    reader.read_until(b'\n', &mut line_bytes)?;
    if line_bytes.last() == Some(&b'\n') {
        line_bytes.pop();
    }
    if line_bytes.last() == Some(&b'\r') {
        line_bytes.pop();
    }
    // Any remaining bare CR means the client smuggled a CRLF pair inside
    // what should have been a single request line.
    if line_bytes.contains(&b'\r') {
        return Ok(ParseOutcome::Rejected(400, "Bad Request"));
    }
    let request_line = String::from_utf8_lossy(&line_bytes).into_owned();
    let mut parts = request_line.split_whitespace();
    let (Some(method), Some(target), Some(_version)) = (parts.next(), parts.next(), parts.next())
    else {
        return Ok(ParseOutcome::Rejected(400, "Bad Request"));
    };
    if target.contains('\r') || target.contains('\n') {
        return Ok(ParseOutcome::Rejected(400, "Bad Request"));
    }
    let method = method.to_owned();
    let target = target.to_owned();

    let mut headers = Vec::new();
    loop {
        let mut header_line = Vec::new();
        reader.read_until(b'\n', &mut header_line)?;
        if header_line.last() == Some(&b'\n') {
            header_line.pop();
        }
        if header_line.last() == Some(&b'\r') {
            header_line.pop();
        }
        if header_line.is_empty() {
            break;
        }
        let line = String::from_utf8_lossy(&header_line).into_owned();
        let Some((name, value)) = line.split_once(':') else {
            return Ok(ParseOutcome::Rejected(400, "Bad Request"));
        };
        headers.push((name.trim().to_lowercase(), value.trim().to_owned()));
    }

    if let Some((_, te)) = headers.iter().find(|(n, _)| n == "transfer-encoding") {
        if !te.eq_ignore_ascii_case("identity") {
            return Ok(ParseOutcome::Rejected(400, "Bad Request"));
        }
    }

    let content_length = headers
        .iter()
        .find(|(n, _)| n == "content-length")
        .map(|(_, v)| v.parse::<i64>());
    let content_length = match content_length {
        Some(Ok(len)) if len < 0 => return Ok(ParseOutcome::Rejected(413, "Payload Too Large")),
        Some(Ok(len)) if (len as u64) > MAX_CONTENT_LENGTH => {
            return Ok(ParseOutcome::Rejected(413, "Payload Too Large"));
        }
        Some(Ok(len)) => len as u64,
        Some(Err(_)) => return Ok(ParseOutcome::Rejected(400, "Bad Request")),
        None => 0,
    };

    let mut body = vec![0u8; content_length as usize];
    if content_length > 0 {
        reader.read_exact(&mut body)?;
    }

    Ok(ParseOutcome::Request(ParsedRequest {
        method,
        target,
        headers,
        body,
    }))
}

fn authenticate(request: &ParsedRequest, route: &Route) -> bool {
    let header_name = route.auth_style.header_name().to_lowercase();
    let Some((_, value)) = request.headers.iter().find(|(n, _)| *n == header_name) else {
        return false;
    };
    let presented = match &route.auth_style {
        AuthStyle::Bearer => value.strip_prefix("Bearer ").unwrap_or(""),
        AuthStyle::Header { .. } => value.as_str(),
    };
    bool::from(presented.as_bytes().ct_eq(route.session_token.as_bytes()))
}

fn relay(
    request: &ParsedRequest,
    route: &Route,
) -> Result<(u16, Vec<(String, String)>, Vec<u8>), reqwest::Error> {
    let client = reqwest::blocking::Client::builder()
        .timeout(READ_TIMEOUT)
        .build()?;

    let method = reqwest::Method::from_bytes(request.method.as_bytes())
        .unwrap_or(reqwest::Method::GET);
    let url = format!("https://{}{}", route.upstream_host, request.target);

    let auth_header = route.auth_style.header_name().to_lowercase();
    let mut builder = client.request(method, url);
    for (name, value) in &request.headers {
        if HOP_BY_HOP_HEADERS.contains(&name.as_str()) || *name == auth_header || *name == "authorization" {
            continue;
        }
        builder = builder.header(name, value);
    }
    builder = match &route.auth_style {
        AuthStyle::Bearer => builder.header("authorization", format!("Bearer {}", route.real_key)),
        AuthStyle::Header { name } => builder.header(name, &route.real_key),
    };
    if !request.body.is_empty() {
        builder = builder.body(request.body.clone());
    }

    let response = builder.send()?;
    let status = response.status().as_u16();
    let mut headers = Vec::new();
    for (name, value) in response.headers() {
        let name = name.as_str().to_lowercase();
        let allowed = RESPONSE_HEADER_ALLOWLIST.contains(&name.as_str())
            || name.starts_with("x-ratelimit-");
        if allowed {
            if let Ok(value) = value.to_str() {
                headers.push((name, value.to_owned()));
            }
        }
    }
    let body = response.bytes()?.to_vec();
    Ok((status, headers, body))
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        400 => "Bad Request",
        403 => "Forbidden",
        413 => "Payload Too Large",
        502 => "Upstream connection failed",
        200 => "OK",
        _ => "Unknown",
    }
}

fn write_status_only(stream: &mut TcpStream, status: u16, reason: &str) -> std::io::Result<()> {
    write_response_with_reason(stream, status, reason, &[], reason.as_bytes())
}

fn write_response(
    stream: &mut TcpStream,
    status: u16,
    headers: &[(String, String)],
    body: &[u8],
) -> std::io::Result<()> {
    write_response_with_reason(stream, status, reason_phrase(status), headers, body)
}

fn write_response_with_reason(
    stream: &mut TcpStream,
    status: u16,
    reason: &str,
    headers: &[(String, String)],
    body: &[u8],
) -> std::io::Result<()> {
    let mut out = Vec::new();
    write!(out, "HTTP/1.1 {status} {reason}\r\n")?;
    for (name, value) in headers {
        write!(out, "{name}: {value}\r\n")?;
    }
    write!(out, "content-length: {}\r\n", body.len())?;
    write!(out, "connection: close\r\n\r\n")?;
    out.extend_from_slice(body);
    stream.write_all(&out)?;
    stream.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_route() -> Route {
        Route {
            loopback_port: 0,
            upstream_host: "api.example.com".to_owned(),
            real_key: "real-secret".to_owned(),
            auth_style: AuthStyle::Bearer,
            session_token: "session-abc".to_owned(),
        }
    }

    fn request_with_header(name: &str, value: &str) -> ParsedRequest {
        ParsedRequest {
            method: "POST".to_owned(),
            target: "/v1/messages".to_owned(),
            headers: vec![(name.to_lowercase(), value.to_owned())],
            body: Vec::new(),
        }
    }

    #[test]
    fn bearer_auth_accepts_matching_token() {
        let route = sample_route();
        let request = request_with_header("authorization", "Bearer session-abc");
        assert!(authenticate(&request, &route));
    }

    #[test]
    fn bearer_auth_rejects_mismatched_token() {
        let route = sample_route();
        let request = request_with_header("authorization", "Bearer wrong-token");
        assert!(!authenticate(&request, &route));
    }

    #[test]
    fn bearer_auth_rejects_missing_header() {
        let route = sample_route();
        let request = ParsedRequest {
            method: "GET".to_owned(),
            target: "/".to_owned(),
            headers: Vec::new(),
            body: Vec::new(),
        };
        assert!(!authenticate(&request, &route));
    }

    #[test]
    fn custom_header_auth_is_supported() {
        let mut route = sample_route();
        route.auth_style = AuthStyle::Header {
            name: "x-session-token".to_owned(),
        };
        let request = request_with_header("x-session-token", "session-abc");
        assert!(authenticate(&request, &route));
    }

    #[test]
    fn parses_a_well_formed_request_line() {
        let raw = b"GET /v1/messages HTTP/1.1\r\nauthorization: Bearer session-abc\r\ncontent-length: 0\r\n\r\n";
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = std::net::TcpStream::connect(addr).unwrap();
        let (server_side, _) = listener.accept().unwrap();
        {
            let mut writer = client;
            writer.write_all(raw).unwrap();
        }
        let mut reader = BufReader::new(server_side);
        let parsed = read_request(&mut reader).unwrap();
        match parsed {
            ParseOutcome::Request(req) => {
                assert_eq!(req.method, "GET");
                assert_eq!(req.target, "/v1/messages");
            }
            ParseOutcome::Rejected(status, _) => panic!("unexpectedly rejected with {status}"),
        }
    }

    #[test]
    fn rejects_non_identity_transfer_encoding() {
        let raw = b"POST /x HTTP/1.1\r\ntransfer-encoding: chunked\r\n\r\n";
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let mut client = std::net::TcpStream::connect(addr).unwrap();
        let (server_side, _) = listener.accept().unwrap();
        client.write_all(raw).unwrap();
        let mut reader = BufReader::new(server_side);
        match read_request(&mut reader).unwrap() {
            ParseOutcome::Rejected(status, _) => assert_eq!(status, 400),
            ParseOutcome::Request(_) => panic!("should have been rejected"),
        }
    }

    #[test]
    fn rejects_oversized_content_length() {
        let raw = format!(
            "POST /x HTTP/1.1\r\ncontent-length: {}\r\n\r\n",
            MAX_CONTENT_LENGTH + 1
        );
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let mut client = std::net::TcpStream::connect(addr).unwrap();
        let (server_side, _) = listener.accept().unwrap();
        client.write_all(raw.as_bytes()).unwrap();
        let mut reader = BufReader::new(server_side);
        match read_request(&mut reader).unwrap() {
            ParseOutcome::Rejected(status, _) => assert_eq!(status, 413),
            ParseOutcome::Request(_) => panic!("should have been rejected"),
        }
    }

    #[test]
    fn rejects_negative_content_length() {
        let raw = b"POST /x HTTP/1.1\r\ncontent-length: -1\r\n\r\n";
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let mut client = std::net::TcpStream::connect(addr).unwrap();
        let (server_side, _) = listener.accept().unwrap();
        client.write_all(raw).unwrap();
        let mut reader = BufReader::new(server_side);
        match read_request(&mut reader).unwrap() {
            ParseOutcome::Rejected(status, _) => assert_eq!(status, 413),
            ParseOutcome::Request(_) => panic!("should have been rejected"),
        }
    }
}
