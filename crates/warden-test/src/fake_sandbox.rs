//! A local-process-backed [`SandboxProvider`] for tests.
//!
//! Provisioning a "sandbox" just means creating a temp directory and
//! running commands against it with `sh -c`, rather than talking to a
//! remote microVM backend. Good enough to exercise the supervisor's
//! lifecycle ordering and error paths without a real provider.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use portable_pty::{native_pty_system, CommandBuilder, PtySize};
use tempfile::TempDir;

use warden_supervisor::provider::{
    CommandHandle, CommandOptions, NetworkPolicy, ProviderError, ProviderResult, PtyHandle, PtySizeSpec, Sandbox,
    SandboxProvider,
};

/// One recorded call to [`FakeSandboxProvider::create`], kept for
/// assertions about what the supervisor actually requested.
#[derive(Debug, Clone)]
pub struct ProvisionRecord {
    /// Sandbox template requested.
    pub template: String,
    /// Host env vars forwarded at provisioning time.
    pub envs: HashMap<String, String>,
    /// Outbound network policy requested.
    pub network_policy: NetworkPolicy,
}

/// A [`SandboxProvider`] backed by local temp directories and local child
/// processes.
#[derive(Default)]
pub struct FakeSandboxProvider {
    provisions: Mutex<Vec<ProvisionRecord>>,
}

impl FakeSandboxProvider {
    /// Construct an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `create()` call observed so far, in order.
    #[must_use]
    pub fn provisions(&self) -> Vec<ProvisionRecord> {
        self.provisions.lock().expect("provisions mutex poisoned").clone()
    }
}

impl SandboxProvider for FakeSandboxProvider {
    fn create(
        &self,
        template: &str,
        envs: &HashMap<String, String>,
        network_policy: &NetworkPolicy,
        _timeout: Duration,
    ) -> ProviderResult<Box<dyn Sandbox>> {
        self.provisions.lock().expect("provisions mutex poisoned").push(ProvisionRecord {
            template: template.to_owned(),
            envs: envs.clone(),
            network_policy: network_policy.clone(),
        });

        let root = tempfile::tempdir().map_err(|e| ProviderError::ProvisionFailed(e.to_string()))?;
        Ok(Box::new(FakeSandbox {
            root,
            children: Mutex::new(HashMap::new()),
        }))
    }
}

/// The provisioned fake sandbox: a temp directory standing in for the
/// agent's home, plus the child processes started inside it.
pub struct FakeSandbox {
    root: TempDir,
    children: Mutex<HashMap<u32, Arc<Mutex<Option<ChildStdin>>>>>,
}

impl FakeSandbox {
    fn resolve(&self, path: &str) -> std::path::PathBuf {
        self.root.path().join(path.trim_start_matches('/'))
    }
}

impl Sandbox for FakeSandbox {
    fn write_file(&self, path: &str, bytes: &[u8], _user: Option<&str>) -> ProviderResult<()> {
        let full = self.resolve(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ProviderError::FileOperation(e.to_string()))?;
        }
        std::fs::write(&full, bytes).map_err(|e| ProviderError::FileOperation(e.to_string()))
    }

    fn read_file(&self, path: &str) -> ProviderResult<Vec<u8>> {
        std::fs::read(self.resolve(path)).map_err(|e| ProviderError::FileOperation(e.to_string()))
    }

    fn run_command(&self, command: &str, opts: CommandOptions) -> ProviderResult<Box<dyn CommandHandle>> {
        let mut built = Command::new("sh");
        built
            .arg("-c")
            .arg(command)
            .current_dir(self.root.path())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        // `opts.user` has no effect here: the fake runs everything as the
        // host test process's own user.
        let _ = &opts.user;

        let mut child = built.spawn().map_err(|e| ProviderError::CommandFailed(e.to_string()))?;
        let pid = child.id();

        let mut stdin = child.stdin.take();
        if let (Some(bytes), Some(writer)) = (&opts.stdin, stdin.as_mut()) {
            writer.write_all(bytes).map_err(|e| ProviderError::CommandFailed(e.to_string()))?;
        }
        let stdin = Arc::new(Mutex::new(stdin));
        self.children.lock().expect("children mutex poisoned").insert(pid, Arc::clone(&stdin));

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        Ok(Box::new(FakeCommandHandle {
            child,
            stdout,
            stderr,
            stdout_accum: Vec::new(),
            stderr_accum: Vec::new(),
            exit_code: None,
            timeout: opts.timeout,
        }))
    }

    fn send_stdin(&self, pid: u32, bytes: &[u8]) -> ProviderResult<()> {
        let table = self.children.lock().expect("children mutex poisoned");
        let Some(slot) = table.get(&pid) else {
            return Err(ProviderError::CommandFailed(format!("no tracked child with pid {pid}")));
        };
        let mut guard = slot.lock().expect("stdin mutex poisoned");
        let Some(stdin) = guard.as_mut() else {
            return Err(ProviderError::CommandFailed(format!("child {pid} stdin already closed")));
        };
        stdin.write_all(bytes).map_err(|e| ProviderError::CommandFailed(e.to_string()))?;
        stdin.flush().map_err(|e| ProviderError::CommandFailed(e.to_string()))
    }

    fn create_pty(
        &self,
        size: PtySizeSpec,
        _user: Option<&str>,
        cwd: Option<&str>,
    ) -> ProviderResult<Box<dyn PtyHandle>> {
        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(PtySize {
                rows: size.rows,
                cols: size.cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| ProviderError::PtyFailed(e.to_string()))?;

        let mut command = CommandBuilder::new("sh");
        command.cwd(cwd.map_or_else(|| self.root.path().to_path_buf(), |c| self.resolve(c)));

        let child = pair.slave.spawn_command(command).map_err(|e| ProviderError::PtyFailed(e.to_string()))?;
        drop(pair.slave);

        let writer = pair.master.take_writer().map_err(|e| ProviderError::PtyFailed(e.to_string()))?;

        Ok(Box::new(FakePtyHandle {
            master: pair.master,
            writer: Mutex::new(writer),
            _child: Mutex::new(child),
        }))
    }

    fn kill(&self) -> ProviderResult<()> {
        let mut table = self.children.lock().expect("children mutex poisoned");
        for (_, stdin) in table.drain() {
            drop(stdin);
        }
        Ok(())
    }
}

/// A running or completed fake command, draining stdout then stderr
/// sequentially on the caller's thread (the trait's callbacks borrow the
/// caller's stack, so this fake cannot fan them out to worker threads the
/// way a real provider's async transport could).
pub struct FakeCommandHandle {
    child: Child,
    stdout: Option<std::process::ChildStdout>,
    stderr: Option<std::process::ChildStderr>,
    stdout_accum: Vec<u8>,
    stderr_accum: Vec<u8>,
    exit_code: Option<i32>,
    timeout: Option<Duration>,
}

impl CommandHandle for FakeCommandHandle {
    fn pid(&self) -> u32 {
        self.child.id()
    }

    fn wait(&mut self, on_stdout: &mut dyn FnMut(&[u8]), on_stderr: &mut dyn FnMut(&[u8])) -> ProviderResult<i32> {
        if let Some(code) = self.exit_code {
            return Ok(code);
        }

        if let Some(mut stdout) = self.stdout.take() {
            drain(&mut stdout, on_stdout, &mut self.stdout_accum);
        }
        if let Some(mut stderr) = self.stderr.take() {
            drain(&mut stderr, on_stderr, &mut self.stderr_accum);
        }

        let status = match self.timeout {
            Some(timeout) => wait_with_timeout(&mut self.child, timeout)?,
            None => self.child.wait().map_err(|e| ProviderError::CommandFailed(e.to_string()))?,
        };
        let code = status.code().unwrap_or(-1);
        self.exit_code = Some(code);
        Ok(code)
    }

    fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    fn stdout(&self) -> &[u8] {
        &self.stdout_accum
    }

    fn stderr(&self) -> &[u8] {
        &self.stderr_accum
    }
}

fn drain(reader: &mut impl Read, on_chunk: &mut dyn FnMut(&[u8]), accum: &mut Vec<u8>) {
    let mut buf = [0u8; 4096];
    loop {
        match reader.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                accum.extend_from_slice(&buf[..n]);
                on_chunk(&buf[..n]);
            }
        }
    }
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> ProviderResult<std::process::ExitStatus> {
    let deadline = std::time::Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait().map_err(|e| ProviderError::CommandFailed(e.to_string()))? {
            return Ok(status);
        }
        if std::time::Instant::now() >= deadline {
            let _ = child.kill();
            return Err(ProviderError::CommandFailed("command exceeded its timeout".to_owned()));
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}

/// A pty backed by `portable_pty`, holding its child alive for the
/// handle's lifetime.
pub struct FakePtyHandle {
    master: Box<dyn portable_pty::MasterPty + Send>,
    writer: Mutex<Box<dyn Write + Send>>,
    _child: Mutex<Box<dyn portable_pty::Child + Send + Sync>>,
}

impl PtyHandle for FakePtyHandle {
    fn send_stdin(&self, bytes: &[u8]) -> ProviderResult<()> {
        let mut writer = self.writer.lock().expect("pty writer mutex poisoned");
        writer.write_all(bytes).map_err(|e| ProviderError::PtyFailed(e.to_string()))?;
        writer.flush().map_err(|e| ProviderError::PtyFailed(e.to_string()))
    }

    fn resize(&self, size: PtySizeSpec) -> ProviderResult<()> {
        self.master
            .resize(PtySize {
                rows: size.rows,
                cols: size.cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| ProviderError::PtyFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_command_reports_exit_code_and_captures_stdout() {
        let provider = FakeSandboxProvider::new();
        let sandbox = provider
            .create("default", &HashMap::new(), &NetworkPolicy::unrestricted(), Duration::from_secs(5))
            .unwrap();
        let mut handle = sandbox.run_command("echo hello", CommandOptions::default()).unwrap();
        let mut out = Vec::new();
        let code = handle.wait(&mut |chunk| out.extend_from_slice(chunk), &mut |_| {}).unwrap();
        assert_eq!(code, 0);
        assert_eq!(String::from_utf8_lossy(&out).trim(), "hello");
    }

    #[test]
    fn write_then_read_file_round_trips() {
        let provider = FakeSandboxProvider::new();
        let sandbox = provider
            .create("default", &HashMap::new(), &NetworkPolicy::unrestricted(), Duration::from_secs(5))
            .unwrap();
        sandbox.write_file("workspace/note.txt", b"hi", None).unwrap();
        let bytes = sandbox.read_file("workspace/note.txt").unwrap();
        assert_eq!(bytes, b"hi");
    }

    #[test]
    fn command_exceeding_timeout_is_killed() {
        let provider = FakeSandboxProvider::new();
        let sandbox = provider
            .create("default", &HashMap::new(), &NetworkPolicy::unrestricted(), Duration::from_secs(5))
            .unwrap();
        let mut handle = sandbox
            .run_command(
                "sleep 5",
                CommandOptions {
                    timeout: Some(Duration::from_millis(100)),
                    ..CommandOptions::default()
                },
            )
            .unwrap();
        let result = handle.wait(&mut |_| {}, &mut |_| {});
        assert!(result.is_err());
    }

    #[test]
    fn provisions_are_recorded() {
        let provider = FakeSandboxProvider::new();
        let _ = provider.create(
            "python-3.12",
            &HashMap::new(),
            &NetworkPolicy::restricted(vec!["api.anthropic.com".to_owned()]),
            Duration::from_secs(5),
        );
        let records = provider.provisions();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].template, "python-3.12");
    }
}
