//! Test helpers for behavioral specifications.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::sync::mpsc;
use std::time::Duration;

pub const API_KEY: &str = "test-api-key";
pub const HMAC_SECRET: &str = "test-hmac-secret";
pub const ENCRYPTION_KEY: &str =
    "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

/// How long a spawned manager may take to print READY
const READY_WAIT: Duration = Duration::from_secs(10);

/// Variables that must not leak from the developer's shell into specs
const SCRUBBED_ENV: &[&str] = &[
    "FLEET_STATE_DIR",
    "FLEET_CONFIG",
    "FLEET_API_URL",
    "FLEET_LISTEN_ADDR",
    "FLEET_BASE_PATH",
    "FLEET_OPERATOR",
    "FLEET_WORKER_BIN",
    "FLEET_TENANT_ID",
    "MANAGER_API_KEY",
    "MANAGER_HMAC_SECRET",
    "ENCRYPTION_KEY",
    "DATABASE_URL",
    "REDIS_URL",
    "DISCORD_TOKEN",
    "DISCORD_CLIENT_ID",
    "CORS_ORIGINS",
    "COLOR",
];

/// Path to a workspace binary, checking the llvm-cov target directory first
/// and falling back to the directory next to the test binary.
pub fn binary_path(name: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    let llvm_cov_path = manifest_dir.join("target/llvm-cov-target/debug").join(name);
    if llvm_cov_path.exists() {
        return llvm_cov_path;
    }

    let standard = manifest_dir.join("target/debug").join(name);
    if standard.exists() {
        return standard;
    }

    // The test binary lives at target/debug/deps/specs-<hash>
    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join(name);
            if fallback.exists() {
                return fallback;
            }
        }
    }

    standard
}

pub fn fleet() -> CliBuilder {
    CliBuilder::new("fleet").env("NO_COLOR", "1")
}

pub fn fleetd() -> CliBuilder {
    CliBuilder::new("fleetd")
}

pub fn worker() -> CliBuilder {
    CliBuilder::new("fleet-worker")
}

/// A port nothing is listening on right now
pub fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Fluent builder for one binary invocation
pub struct CliBuilder {
    binary: &'static str,
    args: Vec<String>,
    envs: Vec<(String, String)>,
    stdin: Option<String>,
}

impl CliBuilder {
    fn new(binary: &'static str) -> Self {
        Self {
            binary,
            args: Vec::new(),
            envs: vec![("RUST_LOG".into(), "warn".into())],
            stdin: None,
        }
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    pub fn env(mut self, key: &str, value: impl AsRef<Path>) -> Self {
        self.envs.push((
            key.to_string(),
            value.as_ref().to_string_lossy().to_string(),
        ));
        self
    }

    pub fn stdin(mut self, input: &str) -> Self {
        self.stdin = Some(input.to_string());
        self
    }

    /// Build the command without running it
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(binary_path(self.binary));
        cmd.args(&self.args);
        for key in SCRUBBED_ENV {
            cmd.env_remove(key);
        }
        for (key, value) in &self.envs {
            cmd.env(key, value);
        }
        cmd
    }

    fn output(self) -> Output {
        let mut cmd = self.command();
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        let mut child = cmd.spawn().expect("command should run");
        let mut stdin = child.stdin.take().unwrap();
        if let Some(input) = &self.stdin {
            stdin.write_all(input.as_bytes()).unwrap();
        }
        drop(stdin);
        child.wait_with_output().unwrap()
    }

    /// Run and expect success (exit code 0)
    pub fn passes(self) -> RunAssert {
        let output = self.output();
        assert!(
            output.status.success(),
            "expected command to pass, got exit code {:?}\nstdout: {}\nstderr: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }

    /// Run and expect failure (non-zero exit code)
    pub fn fails(self) -> RunAssert {
        let output = self.output();
        assert!(
            !output.status.success(),
            "expected command to fail, but it passed\nstdout: {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }
}

/// Result of a run for chaining assertions
pub struct RunAssert {
    output: Output,
}

impl RunAssert {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    pub fn code(&self) -> Option<i32> {
        self.output.status.code()
    }

    /// Assert stdout equals expected exactly (with diff on failure).
    pub fn stdout_eq(self, expected: &str) -> Self {
        similar_asserts::assert_eq!(self.stdout(), expected);
        self
    }

    pub fn stdout_has(self, expected: &str) -> Self {
        let stdout = self.stdout();
        assert!(
            stdout.contains(expected),
            "stdout does not contain '{}'\nstdout: {}",
            expected,
            stdout
        );
        self
    }

    pub fn stdout_lacks(self, unexpected: &str) -> Self {
        let stdout = self.stdout();
        assert!(
            !stdout.contains(unexpected),
            "stdout should not contain '{}'\nstdout: {}",
            unexpected,
            stdout
        );
        self
    }

    pub fn stderr_has(self, expected: &str) -> Self {
        let stderr = self.stderr();
        assert!(
            stderr.contains(expected),
            "stderr does not contain '{}'\nstderr: {}",
            expected,
            stderr
        );
        self
    }

    /// stdout parsed as one JSON document
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.stdout()).unwrap()
    }

    /// stdout parsed as newline-delimited JSON
    pub fn json_lines(&self) -> Vec<serde_json::Value> {
        self.stdout()
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }
}

/// A running `fleetd` in its own state directory. Killed on drop.
pub struct Manager {
    child: Child,
    pub state_dir: tempfile::TempDir,
    pub port: u16,
}

impl Manager {
    pub fn start() -> Self {
        Self::start_in(tempfile::tempdir().unwrap())
    }

    pub fn start_in(state_dir: tempfile::TempDir) -> Self {
        let port = free_port();
        let mut child = manager_command(state_dir.path(), port)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("fleetd should spawn");

        let stdout = child.stdout.take().unwrap();
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            for line in BufReader::new(stdout).lines().map_while(Result::ok) {
                if line.trim() == "READY" {
                    let _ = tx.send(());
                }
            }
        });
        if rx.recv_timeout(READY_WAIT).is_err() {
            let _ = child.kill();
            panic!("fleetd did not become ready");
        }
        Self {
            child,
            state_dir,
            port,
        }
    }

    pub fn api_url(&self) -> String {
        format!("http://127.0.0.1:{}/api", self.port)
    }

    /// `fleet` pointed at this manager with valid credentials
    pub fn fleet(&self) -> CliBuilder {
        fleet()
            .env("FLEET_API_URL", self.api_url())
            .env("MANAGER_API_KEY", API_KEY)
            .env("MANAGER_HMAC_SECRET", HMAC_SECRET)
            .env("FLEET_OPERATOR", "ops")
    }

    pub fn log(&self) -> String {
        std::fs::read_to_string(self.state_dir.path().join("fleetd.log")).unwrap_or_default()
    }
}

impl Drop for Manager {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// `fleetd` with every required secret set
pub fn manager_command(state_dir: &Path, port: u16) -> Command {
    let mut cmd = fleetd()
        .env("FLEET_STATE_DIR", state_dir)
        .env("FLEET_LISTEN_ADDR", format!("127.0.0.1:{port}"))
        .env("MANAGER_API_KEY", API_KEY)
        .env("MANAGER_HMAC_SECRET", HMAC_SECRET)
        .env("ENCRYPTION_KEY", ENCRYPTION_KEY)
        .env("FLEET_WORKER_BIN", binary_path("fleet-worker"))
        .env("FLEET_READY_TIMEOUT_MS", "5000")
        .env("FLEET_SHUTDOWN_GRACE_MS", "2000")
        .command();
    cmd.stdin(Stdio::null());
    cmd
}
