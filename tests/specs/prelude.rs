//! Test helpers for behavioral specifications.
//!
//! Session fixtures on top of the fake broker, plus a small builder for
//! running the `rh` binary.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::sync::Arc;
pub use std::time::Duration;

pub use rh_adapters::{BrokerTarget, FakeConnector, FakeProgram};
pub use rh_core::{HostStartupInfo, PromptContext, SessionId, SourceLocation};
pub use rh_engine::{
    DebugOptions, DebugSession, Nesting, NoOpCallbacks, Session, SessionError, SessionOptions,
    SessionProvider, SessionState,
};
pub use serde_json::{json, Value};

// Spec timeouts
pub const SPEC_WAIT_MAX: Duration = Duration::from_secs(5);
const CLI_TIMEOUT: Duration = Duration::from_secs(30);

// -- Sessions ----------------------------------------------------------------

pub fn options() -> SessionOptions {
    SessionOptions {
        start_timeout: SPEC_WAIT_MAX,
        stop_grace: Duration::from_millis(200),
        event_capacity: 256,
    }
}

pub fn startup() -> HostStartupInfo {
    HostStartupInfo::new("spec", "/usr/lib/R/bin/R")
}

/// Fail the spec instead of hanging.
pub async fn within<F: Future>(fut: F) -> F::Output {
    tokio::time::timeout(SPEC_WAIT_MAX, fut)
        .await
        .expect("spec timed out")
}

/// Provider pointed at the fake `local` broker.
pub async fn provider(connector: FakeConnector) -> SessionProvider<FakeConnector> {
    let provider = SessionProvider::with_options(connector, options());
    assert!(
        provider
            .try_switch_broker(BrokerTarget::local(), None)
            .await
    );
    provider
}

pub async fn start(session: &Session) {
    session
        .start_host(startup(), Arc::new(NoOpCallbacks), SPEC_WAIT_MAX, None)
        .await
        .unwrap();
}

/// A running session backed by the scripted interpreter.
pub async fn running(program: FakeProgram) -> (SessionProvider<FakeConnector>, Session) {
    let provider = provider(FakeConnector::with_program(program)).await;
    let session = provider.get_or_create(SessionId::new_v4()).unwrap();
    start(&session).await;
    (provider, session)
}

/// Source `file` at the top-level prompt in the background.
pub fn source(
    session: &Session,
    file: &str,
) -> tokio::task::JoinHandle<Result<Value, SessionError>> {
    let session = session.clone();
    let code = format!("source('{file}')");
    tokio::spawn(async move { session.evaluate(&code, Nesting::TopLevel, None).await })
}

// -- CLI -----------------------------------------------------------------------

/// Returns the path to a binary, checking llvm-cov target directory first.
/// Falls back to resolving relative to the test binary itself.
fn binary_path(name: &str) -> PathBuf {
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

pub fn rh_binary() -> PathBuf {
    binary_path("rh")
}

/// Create a CLI builder for rh commands
pub fn cli() -> CliBuilder {
    CliBuilder::new()
}

/// High-level CLI builder for fluent test assertions
pub struct CliBuilder {
    args: Vec<String>,
    envs: Vec<(String, String)>,
}

impl CliBuilder {
    fn new() -> Self {
        Self {
            args: Vec::new(),
            envs: vec![("RH_LOG".into(), "warn".into())],
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

    fn command(self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::Command::new(rh_binary());
        cmd.args(&self.args).timeout(CLI_TIMEOUT).write_stdin("");
        // a parent RH_INTERPRETER would satisfy --interpreter
        cmd.env_remove("RH_INTERPRETER");
        for (key, value) in self.envs {
            cmd.env(key, value);
        }
        cmd
    }

    /// Run and expect success (exit code 0)
    pub fn passes(self) -> RunAssert {
        let output = self.command().assert().success().get_output().clone();
        RunAssert { output }
    }

    /// Run and expect failure (non-zero exit code)
    pub fn fails(self) -> RunAssert {
        let output = self.command().assert().failure().get_output().clone();
        RunAssert { output }
    }
}

/// Result of a CLI run for chaining assertions
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

    pub fn code(self, expected: i32) -> Self {
        assert_eq!(self.output.status.code(), Some(expected), "{}", self.stderr());
        self
    }

    pub fn stdout_has(self, expected: &str) -> Self {
        let stdout = self.stdout();
        assert!(
            stdout.contains(expected),
            "stdout does not contain {expected:?}:\n{stdout}"
        );
        self
    }

    pub fn stderr_has(self, expected: &str) -> Self {
        let stderr = self.stderr();
        assert!(
            stderr.contains(expected),
            "stderr does not contain {expected:?}:\n{stderr}"
        );
        self
    }
}
