//! Process-level containment for untrusted JavaScript.
//!
//! The `Executor` knows HOW to run a function once on one input and report
//! what came back. It does not compare against expected outputs; that is
//! the runner's job.
//!
//! `NodeSandbox` runs each invocation in a fresh `node` child process inside
//! a throwaway directory, with a cleared environment, a V8 heap cap, a wall
//! clock timeout, an output cap, and a global limit on concurrent children.
//! The child is killed if the run is abandoned.
//!
//! This bounds time, memory and output. It is not a filesystem or network
//! jail: the child runs with the server's user and can use `require`. Set
//! `runner.restrict_fs` to add Node's permission model (reads limited to the
//! run directory, no writes, no child processes), or run the service itself
//! inside a container.

use std::{process::Stdio, sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tokio::{
  io::{AsyncReadExt, AsyncWriteExt},
  process::Command,
  sync::Semaphore,
};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::config::RunnerConfig;

/// Name bound to a source that is a bare function expression.
pub const EXPRESSION_BINDING: &str = "__solution__";

/// Which function a run should call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntryPoint {
  /// A function the source declares under this name.
  Named(String),
  /// The whole source is a function expression.
  Expression,
}

impl EntryPoint {
  pub fn binding(&self) -> &str {
    match self {
      EntryPoint::Named(name) => name,
      EntryPoint::Expression => EXPRESSION_BINDING,
    }
  }
}

/// What a single invocation produced.
#[derive(Clone, Debug, PartialEq)]
pub enum ExecOutcome {
  /// The function returned a JSON-representable value.
  Returned(Value),
  /// The function returned something `JSON.stringify` drops (e.g. `undefined`).
  Undefined,
  /// The function (or serialising its result) threw.
  Threw(String),
  /// The process died without reporting a result (syntax error, exit, OOM).
  Crashed(String),
  TimedOut,
}

#[derive(Debug, Error)]
pub enum SandboxError {
  #[error("failed to spawn {program}: {source}")]
  Spawn { program: String, source: std::io::Error },
  #[error("sandbox I/O: {0}")]
  Io(#[from] std::io::Error),
  #[error("output exceeded {0} bytes")]
  OutputTooLarge(usize),
  #[error("unreadable harness output: {0}")]
  Protocol(String),
}

#[async_trait]
pub trait Executor: Send + Sync {
  async fn execute(
    &self,
    source: &str,
    entry: &EntryPoint,
    input: &Value,
  ) -> Result<ExecOutcome, SandboxError>;
}

#[derive(Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum Envelope {
  Returned { value: Value },
  Undefined,
  Threw { message: String },
  Harness { message: String },
}

/// Build the script file: user source, then a harness that reads the input
/// from stdin, calls the entry point once, and prints one marker-prefixed
/// JSON envelope on its own line.
fn build_script(source: &str, entry: &EntryPoint, marker: &str) -> String {
  let body = match entry {
    EntryPoint::Named(_) => source.to_string(),
    EntryPoint::Expression => {
      let expr = source.trim_end_matches(|c: char| c == ';' || c.is_whitespace());
      format!("const {EXPRESSION_BINDING} = (\n{expr}\n);")
    }
  };
  let binding = entry.binding();
  format!(
    r#"{body}
;(function (__entry) {{
  const __emit = (raw) => process.stdout.write("\n{marker}" + raw + "\n");
  let __input;
  try {{
    __input = JSON.parse(require("fs").readFileSync(0, "utf8"));
  }} catch (e) {{
    __emit(JSON.stringify({{ status: "harness", message: String(e) }}));
    return;
  }}
  try {{
    if (typeof __entry !== "function") {{
      throw new TypeError("{binding} is not a function");
    }}
    const text = JSON.stringify(__entry(__input));
    if (text === undefined) {{
      __emit('{{"status":"undefined"}}');
    }} else {{
      __emit('{{"status":"returned","value":' + text + '}}');
    }}
  }} catch (e) {{
    __emit(JSON.stringify({{ status: "threw", message: String(e && e.stack ? e.stack : e) }}));
  }}
}})(typeof {binding} === "undefined" ? undefined : {binding});
"#
  )
}

/// Find the last envelope line in stdout; user output before it is ignored.
fn parse_envelope(stdout: &str, marker: &str) -> Option<Result<Envelope, serde_json::Error>> {
  stdout
    .lines()
    .rev()
    .find_map(|line| line.strip_prefix(marker))
    .map(serde_json::from_str::<Envelope>)
}

fn tail(bytes: &[u8], max: usize) -> String {
  let s = String::from_utf8_lossy(bytes);
  let s = s.trim();
  match s.char_indices().rev().nth(max) {
    Some((i, _)) => format!("…{}", &s[i..]),
    None => s.to_string(),
  }
}

#[derive(Clone)]
pub struct NodeSandbox {
  cfg: RunnerConfig,
  permits: Arc<Semaphore>,
}

impl NodeSandbox {
  pub fn new(cfg: RunnerConfig) -> Self {
    let permits = Arc::new(Semaphore::new(cfg.max_parallel_runs.max(1)));
    Self { cfg, permits }
  }

  fn command(&self, dir: &std::path::Path, script: &std::path::Path) -> Command {
    let mut cmd = Command::new(&self.cfg.node_binary);
    cmd.arg(format!("--max-old-space-size={}", self.cfg.memory_limit_mb))
      .args(&self.cfg.node_args);
    if self.cfg.restrict_fs {
      cmd.arg("--experimental-permission").arg(format!("--allow-fs-read={}", dir.display()));
    }
    cmd.arg(script)
      .current_dir(dir)
      .env_clear()
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true);
    if let Some(path) = std::env::var_os("PATH") {
      cmd.env("PATH", path);
    }
    cmd
  }
}

#[async_trait]
impl Executor for NodeSandbox {
  #[instrument(level = "debug", skip(self, source, input), fields(source_len = source.len(), entry = %entry.binding()))]
  async fn execute(
    &self,
    source: &str,
    entry: &EntryPoint,
    input: &Value,
  ) -> Result<ExecOutcome, SandboxError> {
    let _permit = self
      .permits
      .acquire()
      .await
      .map_err(|e| SandboxError::Protocol(e.to_string()))?;

    let dir = tempfile::tempdir()?;
    let marker = format!("@@result-{}@@", Uuid::new_v4().simple());
    let script_path = dir.path().join("solution.js");
    tokio::fs::write(&script_path, build_script(source, entry, &marker)).await?;
    let stdin_bytes = serde_json::to_vec(input).map_err(|e| SandboxError::Protocol(e.to_string()))?;

    let mut child = self
      .command(dir.path(), &script_path)
      .spawn()
      .map_err(|source| SandboxError::Spawn { program: self.cfg.node_binary.clone(), source })?;

    let (Some(mut stdin), Some(stdout), Some(stderr)) =
      (child.stdin.take(), child.stdout.take(), child.stderr.take())
    else {
      return Err(SandboxError::Protocol("child pipes unavailable".into()));
    };

    // One byte past the cap tells us the cap was hit.
    let cap = self.cfg.max_output_bytes as u64 + 1;
    let feed = async move {
      // A child that exits without reading stdin closes the pipe; not our error.
      let _ = stdin.write_all(&stdin_bytes).await;
      let _ = stdin.shutdown().await;
    };
    let read_out = async move {
      let mut buf = Vec::new();
      stdout.take(cap).read_to_end(&mut buf).await.map(|_| buf)
    };
    let read_err = async move {
      let mut buf = Vec::new();
      stderr.take(cap).read_to_end(&mut buf).await.map(|_| buf)
    };

    let limit = Duration::from_millis(self.cfg.timeout_ms);
    let finished = tokio::time::timeout(limit, async {
      let (_, out, err, status) = tokio::join!(feed, read_out, read_err, child.wait());
      (out, err, status)
    })
    .await;

    let (out, err, status) = match finished {
      Ok(parts) => parts,
      Err(_) => {
        warn!(target: "runner", timeout_ms = self.cfg.timeout_ms, "Run timed out; killing child");
        let _ = child.kill().await;
        return Ok(ExecOutcome::TimedOut);
      }
    };
    let (out, err, status) = (out?, err?, status?);

    if out.len() > self.cfg.max_output_bytes {
      return Err(SandboxError::OutputTooLarge(self.cfg.max_output_bytes));
    }
    debug!(target: "runner", exit = ?status.code(), stdout_len = out.len(), stderr_len = err.len(), "Child finished");

    let stdout = String::from_utf8_lossy(&out);
    match parse_envelope(&stdout, &marker) {
      Some(Ok(Envelope::Returned { value })) => Ok(ExecOutcome::Returned(value)),
      Some(Ok(Envelope::Undefined)) => Ok(ExecOutcome::Undefined),
      Some(Ok(Envelope::Threw { message })) => Ok(ExecOutcome::Threw(message)),
      Some(Ok(Envelope::Harness { message })) => Err(SandboxError::Protocol(message)),
      Some(Err(e)) => Err(SandboxError::Protocol(e.to_string())),
      None => Ok(ExecOutcome::Crashed(format!("exit {:?}: {}", status.code(), tail(&err, 400)))),
    }
  }
}

/// True if a `node` binary is on PATH; Node-backed tests skip otherwise.
#[cfg(test)]
pub(crate) async fn node_available() -> bool {
  Command::new("node")
    .arg("--version")
    .stdout(Stdio::null())
    .stderr(Stdio::null())
    .status()
    .await
    .map(|s| s.success())
    .unwrap_or(false)
}
