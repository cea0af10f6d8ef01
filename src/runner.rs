//! Test runner: evaluates a submission against every test case of a problem.
//!
//! Cases run strictly in declared order, one at a time. Every case yields
//! exactly one verdict, so the report always has as many verdicts as the
//! problem has test cases. Failures of any kind are contained to the case
//! they occur in and logged; only the verdict leaves this module.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Number, Value};
use tracing::{debug, info, instrument, warn};

use crate::domain::{Problem, Submission, Verdict};
use crate::sandbox::{EntryPoint, ExecOutcome, Executor};
use crate::util::{is_js_identifier, top_level_functions};

/// Ordered verdicts plus the summary the front-end shows.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct RunReport {
  pub verdicts: Vec<Verdict>,
  pub passed: usize,
  pub total: usize,
  /// Every non-passing case as (index, verdict), in order.
  pub failed: Vec<FailedCase>,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct FailedCase {
  pub index: usize,
  pub verdict: Verdict,
}

impl RunReport {
  pub fn from_verdicts(verdicts: Vec<Verdict>) -> Self {
    let passed = verdicts.iter().filter(|v| **v == Verdict::Passed).count();
    let failed = verdicts
      .iter()
      .enumerate()
      .filter(|(_, v)| **v != Verdict::Passed)
      .map(|(index, verdict)| FailedCase { index, verdict: *verdict })
      .collect();
    Self { total: verdicts.len(), passed, failed, verdicts }
  }
}

/// Normalise a JSON value so that values `JSON.stringify` would print
/// identically compare equal. Every number goes through f64 first, as in JS,
/// so integers past 2^53 round the same way; integral results then become
/// integers and `-0` becomes `0`. Object key order is already irrelevant to
/// `Value` equality.
pub fn canonicalize(value: Value) -> Value {
  match value {
    Value::Number(n) => Value::Number(canonical_number(n)),
    Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
    Value::Object(map) => Value::Object(map.into_iter().map(|(k, v)| (k, canonicalize(v))).collect()),
    other => other,
  }
}

const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;
const TWO_POW_64: f64 = 18_446_744_073_709_551_616.0;

fn canonical_number(n: Number) -> Number {
  let Some(f) = n.as_f64() else {
    return n;
  };
  if f.fract() != 0.0 {
    return Number::from_f64(f).unwrap_or(n);
  }
  if (-TWO_POW_63..TWO_POW_63).contains(&f) {
    Number::from(f as i64)
  } else if (0.0..TWO_POW_64).contains(&f) {
    Number::from(f as u64)
  } else {
    Number::from_f64(f).unwrap_or(n)
  }
}

/// Decide which function to call:
///   1. the submission's `entryPoint`,
///   2. the problem's default,
///   3. the last top-level function the source declares,
///   4. otherwise the whole source is a function expression.
pub fn resolve_entry_point(problem: &Problem, submission: &Submission) -> Result<EntryPoint, String> {
  let named = submission
    .entry_point
    .as_deref()
    .or(problem.entry_point.as_deref())
    .map(str::trim)
    .filter(|s| !s.is_empty());
  match named {
    Some(name) if is_js_identifier(name) => Ok(EntryPoint::Named(name.to_string())),
    Some(name) => Err(format!("not a JavaScript identifier: {name:?}")),
    None => Ok(match top_level_functions(&submission.source).pop() {
      Some(name) => EntryPoint::Named(name),
      None => EntryPoint::Expression,
    }),
  }
}

#[derive(Clone)]
pub struct TestRunner {
  executor: Arc<dyn Executor>,
}

impl TestRunner {
  pub fn new(executor: Arc<dyn Executor>) -> Self {
    Self { executor }
  }

  #[instrument(level = "info", skip(self, problem, submission), fields(problem = %problem.id, cases = problem.test_cases.len(), source_len = submission.source.len()))]
  pub async fn run(&self, problem: &Problem, submission: &Submission) -> RunReport {
    let entry = match resolve_entry_point(problem, submission) {
      Ok(e) => e,
      Err(e) => {
        warn!(target: "runner", problem = %problem.id, error = %e, "Unusable entry point; every case errors");
        return RunReport::from_verdicts(vec![Verdict::Error; problem.test_cases.len()]);
      }
    };

    let mut verdicts = Vec::with_capacity(problem.test_cases.len());
    for (index, tc) in problem.test_cases.iter().enumerate() {
      let verdict = self.run_case(index, &submission.source, &entry, &tc.input, &tc.expected_output).await;
      debug!(target: "runner", problem = %problem.id, index, ?verdict, "Case evaluated");
      verdicts.push(verdict);
    }

    let report = RunReport::from_verdicts(verdicts);
    info!(target: "runner", problem = %problem.id, passed = report.passed, total = report.total, "Submission evaluated");
    report
  }

  async fn run_case(&self, index: usize, source: &str, entry: &EntryPoint, input: &str, expected: &str) -> Verdict {
    let input: Value = match serde_json::from_str(input) {
      Ok(v) => v,
      Err(e) => {
        warn!(target: "runner", index, error = %e, "Malformed test input");
        return Verdict::Error;
      }
    };
    let expected: Value = match serde_json::from_str(expected) {
      Ok(v) => canonicalize(v),
      Err(e) => {
        warn!(target: "runner", index, error = %e, "Malformed expected output");
        return Verdict::Error;
      }
    };

    match self.executor.execute(source, entry, &input).await {
      Ok(ExecOutcome::Returned(actual)) => {
        if canonicalize(actual) == expected { Verdict::Passed } else { Verdict::Failed }
      }
      // No expected output can be `undefined`, so this never matches.
      Ok(ExecOutcome::Undefined) => Verdict::Failed,
      Ok(ExecOutcome::Threw(msg)) => {
        warn!(target: "runner", index, error = %crate::util::trunc_for_log(&msg, 300), "User code threw");
        Verdict::Error
      }
      Ok(ExecOutcome::Crashed(msg)) => {
        warn!(target: "runner", index, error = %crate::util::trunc_for_log(&msg, 300), "User code crashed");
        Verdict::Error
      }
      Ok(ExecOutcome::TimedOut) => {
        warn!(target: "runner", index, "User code timed out");
        Verdict::Error
      }
      Err(e) => {
        warn!(target: "runner", index, error = %e, "Sandbox failure");
        Verdict::Error
      }
    }
  }
}

#[cfg(test)]
pub(crate) mod fake {
  //! Scripted executor for tests that must not depend on a `node` binary.

  use std::sync::Mutex;

  use super::*;
  use crate::sandbox::SandboxError;

  pub type Script = dyn Fn(&str, &EntryPoint, &Value) -> Result<ExecOutcome, SandboxError> + Send + Sync;

  pub struct FakeExecutor {
    script: Box<Script>,
    pub calls: Mutex<Vec<(EntryPoint, Value)>>,
  }

  impl FakeExecutor {
    pub fn new(
      script: impl Fn(&str, &EntryPoint, &Value) -> Result<ExecOutcome, SandboxError> + Send + Sync + 'static,
    ) -> Self {
      Self { script: Box::new(script), calls: Mutex::new(Vec::new()) }
    }

    /// Behaves like `function add(x){ return x.a + x.b; }` for numeric inputs,
    /// like `sub` when the source contains "-", and throws for "throw".
    pub fn arithmetic() -> Self {
      Self::new(|source, _entry, input| {
        if source.contains("throw") {
          return Ok(ExecOutcome::Threw("Error: boom".into()));
        }
        let a = input["a"].as_f64().unwrap_or(0.0);
        let b = input["b"].as_f64().unwrap_or(0.0);
        let r = if source.contains('-') { a - b } else { a + b };
        Ok(ExecOutcome::Returned(serde_json::json!(r)))
      })
    }
  }

  #[async_trait::async_trait]
  impl Executor for FakeExecutor {
    async fn execute(&self, source: &str, entry: &EntryPoint, input: &Value) -> Result<ExecOutcome, SandboxError> {
      self.calls.lock().unwrap().push((entry.clone(), input.clone()));
      (self.script)(source, entry, input)
    }
  }
}
