//! One viewer's session: the loaded problem and the hint panel.
//!
//! A session lives as long as its WebSocket connection. Messages are handled
//! one at a time, so a hint reply can never land after a newer one.

use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{HintState, Problem, Submission};
use crate::logic::{load_problem, request_hint, submit_solution};
use crate::runner::RunReport;
use crate::state::AppState;

pub struct ViewSession {
  pub id: Uuid,
  problem: Option<Problem>,
  hints: HintState,
}

impl Default for ViewSession {
  fn default() -> Self { Self::new() }
}

impl ViewSession {
  pub fn new() -> Self {
    Self { id: Uuid::new_v4(), problem: None, hints: HintState::default() }
  }

  pub fn problem(&self) -> Option<&Problem> { self.problem.as_ref() }
  pub fn hints(&self) -> &HintState { &self.hints }

  /// Replace the loaded problem. On failure the previous one (if any) stays.
  pub async fn load(&mut self, state: &AppState, id: &str) -> Option<&Problem> {
    match load_problem(state, id).await {
      Ok(p) => {
        info!(target: "codejudge_backend", session = %self.id, problem = %p.id, "Session problem loaded");
        self.problem = Some(p);
        self.problem.as_ref()
      }
      Err(e) => {
        warn!(target: "codejudge_backend", session = %self.id, %id, error = %e, "Session problem unavailable");
        None
      }
    }
  }

  /// Evaluate against the loaded problem; `None` when nothing is loaded.
  pub async fn submit(&self, state: &AppState, submission: &Submission) -> Option<RunReport> {
    let problem = self.problem.as_ref()?;
    Some(submit_solution(state, problem, submission).await)
  }

  pub fn toggle_hints(&mut self) -> bool {
    self.hints.toggle()
  }

  /// Ask for a hint. A no-op (returns false) when hints are disabled or no
  /// problem is loaded.
  pub async fn ask_hint(&mut self, state: &AppState, code: &str, prompt: &str) -> bool {
    let Some(problem) = self.problem.as_ref() else {
      return false;
    };
    if !self.hints.begin() {
      return false;
    }
    let result = request_hint(state, problem, code, prompt).await;
    self.hints.finish(result);
    true
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::AppConfig;
  use crate::domain::{HintPhase, Verdict, FAILED_HINT_MESSAGE};
  use crate::runner::fake::FakeExecutor;
  use std::sync::Arc;

  fn state() -> AppState {
    AppState::with_executor(AppConfig::default(), Arc::new(FakeExecutor::arithmetic()))
  }

  #[tokio::test]
  async fn submit_requires_loaded_problem() {
    let st = state();
    let mut s = ViewSession::new();
    let sub = Submission { source: "function add(x){ return x.a + x.b; }".into(), entry_point: None };
    assert!(s.submit(&st, &sub).await.is_none());

    assert!(s.load(&st, "sum-pair").await.is_some());
    let report = s.submit(&st, &sub).await.unwrap();
    assert_eq!(report.total, 3);
    assert_eq!(report.verdicts, vec![Verdict::Passed; 3]);
  }

  #[tokio::test]
  async fn failed_load_keeps_previous_problem() {
    let st = state();
    let mut s = ViewSession::new();
    s.load(&st, "sum-pair").await;
    assert!(s.load(&st, "no-such-problem").await.is_none());
    assert_eq!(s.problem().map(|p| p.id.as_str()), Some("sum-pair"));
  }

  #[tokio::test]
  async fn hints_need_toggle_and_problem() {
    let st = state();
    let mut s = ViewSession::new();
    s.toggle_hints();
    assert!(!s.ask_hint(&st, "code", "help").await, "no problem loaded yet");

    s.load(&st, "sum-pair").await;
    s.toggle_hints();
    assert!(!s.ask_hint(&st, "code", "help").await, "hints disabled");

    s.toggle_hints();
    // No endpoint configured, so the request fails with the fixed message.
    assert!(s.ask_hint(&st, "code", "help").await);
    assert_eq!(s.hints().hint(), Some(FAILED_HINT_MESSAGE));
    assert_eq!(s.hints().phase(), HintPhase::Failed);
  }
}
