//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Loading a problem by id
//!   - Evaluating a submission against a problem's test cases
//!   - Requesting a hint for a problem and the current code

use tracing::{error, instrument};

use crate::domain::{Problem, Submission};
use crate::hint::HintError;
use crate::runner::RunReport;
use crate::state::AppState;

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn load_problem(state: &AppState, id: &str) -> Result<Problem, crate::store::LoadError> {
  state.loader.load(id).await
}

#[instrument(level = "info", skip(state, problem, submission), fields(problem = %problem.id))]
pub async fn submit_solution(state: &AppState, problem: &Problem, submission: &Submission) -> RunReport {
  state.runner.run(problem, submission).await
}

#[instrument(level = "info", skip(state, problem, code, prompt), fields(problem = %problem.id, code_len = code.len(), prompt_len = prompt.len()))]
pub async fn request_hint(state: &AppState, problem: &Problem, code: &str, prompt: &str) -> Result<String, HintError> {
  let Some(client) = &state.hints else {
    error!(target: "hints", problem = %problem.id, "Hint requested but no hint endpoint is configured");
    return Err(HintError::Unavailable);
  };
  client
    .request_hint(&problem.description, code, prompt)
    .await
    .map_err(|e| {
      error!(target: "hints", problem = %problem.id, error = %e, "Error fetching AI hint");
      e
    })
}
