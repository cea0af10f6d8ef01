//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;
use axum::{extract::{Path, State}, http::StatusCode, Json, response::{IntoResponse, Response}};
use tracing::{info, instrument};

use crate::domain::{HintState, Problem, Submission, FAILED_HINT_MESSAGE};
use crate::logic::*;
use crate::protocol::*;
use crate::state::AppState;
use crate::store::LoadError;

fn load_error_response(e: LoadError) -> Response {
  let status = match e {
    LoadError::NotFound(_) => StatusCode::NOT_FOUND,
    LoadError::Store(_) => StatusCode::BAD_GATEWAY,
  };
  (status, Json(ErrorOut { error: e.to_string() })).into_response()
}

async fn problem_or_response(state: &AppState, id: &str) -> Result<Problem, Response> {
  load_problem(state, id).await.map_err(load_error_response)
}

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state))]
pub async fn http_get_problem(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Response {
  match problem_or_response(&state, &id).await {
    Ok(problem) => Json(problem).into_response(),
    Err(res) => res,
  }
}

#[instrument(level = "info", skip(state, body), fields(source_len = body.source.len()))]
pub async fn http_post_submit(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<SubmitIn>,
) -> Response {
  let problem = match problem_or_response(&state, &id).await {
    Ok(p) => p,
    Err(res) => return res,
  };
  let submission = Submission { source: body.source, entry_point: body.entry_point };
  let report = submit_solution(&state, &problem, &submission).await;
  info!(target: "runner", %id, passed = report.passed, total = report.total, "HTTP submission evaluated");
  Json(report).into_response()
}

/// Stateless hint request: calling it is the same as having hints enabled.
#[instrument(level = "info", skip(state, body), fields(code_len = body.code.len(), prompt_len = body.prompt.len()))]
pub async fn http_post_hint(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<HintIn>,
) -> Response {
  let problem = match problem_or_response(&state, &id).await {
    Ok(p) => p,
    Err(res) => return res,
  };
  let mut hints = HintState::default();
  hints.toggle();
  hints.begin();
  hints.finish(request_hint(&state, &problem, &body.code, &body.prompt).await);
  info!(target: "hints", %id, phase = ?hints.phase(), "HTTP hint served");
  Json(HintOut {
    text: hints.hint().unwrap_or(FAILED_HINT_MESSAGE).to_string(),
    phase: hints.phase(),
  })
  .into_response()
}
