//! Minimal client for the external AI-hint endpoint.
//!
//! One POST per request carrying the problem description, the current code,
//! and the user's prompt. The reply is a JSON object holding the hint text in
//! a single field. Calls are instrumented and log sizes and latencies, never
//! the code or the hint itself.

use std::{collections::BTreeMap, time::Duration};

use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, instrument};

use crate::config::HintConfig;

#[derive(Debug, Error)]
pub enum HintError {
  #[error("hint endpoint not configured")]
  Unavailable,
  #[error("hint request failed: {0}")]
  Transport(#[from] reqwest::Error),
  #[error("hint endpoint returned HTTP {0}")]
  Status(reqwest::StatusCode),
  #[error("hint response is not JSON: {0}")]
  Decode(String),
  #[error("hint response has no string field {0:?}")]
  MissingField(String),
}

#[derive(Serialize)]
struct AskRequest<'a> {
  question: &'a str,
  dict_of_vars: BTreeMap<&'static str, &'a str>,
  prompt: &'a str,
}

#[derive(Clone)]
pub struct HintClient {
  client: reqwest::Client,
  pub url: String,
  response_field: String,
}

impl HintClient {
  /// Build the client if a base URL is configured; otherwise `Ok(None)`.
  pub fn from_config(cfg: &HintConfig) -> Result<Option<Self>, HintError> {
    let Some(base) = cfg.base_url.as_deref() else {
      return Ok(None);
    };
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(cfg.timeout_secs))
      .build()?;
    let url = format!("{}/{}", base.trim_end_matches('/'), cfg.path.trim_start_matches('/'));
    Ok(Some(Self { client, url, response_field: cfg.response_field.clone() }))
  }

  #[instrument(level = "info", skip(self, description, code, prompt), fields(url = %self.url, desc_len = description.len(), code_len = code.len(), prompt_len = prompt.len()))]
  pub async fn request_hint(&self, description: &str, code: &str, prompt: &str) -> Result<String, HintError> {
    let body = AskRequest {
      question: description,
      dict_of_vars: BTreeMap::from([("code", code)]),
      prompt,
    };

    let start = std::time::Instant::now();
    let res = self
      .client
      .post(&self.url)
      .header(USER_AGENT, "codejudge-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .json(&body)
      .send()
      .await?;

    let status = res.status();
    if !status.is_success() {
      error!(target: "hints", %status, elapsed = ?start.elapsed(), "Hint endpoint rejected request");
      return Err(HintError::Status(status));
    }

    let bytes = res.bytes().await?;
    let value: Value = serde_json::from_slice(&bytes).map_err(|e| HintError::Decode(e.to_string()))?;
    let text = value
      .get(&self.response_field)
      .and_then(Value::as_str)
      .ok_or_else(|| HintError::MissingField(self.response_field.clone()))?;

    info!(target: "hints", elapsed = ?start.elapsed(), hint_len = text.len(), "Hint received");
    Ok(text.to_string())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::{http::StatusCode, routing::post, Json, Router};
  use serde_json::json;
  use std::sync::{Arc, Mutex};

  /// Serve `app` on an ephemeral local port and return its base URL.
  async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
  }

  fn client_for(base: String) -> HintClient {
    let cfg = HintConfig { base_url: Some(base), ..HintConfig::default() };
    HintClient::from_config(&cfg).unwrap().unwrap()
  }

  #[test]
  fn no_base_url_means_no_client() {
    assert!(HintClient::from_config(&HintConfig::default()).unwrap().is_none());
  }

  #[test]
  fn url_joins_base_and_path() {
    let c = client_for("http://hints.local/".into());
    assert_eq!(c.url, "http://hints.local/api/ask");
  }

  #[tokio::test]
  async fn returns_data_field_and_sends_expected_body() {
    let seen = Arc::new(Mutex::new(None::<Value>));
    let seen_in = seen.clone();
    let app = Router::new().route(
      "/api/ask",
      post(move |Json(body): Json<Value>| {
        let seen_in = seen_in.clone();
        async move {
          *seen_in.lock().unwrap() = Some(body);
          Json(json!({"data": "Use a running total."}))
        }
      }),
    );
    let client = client_for(serve(app).await);

    let hint = client.request_hint("Sum a list", "function f(){}", "where do I start?").await.unwrap();
    assert_eq!(hint, "Use a running total.");

    let body = seen.lock().unwrap().clone().unwrap();
    assert_eq!(
      body,
      json!({
        "question": "Sum a list",
        "dict_of_vars": {"code": "function f(){}"},
        "prompt": "where do I start?"
      })
    );
  }

  #[tokio::test]
  async fn non_success_status_is_an_error() {
    let app = Router::new().route("/api/ask", post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "down") }));
    let client = client_for(serve(app).await);
    let err = client.request_hint("d", "c", "p").await.unwrap_err();
    assert!(matches!(err, HintError::Status(s) if s == reqwest::StatusCode::INTERNAL_SERVER_ERROR));
  }

  #[tokio::test]
  async fn missing_field_is_an_error() {
    let app = Router::new().route("/api/ask", post(|| async { Json(json!({"answer": "nope"})) }));
    let client = client_for(serve(app).await);
    let err = client.request_hint("d", "c", "p").await.unwrap_err();
    assert!(matches!(err, HintError::MissingField(ref f) if f == "data"));
  }

  #[tokio::test]
  async fn non_json_body_is_a_decode_error() {
    let app = Router::new().route("/api/ask", post(|| async { "plain text" }));
    let client = client_for(serve(app).await);
    let err = client.request_hint("d", "c", "p").await.unwrap_err();
    assert!(matches!(err, HintError::Decode(_)));
  }
}
