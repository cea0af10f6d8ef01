//! Service configuration: an optional TOML file plus environment overrides.
//!
//! See `AppConfig` for the file schema. Every section is optional.

use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info};

use crate::domain::TestCase;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read {path}: {source}")]
  Io { path: String, source: std::io::Error },
  #[error("failed to parse {path}: {source}")]
  Parse { path: String, source: toml::de::Error },
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub server: ServerConfig,
  #[serde(default)]
  pub runner: RunnerConfig,
  #[serde(default)]
  pub hints: HintConfig,
  #[serde(default)]
  pub storage: StorageConfig,
  #[serde(default)]
  pub problems: Vec<ProblemCfg>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub port: u16,
  pub static_dir: PathBuf,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self { port: 3000, static_dir: PathBuf::from("./static") }
  }
}

/// Limits applied to every sandboxed run.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
  pub node_binary: String,
  pub node_args: Vec<String>,
  pub timeout_ms: u64,
  pub memory_limit_mb: u32,
  pub max_output_bytes: usize,
  pub max_parallel_runs: usize,
  /// Run node under its permission model: reads only from the run directory.
  pub restrict_fs: bool,
}

impl Default for RunnerConfig {
  fn default() -> Self {
    Self {
      node_binary: "node".into(),
      node_args: vec!["--disallow-code-generation-from-strings".into()],
      timeout_ms: 2_000,
      memory_limit_mb: 128,
      max_output_bytes: 64 * 1024,
      max_parallel_runs: 4,
      restrict_fs: false,
    }
  }
}

/// Hint endpoint settings. Without `base_url` the hint feature is unavailable.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct HintConfig {
  pub base_url: Option<String>,
  pub path: String,
  pub response_field: String,
  pub timeout_secs: u64,
}

impl Default for HintConfig {
  fn default() -> Self {
    Self {
      base_url: None,
      path: "/api/ask".into(),
      response_field: "data".into(),
      timeout_secs: 30,
    }
  }
}

#[derive(Clone, Debug, Deserialize, Default)]
#[serde(default)]
pub struct StorageConfig {
  /// Directory of `<id>.json` problem documents.
  pub problems_dir: Option<PathBuf>,
}

/// Problem entry accepted in the TOML bank.
#[derive(Clone, Debug, Deserialize)]
pub struct ProblemCfg {
  pub id: String,
  pub title: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub entry_point: Option<String>,
  #[serde(default)]
  pub test_cases: Vec<TestCase>,
}

impl AppConfig {
  pub fn from_toml_str(path: &str, s: &str) -> Result<Self, ConfigError> {
    toml::from_str(s).map_err(|source| ConfigError::Parse { path: path.to_string(), source })
  }

  pub fn load(path: &str) -> Result<Self, ConfigError> {
    let s = std::fs::read_to_string(path)
      .map_err(|source| ConfigError::Io { path: path.to_string(), source })?;
    Self::from_toml_str(path, &s)
  }

  /// Apply environment overrides on top of file values.
  pub fn apply_env<F>(&mut self, var: F)
  where
    F: Fn(&str) -> Option<String>,
  {
    if let Some(port) = var("PORT").and_then(|p| p.parse::<u16>().ok()) {
      self.server.port = port;
    }
    if let Some(dir) = var("STATIC_DIR") {
      self.server.static_dir = PathBuf::from(dir);
    }
    if let Some(url) = var("HINT_API_URL").filter(|u| !u.trim().is_empty()) {
      self.hints.base_url = Some(url);
    }
    if let Some(dir) = var("PROBLEMS_DIR") {
      self.storage.problems_dir = Some(PathBuf::from(dir));
    }
    if let Some(bin) = var("NODE_BINARY") {
      self.runner.node_binary = bin;
    }
  }
}

/// Load config from APP_CONFIG_PATH (if set), then apply env overrides.
/// File errors are logged and defaults are used instead.
pub fn load_app_config_from_env() -> AppConfig {
  let mut cfg = match std::env::var("APP_CONFIG_PATH") {
    Ok(path) => match AppConfig::load(&path) {
      Ok(cfg) => {
        info!(target: "codejudge_backend", %path, problems = cfg.problems.len(), "Loaded config (TOML)");
        cfg
      }
      Err(e) => {
        error!(target: "codejudge_backend", %path, error = %e, "Config unusable; using defaults");
        AppConfig::default()
      }
    },
    Err(_) => AppConfig::default(),
  };
  cfg.apply_env(|k| std::env::var(k).ok());
  cfg
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  #[test]
  fn empty_file_yields_defaults() {
    let cfg = AppConfig::from_toml_str("inline", "").unwrap();
    assert_eq!(cfg.server.port, 3000);
    assert_eq!(cfg.hints.path, "/api/ask");
    assert_eq!(cfg.hints.response_field, "data");
    assert!(cfg.hints.base_url.is_none());
    assert_eq!(cfg.runner.node_binary, "node");
    assert!(!cfg.runner.restrict_fs);
    assert!(cfg.problems.is_empty());
  }

  #[test]
  fn parses_problem_bank() {
    let src = r#"
[runner]
timeout_ms = 500
restrict_fs = true

[[problems]]
id = "sum-pair"
title = "Sum a pair"
description = "Return a + b."
entry_point = "add"

[[problems.test_cases]]
input = '{"a":1,"b":2}'
expected_output = "3"
"#;
    let cfg = AppConfig::from_toml_str("inline", src).unwrap();
    assert_eq!(cfg.runner.timeout_ms, 500);
    assert_eq!(cfg.runner.memory_limit_mb, 128);
    assert!(cfg.runner.restrict_fs);
    assert_eq!(cfg.problems.len(), 1);
    assert_eq!(cfg.problems[0].entry_point.as_deref(), Some("add"));
    assert_eq!(cfg.problems[0].test_cases[0].expected_output, "3");
  }

  #[test]
  fn bad_toml_is_a_parse_error() {
    let err = AppConfig::from_toml_str("inline", "[runner\n").unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
  }

  #[test]
  fn env_overrides_file_values() {
    let env: HashMap<&str, &str> = [
      ("PORT", "8081"),
      ("HINT_API_URL", "http://hints.local"),
      ("PROBLEMS_DIR", "/srv/problems"),
      ("NODE_BINARY", "/usr/bin/node"),
    ]
    .into_iter()
    .collect();
    let mut cfg = AppConfig::default();
    cfg.apply_env(|k| env.get(k).map(|v| v.to_string()));
    assert_eq!(cfg.server.port, 8081);
    assert_eq!(cfg.hints.base_url.as_deref(), Some("http://hints.local"));
    assert_eq!(cfg.storage.problems_dir, Some(PathBuf::from("/srv/problems")));
    assert_eq!(cfg.runner.node_binary, "/usr/bin/node");
  }

  #[test]
  fn blank_hint_url_is_ignored() {
    let mut cfg = AppConfig::default();
    cfg.apply_env(|k| (k == "HINT_API_URL").then(|| "  ".to_string()));
    assert!(cfg.hints.base_url.is_none());
  }
}
