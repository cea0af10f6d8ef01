//! Problem loading from an ordered list of document stores.
//!
//! Each store is asked in turn; the first document found wins. Nothing is
//! cached: a directory-backed document is re-read on every load.

use std::{collections::HashMap, path::PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::domain::{Problem, ProblemDoc};

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("invalid problem id {0:?}")]
  InvalidId(String),
  #[error("failed to read {path}: {source}")]
  Io { path: String, source: std::io::Error },
  #[error("failed to decode {path}: {source}")]
  Decode { path: String, source: serde_json::Error },
}

#[derive(Debug, Error)]
pub enum LoadError {
  #[error("problem {0:?} not found")]
  NotFound(String),
  #[error(transparent)]
  Store(#[from] StoreError),
}

/// A read-only, id-keyed source of problem documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
  fn name(&self) -> &'static str;

  /// Fetch at most one document. `Ok(None)` means absent.
  async fn fetch(&self, id: &str) -> Result<Option<Problem>, StoreError>;
}

/// Problems held in memory (TOML bank and built-in seeds).
pub struct MemoryStore {
  by_id: HashMap<String, Problem>,
}

impl MemoryStore {
  /// Build from problems in priority order; a later duplicate id never
  /// overwrites an earlier one.
  pub fn new(problems: impl IntoIterator<Item = Problem>) -> Self {
    let mut by_id = HashMap::new();
    for p in problems {
      if by_id.contains_key(&p.id) {
        warn!(target: "problems", id = %p.id, "Duplicate problem id ignored");
        continue;
      }
      by_id.insert(p.id.clone(), p);
    }
    Self { by_id }
  }

  pub fn len(&self) -> usize { self.by_id.len() }

  pub fn is_empty(&self) -> bool { self.by_id.is_empty() }
}

#[async_trait]
impl DocumentStore for MemoryStore {
  fn name(&self) -> &'static str { "memory" }

  async fn fetch(&self, id: &str) -> Result<Option<Problem>, StoreError> {
    Ok(self.by_id.get(id).cloned())
  }
}

/// `<root>/<id>.json` documents.
pub struct DirStore {
  root: PathBuf,
}

impl DirStore {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }
}

fn is_valid_id(id: &str) -> bool {
  !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[async_trait]
impl DocumentStore for DirStore {
  fn name(&self) -> &'static str { "dir" }

  async fn fetch(&self, id: &str) -> Result<Option<Problem>, StoreError> {
    if !is_valid_id(id) {
      return Err(StoreError::InvalidId(id.to_string()));
    }
    let path = self.root.join(format!("{id}.json"));
    let bytes = match tokio::fs::read(&path).await {
      Ok(b) => b,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
      Err(source) => return Err(StoreError::Io { path: path.display().to_string(), source }),
    };
    let doc: ProblemDoc = serde_json::from_slice(&bytes)
      .map_err(|source| StoreError::Decode { path: path.display().to_string(), source })?;
    Ok(Some(Problem::from_doc(id, doc)))
  }
}

pub struct ProblemLoader {
  stores: Vec<Box<dyn DocumentStore>>,
}

impl ProblemLoader {
  pub fn new(stores: Vec<Box<dyn DocumentStore>>) -> Self {
    Self { stores }
  }

  /// Resolve `id` in all stores, in order.
  #[instrument(level = "info", skip(self), fields(stores = self.stores.len()))]
  pub async fn load(&self, id: &str) -> Result<Problem, LoadError> {
    for store in &self.stores {
      match store.fetch(id).await {
        Ok(Some(problem)) => {
          info!(target: "problems", %id, store = store.name(), cases = problem.test_cases.len(), "Problem loaded");
          return Ok(problem);
        }
        Ok(None) => debug!(target: "problems", %id, store = store.name(), "miss"),
        Err(StoreError::InvalidId(_)) => {
          warn!(target: "problems", %id, store = store.name(), "Rejected problem id");
        }
        Err(e) => {
          error!(target: "problems", %id, store = store.name(), error = %e, "Store failure");
          return Err(e.into());
        }
      }
    }
    error!(target: "problems", %id, "No such problem document");
    Err(LoadError::NotFound(id.to_string()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::TestCase;

  fn problem(id: &str, title: &str) -> Problem {
    Problem {
      id: id.into(),
      title: title.into(),
      description: String::new(),
      test_cases: vec![TestCase { input: "1".into(), expected_output: "1".into() }],
      entry_point: None,
    }
  }

  #[tokio::test]
  async fn memory_store_keeps_first_duplicate() {
    let store = MemoryStore::new([problem("p1", "first"), problem("p1", "second")]);
    assert_eq!(store.len(), 1);
    assert!(!store.is_empty());
    assert!(MemoryStore::new(Vec::<Problem>::new()).is_empty());
    let p = store.fetch("p1").await.unwrap().unwrap();
    assert_eq!(p.title, "first");
  }

  #[tokio::test]
  async fn dir_store_reads_fresh_each_time() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("two-sum.json");
    std::fs::write(&path, r#"{"title":"v1","description":"d","testCases":[{"input":"[1]","expectedOutput":"1"}]}"#).unwrap();

    let store = DirStore::new(dir.path());
    let p = store.fetch("two-sum").await.unwrap().unwrap();
    assert_eq!(p.id, "two-sum");
    assert_eq!(p.title, "v1");
    assert_eq!(p.test_cases.len(), 1);

    std::fs::write(&path, r#"{"title":"v2","testCases":[]}"#).unwrap();
    let p = store.fetch("two-sum").await.unwrap().unwrap();
    assert_eq!(p.title, "v2");
    assert!(p.test_cases.is_empty());
  }

  #[tokio::test]
  async fn dir_store_rejects_traversal_ids() {
    let dir = tempfile::tempdir().unwrap();
    let store = DirStore::new(dir.path());
    let err = store.fetch("../etc/passwd").await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidId(_)));
  }

  #[tokio::test]
  async fn dir_store_reports_bad_json() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("broken.json"), "{not json").unwrap();
    let store = DirStore::new(dir.path());
    assert!(matches!(store.fetch("broken").await, Err(StoreError::Decode { .. })));
  }

  #[tokio::test]
  async fn loader_falls_through_stores() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("on-disk.json"), r#"{"title":"disk"}"#).unwrap();
    let loader = ProblemLoader::new(vec![
      Box::new(MemoryStore::new([problem("in-mem", "mem")])),
      Box::new(DirStore::new(dir.path())),
    ]);

    assert_eq!(loader.load("in-mem").await.unwrap().title, "mem");
    assert_eq!(loader.load("on-disk").await.unwrap().title, "disk");
    assert!(matches!(loader.load("missing").await, Err(LoadError::NotFound(_))));
    assert!(matches!(loader.load("../x").await, Err(LoadError::NotFound(_))));
  }
}
