//! Domain models: problems, test cases, verdicts, and the hint panel state.

use serde::{Deserialize, Serialize};

/// One input/expected-output pair. Both sides are JSON text.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestCase {
  pub input: String,
  #[serde(rename = "expectedOutput", alias = "expected_output")]
  pub expected_output: String,
}

/// A problem document as stored, without its id (the id is the document key).
#[derive(Clone, Debug, Deserialize)]
pub struct ProblemDoc {
  pub title: String,
  #[serde(default)]
  pub description: String,
  #[serde(rename = "testCases", alias = "test_cases", default)]
  pub test_cases: Vec<TestCase>,
  /// Default function name to call when a submission names none.
  #[serde(rename = "entryPoint", alias = "entry_point", default)]
  pub entry_point: Option<String>,
}

/// A loaded problem. Immutable once loaded; replaced wholesale on re-fetch.
#[derive(Clone, Debug, Serialize)]
pub struct Problem {
  pub id: String,
  pub title: String,
  pub description: String,
  #[serde(rename = "testCases")]
  pub test_cases: Vec<TestCase>,
  #[serde(rename = "entryPoint", skip_serializing_if = "Option::is_none")]
  pub entry_point: Option<String>,
}

impl Problem {
  pub fn from_doc(id: impl Into<String>, doc: ProblemDoc) -> Self {
    Self {
      id: id.into(),
      title: doc.title,
      description: doc.description,
      test_cases: doc.test_cases,
      entry_point: doc.entry_point,
    }
  }
}

/// Outcome of evaluating one test case.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Verdict {
  Passed,
  Failed,
  Error,
}

/// Code submitted against a problem.
#[derive(Clone, Debug, Deserialize)]
pub struct Submission {
  pub source: String,
  /// Name of the function to call. When absent the problem default is used,
  /// and when that is absent too the whole source is a function expression.
  #[serde(rename = "entryPoint", default)]
  pub entry_point: Option<String>,
}

/// Fixed text shown when a hint request fails for any reason.
pub const FAILED_HINT_MESSAGE: &str = "Failed to fetch hint";

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum HintPhase {
  #[default]
  Idle,
  Pending,
  Displayed,
  Failed,
}

/// Hint panel state for one viewing session.
#[derive(Clone, Debug, Default)]
pub struct HintState {
  enabled: bool,
  hint: Option<String>,
  phase: HintPhase,
}

impl HintState {
  pub fn enabled(&self) -> bool { self.enabled }
  pub fn hint(&self) -> Option<&str> { self.hint.as_deref() }
  pub fn phase(&self) -> HintPhase { self.phase }

  /// Flip availability. The last hint survives toggling.
  pub fn toggle(&mut self) -> bool {
    self.enabled = !self.enabled;
    self.enabled
  }

  /// Enter `Pending` if a request may be issued; returns false (and changes
  /// nothing) when hints are disabled.
  pub fn begin(&mut self) -> bool {
    if !self.enabled {
      return false;
    }
    self.phase = HintPhase::Pending;
    true
  }

  /// Record the outcome of the outstanding request.
  pub fn finish<E>(&mut self, result: Result<String, E>) {
    match result {
      Ok(text) => {
        self.hint = Some(text);
        self.phase = HintPhase::Displayed;
      }
      Err(_) => {
        self.hint = Some(FAILED_HINT_MESSAGE.to_string());
        self.phase = HintPhase::Failed;
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_case_accepts_both_key_styles() {
    let camel: TestCase = serde_json::from_str(r#"{"input":"1","expectedOutput":"2"}"#).unwrap();
    let snake: TestCase = toml::from_str("input = \"1\"\nexpected_output = \"2\"\n").unwrap();
    assert_eq!(camel, snake);
  }

  #[test]
  fn toggling_keeps_previous_hint() {
    let mut st = HintState::default();
    assert!(st.toggle());
    assert!(st.begin());
    st.finish::<()>(Ok("try a hash map".into()));
    assert!(!st.toggle());
    assert!(st.toggle());
    assert_eq!(st.hint(), Some("try a hash map"));
    assert_eq!(st.phase(), HintPhase::Displayed);
  }

  #[test]
  fn disabled_hints_do_not_start_requests() {
    let mut st = HintState::default();
    assert!(!st.begin());
    assert_eq!(st.phase(), HintPhase::Idle);
    assert_eq!(st.hint(), None);
  }

  #[test]
  fn failed_request_stores_fixed_message() {
    let mut st = HintState::default();
    st.toggle();
    st.begin();
    st.finish::<&str>(Err("boom"));
    assert_eq!(st.hint(), Some(FAILED_HINT_MESSAGE));
    assert_eq!(st.phase(), HintPhase::Failed);
  }

  #[test]
  fn verdicts_serialize_as_plain_names() {
    let s = serde_json::to_string(&[Verdict::Passed, Verdict::Failed, Verdict::Error]).unwrap();
    assert_eq!(s, r#"["Passed","Failed","Error"]"#);
  }
}
