//! Built-in problems that keep the service useful without a config file
//! or a problems directory.

use crate::config::ProblemCfg;
use crate::domain::{Problem, TestCase};

fn case(input: &str, expected: &str) -> TestCase {
  TestCase { input: input.into(), expected_output: expected.into() }
}

pub fn seed_problems() -> Vec<Problem> {
  vec![
    Problem {
      id: "sum-pair".into(),
      title: "Sum a pair".into(),
      description: "Write `add(x)` returning `x.a + x.b`.".into(),
      entry_point: Some("add".into()),
      test_cases: vec![
        case(r#"{"a":1,"b":2}"#, "3"),
        case(r#"{"a":-4,"b":4}"#, "0"),
        case(r#"{"a":0.5,"b":0.25}"#, "0.75"),
      ],
    },
    Problem {
      id: "reverse-list".into(),
      title: "Reverse a list".into(),
      description: "Write `reverse(xs)` returning the array in reverse order.".into(),
      entry_point: Some("reverse".into()),
      test_cases: vec![
        case("[1,2,3]", "[3,2,1]"),
        case("[]", "[]"),
        case(r#"["a"]"#, r#"["a"]"#),
      ],
    },
    Problem {
      id: "count-words".into(),
      title: "Count words".into(),
      description: "Given a string, return an object mapping each word to its count.".into(),
      entry_point: None,
      test_cases: vec![
        case(r#""a b a""#, r#"{"a":2,"b":1}"#),
        case(r#""""#, "{}"),
      ],
    },
  ]
}

/// Convert a TOML bank entry into a problem.
pub fn problem_from_cfg(cfg: &ProblemCfg) -> Problem {
  Problem {
    id: cfg.id.clone(),
    title: cfg.title.clone(),
    description: cfg.description.clone(),
    test_cases: cfg.test_cases.clone(),
    entry_point: cfg.entry_point.clone(),
  }
}
