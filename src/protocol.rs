//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{HintPhase, HintState, Problem};
use crate::runner::RunReport;

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    LoadProblem {
        #[serde(rename = "problemId")]
        problem_id: String,
    },
    Submit {
        source: String,
        #[serde(rename = "entryPoint", default)]
        entry_point: Option<String>,
    },
    ToggleHints,
    AskHint {
        #[serde(default)]
        code: String,
        prompt: String,
    },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Problem {
        problem: Problem,
    },
    /// The requested problem is not available (yet); the client keeps
    /// showing its loading state.
    Loading {
        #[serde(rename = "problemId")]
        problem_id: String,
    },
    Results {
        report: RunReport,
    },
    HintState(HintStateOut),
    Error {
        message: String,
    },
}

#[derive(Debug, Serialize)]
pub struct HintStateOut {
    pub enabled: bool,
    pub hint: Option<String>,
    pub phase: HintPhase,
}

impl From<&HintState> for HintStateOut {
    fn from(h: &HintState) -> Self {
        Self { enabled: h.enabled(), hint: h.hint().map(str::to_string), phase: h.phase() }
    }
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct SubmitIn {
    pub source: String,
    #[serde(rename = "entryPoint", default)]
    pub entry_point: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HintIn {
    #[serde(default)]
    pub code: String,
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct HintOut {
    pub text: String,
    pub phase: HintPhase,
}

#[derive(Debug, Serialize)]
pub struct ErrorOut {
    pub error: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_messages_parse() {
        let m: ClientWsMessage = serde_json::from_str(r#"{"type":"load_problem","problemId":"sum-pair"}"#).unwrap();
        assert!(matches!(m, ClientWsMessage::LoadProblem { problem_id } if problem_id == "sum-pair"));

        let m: ClientWsMessage = serde_json::from_str(r#"{"type":"submit","source":"(x) => x"}"#).unwrap();
        assert!(matches!(m, ClientWsMessage::Submit { entry_point: None, .. }));

        let m: ClientWsMessage = serde_json::from_str(r#"{"type":"toggle_hints"}"#).unwrap();
        assert!(matches!(m, ClientWsMessage::ToggleHints));
    }

    #[test]
    fn hint_state_message_is_flat() {
        let mut h = HintState::default();
        h.toggle();
        let msg = ServerWsMessage::HintState(HintStateOut::from(&h));
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"type": "hint_state", "enabled": true, "hint": null, "phase": "idle"})
        );
    }
}
