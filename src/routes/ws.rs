//! WebSocket upgrade + message loop. Each connection is one viewing session:
//! it owns the loaded problem and the hint panel state, both dropped when the
//! socket closes. Messages are handled one at a time, one JSON reply each.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{info, error, instrument, debug};

use crate::domain::Submission;
use crate::protocol::{ClientWsMessage, HintStateOut, ServerWsMessage};
use crate::session::ViewSession;
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "codejudge_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  let mut session = ViewSession::new();
  info!(target: "codejudge_backend", session = %session.id, "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "codejudge_backend", session = %session.id, "WS received: {:?}", &incoming);
            handle_client_ws(incoming, &mut session, &state).await
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "codejudge_backend", session = %session.id, error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "codejudge_backend", session = %session.id, "WebSocket disconnected");
}

async fn handle_client_ws(msg: ClientWsMessage, session: &mut ViewSession, state: &AppState) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,
    ClientWsMessage::LoadProblem { problem_id } => match session.load(state, &problem_id).await {
      Some(p) => ServerWsMessage::Problem { problem: p.clone() },
      None => ServerWsMessage::Loading { problem_id },
    },
    ClientWsMessage::Submit { source, entry_point } => {
      let submission = Submission { source, entry_point };
      match session.submit(state, &submission).await {
        Some(report) => ServerWsMessage::Results { report },
        None => ServerWsMessage::Error { message: "No problem loaded".into() },
      }
    }
    ClientWsMessage::ToggleHints => {
      session.toggle_hints();
      ServerWsMessage::HintState(HintStateOut::from(session.hints()))
    }
    ClientWsMessage::AskHint { code, prompt } => {
      session.ask_hint(state, &code, &prompt).await;
      ServerWsMessage::HintState(HintStateOut::from(session.hints()))
    }
  }
}
