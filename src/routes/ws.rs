//! WebSocket upgrade + session loop. Each connection owns one `Session`;
//! client messages and background events (oracle answers, ticks) are
//! interleaved on the same task, and every resulting message is pushed back
//! as JSON.

use std::sync::Arc;

use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::session::{Session, SessionEvent};
use crate::state::AppState;

#[instrument(level = "info", skip(ws, state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "devils_advocate", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

enum Inbound {
  Socket(Option<Result<Message, axum::Error>>),
  Session(SessionEvent),
}

async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  let (tx, mut rx) = mpsc::unbounded_channel();
  let mut session = Session::new(state, tx);
  let id = session.id();
  info!(target: "devils_advocate", session = %id, "WebSocket connected");

  let mut outgoing = session.open();
  loop {
    if !send_all(&mut socket, std::mem::take(&mut outgoing)).await {
      break;
    }
    let inbound = tokio::select! {
      msg = socket.recv() => Inbound::Socket(msg),
      Some(ev) = rx.recv() => Inbound::Session(ev),
    };
    outgoing = match inbound {
      Inbound::Session(ev) => session.handle(ev),
      Inbound::Socket(Some(Ok(Message::Text(txt)))) => match serde_json::from_str::<ClientWsMessage>(&txt) {
        Ok(msg) => {
          debug!(target: "devils_advocate", session = %id, "WS received: {:?}", &msg);
          session.handle(SessionEvent::Client(msg))
        }
        Err(e) => vec![ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) }],
      },
      Inbound::Socket(Some(Ok(Message::Ping(payload)))) => {
        if socket.send(Message::Pong(payload)).await.is_err() {
          break;
        }
        Vec::new()
      }
      Inbound::Socket(Some(Ok(Message::Close(_)))) | Inbound::Socket(None) => break,
      Inbound::Socket(Some(Ok(_))) => Vec::new(),
      Inbound::Socket(Some(Err(e))) => {
        warn!(target: "devils_advocate", session = %id, error = %e, "WS receive error");
        break;
      }
    };
  }
  // Dropping the session aborts its outstanding oracle calls and timers.
  drop(session);
  info!(target: "devils_advocate", session = %id, "WebSocket disconnected");
}

async fn send_all(socket: &mut WebSocket, msgs: Vec<ServerWsMessage>) -> bool {
  for msg in msgs {
    let out = serde_json::to_string(&msg).unwrap_or_else(|e| {
      serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
    });
    if let Err(e) = socket.send(Message::Text(out)).await {
      error!(target: "devils_advocate", error = %e, "WS send error");
      return false;
    }
  }
  true
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn client_messages_are_tagged_by_type() {
    let msg: ClientWsMessage = serde_json::from_str(r#"{"type":"select_side","side":"B"}"#).unwrap();
    assert!(matches!(msg, ClientWsMessage::SelectSide { side: crate::domain::SideChoice::B }));
    let msg: ClientWsMessage = serde_json::from_str(r#"{"type":"navigate","screen":"hardcore"}"#).unwrap();
    assert!(matches!(msg, ClientWsMessage::Navigate { screen: crate::protocol::ScreenName::Hardcore }));
    assert!(serde_json::from_str::<ClientWsMessage>(r#"{"type":"teleport"}"#).is_err());
  }

  #[test]
  fn server_messages_serialize_flat() {
    let v = serde_json::to_value(ServerWsMessage::Export { filename: "f.json".into(), content: "{}".into() }).unwrap();
    assert_eq!(v["type"], "export");
    assert_eq!(v["filename"], "f.json");
  }
}
