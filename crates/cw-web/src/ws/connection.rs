use std::sync::Arc;

use axum::{
    extract::{
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use cw_core::{run_agent_turn, ChatSession, DeliveryReceiver};
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use crate::app::AppState;
use crate::ws::frame::{self, ClientFrame, TOO_BIG_CLOSE, UNAUTHORIZED_CLOSE};

/// What the loop does after handling one inbound frame.
enum Step {
    Nothing,
    Reply(String),
    Close(u16, &'static str),
}

/// Per-connection state. A connection owns at most one session at a time.
struct Connection {
    conn_id: String,
    state: Arc<AppState>,
    path_session: String,
    path_datasource: String,
    session: Option<Arc<ChatSession>>,
    inbox: Option<DeliveryReceiver<String>>,
}

/// GET /ws/chat/{session_id}/{datasource_id}
pub async fn ws_handler(
    Path((session_id, datasource_id)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> Response {
    if !frame::valid_route(&session_id, &datasource_id) {
        debug!(session_id, datasource_id, "Rejecting malformed chat route");
        return StatusCode::NOT_FOUND.into_response();
    }
    ws.on_upgrade(move |socket| run_connection(socket, state, session_id, datasource_id))
}

/// Next envelope queued for this connection; pends until authenticated.
async fn next_outbound(inbox: &mut Option<DeliveryReceiver<String>>) -> Option<String> {
    match inbox {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

fn close_frame(code: u16, reason: &'static str) -> Message {
    Message::Close(Some(CloseFrame {
        code,
        reason: Utf8Bytes::from_static(reason),
    }))
}

async fn run_connection(
    socket: WebSocket,
    state: Arc<AppState>,
    path_session: String,
    path_datasource: String,
) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    info!(conn_id, session_id = %path_session, "New WS connection");

    let (mut tx, mut rx) = socket.split();
    let mut shutdown_rx = state.shutdown.subscribe();
    let max_payload = state.config.max_payload_bytes;
    let mut conn = Connection {
        conn_id,
        state,
        path_session,
        path_datasource,
        session: None,
        inbox: None,
    };

    loop {
        tokio::select! {
            msg = rx.next() => {
                let step = match msg {
                    Some(Ok(Message::Text(text))) => {
                        let size = text.as_str().len();
                        if size > max_payload {
                            warn!(conn_id = %conn.conn_id, size, "Payload too large");
                            Step::Close(TOO_BIG_CLOSE, "Payload too large")
                        } else {
                            conn.handle_text(text.as_str()).await
                        }
                    }
                    Some(Ok(Message::Binary(data))) => {
                        if data.len() > max_payload {
                            warn!(conn_id = %conn.conn_id, size = data.len(), "Payload too large");
                            Step::Close(TOO_BIG_CLOSE, "Payload too large")
                        } else {
                            Step::Reply(frame::invalid_message())
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if tx.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                        Step::Nothing
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(Message::Pong(_))) => Step::Nothing,
                    Some(Err(e)) => {
                        debug!(conn_id = %conn.conn_id, error = %e, "WS receive error");
                        break;
                    }
                };

                match step {
                    Step::Nothing => {}
                    Step::Reply(payload) => {
                        if tx.send(Message::Text(payload.into())).await.is_err() {
                            break;
                        }
                    }
                    Step::Close(code, reason) => {
                        let _ = tx.send(close_frame(code, reason)).await;
                        break;
                    }
                }
            }

            outbound = next_outbound(&mut conn.inbox) => {
                match outbound {
                    Some(payload) => {
                        if tx.send(Message::Text(payload.into())).await.is_err() {
                            break;
                        }
                    }
                    None => conn.inbox = None,
                }
            }

            _ = shutdown_rx.recv() => {
                let _ = tx.send(close_frame(1001, "Server shutting down")).await;
                break;
            }
        }
    }

    if let Some(session) = conn.session.take() {
        conn.state.registry.remove_if_same(&session).await;
    }
    info!(conn_id = %conn.conn_id, "WS connection closed");
}

impl Connection {
    async fn handle_text(&mut self, text: &str) -> Step {
        match frame::parse(text) {
            None => {
                debug!(conn_id = %self.conn_id, "Unparseable client frame");
                Step::Reply(frame::invalid_message())
            }
            Some(ClientFrame::Authenticate {
                token,
                session_id,
                datasource_id,
            }) => self.authenticate(token, session_id, datasource_id).await,
            Some(ClientFrame::Chat { message }) => self.chat(message),
        }
    }

    async fn authenticate(
        &mut self,
        token: String,
        session_id: Option<String>,
        datasource_id: Option<String>,
    ) -> Step {
        if !self.state.config.accepts_token(&token) {
            warn!(conn_id = %self.conn_id, "Authentication failed");
            return Step::Close(UNAUTHORIZED_CLOSE, "Unauthorized");
        }

        let session_id = session_id.unwrap_or_else(|| self.path_session.clone());
        let datasource_id = datasource_id.unwrap_or_else(|| self.path_datasource.clone());

        if let Some(previous) = self.session.take() {
            self.state.registry.remove_if_same(&previous).await;
        }
        let (session, inbox) = self
            .state
            .registry
            .create(&session_id, &datasource_id, &token)
            .await;
        info!(conn_id = %self.conn_id, session_id, datasource_id, "Authenticated");

        self.session = Some(session);
        self.inbox = Some(inbox);
        Step::Reply(frame::authenticated())
    }

    fn chat(&self, message: String) -> Step {
        let Some(session) = &self.session else {
            return Step::Reply(frame::unauthorized());
        };
        debug!(conn_id = %self.conn_id, session_id = %session.id, len = message.len(), "Starting agent turn");
        tokio::spawn(run_agent_turn(
            session.clone(),
            self.state.agent.clone(),
            message,
        ));
        Step::Nothing
    }
}
