//! WebSocket connection handlers.
//!
//! One socket carries every channel the client subscribes to. Inbound frames
//! are `subscribe` / `unsubscribe` / `typing` / `ping`; everything the
//! broadcaster enqueues for the connection is written out by [`pusher_loop`].

use std::{sync::Arc, time::Duration};

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use serde::Deserialize;
use tokio::{sync::mpsc, time::Instant};

use crate::{
    domain::{ConnectionId, ConversationId, PusherChannel, UserId, UserRepository},
    infrastructure::dto::websocket::{ClientFrame, EventFrame, OnlineUserDto},
    ui::state::AppState,
    usecase::CoreError,
};

use super::error::{ApiError, error_code};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub user_id: u64,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = UserId::new(query.user_id);
    let Some(user) = state
        .users
        .find_user(user_id)
        .await
        .map_err(CoreError::from)?
    else {
        tracing::warn!("Rejecting WebSocket connection of unknown user {}", user_id);
        return Err(ApiError::missing_identity());
    };

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user.id)))
}

/// Spawns a task that writes queued frames to the socket and pings the
/// client every `ping_interval`.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: SplitSink<WebSocket, Message>,
    ping_interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(ping_interval);
        // 最初の tick は即座に完了する
        ticker.tick().await;
        loop {
            tokio::select! {
                frame = rx.recv() => {
                    let Some(frame) = frame else { break };
                    if sender.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    })
}

/// Queue a reply for this connection only.
fn reply(tx: &PusherChannel, frame: &EventFrame) {
    match serde_json::to_string(frame) {
        Ok(json) => {
            // 送信側が閉じていれば接続は終了処理中
            let _ = tx.send(json);
        }
        Err(e) => tracing::warn!("Failed to encode '{}' frame: {}", frame.event, e),
    }
}

async fn handle_client_frame(
    state: &AppState,
    user_id: UserId,
    connection: ConnectionId,
    tx: &PusherChannel,
    text: &str,
) {
    let frame = match serde_json::from_str::<ClientFrame>(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!("Invalid frame from '{}': {}", connection, e);
            reply(tx, &EventFrame::error("invalid_frame", &e.to_string()));
            return;
        }
    };

    match frame {
        ClientFrame::Subscribe { channel } => {
            match state.channel.subscribe(user_id, connection, &channel).await {
                Ok(subscription) => {
                    let channel = subscription.handle.channel.to_string();
                    reply(tx, &EventFrame::subscription_succeeded(&channel));
                    if let Some(roster) = subscription.roster {
                        let members: Vec<OnlineUserDto> = roster.iter().map(Into::into).collect();
                        reply(tx, &EventFrame::presence_roster(&channel, &members));
                    }
                }
                Err(e) => {
                    tracing::warn!("User {} could not subscribe to {}: {}", user_id, channel, e);
                    reply(
                        tx,
                        &EventFrame::subscription_error(&channel, error_code(&e), &e.to_string()),
                    );
                }
            }
        }
        ClientFrame::Unsubscribe { channel } => {
            if let Err(e) = state.channel.unsubscribe(connection, &channel).await {
                reply(tx, &EventFrame::error(error_code(&e), &e.to_string()));
            }
        }
        ClientFrame::Typing { conversation_id } => {
            if let Err(e) = state
                .messaging
                .notify_typing(ConversationId::new(conversation_id), user_id)
                .await
            {
                reply(tx, &EventFrame::error(error_code(&e), &e.to_string()));
            }
        }
        ClientFrame::Ping => reply(tx, &EventFrame::pong()),
    }
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, user_id: UserId) {
    let connection = ConnectionId::generate();

    // Create a channel for this connection to receive frames
    let (tx, rx) = mpsc::unbounded_channel();
    state.channel.connect(user_id, connection, tx.clone()).await;
    tracing::info!("User {} connected as '{}'", user_id, connection);

    let (sender, mut receiver) = socket.split();
    let mut send_task = pusher_loop(rx, sender, state.heartbeat_interval);

    let state_clone = state.clone();
    let mut recv_task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(state_clone.heartbeat_interval);
        ticker.tick().await;
        let mut last_seen = Instant::now();

        loop {
            tokio::select! {
                msg = receiver.next() => {
                    let msg = match msg {
                        Some(Ok(msg)) => msg,
                        Some(Err(e)) => {
                            tracing::warn!("WebSocket error on '{}': {}", connection, e);
                            break;
                        }
                        None => break,
                    };

                    // どのフレームでも生存確認とみなす
                    last_seen = Instant::now();
                    state_clone.channel.heartbeat(connection).await;

                    match msg {
                        Message::Text(text) => {
                            handle_client_frame(&state_clone, user_id, connection, &tx, text.as_str())
                                .await;
                        }
                        Message::Close(_) => {
                            tracing::info!("Connection '{}' requested close", connection);
                            break;
                        }
                        _ => {}
                    }
                }
                _ = ticker.tick() => {
                    if last_seen.elapsed() > state_clone.heartbeat_timeout {
                        tracing::warn!(
                            "Connection '{}' silent for more than {:?}, closing",
                            connection,
                            state_clone.heartbeat_timeout
                        );
                        break;
                    }
                }
            }
        }
    });

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    state.channel.disconnect(connection).await;
    tracing::info!("User {} disconnected from '{}'", user_id, connection);
}
