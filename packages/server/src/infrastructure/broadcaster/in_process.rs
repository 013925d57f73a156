//! プロセス内 Broadcaster 実装
//!
//! ## 責務
//!
//! - 接続ごとの `UnboundedSender` を管理
//! - チャンネルごとの購読者リストを管理し、publish されたイベントを配信キューに積む
//!
//! ## 設計ノート
//!
//! WebSocket の生成は UI 層（`ui/handler/websocket.rs`）で行われます。
//! この実装は生成された `UnboundedSender` を受け取り、フレームの送信だけを担当します。
//! publish はレジストリのロックを保持したままキューに積むので、
//! 同じチャンネルへのイベントは publish された順に各購読者へ届きます。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    domain::{
        BroadcastError, Broadcaster, ChannelEvent, ChannelName, ConnectionId, PusherChannel,
        SubscriptionHandle, UserId,
    },
    infrastructure::dto::websocket::EventFrame,
};

struct ConnectionEntry {
    user_id: UserId,
    sender: PusherChannel,
}

#[derive(Default)]
struct Registry {
    connections: HashMap<ConnectionId, ConnectionEntry>,
    /// 購読順を保持する
    channels: HashMap<ChannelName, Vec<ConnectionId>>,
}

impl Registry {
    fn remove_connection(&mut self, connection: ConnectionId) {
        self.connections.remove(&connection);
        self.channels.retain(|_, subscribers| {
            subscribers.retain(|id| *id != connection);
            !subscribers.is_empty()
        });
    }
}

/// プロセス内で完結する Broadcaster 実装
#[derive(Default)]
pub struct InProcessBroadcaster {
    registry: Mutex<Registry>,
}

impl InProcessBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// チャンネルの購読者数（デバッグ用）
    pub async fn subscriber_count(&self, channel: &ChannelName) -> usize {
        let registry = self.registry.lock().await;
        registry.channels.get(channel).map(Vec::len).unwrap_or(0)
    }
}

#[async_trait]
impl Broadcaster for InProcessBroadcaster {
    async fn register_connection(
        &self,
        connection: ConnectionId,
        user_id: UserId,
        sender: PusherChannel,
    ) {
        let mut registry = self.registry.lock().await;
        registry
            .connections
            .insert(connection, ConnectionEntry { user_id, sender });
        tracing::debug!("Connection '{}' of user {} registered", connection, user_id);
    }

    async fn subscribe(
        &self,
        channel: ChannelName,
        connection: ConnectionId,
    ) -> Result<SubscriptionHandle, BroadcastError> {
        let mut registry = self.registry.lock().await;
        if !registry.connections.contains_key(&connection) {
            return Err(BroadcastError::UnknownConnection(connection));
        }
        let subscribers = registry.channels.entry(channel).or_default();
        if !subscribers.contains(&connection) {
            subscribers.push(connection);
        }
        tracing::debug!("Connection '{}' subscribed to {}", connection, channel);
        Ok(SubscriptionHandle {
            channel,
            connection,
        })
    }

    async fn unsubscribe(&self, handle: &SubscriptionHandle) {
        let mut registry = self.registry.lock().await;
        if let Some(subscribers) = registry.channels.get_mut(&handle.channel) {
            subscribers.retain(|id| *id != handle.connection);
            if subscribers.is_empty() {
                registry.channels.remove(&handle.channel);
            }
        }
        tracing::debug!(
            "Connection '{}' unsubscribed from {}",
            handle.connection,
            handle.channel
        );
    }

    async fn disconnect(&self, connection: ConnectionId) {
        let mut registry = self.registry.lock().await;
        registry.remove_connection(connection);
        tracing::debug!("Connection '{}' removed from broadcaster", connection);
    }

    async fn publish(
        &self,
        channel: &ChannelName,
        event: &ChannelEvent,
        except: Option<UserId>,
    ) -> Result<usize, BroadcastError> {
        let frame = EventFrame::from_event(channel, event)
            .and_then(|frame| serde_json::to_string(&frame))
            .map_err(|e| BroadcastError::Encode(e.to_string()))?;

        let mut registry = self.registry.lock().await;
        let Some(subscribers) = registry.channels.get(channel) else {
            return Ok(0);
        };

        let mut delivered = 0;
        let mut closed = Vec::new();
        for connection in subscribers {
            let Some(entry) = registry.connections.get(connection) else {
                continue;
            };
            if Some(entry.user_id) == except {
                continue;
            }
            // 受信側が閉じた接続は後で掃除する
            if entry.sender.send(frame.clone()).is_err() {
                tracing::warn!(
                    "Connection '{}' is closed, dropping it from {}",
                    connection,
                    channel
                );
                closed.push(*connection);
            } else {
                delivered += 1;
            }
        }

        for connection in closed {
            registry.remove_connection(connection);
        }

        tracing::debug!(
            "Published {} on {} to {} connection(s)",
            event.name(),
            channel,
            delivered
        );
        Ok(delivered)
    }
}
