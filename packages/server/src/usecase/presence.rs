//! UseCase: Presence Tracker
//!
//! 接続の登録・切断・ハートビートを `PresenceRegistry` に反映し、
//! オンライン状態が変わったときだけ `presence-online-users` へ通知する。
//! 通知はレジストリのロックを保持したまま行うので、同じユーザーの online / offline が
//! 入れ替わって届くことはない。

use std::{sync::Arc, time::Duration};

use nounou_shared::time::Clock;
use tokio::{sync::Mutex, task::JoinHandle};

use crate::domain::{
    ChannelEvent, ChannelName, ConnectionId, PresenceRegistry, Timestamp, User, UserId,
};

use super::delivery::EventDispatcher;

pub struct PresenceTracker {
    registry: Mutex<PresenceRegistry>,
    dispatcher: Arc<EventDispatcher>,
    clock: Arc<dyn Clock>,
    /// これより長く沈黙した接続は sweep で切断扱いにする
    heartbeat_timeout: Duration,
}

impl PresenceTracker {
    pub fn new(
        dispatcher: Arc<EventDispatcher>,
        clock: Arc<dyn Clock>,
        heartbeat_timeout: Duration,
    ) -> Self {
        Self {
            registry: Mutex::new(PresenceRegistry::new()),
            dispatcher,
            clock,
            heartbeat_timeout,
        }
    }

    fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }

    /// 接続を登録する。最初の接続なら本人以外へ `user.online` を通知し、true を返す。
    pub async fn mark_online(&self, user: User, connection: ConnectionId) -> bool {
        let now = self.now();
        let mut registry = self.registry.lock().await;
        let came_online = registry.connect(user.clone(), connection, now);
        if came_online {
            tracing::info!("User {} ({}) is online", user.id, user.name);
            let except = Some(user.id);
            self.dispatcher
                .publish(&ChannelName::Presence, &ChannelEvent::UserOnline(user), except)
                .await;
        }
        came_online
    }

    /// 接続を外す。最後の接続だった場合は `user.offline` を通知してそのユーザーを返す。
    pub async fn mark_offline(&self, connection: ConnectionId) -> Option<User> {
        let mut registry = self.registry.lock().await;
        let user = registry.disconnect(connection)?;
        tracing::info!("User {} ({}) is offline", user.id, user.name);
        self.dispatcher
            .publish(
                &ChannelName::Presence,
                &ChannelEvent::UserOffline(user.clone()),
                None,
            )
            .await;
        Some(user)
    }

    pub async fn heartbeat(&self, connection: ConnectionId) -> bool {
        let now = self.now();
        self.registry.lock().await.heartbeat(connection, now)
    }

    pub async fn list_online(&self) -> Vec<User> {
        self.registry.lock().await.online_users()
    }

    pub async fn is_online(&self, user_id: UserId) -> bool {
        self.registry.lock().await.is_online(user_id)
    }

    /// タイムアウトした接続を追い出し、オフラインになったユーザーを返す
    pub async fn sweep(&self) -> Vec<User> {
        let now = self.now();
        let timeout_millis = i64::try_from(self.heartbeat_timeout.as_millis()).unwrap_or(i64::MAX);

        let mut registry = self.registry.lock().await;
        let offline = registry.evict_stale(now, timeout_millis);
        for user in &offline {
            tracing::info!("User {} ({}) timed out", user.id, user.name);
            self.dispatcher
                .publish(
                    &ChannelName::Presence,
                    &ChannelEvent::UserOffline(user.clone()),
                    None,
                )
                .await;
        }
        offline
    }

    /// `interval` ごとに sweep を実行するタスクを起動する
    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // 最初の tick は即座に完了する
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let evicted = self.sweep().await;
                if !evicted.is_empty() {
                    tracing::debug!("Presence sweep evicted {} user(s)", evicted.len());
                }
            }
        })
    }
}
