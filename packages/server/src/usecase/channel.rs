//! UseCase: Channel Broadcaster の購読管理
//!
//! WebSocket 接続の登録・チャンネル購読・切断。
//! 購読は接続ごと・試行ごとに Access Guard を通す。

use std::sync::Arc;

use crate::domain::{
    Broadcaster, ChannelName, ConnectionId, PusherChannel, SubscriptionHandle, User, UserId,
};

use super::{access_guard::AccessGuard, error::CoreError, presence::PresenceTracker};

/// 購読成功時の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub handle: SubscriptionHandle,
    /// presence チャンネルを購読した場合の現在のオンライン一覧
    pub roster: Option<Vec<User>>,
}

pub struct ChannelUseCase {
    guard: Arc<AccessGuard>,
    presence: Arc<PresenceTracker>,
    broadcaster: Arc<dyn Broadcaster>,
}

impl ChannelUseCase {
    pub fn new(
        guard: Arc<AccessGuard>,
        presence: Arc<PresenceTracker>,
        broadcaster: Arc<dyn Broadcaster>,
    ) -> Self {
        Self {
            guard,
            presence,
            broadcaster,
        }
    }

    /// 接続を登録する。オンラインになるのは presence チャンネルを購読したとき。
    pub async fn connect(
        &self,
        user_id: UserId,
        connection: ConnectionId,
        sender: PusherChannel,
    ) {
        self.broadcaster
            .register_connection(connection, user_id, sender)
            .await;
    }

    /// チャンネルを購読する
    pub async fn subscribe(
        &self,
        user_id: UserId,
        connection: ConnectionId,
        channel_name: &str,
    ) -> Result<Subscription, CoreError> {
        let authorization = self.guard.authorize_channel(user_id, channel_name).await?;
        let handle = self
            .broadcaster
            .subscribe(authorization.channel, connection)
            .await?;
        let roster = match authorization.member {
            Some(member) if authorization.channel.is_presence() => {
                self.presence.mark_online(member, connection).await;
                Some(self.presence.list_online().await)
            }
            _ => None,
        };
        tracing::info!("User {} subscribed to {}", user_id, authorization.channel);
        Ok(Subscription { handle, roster })
    }

    /// 購読を解除する。購読していなければ何もしない。
    pub async fn unsubscribe(
        &self,
        connection: ConnectionId,
        channel_name: &str,
    ) -> Result<(), CoreError> {
        let channel: ChannelName = channel_name
            .parse()
            .map_err(|_| CoreError::NotFound("channel"))?;
        self.broadcaster
            .unsubscribe(&SubscriptionHandle {
                channel,
                connection,
            })
            .await;
        if channel.is_presence() {
            self.presence.mark_offline(connection).await;
        }
        Ok(())
    }

    /// ハートビートを記録する
    pub async fn heartbeat(&self, connection: ConnectionId) -> bool {
        self.presence.heartbeat(connection).await
    }

    /// 接続の購読をすべて外す。presence に参加していればオフラインにする
    pub async fn disconnect(&self, connection: ConnectionId) {
        self.broadcaster.disconnect(connection).await;
        self.presence.mark_offline(connection).await;
    }
}
