//! Broadcaster trait 定義
//!
//! ドメインイベントを購読者へ配信するためのインターフェース。
//! 具体的な実装（プロセス内バス、外部 Pub/Sub など）は Infrastructure 層が提供する。

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use super::{
    channel::ChannelName,
    event::ChannelEvent,
    value_object::{ConnectionId, UserId},
};

/// 接続へのフレーム送信用チャンネル（WebSocket の pusher loop が受信側を持つ）
pub type PusherChannel = mpsc::UnboundedSender<String>;

/// 購読を解除するためのハンドル
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionHandle {
    pub channel: ChannelName,
    pub connection: ConnectionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BroadcastError {
    #[error("connection `{0}` is not registered")]
    UnknownConnection(ConnectionId),
    #[error("failed to encode event: {0}")]
    Encode(String),
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Broadcaster trait
///
/// - 1 チャンネル内のイベントは publish された順に各購読者へ届く（チャンネル単位の FIFO）
/// - 購読前に publish されたイベントは再送しない
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Broadcaster: Send + Sync {
    /// 接続を登録
    async fn register_connection(
        &self,
        connection: ConnectionId,
        user_id: UserId,
        sender: PusherChannel,
    );

    /// チャンネルを購読（認可は呼び出し側の責務）
    async fn subscribe(
        &self,
        channel: ChannelName,
        connection: ConnectionId,
    ) -> Result<SubscriptionHandle, BroadcastError>;

    /// 購読を解除（存在しなければ何もしない）
    async fn unsubscribe(&self, handle: &SubscriptionHandle);

    /// 接続のすべての購読を解除し、登録を削除
    async fn disconnect(&self, connection: ConnectionId);

    /// チャンネルの購読者へイベントを配信
    ///
    /// `except` が指定された場合、そのユーザーの接続には配信しない。
    /// 戻り値は配信キューに積んだ接続数。
    async fn publish(
        &self,
        channel: &ChannelName,
        event: &ChannelEvent,
        except: Option<UserId>,
    ) -> Result<usize, BroadcastError>;
}
