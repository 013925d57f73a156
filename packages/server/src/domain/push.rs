//! PushNotifier trait 定義
//!
//! オフラインのユーザーへ外部チャネル（モバイルプッシュなど）で通知するための
//! fire-and-forget なインターフェース。

use async_trait::async_trait;
use thiserror::Error;

use super::{event::ChannelEvent, value_object::UserId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PushError {
    #[error("failed to encode notification: {0}")]
    Encode(String),
    #[error("push delivery failed: {0}")]
    Delivery(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PushNotifier: Send + Sync {
    /// 通知を送出する。実装は配送完了を待たずに戻ってよい。
    async fn notify(&self, recipient: UserId, event: &ChannelEvent) -> Result<(), PushError>;
}
