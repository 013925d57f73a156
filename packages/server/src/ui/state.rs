//! Shared application state.

use std::{sync::Arc, time::Duration};

use crate::{
    domain::UserRepository,
    usecase::{
        AccessGuard, ChannelUseCase, MessagingUseCase, NegotiationUseCase, PresenceTracker,
    },
};

pub struct AppState {
    /// 認証基盤から同期されたユーザー情報
    pub users: Arc<dyn UserRepository>,
    pub guard: Arc<AccessGuard>,
    pub presence: Arc<PresenceTracker>,
    pub channel: Arc<ChannelUseCase>,
    pub messaging: Arc<MessagingUseCase>,
    pub negotiation: Arc<NegotiationUseCase>,
    /// WebSocket の ping 間隔
    pub heartbeat_interval: Duration,
    /// この時間フレームが届かなければ接続を閉じる
    pub heartbeat_timeout: Duration,
}
