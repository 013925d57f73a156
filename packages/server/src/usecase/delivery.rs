//! イベント配信
//!
//! コミット済みの書き込みを Broadcaster へ流し、オフラインの宛先には PushNotifier で通知する。
//! 配信の失敗はログに残すだけで、呼び出し元の書き込みを失敗させない。

use std::sync::Arc;

use crate::domain::{
    BroadcastError, Broadcaster, ChannelEvent, ChannelName, PushNotifier, UserId,
};

pub struct EventDispatcher {
    broadcaster: Arc<dyn Broadcaster>,
    push_notifier: Arc<dyn PushNotifier>,
    /// publish の試行回数（1 以上）
    attempts: u32,
}

impl EventDispatcher {
    pub fn new(
        broadcaster: Arc<dyn Broadcaster>,
        push_notifier: Arc<dyn PushNotifier>,
        attempts: u32,
    ) -> Self {
        Self {
            broadcaster,
            push_notifier,
            attempts: attempts.max(1),
        }
    }

    /// チャンネルへ配信する。戻り値は配信できた接続数（失敗時は 0）。
    pub async fn publish(
        &self,
        channel: &ChannelName,
        event: &ChannelEvent,
        except: Option<UserId>,
    ) -> usize {
        for attempt in 1..=self.attempts {
            match self.broadcaster.publish(channel, event, except).await {
                Ok(delivered) => return delivered,
                Err(BroadcastError::Encode(e)) => {
                    tracing::warn!("Dropping {} on {}: {}", event.name(), channel, e);
                    return 0;
                }
                Err(e) => {
                    tracing::warn!(
                        "Publishing {} on {} failed (attempt {}/{}): {}",
                        event.name(),
                        channel,
                        attempt,
                        self.attempts,
                        e
                    );
                }
            }
        }
        0
    }

    /// オフラインのユーザーへプッシュ通知を送る（fire-and-forget）
    pub async fn push(&self, recipient: UserId, event: &ChannelEvent) {
        if let Err(e) = self.push_notifier.notify(recipient, event).await {
            tracing::warn!(
                "Push notification {} for user {} failed: {}",
                event.name(),
                recipient,
                e
            );
        }
    }
}
