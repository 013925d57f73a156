//! PushNotifier の実装
//!
//! - `LogPushNotifier`: 送信せずログに残すだけ（Webhook 未設定時のデフォルト）
//! - `HttpPushNotifier`: 設定された Webhook に JSON を POST する

use async_trait::async_trait;
use serde::Serialize;

use crate::{
    domain::{ChannelEvent, ChannelName, PushError, PushNotifier, UserId},
    infrastructure::dto::websocket::EventFrame,
};

/// Webhook に送る本文
#[derive(Debug, Serialize)]
struct PushPayload {
    recipient_id: u64,
    event: String,
    data: serde_json::Value,
}

impl PushPayload {
    fn build(recipient: UserId, event: &ChannelEvent) -> Result<Self, PushError> {
        let frame = EventFrame::from_event(&ChannelName::User(recipient), event)
            .map_err(|e| PushError::Encode(e.to_string()))?;
        Ok(Self {
            recipient_id: recipient.value(),
            event: frame.event,
            data: frame.data,
        })
    }
}

#[derive(Debug, Default)]
pub struct LogPushNotifier;

#[async_trait]
impl PushNotifier for LogPushNotifier {
    async fn notify(&self, recipient: UserId, event: &ChannelEvent) -> Result<(), PushError> {
        tracing::info!("Push notification for user {}: {}", recipient, event.name());
        Ok(())
    }
}

/// 外部のプッシュ配信サービスへ転送する
#[derive(Debug, Clone)]
pub struct HttpPushNotifier {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpPushNotifier {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl PushNotifier for HttpPushNotifier {
    /// リクエストはバックグラウンドで送る。配送の成否は呼び出し元に返さない。
    ///
    /// リクエストを組み立てられない場合（不正なエンドポイントなど）は `Delivery` を返す。
    async fn notify(&self, recipient: UserId, event: &ChannelEvent) -> Result<(), PushError> {
        let payload = PushPayload::build(recipient, event)?;
        let request = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .build()
            .map_err(|e| PushError::Delivery(e.to_string()))?;
        let client = self.client.clone();

        tokio::spawn(async move {
            let result = client
                .execute(request)
                .await
                .and_then(|response| response.error_for_status());
            match result {
                Ok(_) => tracing::debug!(
                    "Push '{}' delivered for user {}",
                    payload.event,
                    payload.recipient_id
                ),
                Err(e) => tracing::warn!(
                    "Push '{}' for user {} failed: {}",
                    payload.event,
                    payload.recipient_id,
                    e
                ),
            }
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConversationId, MessageId};

    #[test]
    fn test_push_payload_carries_recipient_and_event() {
        // テスト項目: Webhook 本文に宛先・イベント名・データが入る
        // given (前提条件):
        let event = ChannelEvent::ConversationUpdated {
            conversation_id: ConversationId::new(42),
            message_id: MessageId::new(7),
            sender_id: UserId::new(1),
        };

        // when (操作):
        let payload = PushPayload::build(UserId::new(2), &event).unwrap();

        // then (期待する結果):
        assert_eq!(payload.recipient_id, 2);
        assert_eq!(payload.event, "conversation.updated");
        assert_eq!(payload.data["message_id"], 7);
    }

    #[tokio::test]
    async fn test_http_notifier_returns_before_delivery() {
        // テスト項目: 宛先に到達できなくても notify はエラーを返さない
        // given (前提条件):
        let notifier = HttpPushNotifier::new("http://127.0.0.1:9/push");
        let event = ChannelEvent::UserTyping {
            user_id: UserId::new(1),
        };

        // when (操作):
        let result = notifier.notify(UserId::new(2), &event).await;

        // then (期待する結果):
        assert_eq!(result, Ok(()));
    }

    #[tokio::test]
    async fn test_http_notifier_rejects_invalid_endpoint() {
        // テスト項目: エンドポイントが URL として不正ならリクエストを組み立てられず Delivery エラー
        // given (前提条件):
        let notifier = HttpPushNotifier::new("not a url");
        let event = ChannelEvent::UserTyping {
            user_id: UserId::new(1),
        };

        // when (操作):
        let result = notifier.notify(UserId::new(2), &event).await;

        // then (期待する結果):
        assert!(matches!(result, Err(PushError::Delivery(_))));
    }
}
