//! UseCase テスト用のフィクスチャ
//!
//! 会話 42（保護者 1 / シッター 2）と、会話に参加していないユーザー 3 を用意する。

use std::sync::Arc;

use nounou_shared::time::ManualClock;
use tokio::sync::mpsc;

use crate::{
    domain::{
        Broadcaster, ChannelName, ConnectionId, Conversation, ConversationId, PushNotifier,
        Timestamp, User, UserId, UserRepository,
    },
    infrastructure::{
        broadcaster::InProcessBroadcaster, dto::websocket::EventFrame, push::LogPushNotifier,
        repository::InMemoryStore,
    },
};

use super::{
    AccessGuard, ChannelUseCase, ConversationLocks, EventDispatcher, MessagingUseCase,
    NegotiationUseCase, PresenceTracker,
};

pub const PARENT: UserId = UserId::new(1);
pub const SITTER: UserId = UserId::new(2);
pub const STRANGER: UserId = UserId::new(3);
pub const CONVERSATION: ConversationId = ConversationId::new(42);

const START_MILLIS: i64 = 1_700_000_000_000;

pub struct Fixture {
    pub store: Arc<InMemoryStore>,
    pub broadcaster: Arc<dyn Broadcaster>,
    pub clock: Arc<ManualClock>,
    pub presence: Arc<PresenceTracker>,
    pub messaging: MessagingUseCase,
    pub negotiation: NegotiationUseCase,
    pub channel: ChannelUseCase,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::build(None, Arc::new(LogPushNotifier), 2000).await
    }

    pub async fn with_max_body_length(max_body_length: usize) -> Self {
        Self::build(None, Arc::new(LogPushNotifier), max_body_length).await
    }

    /// `broadcaster` が `None` ならプロセス内実装を使う
    pub async fn build(
        broadcaster: Option<Arc<dyn Broadcaster>>,
        push_notifier: Arc<dyn PushNotifier>,
        max_body_length: usize,
    ) -> Self {
        let store = Arc::new(InMemoryStore::new());
        for (id, name) in [(PARENT, "Claire"), (SITTER, "Sophie"), (STRANGER, "Marc")] {
            store.upsert_user(User::new(id, name, None)).await.unwrap();
        }
        store
            .insert_conversation(
                Conversation::new(CONVERSATION, PARENT, SITTER, Timestamp::new(START_MILLIS))
                    .unwrap(),
            )
            .await;

        let broadcaster =
            broadcaster.unwrap_or_else(|| Arc::new(InProcessBroadcaster::new()) as Arc<dyn Broadcaster>);
        let clock = Arc::new(ManualClock::new(START_MILLIS));
        let dispatcher = Arc::new(EventDispatcher::new(
            broadcaster.clone(),
            push_notifier,
            3,
        ));
        let locks = Arc::new(ConversationLocks::new());
        let guard = Arc::new(AccessGuard::new(store.clone(), store.clone()));
        let presence = Arc::new(PresenceTracker::new(
            dispatcher.clone(),
            clock.clone(),
            std::time::Duration::from_secs(60),
        ));

        let messaging = MessagingUseCase::new(
            guard.clone(),
            store.clone(),
            store.clone(),
            dispatcher.clone(),
            presence.clone(),
            locks.clone(),
            clock.clone(),
            max_body_length,
        );
        let negotiation = NegotiationUseCase::new(
            guard.clone(),
            store.clone(),
            store.clone(),
            dispatcher,
            locks,
            clock.clone(),
            max_body_length,
        );
        let channel = ChannelUseCase::new(guard, presence.clone(), broadcaster.clone());

        Self {
            store,
            broadcaster,
            clock,
            presence,
            messaging,
            negotiation,
            channel,
        }
    }

    pub fn user(&self, id: UserId) -> User {
        match id {
            PARENT => User::new(PARENT, "Claire", None),
            SITTER => User::new(SITTER, "Sophie", None),
            _ => User::new(id, "Marc", None),
        }
    }

    /// 会話チャンネルと本人のユーザーチャンネルを購読した接続を作る（presence には登録しない）
    pub async fn connect(&self, user_id: UserId) -> (ConnectionId, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connection = ConnectionId::generate();
        self.broadcaster
            .register_connection(connection, user_id, tx)
            .await;
        for channel in [
            ChannelName::Conversation(CONVERSATION),
            ChannelName::User(user_id),
        ] {
            self.broadcaster
                .subscribe(channel, connection)
                .await
                .unwrap();
        }
        (connection, rx)
    }
}

/// 受信済みのフレームをすべて取り出す
pub fn drain(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<EventFrame> {
    let mut frames = Vec::new();
    while let Ok(raw) = rx.try_recv() {
        frames.push(serde_json::from_str(&raw).unwrap());
    }
    frames
}
