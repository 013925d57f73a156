//! UseCase: Message Store & Delivery
//!
//! 会話へのメッセージ送信・既読・入力中通知・アーカイブと、その読み出し。
//!
//! 書き込み系は会話ロックを取得してから認可 → 永続化 → publish の順に処理する。
//! publish は必ずコミットの後に行い、配信の失敗で書き込みが失敗することはない。

use std::sync::Arc;

use nounou_shared::time::Clock;

use crate::domain::{
    ChannelEvent, ChannelName, Conversation, ConversationId, ConversationRepository,
    ConversationSummary, Message, MessageBody, MessageId, MessageKind, MessageRepository,
    NewMessage, Timestamp, UserId,
};

use super::{
    access_guard::AccessGuard, delivery::EventDispatcher, error::CoreError,
    lock::ConversationLocks, presence::PresenceTracker,
};

pub struct MessagingUseCase {
    guard: Arc<AccessGuard>,
    conversations: Arc<dyn ConversationRepository>,
    messages: Arc<dyn MessageRepository>,
    dispatcher: Arc<EventDispatcher>,
    presence: Arc<PresenceTracker>,
    locks: Arc<ConversationLocks>,
    clock: Arc<dyn Clock>,
    max_body_length: usize,
}

impl MessagingUseCase {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        guard: Arc<AccessGuard>,
        conversations: Arc<dyn ConversationRepository>,
        messages: Arc<dyn MessageRepository>,
        dispatcher: Arc<EventDispatcher>,
        presence: Arc<PresenceTracker>,
        locks: Arc<ConversationLocks>,
        clock: Arc<dyn Clock>,
        max_body_length: usize,
    ) -> Self {
        Self {
            guard,
            conversations,
            messages,
            dispatcher,
            presence,
            locks,
            clock,
            max_body_length,
        }
    }

    fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }

    /// メッセージを送信する
    ///
    /// 送信者以外の購読者へ `message.new`、相手のユーザーチャンネルへ `conversation.updated` を配信する。
    /// 相手がオフラインならプッシュ通知も送る。
    pub async fn send(
        &self,
        conversation_id: ConversationId,
        sender_id: UserId,
        body: &str,
    ) -> Result<Message, CoreError> {
        let _lock = self.locks.acquire(conversation_id).await;

        let (conversation, party) = self
            .guard
            .require_participant(sender_id, conversation_id)
            .await?;
        if conversation.is_archived() {
            return Err(CoreError::ConversationArchived);
        }
        let body = MessageBody::with_max_length(body, self.max_body_length)?;

        let message = self
            .messages
            .append_message(NewMessage {
                conversation_id,
                sender_id,
                body,
                kind: MessageKind::Text,
                created_at: self.now(),
            })
            .await?;
        tracing::info!(
            "Message {} stored in conversation {} (sender: {})",
            message.id,
            conversation_id,
            sender_id
        );

        let recipient = conversation.user_of(party.other());
        let event = ChannelEvent::MessageNew(message.clone());
        self.dispatcher
            .publish(
                &ChannelName::Conversation(conversation_id),
                &event,
                Some(sender_id),
            )
            .await;
        self.dispatcher
            .publish(
                &ChannelName::User(recipient),
                &ChannelEvent::ConversationUpdated {
                    conversation_id,
                    message_id: message.id,
                    sender_id,
                },
                None,
            )
            .await;
        if !self.presence.is_online(recipient).await {
            self.dispatcher.push(recipient, &event).await;
        }

        Ok(message)
    }

    /// メッセージを既読にする
    ///
    /// 既読済み、または自分のメッセージの場合は何もせず `None` を返す。
    pub async fn mark_read(
        &self,
        conversation_id: ConversationId,
        message_id: MessageId,
        reader_id: UserId,
    ) -> Result<Option<Message>, CoreError> {
        let _lock = self.locks.acquire(conversation_id).await;

        self.guard
            .require_participant(reader_id, conversation_id)
            .await?;
        let message = self
            .messages
            .find_message(conversation_id, message_id)
            .await?
            .ok_or(CoreError::NotFound("message"))?;
        if message.sender_id == reader_id || message.is_read() {
            return Ok(None);
        }

        let Some(message) = self.messages.mark_read(message_id, self.now()).await? else {
            return Ok(None);
        };
        self.dispatcher
            .publish(
                &ChannelName::Conversation(conversation_id),
                &ChannelEvent::MessageRead {
                    message_id,
                    reader_id,
                },
                Some(reader_id),
            )
            .await;
        Ok(Some(message))
    }

    /// 入力中であることを相手に知らせる（永続化しない）
    pub async fn notify_typing(
        &self,
        conversation_id: ConversationId,
        user_id: UserId,
    ) -> Result<(), CoreError> {
        self.guard
            .require_participant(user_id, conversation_id)
            .await?;
        self.dispatcher
            .publish(
                &ChannelName::Conversation(conversation_id),
                &ChannelEvent::UserTyping { user_id },
                Some(user_id),
            )
            .await;
        Ok(())
    }

    /// 会話をアーカイブする。2 回目以降は何も通知しない。
    pub async fn archive(
        &self,
        conversation_id: ConversationId,
        user_id: UserId,
    ) -> Result<Conversation, CoreError> {
        let _lock = self.locks.acquire(conversation_id).await;

        let (conversation, _) = self
            .guard
            .require_participant(user_id, conversation_id)
            .await?;
        if conversation.is_archived() {
            return Ok(conversation);
        }

        let archived = self
            .conversations
            .archive_conversation(conversation_id, self.now())
            .await?;
        tracing::info!("Conversation {} archived by {}", conversation_id, user_id);
        self.dispatcher
            .publish(
                &ChannelName::Conversation(conversation_id),
                &ChannelEvent::ConversationArchived {
                    conversation_id,
                    archived_by: user_id,
                },
                None,
            )
            .await;
        Ok(archived)
    }

    /// 会話のメッセージ履歴（古い順）
    pub async fn history(
        &self,
        conversation_id: ConversationId,
        user_id: UserId,
    ) -> Result<Vec<Message>, CoreError> {
        self.guard
            .require_participant(user_id, conversation_id)
            .await?;
        Ok(self.messages.list_messages(conversation_id).await?)
    }

    /// ユーザーの会話一覧（未読数と最新メッセージ付き）
    pub async fn list_conversations(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ConversationSummary>, CoreError> {
        let conversations = self.conversations.list_conversations_for(user_id).await?;
        let mut summaries = Vec::with_capacity(conversations.len());
        for conversation in conversations {
            let unread_count = self
                .messages
                .count_unread(conversation.id, user_id)
                .await?;
            let last_message = self
                .messages
                .list_messages(conversation.id)
                .await?
                .pop();
            summaries.push(ConversationSummary {
                conversation,
                unread_count,
                last_message,
            });
        }
        Ok(summaries)
    }
}
