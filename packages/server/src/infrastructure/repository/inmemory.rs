//! InMemory Store 実装
//!
//! ドメイン層が定義する Repository trait 群の具体的な実装。
//! 1 つの Mutex の中に全テーブルを持つので、`commit_transition` などの複合書き込みは
//! そのまま原子的になる。
//!
//! ## 技術的負債
//!
//! ドメインモデルをそのままストレージとして保持している。
//! RDBMS 実装を追加する際は Row → Entity の変換層が必要になる。

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    Application, ApplicationId, ApplicationRepository, CommittedTransition, Conversation,
    ConversationId, ConversationRepository, Message, MessageId, MessageRepository,
    NewApplication, NewMessage, RepositoryError, Reservation, ReservationId, Timestamp,
    TransitionCommit, User, UserId, UserRepository,
};

#[derive(Debug, Default)]
struct StoreState {
    users: HashMap<UserId, User>,
    conversations: BTreeMap<ConversationId, Conversation>,
    messages: BTreeMap<MessageId, Message>,
    applications: BTreeMap<ApplicationId, Application>,
    reservations: HashMap<ApplicationId, Reservation>,
    last_conversation_id: u64,
    last_message_id: u64,
    last_application_id: u64,
    last_reservation_id: u64,
}

impl StoreState {
    fn insert_message(&mut self, new: NewMessage) -> Result<Message, RepositoryError> {
        let conversation = self
            .conversations
            .get_mut(&new.conversation_id)
            .ok_or(RepositoryError::NotFound("conversation"))?;
        conversation.updated_at = conversation.updated_at.max(new.created_at);

        self.last_message_id += 1;
        let message = Message {
            id: MessageId::new(self.last_message_id),
            conversation_id: new.conversation_id,
            sender_id: new.sender_id,
            body: new.body,
            kind: new.kind,
            created_at: new.created_at,
            read_at: None,
        };
        self.messages.insert(message.id, message.clone());
        Ok(message)
    }

    fn latest_application(&self, conversation_id: ConversationId) -> Option<&Application> {
        self.applications
            .values()
            .rev()
            .find(|application| application.conversation_id == conversation_id)
    }
}

/// インメモリ Store 実装
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

impl InMemoryStore {
    /// 新しい空の InMemoryStore を作成
    pub fn new() -> Self {
        Self::default()
    }

    /// 既存の会話をそのまま登録する（移行・テスト用）
    pub async fn insert_conversation(&self, conversation: Conversation) {
        let mut state = self.state.lock().await;
        state.last_conversation_id = state.last_conversation_id.max(conversation.id.value());
        state.conversations.insert(conversation.id, conversation);
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state.users.get(&id).cloned())
    }

    async fn upsert_user(&self, user: User) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().await;
        state.users.insert(user.id, user);
        Ok(())
    }
}

#[async_trait]
impl ConversationRepository for InMemoryStore {
    async fn find_conversation(
        &self,
        id: ConversationId,
    ) -> Result<Option<Conversation>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state.conversations.get(&id).cloned())
    }

    async fn find_or_create_conversation(
        &self,
        parent_id: UserId,
        babysitter_id: UserId,
        now: Timestamp,
    ) -> Result<Conversation, RepositoryError> {
        let mut state = self.state.lock().await;
        if let Some(existing) = state
            .conversations
            .values()
            .find(|c| c.parent_id == parent_id && c.babysitter_id == babysitter_id)
        {
            return Ok(existing.clone());
        }

        let id = ConversationId::new(state.last_conversation_id + 1);
        let conversation = Conversation::new(id, parent_id, babysitter_id, now)?;
        state.last_conversation_id = id.value();
        state.conversations.insert(id, conversation.clone());
        tracing::debug!("Conversation {} created", id);
        Ok(conversation)
    }

    async fn list_conversations_for(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Conversation>, RepositoryError> {
        let state = self.state.lock().await;
        let mut conversations: Vec<Conversation> = state
            .conversations
            .values()
            .filter(|c| c.is_participant(user_id))
            .cloned()
            .collect();
        conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
        Ok(conversations)
    }

    async fn archive_conversation(
        &self,
        id: ConversationId,
        at: Timestamp,
    ) -> Result<Conversation, RepositoryError> {
        let mut state = self.state.lock().await;
        let conversation = state
            .conversations
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound("conversation"))?;
        if conversation.archived_at.is_none() {
            conversation.archived_at = Some(at);
            conversation.updated_at = at;
        }
        Ok(conversation.clone())
    }
}

#[async_trait]
impl MessageRepository for InMemoryStore {
    async fn append_message(&self, message: NewMessage) -> Result<Message, RepositoryError> {
        let mut state = self.state.lock().await;
        state.insert_message(message)
    }

    async fn find_message(
        &self,
        conversation_id: ConversationId,
        message_id: MessageId,
    ) -> Result<Option<Message>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state
            .messages
            .get(&message_id)
            .filter(|m| m.conversation_id == conversation_id)
            .cloned())
    }

    async fn mark_read(
        &self,
        message_id: MessageId,
        at: Timestamp,
    ) -> Result<Option<Message>, RepositoryError> {
        let mut state = self.state.lock().await;
        let message = state
            .messages
            .get_mut(&message_id)
            .ok_or(RepositoryError::NotFound("message"))?;
        if message.is_read() {
            return Ok(None);
        }
        message.read_at = Some(at);
        Ok(Some(message.clone()))
    }

    async fn list_messages(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<Message>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state
            .messages
            .values()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect())
    }

    async fn count_unread(
        &self,
        conversation_id: ConversationId,
        reader_id: UserId,
    ) -> Result<usize, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state
            .messages
            .values()
            .filter(|m| {
                m.conversation_id == conversation_id && m.sender_id != reader_id && !m.is_read()
            })
            .count())
    }
}

#[async_trait]
impl ApplicationRepository for InMemoryStore {
    async fn create_application(
        &self,
        application: NewApplication,
        message: NewMessage,
    ) -> Result<(Application, Message), RepositoryError> {
        let mut state = self.state.lock().await;
        if !state
            .conversations
            .contains_key(&application.conversation_id)
        {
            return Err(RepositoryError::NotFound("conversation"));
        }
        if let Some(open) = state
            .latest_application(application.conversation_id)
            .filter(|a| !a.state.is_terminal())
        {
            return Err(RepositoryError::Conflict(format!(
                "application {} is still open",
                open.id
            )));
        }

        let message = state.insert_message(message)?;
        state.last_application_id += 1;
        let created = Application {
            id: ApplicationId::new(state.last_application_id),
            conversation_id: application.conversation_id,
            proposed_by: application.proposed_by,
            state: crate::domain::NegotiationState::Proposed,
            terms: application.terms,
            counter_offers: Vec::new(),
            version: 0,
            created_at: application.created_at,
            updated_at: application.created_at,
        };
        state.applications.insert(created.id, created.clone());
        Ok((created, message))
    }

    async fn current_application(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Option<Application>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state.latest_application(conversation_id).cloned())
    }

    async fn commit_transition(
        &self,
        commit: TransitionCommit,
    ) -> Result<CommittedTransition, RepositoryError> {
        let mut state = self.state.lock().await;
        let stored = state
            .applications
            .get(&commit.application.id)
            .ok_or(RepositoryError::NotFound("application"))?;
        if stored.version != commit.expected_version {
            return Err(RepositoryError::VersionConflict {
                expected: commit.expected_version,
                actual: stored.version,
            });
        }

        // ここから先は失敗しない順序で書き込む（会話の存在を先に確認）
        if !state
            .conversations
            .contains_key(&commit.message.conversation_id)
        {
            return Err(RepositoryError::NotFound("conversation"));
        }
        let message = state.insert_message(commit.message)?;

        let reservation = commit.reservation.map(|new| {
            state.last_reservation_id += 1;
            let reservation = Reservation {
                id: ReservationId::new(state.last_reservation_id),
                application_id: new.application_id,
                conversation_id: new.conversation_id,
                parent_id: new.parent_id,
                babysitter_id: new.babysitter_id,
                terms: new.terms,
                confirmed_at: new.confirmed_at,
            };
            state
                .reservations
                .insert(reservation.application_id, reservation.clone());
            reservation
        });

        state
            .applications
            .insert(commit.application.id, commit.application.clone());

        Ok(CommittedTransition {
            application: commit.application,
            message,
            reservation,
        })
    }

    async fn find_reservation(
        &self,
        application_id: ApplicationId,
    ) -> Result<Option<Reservation>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state.reservations.get(&application_id).cloned())
    }
}
