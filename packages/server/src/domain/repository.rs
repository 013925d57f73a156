//! Repository trait 定義
//!
//! ドメイン層が必要とするデータアクセスのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。
//!
//! 永続化エンジンの設計は対象外。ここで決めるのは Messaging Core との契約だけ。

use async_trait::async_trait;
use thiserror::Error;

use super::{
    entity::{
        Application, Conversation, Message, NewApplication, NewMessage, NewReservation,
        Reservation, User,
    },
    value_object::{ApplicationId, ConversationId, MessageId, Timestamp, UserId, ValidationError},
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("version conflict: expected {expected}, found {actual}")]
    VersionConflict { expected: u64, actual: u64 },
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// ユーザー情報（認証基盤が持つ ID / 名前 / アバター）
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// 認証基盤からの同期用
    async fn upsert_user(&self, user: User) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ConversationRepository: Send + Sync {
    async fn find_conversation(
        &self,
        id: ConversationId,
    ) -> Result<Option<Conversation>, RepositoryError>;

    /// 保護者とシッターの組で会話を探し、なければ作成する
    async fn find_or_create_conversation(
        &self,
        parent_id: UserId,
        babysitter_id: UserId,
        now: Timestamp,
    ) -> Result<Conversation, RepositoryError>;

    /// ユーザーが参加している会話（更新日時の新しい順）
    async fn list_conversations_for(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Conversation>, RepositoryError>;

    /// アーカイブ状態にする（既にアーカイブ済みなら元の日時を保持）
    async fn archive_conversation(
        &self,
        id: ConversationId,
        at: Timestamp,
    ) -> Result<Conversation, RepositoryError>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// メッセージを追加し、会話の更新日時を進める
    async fn append_message(&self, message: NewMessage) -> Result<Message, RepositoryError>;

    async fn find_message(
        &self,
        conversation_id: ConversationId,
        message_id: MessageId,
    ) -> Result<Option<Message>, RepositoryError>;

    /// 既読にする。既に既読なら何もせず `None` を返す。
    async fn mark_read(
        &self,
        message_id: MessageId,
        at: Timestamp,
    ) -> Result<Option<Message>, RepositoryError>;

    /// 会話のメッセージ（古い順）
    async fn list_messages(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<Message>, RepositoryError>;

    /// `reader_id` から見た未読数（自分の送信分は数えない）
    async fn count_unread(
        &self,
        conversation_id: ConversationId,
        reader_id: UserId,
    ) -> Result<usize, RepositoryError>;
}

/// 遷移の確定内容。ストアは 1 回の操作ですべてを書き込むか、何も書き込まない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionCommit {
    /// 遷移後の Application（`version` は +1 済み）
    pub application: Application,
    /// 保存されている Application の `version` がこの値でなければ失敗させる
    pub expected_version: u64,
    pub message: NewMessage,
    pub reservation: Option<NewReservation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedTransition {
    pub application: Application,
    pub message: Message,
    pub reservation: Option<Reservation>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ApplicationRepository: Send + Sync {
    /// 応募と提案メッセージを同時に作成する。未終了の応募があれば `Conflict`。
    async fn create_application(
        &self,
        application: NewApplication,
        message: NewMessage,
    ) -> Result<(Application, Message), RepositoryError>;

    /// 会話の最新の応募
    async fn current_application(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Option<Application>, RepositoryError>;

    /// 状態遷移・システムメッセージ・予約をまとめて確定する
    async fn commit_transition(
        &self,
        commit: TransitionCommit,
    ) -> Result<CommittedTransition, RepositoryError>;

    async fn find_reservation(
        &self,
        application_id: ApplicationId,
    ) -> Result<Option<Reservation>, RepositoryError>;
}
