//! Entities
//!
//! 会話・メッセージ・応募（交渉レコード）・予約。
//! オンライン状態はユーザーの属性ではなく Presence Tracker が持つ派生状態なので、
//! `User` には含めない。

use serde::{Deserialize, Serialize};

use super::{
    negotiation::{Actor, NegotiationAction, NegotiationState, TransitionError},
    value_object::{
        ApplicationId, ConversationId, MessageBody, MessageId, ReservationId, Terms, Timestamp,
        UserId, ValidationError,
    },
};

/// 認証基盤から受け取るユーザー情報
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub avatar: Option<String>,
}

impl User {
    pub fn new(id: UserId, name: impl Into<String>, avatar: Option<String>) -> Self {
        Self {
            id,
            name: name.into(),
            avatar,
        }
    }
}

/// 会話の中での立場
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Party {
    Parent,
    Babysitter,
}

impl Party {
    /// 相手側の立場
    pub fn other(self) -> Self {
        match self {
            Party::Parent => Party::Babysitter,
            Party::Babysitter => Party::Parent,
        }
    }
}

/// 保護者とベビーシッターの 1 対 1 の会話
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub parent_id: UserId,
    pub babysitter_id: UserId,
    pub archived_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Conversation {
    pub fn new(
        id: ConversationId,
        parent_id: UserId,
        babysitter_id: UserId,
        created_at: Timestamp,
    ) -> Result<Self, ValidationError> {
        if parent_id == babysitter_id {
            return Err(ValidationError::SameParticipant);
        }
        Ok(Self {
            id,
            parent_id,
            babysitter_id,
            archived_at: None,
            created_at,
            updated_at: created_at,
        })
    }

    /// ユーザーの立場を返す（参加者でなければ None）
    pub fn party_of(&self, user_id: UserId) -> Option<Party> {
        if user_id == self.parent_id {
            Some(Party::Parent)
        } else if user_id == self.babysitter_id {
            Some(Party::Babysitter)
        } else {
            None
        }
    }

    pub fn is_participant(&self, user_id: UserId) -> bool {
        self.party_of(user_id).is_some()
    }

    pub fn user_of(&self, party: Party) -> UserId {
        match party {
            Party::Parent => self.parent_id,
            Party::Babysitter => self.babysitter_id,
        }
    }

    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// 参加者が送信したメッセージ
    Text,
    /// 交渉の状態遷移に伴ってサーバーが書き込むメッセージ
    System,
}

/// 会話内のメッセージ。既読状態以外は不変。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub body: MessageBody,
    pub kind: MessageKind,
    pub created_at: Timestamp,
    pub read_at: Option<Timestamp>,
}

impl Message {
    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }
}

/// 保存前のメッセージ（ID はストアが採番する）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub body: MessageBody,
    pub kind: MessageKind,
    pub created_at: Timestamp,
}

/// 交渉履歴の 1 件
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounterOffer {
    pub by: Party,
    pub terms: Terms,
    pub at: Timestamp,
}

/// 会話に紐づく応募（交渉レコード）
///
/// 状態は `apply` を通してのみ変化する。`version` は確定した遷移ごとに 1 増え、
/// ストア側の楽観的排他制御に使われる。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Application {
    pub id: ApplicationId,
    pub conversation_id: ConversationId,
    pub proposed_by: Party,
    pub state: NegotiationState,
    pub terms: Terms,
    pub counter_offers: Vec<CounterOffer>,
    pub version: u64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// 遷移を適用した結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedTransition {
    pub from: NegotiationState,
    pub to: NegotiationState,
    pub application: Application,
}

impl Application {
    /// 遷移表に従って新しい状態の Application を返す（self は変更しない）
    pub fn apply(
        &self,
        action: &NegotiationAction,
        actor: Actor,
        now: Timestamp,
    ) -> Result<AppliedTransition, TransitionError> {
        let to = self.state.next(action, actor, self.proposed_by)?;

        let mut next = self.clone();
        if let (Some(terms), Actor::Participant(by)) = (action.counter_terms(), actor) {
            next.counter_offers.push(CounterOffer {
                by,
                terms: terms.clone(),
                at: now,
            });
            next.terms = terms.clone();
        }
        next.state = to;
        next.version += 1;
        next.updated_at = now;

        Ok(AppliedTransition {
            from: self.state,
            to,
            application: next,
        })
    }
}

/// 保存前の応募
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewApplication {
    pub conversation_id: ConversationId,
    pub proposed_by: Party,
    pub terms: Terms,
    pub created_at: Timestamp,
}

/// 保存前の予約
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReservation {
    pub application_id: ApplicationId,
    pub conversation_id: ConversationId,
    pub parent_id: UserId,
    pub babysitter_id: UserId,
    pub terms: Terms,
    pub confirmed_at: Timestamp,
}

/// 合意成立時に作られる予約。予約サブシステムから参照される。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub application_id: ApplicationId,
    pub conversation_id: ConversationId,
    pub parent_id: UserId,
    pub babysitter_id: UserId,
    pub terms: Terms,
    pub confirmed_at: Timestamp,
}

/// 会話一覧の 1 行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSummary {
    pub conversation: Conversation,
    pub unread_count: usize,
    pub last_message: Option<Message>,
}
