//! UseCase: Conversation Access Guard
//!
//! 会話チャンネルの購読と会話への書き込みの前に必ず通る認可チェック。
//! 会話が見つからない場合は拒否する（fail closed）。

use std::sync::Arc;

use crate::domain::{
    ChannelName, Conversation, ConversationId, ConversationRepository, Party, User, UserId,
    UserRepository,
};

use super::error::CoreError;

/// チャンネル認可の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelAuthorization {
    pub channel: ChannelName,
    /// presence チャンネルのときのメンバー情報
    pub member: Option<User>,
}

pub struct AccessGuard {
    conversations: Arc<dyn ConversationRepository>,
    users: Arc<dyn UserRepository>,
}

impl AccessGuard {
    pub fn new(
        conversations: Arc<dyn ConversationRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            conversations,
            users,
        }
    }

    /// ユーザーが会話の参加者（保護者またはシッター）なら true
    pub async fn authorize(&self, user_id: UserId, conversation_id: ConversationId) -> bool {
        match self.conversations.find_conversation(conversation_id).await {
            Ok(Some(conversation)) => conversation.is_participant(user_id),
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(
                    "Failed to load conversation {} for authorization: {}",
                    conversation_id,
                    e
                );
                false
            }
        }
    }

    /// 書き込み用: 会話と参加者の立場を返す
    pub async fn require_participant(
        &self,
        user_id: UserId,
        conversation_id: ConversationId,
    ) -> Result<(Conversation, Party), CoreError> {
        let conversation = self
            .conversations
            .find_conversation(conversation_id)
            .await?
            .ok_or(CoreError::NotFound("conversation"))?;
        let party = conversation
            .party_of(user_id)
            .ok_or(CoreError::Unauthorized)?;
        Ok((conversation, party))
    }

    /// チャンネル名の購読可否を判定する。未知のチャンネル名は拒否。
    pub async fn authorize_channel(
        &self,
        user_id: UserId,
        channel_name: &str,
    ) -> Result<ChannelAuthorization, CoreError> {
        let channel: ChannelName = channel_name.parse().map_err(|_| {
            tracing::warn!("User {} asked for unknown channel '{}'", user_id, channel_name);
            CoreError::Unauthorized
        })?;

        let member = match channel {
            ChannelName::Conversation(conversation_id) => {
                if !self.authorize(user_id, conversation_id).await {
                    return Err(CoreError::Unauthorized);
                }
                None
            }
            ChannelName::User(owner) => {
                if owner != user_id {
                    return Err(CoreError::Unauthorized);
                }
                None
            }
            ChannelName::Presence => {
                let user = self
                    .users
                    .find_user(user_id)
                    .await?
                    .ok_or(CoreError::Unauthorized)?;
                Some(user)
            }
        };

        Ok(ChannelAuthorization { channel, member })
    }
}
