//! Domain events fanned out through the broadcaster.

use super::{
    entity::{Message, User},
    negotiation::NegotiationState,
    value_object::{ApplicationId, ConversationId, MessageId, Terms, UserId},
};

/// A negotiation transition, published together with its system message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiationEvent {
    pub application_id: ApplicationId,
    pub conversation_id: ConversationId,
    /// `None` when the application was just proposed.
    pub from_state: Option<NegotiationState>,
    pub to_state: NegotiationState,
    pub terms: Terms,
    pub message: Message,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    MessageNew(Message),
    MessageRead {
        message_id: MessageId,
        reader_id: UserId,
    },
    UserTyping {
        user_id: UserId,
    },
    UserOnline(User),
    UserOffline(User),
    Negotiation(NegotiationEvent),
    ConversationUpdated {
        conversation_id: ConversationId,
        message_id: MessageId,
        sender_id: UserId,
    },
    ConversationArchived {
        conversation_id: ConversationId,
        archived_by: UserId,
    },
}

impl ChannelEvent {
    /// Event name as seen by clients.
    pub fn name(&self) -> String {
        match self {
            ChannelEvent::MessageNew(_) => "message.new".to_string(),
            ChannelEvent::MessageRead { .. } => "message.read".to_string(),
            ChannelEvent::UserTyping { .. } => "user.typing".to_string(),
            ChannelEvent::UserOnline(_) => "user.online".to_string(),
            ChannelEvent::UserOffline(_) => "user.offline".to_string(),
            ChannelEvent::Negotiation(event) => format!("application.{}", event.to_state),
            ChannelEvent::ConversationUpdated { .. } => "conversation.updated".to_string(),
            ChannelEvent::ConversationArchived { .. } => "conversation.archived".to_string(),
        }
    }
}
