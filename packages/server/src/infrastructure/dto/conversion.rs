//! Conversion logic between DTOs and domain entities.

use crate::domain::{
    Application, ChannelEvent, ChannelName, Conversation, ConversationSummary, CounterOffer,
    HourlyRate, Message, MessageKind, Reservation, Terms, User, ValidationError,
};

use super::{
    http::{ApplicationDto, ConversationDto, ConversationSummaryDto, ReservationDto},
    websocket::{
        ConversationArchivedDto, ConversationUpdatedDto, CounterOfferDto, EventFrame,
        MessageDto, MessageReadDto, NegotiationDto, OnlineUserDto, PresenceChangeDto, TermsDto,
        TypingDto,
    },
};

// ========================================
// DTO → Domain
// ========================================

impl TryFrom<TermsDto> for Terms {
    type Error = ValidationError;

    fn try_from(dto: TermsDto) -> Result<Self, Self::Error> {
        Ok(Terms::new(HourlyRate::from_cents(dto.hourly_rate_cents)?, dto.note))
    }
}

// ========================================
// Domain → DTO
// ========================================

impl From<&Terms> for TermsDto {
    fn from(terms: &Terms) -> Self {
        Self {
            hourly_rate_cents: terms.hourly_rate.cents(),
            note: terms.note.clone(),
        }
    }
}

impl From<&Message> for MessageDto {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id.value(),
            conversation_id: message.conversation_id.value(),
            sender_id: message.sender_id.value(),
            body: message.body.as_str().to_string(),
            kind: match message.kind {
                MessageKind::Text => "text".to_string(),
                MessageKind::System => "system".to_string(),
            },
            created_at: message.created_at.to_rfc3339(),
            read_at: message.read_at.map(|at| at.to_rfc3339()),
        }
    }
}

impl From<&User> for OnlineUserDto {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.value(),
            name: user.name.clone(),
            avatar: user.avatar.clone(),
        }
    }
}

impl PresenceChangeDto {
    pub fn from_user(user: &User, is_online: bool) -> Self {
        Self {
            user_id: user.id.value(),
            user_name: user.name.clone(),
            is_online,
            avatar: user.avatar.clone(),
        }
    }
}

impl From<&CounterOffer> for CounterOfferDto {
    fn from(offer: &CounterOffer) -> Self {
        Self {
            by: offer.by,
            terms: (&offer.terms).into(),
            at: offer.at.to_rfc3339(),
        }
    }
}

impl From<&Reservation> for ReservationDto {
    fn from(reservation: &Reservation) -> Self {
        Self {
            id: reservation.id.value(),
            application_id: reservation.application_id.value(),
            parent_id: reservation.parent_id.value(),
            babysitter_id: reservation.babysitter_id.value(),
            terms: (&reservation.terms).into(),
            confirmed_at: reservation.confirmed_at.to_rfc3339(),
        }
    }
}

impl ApplicationDto {
    pub fn from_parts(application: &Application, reservation: Option<&Reservation>) -> Self {
        Self {
            id: application.id.value(),
            conversation_id: application.conversation_id.value(),
            proposed_by: application.proposed_by,
            state: application.state,
            terms: (&application.terms).into(),
            counter_offers: application.counter_offers.iter().map(Into::into).collect(),
            version: application.version,
            created_at: application.created_at.to_rfc3339(),
            updated_at: application.updated_at.to_rfc3339(),
            reservation: reservation.map(Into::into),
        }
    }
}

impl From<&Conversation> for ConversationDto {
    fn from(conversation: &Conversation) -> Self {
        Self {
            id: conversation.id.value(),
            parent_id: conversation.parent_id.value(),
            babysitter_id: conversation.babysitter_id.value(),
            archived_at: conversation.archived_at.map(|at| at.to_rfc3339()),
            created_at: conversation.created_at.to_rfc3339(),
            updated_at: conversation.updated_at.to_rfc3339(),
        }
    }
}

impl From<&ConversationSummary> for ConversationSummaryDto {
    fn from(summary: &ConversationSummary) -> Self {
        let conversation = &summary.conversation;
        Self {
            id: conversation.id.value(),
            parent_id: conversation.parent_id.value(),
            babysitter_id: conversation.babysitter_id.value(),
            archived_at: conversation.archived_at.map(|at| at.to_rfc3339()),
            updated_at: conversation.updated_at.to_rfc3339(),
            unread_count: summary.unread_count,
            last_message: summary.last_message.as_ref().map(Into::into),
        }
    }
}

/// Payload object of a domain event.
fn event_data(event: &ChannelEvent) -> Result<serde_json::Value, serde_json::Error> {
    match event {
        ChannelEvent::MessageNew(message) => serde_json::to_value(MessageDto::from(message)),
        ChannelEvent::MessageRead {
            message_id,
            reader_id,
        } => serde_json::to_value(MessageReadDto {
            message_id: message_id.value(),
            reader_id: reader_id.value(),
        }),
        ChannelEvent::UserTyping { user_id } => serde_json::to_value(TypingDto {
            user_id: user_id.value(),
        }),
        ChannelEvent::UserOnline(user) => {
            serde_json::to_value(PresenceChangeDto::from_user(user, true))
        }
        ChannelEvent::UserOffline(user) => {
            serde_json::to_value(PresenceChangeDto::from_user(user, false))
        }
        ChannelEvent::Negotiation(negotiation) => serde_json::to_value(NegotiationDto {
            application_id: negotiation.application_id.value(),
            conversation_id: negotiation.conversation_id.value(),
            from_state: negotiation.from_state,
            to_state: negotiation.to_state,
            terms: (&negotiation.terms).into(),
            message: (&negotiation.message).into(),
        }),
        ChannelEvent::ConversationUpdated {
            conversation_id,
            message_id,
            sender_id,
        } => serde_json::to_value(ConversationUpdatedDto {
            conversation_id: conversation_id.value(),
            message_id: message_id.value(),
            sender_id: sender_id.value(),
        }),
        ChannelEvent::ConversationArchived {
            conversation_id,
            archived_by,
        } => serde_json::to_value(ConversationArchivedDto {
            conversation_id: conversation_id.value(),
            archived_by: archived_by.value(),
        }),
    }
}

impl EventFrame {
    /// Build the frame delivered to subscribers of `channel`.
    pub fn from_event(
        channel: &ChannelName,
        event: &ChannelEvent,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            event: event.name(),
            channel: Some(channel.to_string()),
            data: event_data(event)?,
        })
    }
}
