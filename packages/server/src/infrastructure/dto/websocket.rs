//! WebSocket frame DTOs.
//!
//! Every frame sent to a client has the shape
//! `{"event": "...", "channel": "...", "data": {...}}`.

use serde::{Deserialize, Serialize};

use crate::domain::{NegotiationState, Party};

/// Frame pushed to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventFrame {
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl EventFrame {
    pub fn subscription_succeeded(channel: &str) -> Self {
        Self {
            event: "subscription_succeeded".to_string(),
            channel: Some(channel.to_string()),
            data: serde_json::Value::Null,
        }
    }

    pub fn subscription_error(channel: &str, code: &str, message: &str) -> Self {
        Self {
            event: "subscription_error".to_string(),
            channel: Some(channel.to_string()),
            data: serde_json::json!({ "code": code, "message": message }),
        }
    }

    /// Current roster, sent only to a connection that just joined the presence channel.
    pub fn presence_roster(channel: &str, members: &[OnlineUserDto]) -> Self {
        Self {
            event: "presence.roster".to_string(),
            channel: Some(channel.to_string()),
            data: serde_json::json!({ "members": members }),
        }
    }

    pub fn pong() -> Self {
        Self {
            event: "pong".to_string(),
            channel: None,
            data: serde_json::Value::Null,
        }
    }

    pub fn error(code: &str, message: &str) -> Self {
        Self {
            event: "error".to_string(),
            channel: None,
            data: serde_json::json!({ "code": code, "message": message }),
        }
    }
}

/// Frame received from a client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientFrame {
    Subscribe { channel: String },
    Unsubscribe { channel: String },
    Typing { conversation_id: u64 },
    Ping,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermsDto {
    pub hourly_rate_cents: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDto {
    pub id: u64,
    pub conversation_id: u64,
    pub sender_id: u64,
    pub body: String,
    pub kind: String,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReadDto {
    pub message_id: u64,
    pub reader_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingDto {
    pub user_id: u64,
}

/// Payload of `user.online` / `user.offline`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceChangeDto {
    pub user_id: u64,
    pub user_name: String,
    pub is_online: bool,
    pub avatar: Option<String>,
}

/// Roster entry (`listOnline`) and presence channel member info.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnlineUserDto {
    pub id: u64,
    pub name: String,
    pub avatar: Option<String>,
}

/// Payload of `application.*` events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegotiationDto {
    pub application_id: u64,
    pub conversation_id: u64,
    pub from_state: Option<NegotiationState>,
    pub to_state: NegotiationState,
    pub terms: TermsDto,
    pub message: MessageDto,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationUpdatedDto {
    pub conversation_id: u64,
    pub message_id: u64,
    pub sender_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationArchivedDto {
    pub conversation_id: u64,
    pub archived_by: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterOfferDto {
    pub by: Party,
    pub terms: TermsDto,
    pub at: String,
}
