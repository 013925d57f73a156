//! Channel names exposed to clients.

use std::{fmt, str::FromStr};

use thiserror::Error;

use super::value_object::{ConversationId, UserId};

const CONVERSATION_PREFIX: &str = "private-conversation.";
const USER_PREFIX: &str = "private-App.Models.User.";
const PRESENCE_CHANNEL: &str = "presence-online-users";

/// A broadcast channel.
///
/// - `Conversation`: private, members are the two participants
/// - `Presence`: global roster of online users
/// - `User`: private notifications for one user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelName {
    Conversation(ConversationId),
    Presence,
    User(UserId),
}

impl ChannelName {
    pub fn is_presence(&self) -> bool {
        matches!(self, ChannelName::Presence)
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelName::Conversation(id) => write!(f, "{CONVERSATION_PREFIX}{id}"),
            ChannelName::Presence => f.write_str(PRESENCE_CHANNEL),
            ChannelName::User(id) => write!(f, "{USER_PREFIX}{id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown channel `{0}`")]
pub struct UnknownChannel(pub String);

/// Parse the id suffix, accepting only its canonical decimal form
/// (no sign, no leading zeros) so the name round-trips through `Display`.
fn parse_canonical_id(raw: &str) -> Option<u64> {
    let id = raw.parse::<u64>().ok()?;
    (id.to_string() == raw).then_some(id)
}

impl FromStr for ChannelName {
    type Err = UnknownChannel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || UnknownChannel(s.to_string());

        if s == PRESENCE_CHANNEL {
            return Ok(ChannelName::Presence);
        }
        if let Some(id) = s.strip_prefix(CONVERSATION_PREFIX) {
            let id = parse_canonical_id(id).ok_or_else(unknown)?;
            return Ok(ChannelName::Conversation(ConversationId::new(id)));
        }
        if let Some(id) = s.strip_prefix(USER_PREFIX) {
            let id = parse_canonical_id(id).ok_or_else(unknown)?;
            return Ok(ChannelName::User(UserId::new(id)));
        }
        Err(unknown())
    }
}
