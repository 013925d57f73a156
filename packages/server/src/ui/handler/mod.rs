//! Request handlers.

mod auth;
mod error;
mod http;
mod websocket;

pub use http::{
    accept_proposal, archive_conversation, authorize_channel, babysitter_counter,
    counter_offer, current_application, decline, expire, get_messages, health_check,
    list_conversations, list_online, mark_read, notify_typing, propose,
    respond_to_counter_offer, send_message, upsert_user,
};
pub use websocket::websocket_handler;
