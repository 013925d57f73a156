//! HTTP API request / response DTOs.

use serde::{Deserialize, Serialize};

use crate::domain::{NegotiationState, Party};

use super::websocket::{CounterOfferDto, MessageDto, OnlineUserDto, TermsDto};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpsertUserRequest {
    pub name: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SendMessageRequest {
    pub body: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProposeRequest {
    pub parent_id: u64,
    pub babysitter_id: u64,
    pub terms: TermsDto,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CounterOfferRequest {
    pub expected_state: NegotiationState,
    pub terms: TermsDto,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RespondRequest {
    pub expected_state: NegotiationState,
    pub accept: bool,
}

/// Body of accept / decline.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransitionRequest {
    pub expected_state: NegotiationState,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChannelAuthRequest {
    pub channel_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChannelAuthResponse {
    pub channel: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_data: Option<OnlineUserDto>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConversationSummaryDto {
    pub id: u64,
    pub parent_id: u64,
    pub babysitter_id: u64,
    pub archived_at: Option<String>,
    pub updated_at: String,
    pub unread_count: usize,
    pub last_message: Option<MessageDto>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReservationDto {
    pub id: u64,
    pub application_id: u64,
    pub parent_id: u64,
    pub babysitter_id: u64,
    pub terms: TermsDto,
    pub confirmed_at: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApplicationDto {
    pub id: u64,
    pub conversation_id: u64,
    pub proposed_by: Party,
    pub state: NegotiationState,
    pub terms: TermsDto,
    pub counter_offers: Vec<CounterOfferDto>,
    pub version: u64,
    pub created_at: String,
    pub updated_at: String,
    pub reservation: Option<ReservationDto>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConversationDto {
    pub id: u64,
    pub parent_id: u64,
    pub babysitter_id: u64,
    pub archived_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// `updated` is false when the message was already read (or is the reader's own).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReadReceiptDto {
    pub message_id: u64,
    pub updated: bool,
}
