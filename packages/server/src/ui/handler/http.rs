//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    domain::{
        CommittedTransition, ConversationId, MessageId, Terms, User, UserId, UserRepository,
    },
    infrastructure::dto::{
        http::{
            ApplicationDto, ChannelAuthRequest, ChannelAuthResponse, ConversationDto,
            ConversationSummaryDto, CounterOfferRequest, ProposeRequest, ReadReceiptDto,
            RespondRequest, SendMessageRequest, TransitionRequest, UpsertUserRequest,
        },
        websocket::{MessageDto, OnlineUserDto},
    },
    ui::state::AppState,
    usecase::CoreError,
};

use super::{auth::Identity, error::ApiError};

fn committed(transition: CommittedTransition) -> Json<ApplicationDto> {
    Json(ApplicationDto::from_parts(
        &transition.application,
        transition.reservation.as_ref(),
    ))
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// 認証基盤からのユーザー同期
pub async fn upsert_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<u64>,
    Json(request): Json<UpsertUserRequest>,
) -> Result<Json<OnlineUserDto>, ApiError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "user name must not be empty",
        ));
    }
    let user = User::new(UserId::new(user_id), name, request.avatar);
    state
        .users
        .upsert_user(user.clone())
        .await
        .map_err(CoreError::from)?;
    tracing::info!("User {} synchronized", user.id);
    Ok(Json((&user).into()))
}

/// Get list of online users
pub async fn list_online(State(state): State<Arc<AppState>>) -> Json<Vec<OnlineUserDto>> {
    let users = state.presence.list_online().await;
    Json(users.iter().map(Into::into).collect())
}

/// チャンネル購読の認可（Pusher 互換クライアント向け）
pub async fn authorize_channel(
    State(state): State<Arc<AppState>>,
    Identity(user_id): Identity,
    Json(request): Json<ChannelAuthRequest>,
) -> Result<Json<ChannelAuthResponse>, ApiError> {
    let authorization = state
        .guard
        .authorize_channel(user_id, &request.channel_name)
        .await?;
    Ok(Json(ChannelAuthResponse {
        channel: authorization.channel.to_string(),
        channel_data: authorization.member.as_ref().map(Into::into),
    }))
}

pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
    Identity(user_id): Identity,
) -> Result<Json<Vec<ConversationSummaryDto>>, ApiError> {
    let summaries = state.messaging.list_conversations(user_id).await?;
    Ok(Json(summaries.iter().map(Into::into).collect()))
}

pub async fn get_messages(
    State(state): State<Arc<AppState>>,
    Identity(user_id): Identity,
    Path(conversation_id): Path<u64>,
) -> Result<Json<Vec<MessageDto>>, ApiError> {
    let messages = state
        .messaging
        .history(ConversationId::new(conversation_id), user_id)
        .await?;
    Ok(Json(messages.iter().map(Into::into).collect()))
}

pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Identity(user_id): Identity,
    Path(conversation_id): Path<u64>,
    Json(request): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessageDto>), ApiError> {
    let message = state
        .messaging
        .send(ConversationId::new(conversation_id), user_id, &request.body)
        .await?;
    Ok((StatusCode::CREATED, Json((&message).into())))
}

/// 既読にする。既読済み・自分のメッセージなら `updated: false`
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    Identity(user_id): Identity,
    Path((conversation_id, message_id)): Path<(u64, u64)>,
) -> Result<Json<ReadReceiptDto>, ApiError> {
    let updated = state
        .messaging
        .mark_read(
            ConversationId::new(conversation_id),
            MessageId::new(message_id),
            user_id,
        )
        .await?;
    Ok(Json(ReadReceiptDto {
        message_id,
        updated: updated.is_some(),
    }))
}

pub async fn notify_typing(
    State(state): State<Arc<AppState>>,
    Identity(user_id): Identity,
    Path(conversation_id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    state
        .messaging
        .notify_typing(ConversationId::new(conversation_id), user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn archive_conversation(
    State(state): State<Arc<AppState>>,
    Identity(user_id): Identity,
    Path(conversation_id): Path<u64>,
) -> Result<Json<ConversationDto>, ApiError> {
    let conversation = state
        .messaging
        .archive(ConversationId::new(conversation_id), user_id)
        .await?;
    Ok(Json((&conversation).into()))
}

// ========================================
// Negotiation
// ========================================

pub async fn propose(
    State(state): State<Arc<AppState>>,
    Identity(user_id): Identity,
    Json(request): Json<ProposeRequest>,
) -> Result<(StatusCode, Json<ApplicationDto>), ApiError> {
    let terms = Terms::try_from(request.terms)?;
    let application = state
        .negotiation
        .propose(
            user_id,
            UserId::new(request.parent_id),
            UserId::new(request.babysitter_id),
            terms,
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApplicationDto::from_parts(&application, None)),
    ))
}

pub async fn current_application(
    State(state): State<Arc<AppState>>,
    Identity(user_id): Identity,
    Path(conversation_id): Path<u64>,
) -> Result<Json<ApplicationDto>, ApiError> {
    let (application, reservation) = state
        .negotiation
        .current(ConversationId::new(conversation_id), user_id)
        .await?;
    Ok(Json(ApplicationDto::from_parts(
        &application,
        reservation.as_ref(),
    )))
}

pub async fn counter_offer(
    State(state): State<Arc<AppState>>,
    Identity(user_id): Identity,
    Path(conversation_id): Path<u64>,
    Json(request): Json<CounterOfferRequest>,
) -> Result<Json<ApplicationDto>, ApiError> {
    let terms = Terms::try_from(request.terms)?;
    let transition = state
        .negotiation
        .counter_offer(
            ConversationId::new(conversation_id),
            user_id,
            request.expected_state,
            terms,
        )
        .await?;
    Ok(committed(transition))
}

pub async fn babysitter_counter(
    State(state): State<Arc<AppState>>,
    Identity(user_id): Identity,
    Path(conversation_id): Path<u64>,
    Json(request): Json<CounterOfferRequest>,
) -> Result<Json<ApplicationDto>, ApiError> {
    let terms = Terms::try_from(request.terms)?;
    let transition = state
        .negotiation
        .babysitter_counter(
            ConversationId::new(conversation_id),
            user_id,
            request.expected_state,
            terms,
        )
        .await?;
    Ok(committed(transition))
}

pub async fn respond_to_counter_offer(
    State(state): State<Arc<AppState>>,
    Identity(user_id): Identity,
    Path(conversation_id): Path<u64>,
    Json(request): Json<RespondRequest>,
) -> Result<Json<ApplicationDto>, ApiError> {
    let transition = state
        .negotiation
        .respond_to_counter_offer(
            ConversationId::new(conversation_id),
            user_id,
            request.expected_state,
            request.accept,
        )
        .await?;
    Ok(committed(transition))
}

pub async fn accept_proposal(
    State(state): State<Arc<AppState>>,
    Identity(user_id): Identity,
    Path(conversation_id): Path<u64>,
    Json(request): Json<TransitionRequest>,
) -> Result<Json<ApplicationDto>, ApiError> {
    let transition = state
        .negotiation
        .accept_proposal(
            ConversationId::new(conversation_id),
            user_id,
            request.expected_state,
        )
        .await?;
    Ok(committed(transition))
}

pub async fn decline(
    State(state): State<Arc<AppState>>,
    Identity(user_id): Identity,
    Path(conversation_id): Path<u64>,
    Json(request): Json<TransitionRequest>,
) -> Result<Json<ApplicationDto>, ApiError> {
    let transition = state
        .negotiation
        .decline(
            ConversationId::new(conversation_id),
            user_id,
            request.expected_state,
        )
        .await?;
    Ok(committed(transition))
}

/// 外部の期限切れスイープから呼ばれる
pub async fn expire(
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<u64>,
) -> Result<Json<ApplicationDto>, ApiError> {
    let transition = state
        .negotiation
        .expire(ConversationId::new(conversation_id))
        .await?;
    Ok(committed(transition))
}
