//! Conversion from use case errors to HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::{domain::ValidationError, usecase::CoreError};

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                code,
                message: message.into(),
            },
        }
    }

    pub fn missing_identity() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "unauthenticated",
            "missing or invalid user identity",
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

/// Machine readable error code, shared with WebSocket error frames.
pub fn error_code(error: &CoreError) -> &'static str {
    match error {
        CoreError::Unauthorized => "unauthorized",
        CoreError::NotFound(_) => "not_found",
        CoreError::InvalidStateTransition { .. } => "invalid_state_transition",
        CoreError::StaleState { .. } => "stale_state",
        CoreError::ConversationArchived => "conversation_archived",
        CoreError::TransportFailure(_) => "transport_failure",
        CoreError::Validation(_) => "validation_error",
        CoreError::Repository(_) => "repository_error",
    }
}

impl From<CoreError> for ApiError {
    fn from(error: CoreError) -> Self {
        let status = match &error {
            CoreError::Unauthorized => StatusCode::FORBIDDEN,
            CoreError::NotFound(_) => StatusCode::NOT_FOUND,
            CoreError::InvalidStateTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            CoreError::StaleState { .. } => StatusCode::CONFLICT,
            CoreError::ConversationArchived => StatusCode::LOCKED,
            CoreError::TransportFailure(_) => StatusCode::BAD_GATEWAY,
            CoreError::Validation(_) => StatusCode::BAD_REQUEST,
            CoreError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("Request failed: {}", error);
        }
        ApiError::new(status, error_code(&error), error.to_string())
    }
}

impl From<ValidationError> for ApiError {
    fn from(error: ValidationError) -> Self {
        CoreError::Validation(error).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
