//! UseCase 層のエラー型定義

use thiserror::Error;

use crate::domain::{
    BroadcastError, NegotiationState, RepositoryError, TransitionError, ValidationError,
};

/// Messaging Core の操作が失敗した理由
///
/// 認可・存在チェックの失敗は副作用なしで中断する。
/// 状態遷移とアーカイブ済みのエラーは永続化の前に中断する。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("user is not allowed to perform this action")]
    Unauthorized,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("`{action}` is not allowed from `{from}`")]
    InvalidStateTransition {
        from: NegotiationState,
        action: &'static str,
    },
    #[error("stale state: expected `{expected}`, found `{actual}`")]
    StaleState {
        expected: NegotiationState,
        actual: NegotiationState,
    },
    #[error("conversation is archived")]
    ConversationArchived,
    #[error("transport failure: {0}")]
    TransportFailure(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("repository error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for CoreError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::NotFound(what) => CoreError::NotFound(what),
            RepositoryError::Validation(error) => CoreError::Validation(error),
            other => CoreError::Repository(other),
        }
    }
}

impl From<TransitionError> for CoreError {
    fn from(error: TransitionError) -> Self {
        match error {
            TransitionError::NotAllowed { from, action } => {
                CoreError::InvalidStateTransition { from, action }
            }
            // 相手側の操作を実行しようとした
            TransitionError::WrongActor { .. } => CoreError::Unauthorized,
        }
    }
}

impl From<BroadcastError> for CoreError {
    fn from(error: BroadcastError) -> Self {
        CoreError::TransportFailure(error.to_string())
    }
}
