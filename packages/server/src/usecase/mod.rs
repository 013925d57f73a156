//! UseCase 層
//!
//! ドメインのルールとポート（Repository / Broadcaster / PushNotifier）を組み合わせて、
//! Messaging Core の操作を提供する。

pub mod access_guard;
pub mod channel;
pub mod delivery;
pub mod error;
pub mod lock;
pub mod messaging;
pub mod negotiation;
pub mod presence;

#[cfg(test)]
pub(crate) mod test_support;

pub use access_guard::{AccessGuard, ChannelAuthorization};
pub use channel::{ChannelUseCase, Subscription};
pub use delivery::EventDispatcher;
pub use error::CoreError;
pub use lock::ConversationLocks;
pub use messaging::MessagingUseCase;
pub use negotiation::NegotiationUseCase;
pub use presence::PresenceTracker;
