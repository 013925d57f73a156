//! Domain layer: entities, value objects, the negotiation state machine,
//! presence bookkeeping and the ports implemented by infrastructure.

pub mod broadcaster;
pub mod channel;
pub mod entity;
pub mod event;
pub mod negotiation;
pub mod presence;
pub mod push;
pub mod repository;
pub mod value_object;

pub use broadcaster::{BroadcastError, Broadcaster, PusherChannel, SubscriptionHandle};
pub use channel::{ChannelName, UnknownChannel};
pub use entity::{
    AppliedTransition, Application, Conversation, ConversationSummary, CounterOffer, Message,
    MessageKind, NewApplication, NewMessage, NewReservation, Party, Reservation, User,
};
pub use event::{ChannelEvent, NegotiationEvent};
pub use negotiation::{Actor, NegotiationAction, NegotiationState, TransitionError};
pub use presence::PresenceRegistry;
pub use push::{PushError, PushNotifier};
pub use repository::{
    ApplicationRepository, CommittedTransition, ConversationRepository, MessageRepository,
    RepositoryError, TransitionCommit, UserRepository,
};
pub use value_object::{
    ApplicationId, ConnectionId, ConversationId, HourlyRate, MessageBody, MessageId,
    ReservationId, Terms, Timestamp, UserId, ValidationError,
};

#[cfg(test)]
pub use broadcaster::MockBroadcaster;
#[cfg(test)]
pub use push::MockPushNotifier;
#[cfg(test)]
pub use repository::MockApplicationRepository;
