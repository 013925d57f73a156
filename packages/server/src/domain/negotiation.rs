//! Negotiation state machine.
//!
//! The whole lifecycle of an application lives in [`NegotiationState::next`]:
//! one `match` over `(state, action)` pairs. Anything not listed there is
//! rejected, and terminal states accept nothing.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{entity::Party, value_object::Terms};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegotiationState {
    Proposed,
    ParentCountered,
    SitterCountered,
    Accepted,
    Declined,
    Expired,
}

impl NegotiationState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            NegotiationState::Accepted | NegotiationState::Declined | NegotiationState::Expired
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NegotiationState::Proposed => "proposed",
            NegotiationState::ParentCountered => "parent_countered",
            NegotiationState::SitterCountered => "sitter_countered",
            NegotiationState::Accepted => "accepted",
            NegotiationState::Declined => "declined",
            NegotiationState::Expired => "expired",
        }
    }

    /// Compute the state reached by `action`, or why it is refused.
    ///
    /// `proposed_by` is the party that opened the application; only the other
    /// side may accept a proposal as-is.
    pub fn next(
        self,
        action: &NegotiationAction,
        actor: Actor,
        proposed_by: Party,
    ) -> Result<NegotiationState, TransitionError> {
        use NegotiationAction as A;
        use NegotiationState as S;

        let to = match (self, action) {
            (S::Proposed | S::SitterCountered, A::ParentCounter(_)) => S::ParentCountered,
            (S::Proposed | S::ParentCountered, A::BabysitterCounter(_)) => S::SitterCountered,
            (S::ParentCountered | S::SitterCountered, A::RespondToCounterOffer { accept }) => {
                if *accept {
                    S::Accepted
                } else {
                    S::Declined
                }
            }
            (S::Proposed, A::AcceptProposal) => S::Accepted,
            (S::Proposed | S::ParentCountered | S::SitterCountered, A::Decline) => S::Declined,
            (S::Proposed | S::ParentCountered | S::SitterCountered, A::Expire) => S::Expired,
            (from, action) => {
                return Err(TransitionError::NotAllowed {
                    from,
                    action: action.name(),
                });
            }
        };

        let required = self.required_actor(action, proposed_by);
        if !required.admits(actor) {
            return Err(TransitionError::WrongActor {
                action: action.name(),
                actor,
            });
        }

        Ok(to)
    }

    /// Who may perform `action` from this state. Only meaningful for pairs
    /// that `next` accepts.
    fn required_actor(self, action: &NegotiationAction, proposed_by: Party) -> RequiredActor {
        use NegotiationAction as A;

        match action {
            A::ParentCounter(_) => RequiredActor::Exactly(Party::Parent),
            A::BabysitterCounter(_) => RequiredActor::Exactly(Party::Babysitter),
            // the side that received the counter answers it
            A::RespondToCounterOffer { .. } => match self {
                NegotiationState::ParentCountered => RequiredActor::Exactly(Party::Babysitter),
                _ => RequiredActor::Exactly(Party::Parent),
            },
            A::AcceptProposal => RequiredActor::Exactly(proposed_by.other()),
            A::Decline => RequiredActor::AnyParticipant,
            A::Expire => RequiredActor::System,
        }
    }
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who triggers a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Participant(Party),
    /// External expiration sweep.
    System,
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actor::Participant(Party::Parent) => f.write_str("parent"),
            Actor::Participant(Party::Babysitter) => f.write_str("babysitter"),
            Actor::System => f.write_str("system"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum RequiredActor {
    Exactly(Party),
    AnyParticipant,
    System,
}

impl RequiredActor {
    fn admits(self, actor: Actor) -> bool {
        match (self, actor) {
            (RequiredActor::Exactly(party), Actor::Participant(by)) => party == by,
            (RequiredActor::AnyParticipant, Actor::Participant(_)) => true,
            (RequiredActor::System, Actor::System) => true,
            _ => false,
        }
    }
}

/// Commands accepted by an application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NegotiationAction {
    ParentCounter(Terms),
    BabysitterCounter(Terms),
    RespondToCounterOffer { accept: bool },
    AcceptProposal,
    Decline,
    Expire,
}

impl NegotiationAction {
    pub fn name(&self) -> &'static str {
        match self {
            NegotiationAction::ParentCounter(_) => "counter_offer",
            NegotiationAction::BabysitterCounter(_) => "babysitter_counter",
            NegotiationAction::RespondToCounterOffer { .. } => "respond_to_counter_offer",
            NegotiationAction::AcceptProposal => "accept_proposal",
            NegotiationAction::Decline => "decline",
            NegotiationAction::Expire => "expire",
        }
    }

    /// New terms carried by a counter-offer.
    pub fn counter_terms(&self) -> Option<&Terms> {
        match self {
            NegotiationAction::ParentCounter(terms) | NegotiationAction::BabysitterCounter(terms) => {
                Some(terms)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("`{action}` is not allowed from `{from}`")]
    NotAllowed {
        from: NegotiationState,
        action: &'static str,
    },
    #[error("`{action}` cannot be performed by {actor}")]
    WrongActor { action: &'static str, actor: Actor },
}

/// Text of the system message written alongside a transition.
pub fn system_message(to: NegotiationState, actor: Actor, terms: &Terms) -> String {
    match to {
        NegotiationState::Proposed => format!("New proposal from the {actor}: {terms}"),
        NegotiationState::ParentCountered => format!("Counter-offer from the parent: {terms}"),
        NegotiationState::SitterCountered => format!("Counter-offer from the babysitter: {terms}"),
        NegotiationState::Accepted => {
            format!("Offer accepted by the {actor} at {terms}. Reservation confirmed.")
        }
        NegotiationState::Declined => format!("Offer declined by the {actor}."),
        NegotiationState::Expired => "Offer expired.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_object::HourlyRate;

    use NegotiationState::*;

    const ALL_STATES: [NegotiationState; 6] = [
        Proposed,
        ParentCountered,
        SitterCountered,
        Accepted,
        Declined,
        Expired,
    ];

    fn terms() -> Terms {
        Terms::new(HourlyRate::from_cents(1800).unwrap(), None)
    }

    fn parent() -> Actor {
        Actor::Participant(Party::Parent)
    }

    fn sitter() -> Actor {
        Actor::Participant(Party::Babysitter)
    }

    #[test]
    fn test_parent_counter_valid_sources() {
        // テスト項目: 保護者のカウンターは proposed / sitter_countered からのみ可能
        // given (前提条件):
        let action = NegotiationAction::ParentCounter(terms());

        // when (操作) / then (期待する結果):
        for state in ALL_STATES {
            let result = state.next(&action, parent(), Party::Parent);
            match state {
                Proposed | SitterCountered => assert_eq!(result, Ok(ParentCountered)),
                _ => assert!(matches!(result, Err(TransitionError::NotAllowed { .. }))),
            }
        }
    }

    #[test]
    fn test_babysitter_counter_valid_sources() {
        // テスト項目: シッターのカウンターは proposed / parent_countered からのみ可能
        // given (前提条件):
        let action = NegotiationAction::BabysitterCounter(terms());

        // when (操作) / then (期待する結果):
        for state in ALL_STATES {
            let result = state.next(&action, sitter(), Party::Parent);
            match state {
                Proposed | ParentCountered => assert_eq!(result, Ok(SitterCountered)),
                _ => assert!(matches!(result, Err(TransitionError::NotAllowed { .. }))),
            }
        }
    }

    #[test]
    fn test_counter_offer_by_wrong_party() {
        // テスト項目: シッターは保護者側のカウンターを出せない
        // given (前提条件):
        let action = NegotiationAction::ParentCounter(terms());

        // when (操作):
        let result = Proposed.next(&action, sitter(), Party::Parent);

        // then (期待する結果):
        assert!(matches!(result, Err(TransitionError::WrongActor { .. })));
    }

    #[test]
    fn test_respond_is_answered_by_receiving_side() {
        // テスト項目: カウンターへの回答は受け取った側だけが行える
        // given (前提条件):
        let accept = NegotiationAction::RespondToCounterOffer { accept: true };
        let refuse = NegotiationAction::RespondToCounterOffer { accept: false };

        // when (操作) / then (期待する結果):
        assert_eq!(SitterCountered.next(&accept, parent(), Party::Parent), Ok(Accepted));
        assert_eq!(ParentCountered.next(&refuse, sitter(), Party::Parent), Ok(Declined));
        assert!(matches!(
            SitterCountered.next(&accept, sitter(), Party::Parent),
            Err(TransitionError::WrongActor { .. })
        ));
        assert!(matches!(
            Proposed.next(&accept, parent(), Party::Parent),
            Err(TransitionError::NotAllowed { .. })
        ));
    }

    #[test]
    fn test_accept_proposal_requires_counterparty() {
        // テスト項目: 提案の直接承諾は提案者以外のみ、proposed からのみ可能
        // given (前提条件):
        let action = NegotiationAction::AcceptProposal;

        // when (操作) / then (期待する結果):
        assert_eq!(Proposed.next(&action, sitter(), Party::Parent), Ok(Accepted));
        assert!(matches!(
            Proposed.next(&action, parent(), Party::Parent),
            Err(TransitionError::WrongActor { .. })
        ));
        assert!(matches!(
            SitterCountered.next(&action, parent(), Party::Babysitter),
            Err(TransitionError::NotAllowed { .. })
        ));
    }

    #[test]
    fn test_decline_and_expire_from_any_open_state() {
        // テスト項目: decline / expire は終了状態以外のすべてから可能
        // given (前提条件):
        let decline = NegotiationAction::Decline;
        let expire = NegotiationAction::Expire;

        // when (操作) / then (期待する結果):
        for state in ALL_STATES {
            if state.is_terminal() {
                assert!(state.next(&decline, parent(), Party::Parent).is_err());
                assert!(state.next(&expire, Actor::System, Party::Parent).is_err());
            } else {
                assert_eq!(state.next(&decline, sitter(), Party::Parent), Ok(Declined));
                assert_eq!(state.next(&expire, Actor::System, Party::Parent), Ok(Expired));
            }
        }
    }

    #[test]
    fn test_expire_is_system_only() {
        // テスト項目: expire は外部スイープ（System）だけが実行できる
        // given (前提条件) / when (操作):
        let result = Proposed.next(&NegotiationAction::Expire, parent(), Party::Parent);

        // then (期待する結果):
        assert!(matches!(result, Err(TransitionError::WrongActor { .. })));
    }

    #[test]
    fn test_terminal_states_accept_nothing() {
        // テスト項目: 終了状態からはどのアクションも受け付けない
        // given (前提条件):
        let actions = [
            NegotiationAction::ParentCounter(terms()),
            NegotiationAction::BabysitterCounter(terms()),
            NegotiationAction::RespondToCounterOffer { accept: true },
            NegotiationAction::AcceptProposal,
            NegotiationAction::Decline,
            NegotiationAction::Expire,
        ];

        // when (操作) / then (期待する結果):
        for state in [Accepted, Declined, Expired] {
            for action in &actions {
                assert!(matches!(
                    state.next(action, Actor::System, Party::Parent),
                    Err(TransitionError::NotAllowed { .. })
                ));
            }
        }
    }
}
