//! UseCase: Negotiation State Machine
//!
//! 応募の作成と状態遷移コマンド。
//!
//! ## 処理の流れ
//!
//! 1. 会話ロックを取得
//! 2. 認可（参加者かどうか）と `expected_state` の照合（食い違えば `StaleState`）
//! 3. `Application::apply` で遷移表を検証
//! 4. 新しい状態・システムメッセージ・予約（合意時のみ）を 1 回の `commit_transition` で確定
//!    （`version` の比較に失敗した場合も `StaleState`）
//! 5. `application.{to_state}` を会話チャンネルへ 1 回だけ配信
//!
//! どこかで失敗した場合は何も永続化されず、何も配信されない。

use std::sync::Arc;

use nounou_shared::time::Clock;

use crate::domain::{
    Actor, Application, ApplicationRepository, ChannelEvent, ChannelName, CommittedTransition,
    ConversationId, ConversationRepository, MessageBody, MessageKind, NegotiationAction,
    NegotiationEvent, NegotiationState, NewApplication, NewMessage, NewReservation, Party,
    RepositoryError, Reservation, Terms, Timestamp, TransitionCommit, UserId,
    negotiation::system_message,
};

use super::{
    access_guard::AccessGuard, delivery::EventDispatcher, error::CoreError,
    lock::ConversationLocks,
};

pub struct NegotiationUseCase {
    guard: Arc<AccessGuard>,
    conversations: Arc<dyn ConversationRepository>,
    applications: Arc<dyn ApplicationRepository>,
    dispatcher: Arc<EventDispatcher>,
    locks: Arc<ConversationLocks>,
    clock: Arc<dyn Clock>,
    max_note_length: usize,
}

impl NegotiationUseCase {
    pub fn new(
        guard: Arc<AccessGuard>,
        conversations: Arc<dyn ConversationRepository>,
        applications: Arc<dyn ApplicationRepository>,
        dispatcher: Arc<EventDispatcher>,
        locks: Arc<ConversationLocks>,
        clock: Arc<dyn Clock>,
        max_note_length: usize,
    ) -> Self {
        Self {
            guard,
            conversations,
            applications,
            dispatcher,
            locks,
            clock,
            max_note_length,
        }
    }

    fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }

    /// 新しい応募を作成する（会話がなければ作成する）
    ///
    /// 同じ会話に未終了の応募があれば `InvalidStateTransition`。
    pub async fn propose(
        &self,
        proposer: UserId,
        parent_id: UserId,
        babysitter_id: UserId,
        terms: Terms,
    ) -> Result<Application, CoreError> {
        if proposer != parent_id && proposer != babysitter_id {
            return Err(CoreError::Unauthorized);
        }
        terms.check_note_length(self.max_note_length)?;

        let conversation_id = self
            .conversations
            .find_or_create_conversation(parent_id, babysitter_id, self.now())
            .await?
            .id;
        let _lock = self.locks.acquire(conversation_id).await;

        let (conversation, party) = self
            .guard
            .require_participant(proposer, conversation_id)
            .await?;
        if conversation.is_archived() {
            return Err(CoreError::ConversationArchived);
        }
        if let Some(open) = self
            .applications
            .current_application(conversation_id)
            .await?
            .filter(|application| !application.state.is_terminal())
        {
            return Err(CoreError::InvalidStateTransition {
                from: open.state,
                action: "propose",
            });
        }

        let now = self.now();
        let body = system_message(
            NegotiationState::Proposed,
            Actor::Participant(party),
            &terms,
        );
        let (application, message) = self
            .applications
            .create_application(
                NewApplication {
                    conversation_id,
                    proposed_by: party,
                    terms,
                    created_at: now,
                },
                NewMessage {
                    conversation_id,
                    sender_id: proposer,
                    body: MessageBody::system(body),
                    kind: MessageKind::System,
                    created_at: now,
                },
            )
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => CoreError::InvalidStateTransition {
                    from: NegotiationState::Proposed,
                    action: "propose",
                },
                other => other.into(),
            })?;
        tracing::info!(
            "Application {} proposed by {} in conversation {}",
            application.id,
            proposer,
            conversation_id
        );

        let event = ChannelEvent::Negotiation(NegotiationEvent {
            application_id: application.id,
            conversation_id,
            from_state: None,
            to_state: application.state,
            terms: application.terms.clone(),
            message,
        });
        self.dispatcher
            .publish(&ChannelName::Conversation(conversation_id), &event, None)
            .await;

        Ok(application)
    }

    /// 保護者のカウンターオファー
    pub async fn counter_offer(
        &self,
        conversation_id: ConversationId,
        user_id: UserId,
        expected_state: NegotiationState,
        terms: Terms,
    ) -> Result<CommittedTransition, CoreError> {
        terms.check_note_length(self.max_note_length)?;
        self.transition(
            conversation_id,
            Some((user_id, expected_state)),
            NegotiationAction::ParentCounter(terms),
        )
        .await
    }

    /// シッターのカウンターオファー
    pub async fn babysitter_counter(
        &self,
        conversation_id: ConversationId,
        user_id: UserId,
        expected_state: NegotiationState,
        terms: Terms,
    ) -> Result<CommittedTransition, CoreError> {
        terms.check_note_length(self.max_note_length)?;
        self.transition(
            conversation_id,
            Some((user_id, expected_state)),
            NegotiationAction::BabysitterCounter(terms),
        )
        .await
    }

    /// カウンターオファーへの回答（カウンターを出していない側が行う）
    pub async fn respond_to_counter_offer(
        &self,
        conversation_id: ConversationId,
        user_id: UserId,
        expected_state: NegotiationState,
        accept: bool,
    ) -> Result<CommittedTransition, CoreError> {
        self.transition(
            conversation_id,
            Some((user_id, expected_state)),
            NegotiationAction::RespondToCounterOffer { accept },
        )
        .await
    }

    /// 提案をそのまま受け入れる（提案していない側が行う）
    pub async fn accept_proposal(
        &self,
        conversation_id: ConversationId,
        user_id: UserId,
        expected_state: NegotiationState,
    ) -> Result<CommittedTransition, CoreError> {
        self.transition(
            conversation_id,
            Some((user_id, expected_state)),
            NegotiationAction::AcceptProposal,
        )
        .await
    }

    pub async fn decline(
        &self,
        conversation_id: ConversationId,
        user_id: UserId,
        expected_state: NegotiationState,
    ) -> Result<CommittedTransition, CoreError> {
        self.transition(
            conversation_id,
            Some((user_id, expected_state)),
            NegotiationAction::Decline,
        )
        .await
    }

    /// 外部の期限切れスイープから呼ばれる
    pub async fn expire(
        &self,
        conversation_id: ConversationId,
    ) -> Result<CommittedTransition, CoreError> {
        self.transition(conversation_id, None, NegotiationAction::Expire)
            .await
    }

    /// 最新の応募と、合意済みなら予約
    pub async fn current(
        &self,
        conversation_id: ConversationId,
        user_id: UserId,
    ) -> Result<(Application, Option<Reservation>), CoreError> {
        self.guard
            .require_participant(user_id, conversation_id)
            .await?;
        let application = self
            .applications
            .current_application(conversation_id)
            .await?
            .ok_or(CoreError::NotFound("application"))?;
        let reservation = if application.state == NegotiationState::Accepted {
            self.applications.find_reservation(application.id).await?
        } else {
            None
        };
        Ok((application, reservation))
    }

    /// `caller` が `None` のときはシステム（期限切れ）による遷移
    async fn transition(
        &self,
        conversation_id: ConversationId,
        caller: Option<(UserId, NegotiationState)>,
        action: NegotiationAction,
    ) -> Result<CommittedTransition, CoreError> {
        let _lock = self.locks.acquire(conversation_id).await;

        let (conversation, actor) = match caller {
            Some((user_id, _)) => {
                let (conversation, party) = self
                    .guard
                    .require_participant(user_id, conversation_id)
                    .await?;
                if conversation.is_archived() {
                    return Err(CoreError::ConversationArchived);
                }
                (conversation, Actor::Participant(party))
            }
            None => {
                let conversation = self
                    .conversations
                    .find_conversation(conversation_id)
                    .await?
                    .ok_or(CoreError::NotFound("conversation"))?;
                (conversation, Actor::System)
            }
        };

        let application = self
            .applications
            .current_application(conversation_id)
            .await?
            .ok_or(CoreError::NotFound("application"))?;
        let expected_state = match caller {
            Some((_, expected)) => expected,
            None => application.state,
        };
        if expected_state != application.state {
            return Err(CoreError::StaleState {
                expected: expected_state,
                actual: application.state,
            });
        }

        let now = self.now();
        let applied = application.apply(&action, actor, now)?;

        // システムによる遷移は提案者の名義で記録する
        let sender_party = match actor {
            Actor::Participant(party) => party,
            Actor::System => application.proposed_by,
        };
        let body = system_message(applied.to, actor, &applied.application.terms);
        let reservation = (applied.to == NegotiationState::Accepted).then(|| NewReservation {
            application_id: application.id,
            conversation_id,
            parent_id: conversation.user_of(Party::Parent),
            babysitter_id: conversation.user_of(Party::Babysitter),
            terms: applied.application.terms.clone(),
            confirmed_at: now,
        });

        let committed = match self
            .applications
            .commit_transition(TransitionCommit {
                application: applied.application,
                expected_version: application.version,
                message: NewMessage {
                    conversation_id,
                    sender_id: conversation.user_of(sender_party),
                    body: MessageBody::system(body),
                    kind: MessageKind::System,
                    created_at: now,
                },
                reservation,
            })
            .await
        {
            Ok(committed) => committed,
            Err(RepositoryError::VersionConflict { .. }) => {
                let actual = self
                    .applications
                    .current_application(conversation_id)
                    .await?
                    .map(|application| application.state)
                    .unwrap_or(application.state);
                return Err(CoreError::StaleState {
                    expected: expected_state,
                    actual,
                });
            }
            Err(e) => return Err(e.into()),
        };
        tracing::info!(
            "Application {} moved {} -> {} by {} ({})",
            committed.application.id,
            applied.from,
            applied.to,
            actor,
            action.name()
        );

        let event = ChannelEvent::Negotiation(NegotiationEvent {
            application_id: committed.application.id,
            conversation_id,
            from_state: Some(applied.from),
            to_state: applied.to,
            terms: committed.application.terms.clone(),
            message: committed.message.clone(),
        });
        self.dispatcher
            .publish(&ChannelName::Conversation(conversation_id), &event, None)
            .await;

        Ok(committed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{
            ApplicationId, HourlyRate, MessageRepository, MockApplicationRepository,
            MockBroadcaster, ValidationError,
        },
        infrastructure::{dto::websocket::EventFrame, push::LogPushNotifier},
        usecase::test_support::{CONVERSATION, Fixture, PARENT, SITTER, STRANGER, drain},
    };

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - 15 €/h の提案 → 18 €/h のカウンター → 合意 のシナリオ
    // - expected_state の不一致と同時カウンターでの StaleState
    // - 終了状態・立場違いの操作の拒否
    // - 遷移失敗時は状態もメッセージも変わらない
    // - 保存時の version 衝突は再読込した状態で StaleState になり、配信されない
    // - メモが本文の上限を超える条件は受け付けない
    // ========================================

    fn rate(cents: u32) -> Terms {
        Terms::new(HourlyRate::from_cents(cents).unwrap(), None)
    }

    fn negotiation_frames(frames: Vec<EventFrame>) -> Vec<EventFrame> {
        frames
            .into_iter()
            .filter(|frame| frame.event.starts_with("application."))
            .collect()
    }

    async fn proposed(f: &Fixture) -> Application {
        f.negotiation
            .propose(PARENT, PARENT, SITTER, rate(1500))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_counter_then_accept_scenario() {
        // テスト項目: 15 €/h の提案 → シッターが 18 €/h でカウンター → 保護者が合意
        // given (前提条件):
        let f = Fixture::new().await;
        let (_, mut parent_rx) = f.connect(PARENT).await;
        let (_, mut sitter_rx) = f.connect(SITTER).await;
        let application = proposed(&f).await;
        assert_eq!(application.state, NegotiationState::Proposed);

        // when (操作):
        let countered = f
            .negotiation
            .babysitter_counter(CONVERSATION, SITTER, NegotiationState::Proposed, rate(1800))
            .await
            .unwrap();
        drain(&mut parent_rx);
        drain(&mut sitter_rx);
        let accepted = f
            .negotiation
            .respond_to_counter_offer(
                CONVERSATION,
                PARENT,
                NegotiationState::SitterCountered,
                true,
            )
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(countered.application.state, NegotiationState::SitterCountered);
        assert_eq!(countered.application.counter_offers.len(), 1);
        assert_eq!(countered.application.counter_offers[0].by, Party::Babysitter);

        assert_eq!(accepted.application.state, NegotiationState::Accepted);
        assert_eq!(accepted.application.terms, rate(1800));
        assert_eq!(accepted.application.counter_offers.len(), 1);
        let reservation = accepted.reservation.unwrap();
        assert_eq!(reservation.parent_id, PARENT);
        assert_eq!(reservation.babysitter_id, SITTER);
        assert_eq!(reservation.terms, rate(1800));

        for rx in [&mut parent_rx, &mut sitter_rx] {
            let frames = negotiation_frames(drain(rx));
            assert_eq!(frames.len(), 1);
            assert_eq!(frames[0].event, "application.accepted");
            assert_eq!(frames[0].data["from_state"], "sitter_countered");
            assert_eq!(frames[0].data["terms"]["hourly_rate_cents"], 1800);
            assert_eq!(frames[0].data["message"]["kind"], "system");
        }

        let (current, stored_reservation) =
            f.negotiation.current(CONVERSATION, SITTER).await.unwrap();
        assert_eq!(current.state, NegotiationState::Accepted);
        assert_eq!(stored_reservation, Some(reservation));
    }

    #[tokio::test]
    async fn test_accept_proposal_by_counterparty() {
        // テスト項目: 提案者でない側は提案をそのまま受け入れられ、提案者自身はできない
        // given (前提条件):
        let f = Fixture::new().await;
        proposed(&f).await;

        // when (操作):
        let own = f
            .negotiation
            .accept_proposal(CONVERSATION, PARENT, NegotiationState::Proposed)
            .await;
        let other = f
            .negotiation
            .accept_proposal(CONVERSATION, SITTER, NegotiationState::Proposed)
            .await;

        // then (期待する結果):
        assert_eq!(own.unwrap_err(), CoreError::Unauthorized);
        let other = other.unwrap();
        assert_eq!(other.application.state, NegotiationState::Accepted);
        assert!(other.reservation.is_some());
    }

    #[tokio::test]
    async fn test_stale_expected_state() {
        // テスト項目: expected_state が保存済みの状態と違えば StaleState
        // given (前提条件):
        let f = Fixture::new().await;
        proposed(&f).await;

        // when (操作):
        let result = f
            .negotiation
            .counter_offer(
                CONVERSATION,
                PARENT,
                NegotiationState::SitterCountered,
                rate(1600),
            )
            .await;

        // then (期待する結果):
        assert_eq!(
            result.unwrap_err(),
            CoreError::StaleState {
                expected: NegotiationState::SitterCountered,
                actual: NegotiationState::Proposed,
            }
        );
    }

    #[tokio::test]
    async fn test_concurrent_counters_exactly_one_stale() {
        // テスト項目: 同じ状態からの同時カウンターは片方だけが成功し、もう片方は StaleState
        // given (前提条件):
        let f = Fixture::new().await;
        proposed(&f).await;
        let messages_before = f.store.list_messages(CONVERSATION).await.unwrap().len();

        // when (操作):
        let (parent, sitter) = tokio::join!(
            f.negotiation.counter_offer(
                CONVERSATION,
                PARENT,
                NegotiationState::Proposed,
                rate(1400)
            ),
            f.negotiation.babysitter_counter(
                CONVERSATION,
                SITTER,
                NegotiationState::Proposed,
                rate(1900)
            ),
        );

        // then (期待する結果):
        let results = [parent.map(|_| ()), sitter.map(|_| ())];
        let stale = results
            .iter()
            .filter(|r| matches!(r, Err(CoreError::StaleState { .. })))
            .count();
        let ok = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!((ok, stale), (1, 1));

        let (current, _) = f.negotiation.current(CONVERSATION, PARENT).await.unwrap();
        assert_eq!(current.counter_offers.len(), 1);
        assert_eq!(current.version, 1);
        let messages_after = f.store.list_messages(CONVERSATION).await.unwrap().len();
        assert_eq!(messages_after, messages_before + 1);
    }

    #[tokio::test]
    async fn test_terminal_state_rejects_every_action() {
        // テスト項目: 終了状態からの操作は InvalidStateTransition で、何も書き込まれない
        // given (前提条件):
        let f = Fixture::new().await;
        proposed(&f).await;
        f.negotiation
            .decline(CONVERSATION, SITTER, NegotiationState::Proposed)
            .await
            .unwrap();
        let messages_before = f.store.list_messages(CONVERSATION).await.unwrap().len();

        // when (操作):
        let counter = f
            .negotiation
            .counter_offer(CONVERSATION, PARENT, NegotiationState::Declined, rate(1500))
            .await;
        let expire = f.negotiation.expire(CONVERSATION).await;

        // then (期待する結果):
        assert_eq!(
            counter.unwrap_err(),
            CoreError::InvalidStateTransition {
                from: NegotiationState::Declined,
                action: "counter_offer",
            }
        );
        assert!(matches!(
            expire,
            Err(CoreError::InvalidStateTransition { .. })
        ));
        assert_eq!(
            f.store.list_messages(CONVERSATION).await.unwrap().len(),
            messages_before
        );
    }

    #[tokio::test]
    async fn test_answering_own_counter_is_rejected() {
        // テスト項目: 自分のカウンターに自分で回答することはできない
        // given (前提条件):
        let f = Fixture::new().await;
        proposed(&f).await;
        f.negotiation
            .counter_offer(CONVERSATION, PARENT, NegotiationState::Proposed, rate(1400))
            .await
            .unwrap();

        // when (操作):
        let result = f
            .negotiation
            .respond_to_counter_offer(
                CONVERSATION,
                PARENT,
                NegotiationState::ParentCountered,
                true,
            )
            .await;

        // then (期待する結果):
        assert_eq!(result.unwrap_err(), CoreError::Unauthorized);
        let (current, _) = f.negotiation.current(CONVERSATION, PARENT).await.unwrap();
        assert_eq!(current.state, NegotiationState::ParentCountered);
    }

    #[tokio::test]
    async fn test_non_participant_cannot_transition() {
        // テスト項目: 参加者以外の操作は Unauthorized
        // given (前提条件):
        let f = Fixture::new().await;
        proposed(&f).await;

        // when (操作):
        let result = f
            .negotiation
            .decline(CONVERSATION, STRANGER, NegotiationState::Proposed)
            .await;

        // then (期待する結果):
        assert_eq!(result.unwrap_err(), CoreError::Unauthorized);
    }

    #[tokio::test]
    async fn test_expire_moves_to_expired() {
        // テスト項目: 期限切れは未終了の応募を expired にし、application.expired を配信する
        // given (前提条件):
        let f = Fixture::new().await;
        let (_, mut sitter_rx) = f.connect(SITTER).await;
        proposed(&f).await;
        drain(&mut sitter_rx);

        // when (操作):
        let expired = f.negotiation.expire(CONVERSATION).await.unwrap();

        // then (期待する結果):
        assert_eq!(expired.application.state, NegotiationState::Expired);
        assert_eq!(expired.message.body.as_str(), "Offer expired.");
        let frames = negotiation_frames(drain(&mut sitter_rx));
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event, "application.expired");
    }

    #[tokio::test]
    async fn test_second_proposal_requires_terminal_application() {
        // テスト項目: 未終了の応募がある間は新しい提案ができない
        // given (前提条件):
        let f = Fixture::new().await;
        proposed(&f).await;

        // when (操作):
        let while_open = f
            .negotiation
            .propose(SITTER, PARENT, SITTER, rate(2000))
            .await;
        f.negotiation
            .decline(CONVERSATION, PARENT, NegotiationState::Proposed)
            .await
            .unwrap();
        let after_decline = f
            .negotiation
            .propose(SITTER, PARENT, SITTER, rate(2000))
            .await;

        // then (期待する結果):
        assert_eq!(
            while_open.unwrap_err(),
            CoreError::InvalidStateTransition {
                from: NegotiationState::Proposed,
                action: "propose",
            }
        );
        let second = after_decline.unwrap();
        assert_eq!(second.proposed_by, Party::Babysitter);
        assert_eq!(second.conversation_id, CONVERSATION);
    }

    #[tokio::test]
    async fn test_propose_creates_conversation() {
        // テスト項目: 初めての組み合わせでは会話が作られる
        // given (前提条件):
        let f = Fixture::new().await;

        // when (操作):
        let application = f
            .negotiation
            .propose(STRANGER, PARENT, STRANGER, rate(1500))
            .await
            .unwrap();

        // then (期待する結果):
        assert_ne!(application.conversation_id, CONVERSATION);
        let (current, reservation) = f
            .negotiation
            .current(application.conversation_id, STRANGER)
            .await
            .unwrap();
        assert_eq!(current.id, application.id);
        assert_eq!(reservation, None);
        let messages = f
            .store
            .list_messages(application.conversation_id)
            .await
            .unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].kind, MessageKind::System);
    }

    #[tokio::test]
    async fn test_propose_on_archived_conversation() {
        // テスト項目: アーカイブ済みの会話では提案できない
        // given (前提条件):
        let f = Fixture::new().await;
        f.messaging.archive(CONVERSATION, PARENT).await.unwrap();

        // when (操作):
        let result = f
            .negotiation
            .propose(PARENT, PARENT, SITTER, rate(1500))
            .await;

        // then (期待する結果):
        assert_eq!(result.unwrap_err(), CoreError::ConversationArchived);
    }

    #[tokio::test]
    async fn test_proposer_must_be_a_party() {
        // テスト項目: 提案者は保護者かシッターのどちらかでなければならない
        // given (前提条件):
        let f = Fixture::new().await;

        // when (操作):
        let result = f
            .negotiation
            .propose(STRANGER, PARENT, SITTER, rate(1500))
            .await;

        // then (期待する結果):
        assert_eq!(result.unwrap_err(), CoreError::Unauthorized);
    }

    fn stored_application(state: NegotiationState, version: u64) -> Application {
        Application {
            id: ApplicationId::new(7),
            conversation_id: CONVERSATION,
            proposed_by: Party::Parent,
            state,
            terms: rate(1500),
            counter_offers: Vec::new(),
            version,
            created_at: Timestamp::new(0),
            updated_at: Timestamp::new(0),
        }
    }

    #[tokio::test]
    async fn test_version_conflict_reports_reloaded_state() {
        // テスト項目: commit 時に version が衝突したら、再読込した状態で StaleState を返し配信しない
        // given (前提条件):
        let f = Fixture::new().await;
        let mut applications = MockApplicationRepository::new();
        let mut loads = 0;
        applications
            .expect_current_application()
            .times(2)
            .returning(move |_| {
                loads += 1;
                Ok(Some(if loads == 1 {
                    stored_application(NegotiationState::Proposed, 1)
                } else {
                    stored_application(NegotiationState::Expired, 2)
                }))
            });
        applications
            .expect_commit_transition()
            .times(1)
            .returning(|commit| {
                assert_eq!(commit.expected_version, 1);
                Err(RepositoryError::VersionConflict {
                    expected: 1,
                    actual: 2,
                })
            });
        let mut broadcaster = MockBroadcaster::new();
        broadcaster.expect_publish().times(0);
        let dispatcher = Arc::new(EventDispatcher::new(
            Arc::new(broadcaster),
            Arc::new(LogPushNotifier),
            3,
        ));
        let negotiation = NegotiationUseCase::new(
            Arc::new(AccessGuard::new(f.store.clone(), f.store.clone())),
            f.store.clone(),
            Arc::new(applications),
            dispatcher,
            Arc::new(ConversationLocks::new()),
            f.clock.clone(),
            2000,
        );

        // when (操作):
        let result = negotiation
            .babysitter_counter(CONVERSATION, SITTER, NegotiationState::Proposed, rate(1800))
            .await;

        // then (期待する結果):
        assert_eq!(
            result.unwrap_err(),
            CoreError::StaleState {
                expected: NegotiationState::Proposed,
                actual: NegotiationState::Expired,
            }
        );
    }

    #[tokio::test]
    async fn test_note_longer_than_body_limit_is_rejected() {
        // テスト項目: メモが本文の上限を超える条件は提案もカウンターも受け付けない
        // given (前提条件):
        let f = Fixture::with_max_body_length(10).await;
        let (_, mut parent_rx) = f.connect(PARENT).await;
        let long_note = || {
            Terms::new(
                HourlyRate::from_cents(1500).unwrap(),
                Some("x".repeat(11)),
            )
        };
        let too_long = CoreError::Validation(ValidationError::NoteTooLong {
            max: 10,
            actual: 11,
        });

        // when (操作):
        let proposal = f
            .negotiation
            .propose(PARENT, PARENT, SITTER, long_note())
            .await;
        proposed(&f).await;
        drain(&mut parent_rx);
        let counter = f
            .negotiation
            .babysitter_counter(CONVERSATION, SITTER, NegotiationState::Proposed, long_note())
            .await;

        // then (期待する結果):
        assert_eq!(proposal.unwrap_err(), too_long);
        assert_eq!(counter.unwrap_err(), too_long);
        let (current, _) = f.negotiation.current(CONVERSATION, PARENT).await.unwrap();
        assert_eq!(current.state, NegotiationState::Proposed);
        assert!(drain(&mut parent_rx).is_empty());
    }
}
