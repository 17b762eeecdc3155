/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The generic request/response state machine shared by all message kinds.
//!
//! Main type: [`MessageReqTracker`].

use std::{collections::HashMap, marker::PhantomData, sync::mpsc::Sender, time::SystemTime};

use borsh::BorshDeserialize;
use ed25519_dalek::VerifyingKey;

use crate::{
    consensus_state::ConsensusState,
    events::{
        AcceptMessageReplyEvent, CollectGarbageEvent, Event, ReceiveMessageRequestEvent,
        RejectMessageReplyEvent, RequestMessageEvent,
    },
    logging::first_seven_base64_chars,
    messages::{MessageKind, MessageRep, MessageReq, ThreePCMessage},
    types::data_types::{InstanceID, SeqNumber, StashBinding, ThreePCKey, ViewNumber},
};

use super::handlers::ThreePCMessageHandler;

/// Tracks which messages of kind `H::Message` the local replica has requested, and validates replies to
/// those requests as well as requests from peers.
///
/// # Usage
///
/// On the requesting side:
/// 1. [`prepare_request`](Self::prepare_request) when a message is found missing. At most one request
///    is produced per key until the next [`gc`](Self::gc).
/// 2. [`handle_reply`](Self::handle_reply) for every reply received. Accepted messages should be
///    inserted into the consensus state by the caller.
/// 3. [`gc`](Self::gc) at protocol checkpoints, e.g., after a view change.
///
/// On the responding side, [`handle_request`](Self::handle_request) for every request received.
///
/// # Pending-request table
///
/// A key is in the table from the moment a request for it is produced until the next `gc`. Receiving a
/// reply, accepted or not, never removes the key, so a correct reply can still be accepted after a bad
/// one was rejected.
///
/// The tracker does not filter duplicates. A reply re-delivered for a key that is still pending passes
/// validation again, so inserting accepted messages into the consensus state must be idempotent, as
/// [`VoteTally::add_vote`](crate::consensus_state::VoteTally::add_vote) is. Once a recovered
/// pre-prepare has been inserted, copies of it are refused as
/// [`RedundantEvidence`](ReplyRejection::RedundantEvidence).
pub struct MessageReqTracker<H: ThreePCMessageHandler> {
    requested: HashMap<ThreePCKey, Option<StashBinding>>,
    event_publisher: Option<Sender<Event>>,
    handler: PhantomData<H>,
}

impl<H: ThreePCMessageHandler> MessageReqTracker<H> {
    pub fn new(event_publisher: Option<Sender<Event>>) -> Self {
        Self {
            requested: HashMap::new(),
            event_publisher,
            handler: PhantomData,
        }
    }

    /// The kind of message this tracker handles.
    pub fn kind(&self) -> MessageKind {
        H::Message::KIND
    }

    /// Produce the request for the message at `key`, unless it has already been requested since the
    /// last [`gc`](Self::gc).
    ///
    /// `stash_binding` pins the content that a reply must bind to. It is ignored for kinds that do not
    /// bind content.
    pub fn prepare_request<S: ConsensusState>(
        &mut self,
        key: ThreePCKey,
        stash_binding: Option<StashBinding>,
        state: &S,
    ) -> Option<MessageReq> {
        if self.requested.contains_key(&key) {
            log::debug!(
                "{} not requesting {} since already requested for {}",
                first_seven_base64_chars(&state.me().to_bytes()),
                H::Message::KIND.name(),
                key
            );
            return None;
        }

        let stash_binding = if H::Message::PINS_CONTENT {
            stash_binding
        } else {
            None
        };
        self.requested.insert(key, stash_binding);

        Event::RequestMessage(RequestMessageEvent {
            timestamp: SystemTime::now(),
            kind: H::Message::KIND,
            instance_id: state.instance_id(),
            key,
            pinned: stash_binding.is_some(),
        })
        .publish(&self.event_publisher);

        Some(MessageReq::new(H::Message::KIND, state.instance_id(), key))
    }

    /// Answer `request` from `origin` with the local message for the requested key, if the local replica
    /// can vouch for one.
    ///
    /// Returns `Ok(None)` if the request is well-formed but there is nothing to serve. `origin` is used
    /// for diagnostics only.
    pub fn handle_request<S: ConsensusState>(
        &self,
        request: &MessageReq,
        origin: &VerifyingKey,
        state: &S,
    ) -> Result<Option<H::Message>, MalformedRequest> {
        Event::ReceiveMessageRequest(ReceiveMessageRequestEvent {
            timestamp: SystemTime::now(),
            origin: *origin,
            request: request.clone(),
        })
        .publish(&self.event_publisher);

        if let Err(reason) = Self::validate_request(request, state) {
            let malformed = MalformedRequest::new(request, reason);
            log::debug!(
                "{} cannot serve request from {}: {:?}",
                first_seven_base64_chars(&state.me().to_bytes()),
                first_seven_base64_chars(&origin.to_bytes()),
                malformed
            );
            return Err(malformed);
        }

        Ok(H::get_reply(state, &request.key()))
    }

    fn validate_request<S: ConsensusState>(
        request: &MessageReq,
        state: &S,
    ) -> Result<(), MalformedRequestReason> {
        if request.kind != H::Message::KIND {
            return Err(MalformedRequestReason::WrongKind {
                expected: H::Message::KIND,
            });
        }
        if request.instance_id != state.instance_id() {
            return Err(MalformedRequestReason::WrongInstance {
                expected: state.instance_id(),
            });
        }
        if request.view != state.view() {
            return Err(MalformedRequestReason::WrongView {
                expected: state.view(),
            });
        }
        if !request.seq.is_valid() {
            return Err(MalformedRequestReason::NonPositiveSeq);
        }
        Ok(())
    }

    /// Validate `reply` from `origin` and materialize the message it carries.
    ///
    /// Rejections never change the pending-request table. `origin` is used for diagnostics only.
    pub fn handle_reply<S: ConsensusState>(
        &self,
        reply: &MessageRep,
        origin: &VerifyingKey,
        state: &S,
    ) -> Result<H::Message, ReplyRejection> {
        log::debug!(
            "{} received requested {} for {} from {}",
            first_seven_base64_chars(&state.me().to_bytes()),
            H::Message::KIND.name(),
            reply.key(),
            first_seven_base64_chars(&origin.to_bytes())
        );

        match self.validate_reply(reply, state) {
            Ok(msg) => {
                Event::AcceptMessageReply(AcceptMessageReplyEvent {
                    timestamp: SystemTime::now(),
                    origin: *origin,
                    kind: H::Message::KIND,
                    key: msg.key(),
                })
                .publish(&self.event_publisher);

                Ok(msg)
            }
            Err(rejection) => {
                if rejection.is_peer_fault() {
                    log::warn!(
                        "{} discarding {} from {}: {:?}",
                        first_seven_base64_chars(&state.me().to_bytes()),
                        H::Message::KIND.name(),
                        first_seven_base64_chars(&origin.to_bytes()),
                        rejection
                    );
                } else {
                    log::debug!(
                        "{} discarding {} from {}: {:?}",
                        first_seven_base64_chars(&state.me().to_bytes()),
                        H::Message::KIND.name(),
                        first_seven_base64_chars(&origin.to_bytes()),
                        rejection
                    );
                }

                Event::RejectMessageReply(RejectMessageReplyEvent {
                    timestamp: SystemTime::now(),
                    origin: *origin,
                    kind: H::Message::KIND,
                    key: reply.key(),
                    rejection: rejection.clone(),
                })
                .publish(&self.event_publisher);

                Err(rejection)
            }
        }
    }

    // Checks on the envelope run first, so that the body is decoded only for keys that are pending and
    // not yet ordered. Kind-specific checks run after all common checks have passed.
    fn validate_reply<S: ConsensusState>(
        &self,
        reply: &MessageRep,
        state: &S,
    ) -> Result<H::Message, ReplyRejection> {
        if reply.kind != H::Message::KIND {
            return Err(ReplyRejection::WrongKind {
                expected: H::Message::KIND,
                received: reply.kind,
            });
        }

        let Some(body) = &reply.msg else {
            return Err(ReplyRejection::EmptyReply);
        };

        let key = reply.key();
        let Some(stash_binding) = self.requested.get(&key) else {
            return Err(ReplyRejection::Unsolicited { key });
        };

        // Last ordered itself counts as already ordered.
        let last_ordered = state.last_ordered();
        if key <= last_ordered {
            return Err(ReplyRejection::Stale { key, last_ordered });
        }

        let msg = H::Message::try_from_slice(body)
            .map_err(|_| ReplyRejection::InvalidStructure { key })?;

        if let Some(expected) = stash_binding {
            let received = msg.content_binding();
            if received != Some(*expected) {
                return Err(ReplyRejection::ContentMismatch {
                    key,
                    expected: *expected,
                    received,
                });
            }
        }

        H::validate_reply(state, &key, &msg)?;

        let expected = (state.instance_id(), key);
        if reply.instance_id != expected.0 {
            return Err(ReplyRejection::StructuralMismatch {
                expected,
                received: (reply.instance_id, key),
            });
        }
        let received = (msg.instance_id(), msg.key());
        if received != expected {
            return Err(ReplyRejection::StructuralMismatch { expected, received });
        }

        Ok(msg)
    }

    /// Forget every key that has been requested, so that all of them can be requested again.
    pub fn gc(&mut self) {
        let discarded = self.requested.len();
        self.requested.clear();

        Event::CollectGarbage(CollectGarbageEvent {
            timestamp: SystemTime::now(),
            kind: H::Message::KIND,
            discarded,
        })
        .publish(&self.event_publisher);
    }

    /// Whether a request for `key` has been produced since the last [`gc`](Self::gc).
    pub fn is_requested(&self, key: &ThreePCKey) -> bool {
        self.requested.contains_key(key)
    }

    /// The content pinned for `key`, if `key` was requested with a stash binding.
    pub fn stash_binding(&self, key: &ThreePCKey) -> Option<&StashBinding> {
        self.requested.get(key).and_then(|binding| binding.as_ref())
    }

    /// Number of keys in the pending-request table.
    pub fn num_requested(&self) -> usize {
        self.requested.len()
    }
}

/// A request that the local replica cannot serve, whatever its local state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MalformedRequest {
    pub kind: MessageKind,
    pub instance_id: InstanceID,
    pub view: ViewNumber,
    pub seq: SeqNumber,
    pub reason: MalformedRequestReason,
}

impl MalformedRequest {
    fn new(request: &MessageReq, reason: MalformedRequestReason) -> Self {
        Self {
            kind: request.kind,
            instance_id: request.instance_id,
            view: request.view,
            seq: request.seq,
            reason,
        }
    }
}

/// Enumerates the ways a request can be malformed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MalformedRequestReason {
    /// The request was routed to the tracker of another kind.
    WrongKind { expected: MessageKind },

    /// The request is for another protocol instance.
    WrongInstance { expected: InstanceID },

    /// The request is for a view other than the current one.
    WrongView { expected: ViewNumber },

    /// The sequence number is 0.
    NonPositiveSeq,
}

/// Enumerates the reasons a reply can be rejected.
///
/// All rejections are non-fatal. [`is_peer_fault`](Self::is_peer_fault) separates the rejections that
/// only a faulty or malicious peer can cause from the ones that benign races produce.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplyRejection {
    /// The reply was routed to the tracker of another kind.
    WrongKind {
        expected: MessageKind,
        received: MessageKind,
    },

    /// The reply carries no message.
    EmptyReply,

    /// `key` is not in the pending-request table: either it was never requested, or the table was
    /// garbage collected since.
    Unsolicited { key: ThreePCKey },

    /// `key` is at or behind the last-ordered key.
    Stale {
        key: ThreePCKey,
        last_ordered: ThreePCKey,
    },

    /// The embedded message does not decode as a message of the tracker's kind.
    InvalidStructure { key: ThreePCKey },

    /// The embedded message binds to content other than what the request pinned.
    ContentMismatch {
        key: ThreePCKey,
        expected: StashBinding,
        received: Option<StashBinding>,
    },

    /// The replica already holds pre-prepared material for `key`.
    RedundantEvidence { key: ThreePCKey },

    /// The recovered pre-prepare's digest is not the digest of its batch of requests.
    IncorrectDigest { key: ThreePCKey },

    /// The instance, view, or sequence number of the embedded message (or the reply's instance) does not
    /// match the request it claims to answer.
    StructuralMismatch {
        expected: (InstanceID, ThreePCKey),
        received: (InstanceID, ThreePCKey),
    },
}

impl ReplyRejection {
    /// Whether the rejection shows the sender to be faulty or malicious.
    pub fn is_peer_fault(&self) -> bool {
        matches!(
            self,
            ReplyRejection::ContentMismatch { .. }
                | ReplyRejection::StructuralMismatch { .. }
                | ReplyRejection::InvalidStructure { .. }
                | ReplyRejection::IncorrectDigest { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use ed25519_dalek::SigningKey;

    use super::*;
    use crate::{
        consensus_state::ConsensusSharedData,
        message_req::handlers::{CommitHandler, PrePrepareHandler, PrepareHandler},
        messages::{Commit, PrePrepare, Prepare},
        types::data_types::{CryptoHash, LedgerID, Timestamp},
    };

    fn replica(seed: u8) -> VerifyingKey {
        SigningKey::from_bytes(&[seed; 32]).verifying_key()
    }

    fn state() -> ConsensusSharedData {
        ConsensusSharedData::new(replica(0), InstanceID::new(0), ViewNumber::new(1))
    }

    fn hash(byte: u8) -> CryptoHash {
        CryptoHash::new([byte; 32])
    }

    fn prepare(key: ThreePCKey, digest: u8) -> Prepare {
        Prepare::agreeing_with(&PrePrepare {
            instance_id: InstanceID::new(0),
            view: key.view,
            seq: key.seq,
            timestamp: Timestamp::new(0),
            ledger_id: LedgerID::new(1),
            req_digests: vec![],
            digest: hash(digest),
            state_root_hash: hash(10),
            txn_root_hash: hash(20),
        })
    }

    fn pre_prepare(key: ThreePCKey, batch: u8) -> PrePrepare {
        PrePrepare::new(
            InstanceID::new(0),
            key,
            Timestamp::new(0),
            LedgerID::new(1),
            vec![hash(batch)],
            hash(10),
            hash(20),
        )
    }

    fn reply_with<M: ThreePCMessage>(msg: &M) -> MessageRep {
        MessageRep::new(
            &MessageReq::new(M::KIND, msg.instance_id(), msg.key()),
            msg,
        )
    }

    #[test]
    fn requests_each_key_once_until_gc() {
        let state = state();
        let mut tracker = MessageReqTracker::<PrepareHandler>::new(None);
        let key = ThreePCKey::from((1, 4));

        let request = tracker.prepare_request(key, None, &state).unwrap();
        assert_eq!(request.kind, MessageKind::Prepare);
        assert_eq!(request.instance_id, InstanceID::new(0));
        assert_eq!(request.key(), key);

        assert!(tracker.prepare_request(key, None, &state).is_none());
        assert!(tracker.prepare_request(ThreePCKey::from((1, 5)), None, &state).is_some());
        assert_eq!(tracker.num_requested(), 2);

        tracker.gc();
        assert_eq!(tracker.num_requested(), 0);
        assert!(tracker.prepare_request(key, None, &state).is_some());

        // Collecting garbage twice in a row is harmless.
        tracker.gc();
        tracker.gc();
        assert!(!tracker.is_requested(&key));
    }

    #[test]
    fn commit_requests_never_pin_content() {
        let state = state();
        let mut tracker = MessageReqTracker::<CommitHandler>::new(None);
        let key = ThreePCKey::from((1, 4));
        let binding = StashBinding::new(hash(1), hash(2), hash(3));

        tracker.prepare_request(key, Some(binding), &state).unwrap();
        assert!(tracker.is_requested(&key));
        assert_eq!(tracker.stash_binding(&key), None);

        let commit = Commit::new(InstanceID::new(0), key);
        assert_eq!(
            tracker.handle_reply(&reply_with(&commit), &replica(1), &state),
            Ok(commit)
        );
    }

    #[test]
    fn rejects_empty_and_unsolicited_replies() {
        let state = state();
        let mut tracker = MessageReqTracker::<PrepareHandler>::new(None);
        let key = ThreePCKey::from((1, 4));
        tracker.prepare_request(key, None, &state).unwrap();

        let mut empty = reply_with(&prepare(key, 1));
        empty.msg = None;
        assert_eq!(
            tracker.handle_reply(&empty, &replica(1), &state),
            Err(ReplyRejection::EmptyReply)
        );

        let other_key = ThreePCKey::from((1, 5));
        assert_eq!(
            tracker.handle_reply(&reply_with(&prepare(other_key, 1)), &replica(1), &state),
            Err(ReplyRejection::Unsolicited { key: other_key })
        );
    }

    #[test]
    fn rejects_replies_at_or_below_last_ordered() {
        let mut state = state();
        state.set_last_ordered(ThreePCKey::from((1, 5)));
        let mut tracker = MessageReqTracker::<PrepareHandler>::new(None);

        for seq in [3, 5, 6] {
            tracker.prepare_request(ThreePCKey::from((1, seq)), None, &state);
        }

        for seq in [3, 5] {
            let key = ThreePCKey::from((1, seq));
            assert_eq!(
                tracker.handle_reply(&reply_with(&prepare(key, 1)), &replica(1), &state),
                Err(ReplyRejection::Stale {
                    key,
                    last_ordered: ThreePCKey::from((1, 5))
                })
            );
        }

        let eligible = prepare(ThreePCKey::from((1, 6)), 1);
        assert_eq!(
            tracker.handle_reply(&reply_with(&eligible), &replica(1), &state),
            Ok(eligible)
        );
    }

    #[test]
    fn enforces_pinned_content() {
        let state = state();
        let mut tracker = MessageReqTracker::<PrepareHandler>::new(None);
        let key = ThreePCKey::from((1, 7));
        let pinned = prepare(key, 1).content_binding();
        tracker.prepare_request(key, pinned, &state).unwrap();

        let forged = prepare(key, 2);
        let rejection = tracker
            .handle_reply(&reply_with(&forged), &replica(1), &state)
            .unwrap_err();
        assert_eq!(
            rejection,
            ReplyRejection::ContentMismatch {
                key,
                expected: pinned.unwrap(),
                received: forged.content_binding(),
            }
        );
        assert!(rejection.is_peer_fault());

        // The key stays pending, so the correct reply still gets through.
        assert!(tracker.is_requested(&key));
        let genuine = prepare(key, 1);
        assert_eq!(
            tracker.handle_reply(&reply_with(&genuine), &replica(2), &state),
            Ok(genuine)
        );
    }

    #[test]
    fn rejects_bodies_that_do_not_match_the_request() {
        let state = state();
        let mut tracker = MessageReqTracker::<PrepareHandler>::new(None);
        let key = ThreePCKey::from((1, 7));
        tracker.prepare_request(key, None, &state).unwrap();

        // The envelope claims (1, 7) but the embedded prepare is for (1, 8).
        let mut reply = reply_with(&prepare(ThreePCKey::from((1, 8)), 1));
        reply.seq = key.seq;
        assert_eq!(
            tracker.handle_reply(&reply, &replica(1), &state),
            Err(ReplyRejection::StructuralMismatch {
                expected: (InstanceID::new(0), key),
                received: (InstanceID::new(0), ThreePCKey::from((1, 8))),
            })
        );

        // Embedded message from another instance.
        let mut foreign = prepare(key, 1);
        foreign.instance_id = InstanceID::new(3);
        let mut reply = reply_with(&foreign);
        reply.instance_id = InstanceID::new(0);
        assert_eq!(
            tracker.handle_reply(&reply, &replica(1), &state),
            Err(ReplyRejection::StructuralMismatch {
                expected: (InstanceID::new(0), key),
                received: (InstanceID::new(3), key),
            })
        );

        let mut garbage = reply_with(&prepare(key, 1));
        garbage.msg = Some(vec![1, 2, 3]);
        let rejection = tracker
            .handle_reply(&garbage, &replica(1), &state)
            .unwrap_err();
        assert_eq!(rejection, ReplyRejection::InvalidStructure { key });
        assert!(rejection.is_peer_fault());
    }

    #[test]
    fn rejects_recovered_pre_prepare_for_slot_already_pre_prepared() {
        let mut state = state();
        let mut tracker = MessageReqTracker::<PrePrepareHandler>::new(None);
        let key = ThreePCKey::from((1, 2));
        tracker.prepare_request(key, None, &state).unwrap();

        let pre_prepare = PrePrepare::new(
            InstanceID::new(0),
            key,
            Timestamp::new(0),
            LedgerID::new(1),
            vec![hash(1)],
            hash(2),
            hash(3),
        );
        state.add_pre_prepared(pre_prepare.clone());

        let rejection = tracker
            .handle_reply(&reply_with(&pre_prepare), &replica(1), &state)
            .unwrap_err();
        assert_eq!(rejection, ReplyRejection::RedundantEvidence { key });
        assert!(!rejection.is_peer_fault());
    }

    #[test]
    fn accepts_redelivered_votes_until_gc() {
        let mut state = state();
        let mut tracker = MessageReqTracker::<CommitHandler>::new(None);
        let key = ThreePCKey::from((1, 4));
        tracker.prepare_request(key, None, &state).unwrap();

        let commit = Commit::new(InstanceID::new(0), key);
        let reply = reply_with(&commit);
        let first = tracker.handle_reply(&reply, &replica(1), &state).unwrap();
        assert!(state.add_commit(first, replica(1)));

        // The same reply again is still valid. Inserting it again changes nothing.
        let again = tracker.handle_reply(&reply, &replica(1), &state).unwrap();
        assert_eq!(again, commit);
        assert!(state.add_commit(again, replica(1)));
        assert_eq!(state.commits().get(&key).map(|entry| entry.num_votes()), Some(1));

        tracker.gc();
        assert_eq!(
            tracker.handle_reply(&reply, &replica(1), &state),
            Err(ReplyRejection::Unsolicited { key })
        );
    }

    #[test]
    fn refuses_redelivered_pre_prepare_once_inserted() {
        let mut state = state();
        let mut tracker = MessageReqTracker::<PrePrepareHandler>::new(None);
        let key = ThreePCKey::from((1, 2));
        tracker.prepare_request(key, None, &state).unwrap();

        let reply = reply_with(&pre_prepare(key, 1));
        let recovered = tracker.handle_reply(&reply, &replica(1), &state).unwrap();
        state.add_pre_prepared(recovered);

        assert_eq!(
            tracker.handle_reply(&reply, &replica(1), &state),
            Err(ReplyRejection::RedundantEvidence { key })
        );
    }

    #[test]
    fn enforces_pinned_pre_prepare_content() {
        let state = state();
        let mut tracker = MessageReqTracker::<PrePrepareHandler>::new(None);
        let key = ThreePCKey::from((1, 3));
        let genuine = pre_prepare(key, 1);
        tracker
            .prepare_request(key, genuine.content_binding(), &state)
            .unwrap();

        // A different but internally consistent batch.
        let other_batch = pre_prepare(key, 2);
        assert_eq!(
            tracker.handle_reply(&reply_with(&other_batch), &replica(1), &state),
            Err(ReplyRejection::ContentMismatch {
                key,
                expected: genuine.content_binding().unwrap(),
                received: other_batch.content_binding(),
            })
        );
        assert_eq!(
            tracker.handle_reply(&reply_with(&genuine), &replica(2), &state),
            Ok(genuine)
        );
    }

    #[test]
    fn rejects_bodies_for_another_view_or_envelopes_for_another_instance() {
        let state = state();
        let mut tracker = MessageReqTracker::<CommitHandler>::new(None);
        let key = ThreePCKey::from((1, 4));
        tracker.prepare_request(key, None, &state).unwrap();

        // The envelope claims (1, 4) but the embedded commit is for (2, 4).
        let mut reply = reply_with(&Commit::new(InstanceID::new(0), ThreePCKey::from((2, 4))));
        reply.view = key.view;
        assert_eq!(
            tracker.handle_reply(&reply, &replica(1), &state),
            Err(ReplyRejection::StructuralMismatch {
                expected: (InstanceID::new(0), key),
                received: (InstanceID::new(0), ThreePCKey::from((2, 4))),
            })
        );

        // The embedded commit is right but the envelope names another instance.
        let mut reply = reply_with(&Commit::new(InstanceID::new(0), key));
        reply.instance_id = InstanceID::new(9);
        let rejection = tracker
            .handle_reply(&reply, &replica(1), &state)
            .unwrap_err();
        assert_eq!(
            rejection,
            ReplyRejection::StructuralMismatch {
                expected: (InstanceID::new(0), key),
                received: (InstanceID::new(9), key),
            }
        );
        assert!(rejection.is_peer_fault());
    }

    #[test]
    fn drops_requests_it_cannot_serve() {
        let mut state = state();
        let key = ThreePCKey::from((1, 1));
        state.add_prepare(prepare(key, 1), replica(0));
        let tracker = MessageReqTracker::<PrepareHandler>::new(None);

        let mut request = MessageReq::new(MessageKind::Prepare, InstanceID::new(0), key);
        assert_eq!(
            tracker.handle_request(&request, &replica(1), &state),
            Ok(Some(prepare(key, 1)))
        );

        request.instance_id = InstanceID::new(1);
        assert_eq!(
            tracker
                .handle_request(&request, &replica(1), &state)
                .unwrap_err()
                .reason,
            MalformedRequestReason::WrongInstance {
                expected: InstanceID::new(0)
            }
        );

        request.instance_id = InstanceID::new(0);
        request.view = ViewNumber::new(2);
        assert_eq!(
            tracker
                .handle_request(&request, &replica(1), &state)
                .unwrap_err()
                .reason,
            MalformedRequestReason::WrongView {
                expected: ViewNumber::new(1)
            }
        );

        request.view = ViewNumber::new(1);
        request.seq = SeqNumber::new(0);
        assert_eq!(
            tracker
                .handle_request(&request, &replica(1), &state)
                .unwrap_err()
                .reason,
            MalformedRequestReason::NonPositiveSeq
        );

        request.seq = key.seq;
        request.kind = MessageKind::Commit;
        assert_eq!(
            tracker
                .handle_request(&request, &replica(1), &state)
                .unwrap_err()
                .reason,
            MalformedRequestReason::WrongKind {
                expected: MessageKind::Prepare
            }
        );
    }

    #[test]
    fn publishes_events_for_each_outcome() {
        let state = state();
        let (event_publisher, event_subscriber) = mpsc::channel();
        let mut tracker = MessageReqTracker::<CommitHandler>::new(Some(event_publisher));
        let key = ThreePCKey::from((1, 3));

        tracker.prepare_request(key, None, &state).unwrap();
        let commit = Commit::new(InstanceID::new(0), key);
        tracker
            .handle_reply(&reply_with(&commit), &replica(1), &state)
            .unwrap();
        let mut wrong_kind = reply_with(&commit);
        wrong_kind.kind = MessageKind::Prepare;
        tracker
            .handle_reply(&wrong_kind, &replica(1), &state)
            .unwrap_err();
        tracker.gc();

        let expected_rejection = ReplyRejection::WrongKind {
            expected: MessageKind::Commit,
            received: MessageKind::Prepare,
        };
        let events: Vec<Event> = event_subscriber.try_iter().collect();
        assert_eq!(events.len(), 4);
        assert!(matches!(&events[0], Event::RequestMessage(e) if e.key == key && !e.pinned));
        assert!(matches!(&events[1], Event::AcceptMessageReply(e) if e.key == key));
        assert!(matches!(
            &events[2],
            Event::RejectMessageReply(e) if e.rejection == expected_rejection
        ));
        assert!(matches!(&events[3], Event::CollectGarbage(e) if e.discarded == 1));
    }
}
