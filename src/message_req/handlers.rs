/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The rules that differ between message kinds: which local messages a replica may serve to peers, and
//! which extra checks a recovered message must pass.

use crate::{
    consensus_state::ConsensusState,
    messages::{Commit, PrePrepare, Prepare, ThreePCMessage},
    types::data_types::ThreePCKey,
};

use super::tracker::{MessageReqTracker, ReplyRejection};

/// Kind-specific strategy plugged into a [`MessageReqTracker`].
pub trait ThreePCMessageHandler {
    type Message: ThreePCMessage;

    /// The local message for `key` that the replica is willing to serve, if any.
    fn get_reply<S: ConsensusState>(state: &S, key: &ThreePCKey) -> Option<Self::Message>;

    /// Checks on a recovered message that run after every check common to all kinds has passed.
    fn validate_reply<S: ConsensusState>(
        _state: &S,
        _key: &ThreePCKey,
        _msg: &Self::Message,
    ) -> Result<(), ReplyRejection> {
        Ok(())
    }
}

/// Serves only pre-prepares the local replica originated as primary. A replica that merely received a
/// pre-prepare is not an authoritative source for it.
///
/// A recovered pre-prepare is refused if the replica already holds pre-prepared material for the slot,
/// or if its digest is not the digest of its batch.
pub struct PrePrepareHandler;

impl ThreePCMessageHandler for PrePrepareHandler {
    type Message = PrePrepare;

    fn get_reply<S: ConsensusState>(state: &S, key: &ThreePCKey) -> Option<PrePrepare> {
        state.sent_pre_prepare(key).cloned()
    }

    fn validate_reply<S: ConsensusState>(
        state: &S,
        key: &ThreePCKey,
        msg: &PrePrepare,
    ) -> Result<(), ReplyRejection> {
        if state.is_pre_prepared(key) {
            return Err(ReplyRejection::RedundantEvidence { key: *key });
        }
        // Without a pinned binding, this is the only thing tying the digest to the batch.
        if !msg.is_correct() {
            return Err(ReplyRejection::IncorrectDigest { key: *key });
        }
        Ok(())
    }
}

/// Serves a prepare only if the local replica's own vote is in the tally for it.
pub struct PrepareHandler;

impl ThreePCMessageHandler for PrepareHandler {
    type Message = Prepare;

    fn get_reply<S: ConsensusState>(state: &S, key: &ThreePCKey) -> Option<Prepare> {
        if !state.prepares().has_vote_from(key, state.me()) {
            return None;
        }
        state.prepares().get(key).map(|entry| entry.msg().clone())
    }
}

/// Serves a commit only if the local replica's own vote is in the tally for it.
pub struct CommitHandler;

impl ThreePCMessageHandler for CommitHandler {
    type Message = Commit;

    fn get_reply<S: ConsensusState>(state: &S, key: &ThreePCKey) -> Option<Commit> {
        if !state.commits().has_vote_from(key, state.me()) {
            return None;
        }
        state.commits().get(key).map(|entry| entry.msg().clone())
    }
}

pub type PrePrepareTracker = MessageReqTracker<PrePrepareHandler>;

pub type PrepareTracker = MessageReqTracker<PrepareHandler>;

pub type CommitTracker = MessageReqTracker<CommitHandler>;
