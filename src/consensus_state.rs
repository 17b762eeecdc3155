/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The slice of a replica's consensus state that message request trackers read.
//!
//! Trackers are written against the [`ConsensusState`] trait and only ever receive it by shared
//! reference. The layer that drives consensus owns the state and is its single writer: it is the one
//! that records sent pre-prepares, tallies votes, advances the last-ordered key, and inserts messages
//! that trackers accepted from peers.
//!
//! [`ConsensusSharedData`] is an in-memory implementation of the trait suitable for driving trackers
//! directly.

use std::collections::{BTreeMap, HashSet};

use ed25519_dalek::VerifyingKey;

use crate::messages::{AnyThreePCMessage, Commit, PrePrepare, Prepare, ThreePCMessage};
use crate::types::data_types::{InstanceID, ThreePCKey, ViewNumber};

/// Read accessors into the consensus state of a single protocol instance.
pub trait ConsensusState {
    /// The identity of the local replica.
    fn me(&self) -> &VerifyingKey;

    /// The protocol instance this state belongs to.
    fn instance_id(&self) -> InstanceID;

    /// The view the replica is currently in.
    fn view(&self) -> ViewNumber;

    /// The highest slot the replica has already ordered.
    fn last_ordered(&self) -> ThreePCKey;

    /// The pre-prepare that the local replica itself originated, as primary, at `key`.
    fn sent_pre_prepare(&self, key: &ThreePCKey) -> Option<&PrePrepare>;

    /// Whether the replica already holds a pre-prepared candidate for `key`.
    fn is_pre_prepared(&self, key: &ThreePCKey) -> bool;

    /// Tally of prepare votes.
    fn prepares(&self) -> &VoteTally<Prepare>;

    /// Tally of commit votes.
    fn commits(&self) -> &VoteTally<Commit>;
}

/// Per-slot record of a vote message and the replicas that cast it.
///
/// The first message recorded for a slot becomes the slot's message. Later votes for the slot only count
/// if they bind to the same content.
#[derive(Clone)]
pub struct VoteTally<M: ThreePCMessage> {
    votes: BTreeMap<ThreePCKey, VoteEntry<M>>,
}

#[derive(Clone)]
pub struct VoteEntry<M: ThreePCMessage> {
    msg: M,
    voters: HashSet<VerifyingKey>,
}

impl<M: ThreePCMessage> VoteEntry<M> {
    /// The message voted for at this entry's slot.
    pub fn msg(&self) -> &M {
        &self.msg
    }

    pub fn num_votes(&self) -> usize {
        self.voters.len()
    }
}

impl<M: ThreePCMessage> VoteTally<M> {
    pub fn new() -> Self {
        Self {
            votes: BTreeMap::new(),
        }
    }

    /// Record that `voter` voted `msg`. Returns whether the vote was counted.
    ///
    /// A vote is not counted if it disagrees with the message already recorded for its slot.
    pub fn add_vote(&mut self, msg: M, voter: VerifyingKey) -> bool {
        match self.votes.get_mut(&msg.key()) {
            Some(entry) => {
                if entry.msg.content_binding() != msg.content_binding() {
                    return false;
                }
                entry.voters.insert(voter);
                true
            }
            None => {
                self.votes.insert(
                    msg.key(),
                    VoteEntry {
                        msg,
                        voters: HashSet::from([voter]),
                    },
                );
                true
            }
        }
    }

    pub fn get(&self, key: &ThreePCKey) -> Option<&VoteEntry<M>> {
        self.votes.get(key)
    }

    /// Whether `voter` has a counted vote for the slot `key`.
    pub fn has_vote_from(&self, key: &ThreePCKey, voter: &VerifyingKey) -> bool {
        self.votes
            .get(key)
            .is_some_and(|entry| entry.voters.contains(voter))
    }

    pub fn len(&self) -> usize {
        self.votes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }
}

impl<M: ThreePCMessage> Default for VoteTally<M> {
    fn default() -> Self {
        Self::new()
    }
}

/// In-memory [`ConsensusState`] of one protocol instance.
#[derive(Clone)]
pub struct ConsensusSharedData {
    me: VerifyingKey,
    instance_id: InstanceID,
    view: ViewNumber,
    last_ordered: ThreePCKey,
    sent_pre_prepares: BTreeMap<ThreePCKey, PrePrepare>,
    pre_prepared: BTreeMap<ThreePCKey, PrePrepare>,
    prepares: VoteTally<Prepare>,
    commits: VoteTally<Commit>,
}

impl ConsensusSharedData {
    /// Create the state of a replica, identified by `me`, that has not ordered anything yet in
    /// `instance_id`.
    pub fn new(me: VerifyingKey, instance_id: InstanceID, view: ViewNumber) -> Self {
        Self {
            me,
            instance_id,
            view,
            last_ordered: ThreePCKey::init(),
            sent_pre_prepares: BTreeMap::new(),
            pre_prepared: BTreeMap::new(),
            prepares: VoteTally::new(),
            commits: VoteTally::new(),
        }
    }

    pub fn set_last_ordered(&mut self, key: ThreePCKey) {
        self.last_ordered = key
    }

    /// Record a pre-prepare that the local replica sent as primary. The local replica also counts as
    /// having pre-prepared it.
    pub fn add_sent_pre_prepare(&mut self, pre_prepare: PrePrepare) {
        self.pre_prepared
            .insert(pre_prepare.key(), pre_prepare.clone());
        self.sent_pre_prepares
            .insert(pre_prepare.key(), pre_prepare);
    }

    /// Record a pre-prepare received from the primary (or recovered from a peer) as a pre-prepared
    /// candidate.
    pub fn add_pre_prepared(&mut self, pre_prepare: PrePrepare) {
        self.pre_prepared
            .insert(pre_prepare.key(), pre_prepare);
    }

    pub fn pre_prepared(&self, key: &ThreePCKey) -> Option<&PrePrepare> {
        self.pre_prepared.get(key)
    }

    pub fn add_prepare(&mut self, prepare: Prepare, voter: VerifyingKey) -> bool {
        self.prepares.add_vote(prepare, voter)
    }

    pub fn add_commit(&mut self, commit: Commit, voter: VerifyingKey) -> bool {
        self.commits.add_vote(commit, voter)
    }

    /// Insert a message that a tracker accepted from `origin` in reply to a request.
    ///
    /// A recovered pre-prepare becomes a pre-prepared candidate. A recovered prepare or commit counts as
    /// `origin`'s vote, since the responder only serves votes it cast itself.
    pub fn insert_recovered(&mut self, msg: AnyThreePCMessage, origin: VerifyingKey) -> bool {
        match msg {
            AnyThreePCMessage::PrePrepare(pre_prepare) => {
                self.add_pre_prepared(pre_prepare);
                true
            }
            AnyThreePCMessage::Prepare(prepare) => self.add_prepare(prepare, origin),
            AnyThreePCMessage::Commit(commit) => self.add_commit(commit, origin),
        }
    }
}

impl ConsensusState for ConsensusSharedData {
    fn me(&self) -> &VerifyingKey {
        &self.me
    }

    fn instance_id(&self) -> InstanceID {
        self.instance_id
    }

    fn view(&self) -> ViewNumber {
        self.view
    }

    fn last_ordered(&self) -> ThreePCKey {
        self.last_ordered
    }

    fn sent_pre_prepare(&self, key: &ThreePCKey) -> Option<&PrePrepare> {
        self.sent_pre_prepares.get(key)
    }

    fn is_pre_prepared(&self, key: &ThreePCKey) -> bool {
        self.pre_prepared.contains_key(key)
    }

    fn prepares(&self) -> &VoteTally<Prepare> {
        &self.prepares
    }

    fn commits(&self) -> &VoteTally<Commit> {
        &self.commits
    }
}
