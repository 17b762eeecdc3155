/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions for the three-phase commit messages that can be recovered from peers, and for the
//! request and reply envelopes that carry them.
//!
//! ## Three-phase commit messages
//!
//! A slot, identified by a [`ThreePCKey`], is ordered by exchanging:
//! 1. A [`PrePrepare`] from the primary, which fixes the batch of requests ordered at the slot and the
//!    state and transaction roots that applying the batch yields.
//! 2. [`Prepare`]s from the backups, which agree to the pre-prepare's content.
//! 3. [`Commit`]s from every replica, sent once a prepare quorum is seen.
//!
//! All three implement [`ThreePCMessage`], which is the interface the
//! [message request trackers](crate::message_req) are written against.
//!
//! ## Envelopes
//!
//! A replica that is missing a message sends a [`MessageReq`]. A peer that can vouch for the message
//! answers with a [`MessageRep`] embedding the borsh-encoding of the message. Both are tagged with the
//! [`MessageKind`] they are about, and travel on the wire wrapped in a [`RecoveryMessage`].

use borsh::{BorshDeserialize, BorshSerialize};

use crate::types::{
    crypto_primitives::{CryptoHasher, Digest},
    data_types::*,
};

/// The kinds of three-phase commit message that can be requested from peers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub enum MessageKind {
    PrePrepare,
    Prepare,
    Commit,
}

impl MessageKind {
    /// Name of the kind in PascalCase, for printing.
    pub const fn name(&self) -> &'static str {
        match self {
            MessageKind::PrePrepare => "PrePrepare",
            MessageKind::Prepare => "Prepare",
            MessageKind::Commit => "Commit",
        }
    }
}

/// Behavior common to the messages of the three-phase commit protocol.
pub trait ThreePCMessage: Clone + BorshSerialize + BorshDeserialize {
    /// The kind of message this type represents.
    const KIND: MessageKind;

    /// Whether messages of this kind bind to content that a [`StashBinding`] can pin.
    const PINS_CONTENT: bool;

    fn instance_id(&self) -> InstanceID;

    fn view(&self) -> ViewNumber;

    fn seq(&self) -> SeqNumber;

    /// The slot this message is about.
    fn key(&self) -> ThreePCKey {
        ThreePCKey::new(self.view(), self.seq())
    }

    /// The content hashes this message binds to. `None` for kinds that do not pin content.
    fn content_binding(&self) -> Option<StashBinding>;
}

/// Proposal by the primary of `view` to order a batch of requests at `seq`.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct PrePrepare {
    pub instance_id: InstanceID,
    pub view: ViewNumber,
    pub seq: SeqNumber,
    pub timestamp: Timestamp,
    pub ledger_id: LedgerID,
    pub req_digests: Vec<CryptoHash>,
    pub digest: CryptoHash,
    pub state_root_hash: CryptoHash,
    pub txn_root_hash: CryptoHash,
}

impl PrePrepare {
    /// Create a pre-prepare for the batch identified by `req_digests`. The pre-prepare's digest is
    /// computed from the batch.
    pub fn new(
        instance_id: InstanceID,
        key: ThreePCKey,
        timestamp: Timestamp,
        ledger_id: LedgerID,
        req_digests: Vec<CryptoHash>,
        state_root_hash: CryptoHash,
        txn_root_hash: CryptoHash,
    ) -> PrePrepare {
        let digest = PrePrepare::compute_digest(&req_digests);
        PrePrepare {
            instance_id,
            view: key.view,
            seq: key.seq,
            timestamp,
            ledger_id,
            req_digests,
            digest,
            state_root_hash,
            txn_root_hash,
        }
    }

    /// SHA256 over the concatenation of the digests of the requests in a batch.
    pub fn compute_digest(req_digests: &[CryptoHash]) -> CryptoHash {
        let mut hasher = CryptoHasher::new();
        for req_digest in req_digests {
            hasher.update(req_digest.bytes());
        }
        CryptoHash::new(hasher.finalize().into())
    }

    /// Checks whether `digest` is actually the digest of `req_digests`.
    pub fn is_correct(&self) -> bool {
        self.digest == PrePrepare::compute_digest(&self.req_digests)
    }
}

impl ThreePCMessage for PrePrepare {
    const KIND: MessageKind = MessageKind::PrePrepare;
    const PINS_CONTENT: bool = true;

    fn instance_id(&self) -> InstanceID {
        self.instance_id
    }

    fn view(&self) -> ViewNumber {
        self.view
    }

    fn seq(&self) -> SeqNumber {
        self.seq
    }

    fn content_binding(&self) -> Option<StashBinding> {
        Some(StashBinding::new(
            self.digest,
            self.state_root_hash,
            self.txn_root_hash,
        ))
    }
}

/// A backup's agreement to the content of the pre-prepare at `(view, seq)`.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Prepare {
    pub instance_id: InstanceID,
    pub view: ViewNumber,
    pub seq: SeqNumber,
    pub timestamp: Timestamp,
    pub digest: CryptoHash,
    pub state_root_hash: CryptoHash,
    pub txn_root_hash: CryptoHash,
}

impl Prepare {
    /// Create the prepare that agrees with `pre_prepare`.
    pub fn agreeing_with(pre_prepare: &PrePrepare) -> Prepare {
        Prepare {
            instance_id: pre_prepare.instance_id,
            view: pre_prepare.view,
            seq: pre_prepare.seq,
            timestamp: pre_prepare.timestamp,
            digest: pre_prepare.digest,
            state_root_hash: pre_prepare.state_root_hash,
            txn_root_hash: pre_prepare.txn_root_hash,
        }
    }
}

impl ThreePCMessage for Prepare {
    const KIND: MessageKind = MessageKind::Prepare;
    const PINS_CONTENT: bool = true;

    fn instance_id(&self) -> InstanceID {
        self.instance_id
    }

    fn view(&self) -> ViewNumber {
        self.view
    }

    fn seq(&self) -> SeqNumber {
        self.seq
    }

    fn content_binding(&self) -> Option<StashBinding> {
        Some(StashBinding::new(
            self.digest,
            self.state_root_hash,
            self.txn_root_hash,
        ))
    }
}

/// A replica's commitment to order the slot `(view, seq)`.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Commit {
    pub instance_id: InstanceID,
    pub view: ViewNumber,
    pub seq: SeqNumber,
}

impl Commit {
    pub fn new(instance_id: InstanceID, key: ThreePCKey) -> Commit {
        Commit {
            instance_id,
            view: key.view,
            seq: key.seq,
        }
    }
}

impl ThreePCMessage for Commit {
    const KIND: MessageKind = MessageKind::Commit;
    const PINS_CONTENT: bool = false;

    fn instance_id(&self) -> InstanceID {
        self.instance_id
    }

    fn view(&self) -> ViewNumber {
        self.view
    }

    fn seq(&self) -> SeqNumber {
        self.seq
    }

    fn content_binding(&self) -> Option<StashBinding> {
        None
    }
}

/// A three-phase commit message of any kind, as returned by
/// [`MessageReqService::handle_reply`](crate::message_req::service::MessageReqService::handle_reply).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnyThreePCMessage {
    PrePrepare(PrePrepare),
    Prepare(Prepare),
    Commit(Commit),
}

impl AnyThreePCMessage {
    pub fn kind(&self) -> MessageKind {
        match self {
            AnyThreePCMessage::PrePrepare(_) => MessageKind::PrePrepare,
            AnyThreePCMessage::Prepare(_) => MessageKind::Prepare,
            AnyThreePCMessage::Commit(_) => MessageKind::Commit,
        }
    }

    pub fn key(&self) -> ThreePCKey {
        match self {
            AnyThreePCMessage::PrePrepare(pre_prepare) => pre_prepare.key(),
            AnyThreePCMessage::Prepare(prepare) => prepare.key(),
            AnyThreePCMessage::Commit(commit) => commit.key(),
        }
    }
}

impl From<PrePrepare> for AnyThreePCMessage {
    fn from(value: PrePrepare) -> Self {
        AnyThreePCMessage::PrePrepare(value)
    }
}

impl From<Prepare> for AnyThreePCMessage {
    fn from(value: Prepare) -> Self {
        AnyThreePCMessage::Prepare(value)
    }
}

impl From<Commit> for AnyThreePCMessage {
    fn from(value: Commit) -> Self {
        AnyThreePCMessage::Commit(value)
    }
}

/// Messages exchanged as part of the message recovery protocol.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum RecoveryMessage {
    MessageReq(MessageReq),
    MessageRep(MessageRep),
}

/// Request for the message of kind `kind` at slot `(view, seq)` of instance `instance_id`.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct MessageReq {
    pub kind: MessageKind,
    pub instance_id: InstanceID,
    pub view: ViewNumber,
    pub seq: SeqNumber,
}

impl MessageReq {
    pub fn new(kind: MessageKind, instance_id: InstanceID, key: ThreePCKey) -> MessageReq {
        MessageReq {
            kind,
            instance_id,
            view: key.view,
            seq: key.seq,
        }
    }

    pub fn key(&self) -> ThreePCKey {
        ThreePCKey::new(self.view, self.seq)
    }
}

impl Into<RecoveryMessage> for MessageReq {
    fn into(self) -> RecoveryMessage {
        RecoveryMessage::MessageReq(self)
    }
}

/// Reply to a [`MessageReq`].
///
/// `kind`, `instance_id`, `view`, and `seq` echo the request being answered. `msg` is the borsh
/// encoding of the message of type `kind`, and is `None` if the reply carries nothing.
///
/// Nothing about a received `MessageRep` is trusted: whether the echoed fields match the embedded
/// message, or the message decodes at all, is checked by the
/// [tracker](crate::message_req::tracker::MessageReqTracker::handle_reply) that receives it.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct MessageRep {
    pub kind: MessageKind,
    pub instance_id: InstanceID,
    pub view: ViewNumber,
    pub seq: SeqNumber,
    pub msg: Option<Vec<u8>>,
}

impl MessageRep {
    /// Create a reply to `request` carrying `msg`.
    pub fn new<M: ThreePCMessage>(request: &MessageReq, msg: &M) -> MessageRep {
        MessageRep {
            kind: request.kind,
            instance_id: request.instance_id,
            view: request.view,
            seq: request.seq,
            // Serializing into a Vec<u8> cannot fail.
            msg: Some(msg.try_to_vec().unwrap()),
        }
    }

    pub fn key(&self) -> ThreePCKey {
        ThreePCKey::new(self.view, self.seq)
    }
}

impl Into<RecoveryMessage> for MessageRep {
    fn into(self) -> RecoveryMessage {
        RecoveryMessage::MessageRep(self)
    }
}
