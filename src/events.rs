/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions of the events emitted by the message request trackers, for event handling and logging.
//!
//! An event for a given action indicates that the action has been completed. Events are published on an
//! optional [`Sender<Event>`]; publishing never blocks, and events are silently dropped if the receiving
//! end is gone.

use std::sync::mpsc::Sender;
use std::time::SystemTime;

use ed25519_dalek::VerifyingKey;

use crate::message_req::tracker::ReplyRejection;
use crate::messages::{MessageKind, MessageReq};
use crate::types::data_types::{InstanceID, ThreePCKey};

pub enum Event {
    // Events on the requesting side.
    RequestMessage(RequestMessageEvent),
    AcceptMessageReply(AcceptMessageReplyEvent),
    RejectMessageReply(RejectMessageReplyEvent),
    CollectGarbage(CollectGarbageEvent),
    // Events on the responding side.
    ReceiveMessageRequest(ReceiveMessageRequestEvent),
    SendMessageReply(SendMessageReplyEvent),
}

impl Event {
    pub(crate) fn publish(self, event_publisher: &Option<Sender<Event>>) {
        if let Some(event_publisher) = event_publisher {
            let _ = event_publisher.send(self);
        }
    }
}

/// A request payload for a missing message was produced.
pub struct RequestMessageEvent {
    pub timestamp: SystemTime,
    pub kind: MessageKind,
    pub instance_id: InstanceID,
    pub key: ThreePCKey,
    /// Whether the request pins the content of the reply.
    pub pinned: bool,
}

/// A reply from `origin` passed validation and was materialized.
pub struct AcceptMessageReplyEvent {
    pub timestamp: SystemTime,
    pub origin: VerifyingKey,
    pub kind: MessageKind,
    pub key: ThreePCKey,
}

/// A reply from `origin` was rejected.
pub struct RejectMessageReplyEvent {
    pub timestamp: SystemTime,
    pub origin: VerifyingKey,
    pub kind: MessageKind,
    pub key: ThreePCKey,
    pub rejection: ReplyRejection,
}

/// The pending-request table of the tracker for `kind` was cleared.
pub struct CollectGarbageEvent {
    pub timestamp: SystemTime,
    pub kind: MessageKind,
    pub discarded: usize,
}

/// A request was received from `origin`. Published whether or not the request is answered.
pub struct ReceiveMessageRequestEvent {
    pub timestamp: SystemTime,
    pub origin: VerifyingKey,
    pub request: MessageReq,
}

/// A reply was produced for `peer`.
pub struct SendMessageReplyEvent {
    pub timestamp: SystemTime,
    pub peer: VerifyingKey,
    pub kind: MessageKind,
    pub key: ThreePCKey,
}
