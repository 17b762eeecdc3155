/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! [`MessageReqService`]: one tracker per message kind behind a single entry point that routes
//! requests and replies by their [`MessageKind`] tag.

use std::{sync::mpsc::Sender, thread::JoinHandle, time::SystemTime};

use ed25519_dalek::VerifyingKey;

use crate::{
    consensus_state::ConsensusState,
    events::{Event, SendMessageReplyEvent},
    messages::{AnyThreePCMessage, MessageKind, MessageRep, MessageReq},
    types::data_types::{StashBinding, ThreePCKey},
};

use super::{
    handlers::{CommitTracker, PrePrepareTracker, PrepareTracker},
    tracker::ReplyRejection,
};

/// The message request trackers of a single protocol instance.
///
/// Create one with [`MessageReqSpec::start`](crate::config::MessageReqSpec::start) to get events logged
/// and passed to registered handlers, or with [`new`](Self::new) to consume events directly. When
/// created through `MessageReqSpec`, dropping the service stops the event bus thread.
pub struct MessageReqService {
    pre_prepares: PrePrepareTracker,
    prepares: PrepareTracker,
    commits: CommitTracker,
    event_publisher: Option<Sender<Event>>,
    event_bus: Option<JoinHandle<()>>,
    event_bus_shutdown: Option<Sender<()>>,
}

impl MessageReqService {
    pub fn new(event_publisher: Option<Sender<Event>>) -> Self {
        Self::with_event_bus(event_publisher, None, None)
    }

    pub(crate) fn with_event_bus(
        event_publisher: Option<Sender<Event>>,
        event_bus: Option<JoinHandle<()>>,
        event_bus_shutdown: Option<Sender<()>>,
    ) -> Self {
        Self {
            pre_prepares: PrePrepareTracker::new(event_publisher.clone()),
            prepares: PrepareTracker::new(event_publisher.clone()),
            commits: CommitTracker::new(event_publisher.clone()),
            event_publisher,
            event_bus,
            event_bus_shutdown,
        }
    }

    /// See [`MessageReqTracker::prepare_request`](super::tracker::MessageReqTracker::prepare_request).
    pub fn prepare_request<S: ConsensusState>(
        &mut self,
        kind: MessageKind,
        key: ThreePCKey,
        stash_binding: Option<StashBinding>,
        state: &S,
    ) -> Option<MessageReq> {
        match kind {
            MessageKind::PrePrepare => self.pre_prepares.prepare_request(key, stash_binding, state),
            MessageKind::Prepare => self.prepares.prepare_request(key, stash_binding, state),
            MessageKind::Commit => self.commits.prepare_request(key, stash_binding, state),
        }
    }

    /// Produce the reply to `request` from `origin`, or `None` if the request is malformed or there is
    /// nothing the local replica can vouch for.
    pub fn handle_request<S: ConsensusState>(
        &self,
        request: &MessageReq,
        origin: &VerifyingKey,
        state: &S,
    ) -> Option<MessageRep> {
        let reply = match request.kind {
            MessageKind::PrePrepare => self
                .pre_prepares
                .handle_request(request, origin, state)
                .ok()
                .flatten()
                .map(|msg| MessageRep::new(request, &msg)),
            MessageKind::Prepare => self
                .prepares
                .handle_request(request, origin, state)
                .ok()
                .flatten()
                .map(|msg| MessageRep::new(request, &msg)),
            MessageKind::Commit => self
                .commits
                .handle_request(request, origin, state)
                .ok()
                .flatten()
                .map(|msg| MessageRep::new(request, &msg)),
        }?;

        Event::SendMessageReply(SendMessageReplyEvent {
            timestamp: SystemTime::now(),
            peer: *origin,
            kind: reply.kind,
            key: reply.key(),
        })
        .publish(&self.event_publisher);

        Some(reply)
    }

    /// See [`MessageReqTracker::handle_reply`](super::tracker::MessageReqTracker::handle_reply).
    pub fn handle_reply<S: ConsensusState>(
        &self,
        reply: &MessageRep,
        origin: &VerifyingKey,
        state: &S,
    ) -> Result<AnyThreePCMessage, ReplyRejection> {
        match reply.kind {
            MessageKind::PrePrepare => self
                .pre_prepares
                .handle_reply(reply, origin, state)
                .map(AnyThreePCMessage::from),
            MessageKind::Prepare => self
                .prepares
                .handle_reply(reply, origin, state)
                .map(AnyThreePCMessage::from),
            MessageKind::Commit => self
                .commits
                .handle_reply(reply, origin, state)
                .map(AnyThreePCMessage::from),
        }
    }

    /// Clear the pending-request tables of all three trackers.
    pub fn gc(&mut self) {
        self.pre_prepares.gc();
        self.prepares.gc();
        self.commits.gc();
    }

    /// Whether the message of `kind` at `key` has been requested since the last [`gc`](Self::gc).
    pub fn is_requested(&self, kind: MessageKind, key: &ThreePCKey) -> bool {
        match kind {
            MessageKind::PrePrepare => self.pre_prepares.is_requested(key),
            MessageKind::Prepare => self.prepares.is_requested(key),
            MessageKind::Commit => self.commits.is_requested(key),
        }
    }
}

impl Drop for MessageReqService {
    fn drop(&mut self) {
        if let Some(shutdown) = &self.event_bus_shutdown {
            let _ = shutdown.send(());
        }
        if let Some(event_bus) = self.event_bus.take() {
            let _ = event_bus.join();
        }
    }
}
