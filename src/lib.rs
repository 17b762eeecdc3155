/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Recovery of missing three-phase commit messages for replicas of a PBFT-style consensus protocol.
//!
//! Replicas order requests by exchanging pre-prepares, prepares, and commits, each identified by a
//! [3PC key](types::data_types::ThreePCKey). Message loss, late joins, and view changes can leave a
//! replica without a message it needs to make progress. This crate implements the request/response
//! protocol through which the replica recovers such messages from its peers: deciding whether a request
//! should be sent, answering peers' requests from local state, and, most importantly, validating that a
//! reply from an untrusted peer is trustworthy before it is accepted.
//!
//! ## Main types
//!
//! - [`MessageReqTracker`](message_req::tracker::MessageReqTracker): the request/response state machine
//!   for one message kind.
//! - [`MessageReqService`](message_req::service::MessageReqService): the three trackers of a protocol
//!   instance behind one entry point.
//! - [`ConsensusState`](consensus_state::ConsensusState): the consensus state the trackers read.
//!
//! ## Threading
//!
//! Trackers are meant to be driven from the single thread that processes a protocol instance's messages.
//! They never block and never do I/O. Instances run independently, each with its own trackers and state.
//! The only thread this crate starts is the optional [event bus](config::MessageReqSpec::start).

pub mod config;

pub mod consensus_state;

pub(crate) mod event_bus;

pub mod events;

pub mod logging;

pub mod message_req;

pub mod messages;

pub mod types;
