/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Subprotocol for recovering three-phase commit messages that a replica missed.
//!
//! A replica can end up missing a [`PrePrepare`](crate::messages::PrePrepare),
//! [`Prepare`](crate::messages::Prepare), or [`Commit`](crate::messages::Commit) it needs to make
//! progress, e.g., because of message loss or because it joined late. It then asks its peers for the
//! message with a [`MessageReq`](crate::messages::MessageReq), and a peer that can vouch for the message
//! answers with a [`MessageRep`](crate::messages::MessageRep).
//!
//! ## Requesting
//!
//! A request is produced at most once per key until the pending-request table is garbage collected.
//! Deciding *when* a message is missing, retrying after a timeout, and sending the request are up to the
//! caller.
//!
//! ## Validating replies
//!
//! Replies come from untrusted peers, so accepting a forged or stale one could corrupt the replica's view
//! of consensus progress. A reply is accepted only if, in order:
//! 1. It carries a message.
//! 2. Its key was requested and the table has not been garbage collected since.
//! 3. Its key is after the last-ordered key.
//! 4. The embedded message decodes as a message of the expected kind.
//! 5. The message binds to the content pinned by the request, if the request pinned any.
//! 6. It passes the checks specific to its kind (a recovered pre-prepare is refused if the replica
//!    already holds pre-prepared material for the slot, or if its digest does not cover its batch).
//! 7. The embedded message's instance, view, and sequence number are the ones requested.
//!
//! ## Serving requests
//!
//! A request is answered only if it is for the local instance and current view and has a positive
//! sequence number, and only with material the local replica can vouch for itself:
//! - [`PrePrepareHandler`](handlers::PrePrepareHandler): pre-prepares it originated as primary.
//! - [`PrepareHandler`](handlers::PrepareHandler) and [`CommitHandler`](handlers::CommitHandler): votes
//!   it cast itself.
//!
//! If there is nothing to serve the request goes unanswered, and the requester has to try another peer.

pub mod handlers;

pub mod service;

pub mod tracker;
