/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Functions that log out events.
//!
//! The logs defined in this module are printed if the user enabled them via the service's
//! [configuration](crate::config::Configuration).
//!
//! This crate logs using the [log](https://docs.rs/log/latest/log/) crate. To get these messages
//! printed onto a terminal or to a file, set up a
//! [logging implementation](https://docs.rs/log/latest/log/#available-logging-implementations).
//!
//! ## Log message format
//!
//! Log messages are CSVs (Comma Separated Values) with at least two values. The first two values are
//! always:
//! 1. The name of the [event](crate::events) in PascalCase (defined in this module as constants).
//! 2. The time the event was emitted (as number of seconds since the Unix Epoch).
//!
//! The rest of the values differ depending on the kind of event. For example, the following snippet
//! is how an [AcceptMessageReply](crate::events::AcceptMessageReplyEvent) is printed:
//!
//! ```text
//! AcceptMessageReply, 1701329264, Id5u7f6, PrePrepare, 2, 9
//! ```
//!
//! In the snippet:
//! - The third value is the first seven characters of the Base64 encoding of the public key of the
//!   replica that sent the reply.
//! - The fourth value is the kind of the recovered message.
//! - The fifth and sixth values are the view and sequence number of the recovered message.

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use std::time::SystemTime;

use crate::events::*;

// Names of each event in PascalCase for printing:
pub const REQUEST_MESSAGE: &str = "RequestMessage";
pub const ACCEPT_MESSAGE_REPLY: &str = "AcceptMessageReply";
pub const REJECT_MESSAGE_REPLY: &str = "RejectMessageReply";
pub const COLLECT_GARBAGE: &str = "CollectGarbage";
pub const RECEIVE_MESSAGE_REQUEST: &str = "ReceiveMessageRequest";
pub const SEND_MESSAGE_REPLY: &str = "SendMessageReply";

/// Implemented by event types. Used to get a closure that logs the event.
pub(crate) trait Logger {
    /// Returns a pointer to the default logging handler for a given event type.
    fn get_logger() -> Box<dyn Fn(&Self) + Send>;
}

impl Logger for RequestMessageEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |request_message_event: &RequestMessageEvent| {
            log::info!(
                "{}, {}, {}, {}, {}, {}, {}",
                REQUEST_MESSAGE,
                secs_since_unix_epoch(request_message_event.timestamp),
                request_message_event.kind.name(),
                request_message_event.instance_id,
                request_message_event.key.view,
                request_message_event.key.seq,
                request_message_event.pinned
            )
        };
        Box::new(logger)
    }
}

impl Logger for AcceptMessageReplyEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |accept_message_reply_event: &AcceptMessageReplyEvent| {
            log::info!(
                "{}, {}, {}, {}, {}, {}",
                ACCEPT_MESSAGE_REPLY,
                secs_since_unix_epoch(accept_message_reply_event.timestamp),
                first_seven_base64_chars(&accept_message_reply_event.origin.to_bytes()),
                accept_message_reply_event.kind.name(),
                accept_message_reply_event.key.view,
                accept_message_reply_event.key.seq
            )
        };
        Box::new(logger)
    }
}

impl Logger for RejectMessageReplyEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |reject_message_reply_event: &RejectMessageReplyEvent| {
            log::info!(
                "{}, {}, {}, {}, {}, {}, {:?}",
                REJECT_MESSAGE_REPLY,
                secs_since_unix_epoch(reject_message_reply_event.timestamp),
                first_seven_base64_chars(&reject_message_reply_event.origin.to_bytes()),
                reject_message_reply_event.kind.name(),
                reject_message_reply_event.key.view,
                reject_message_reply_event.key.seq,
                reject_message_reply_event.rejection
            )
        };
        Box::new(logger)
    }
}

impl Logger for CollectGarbageEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |collect_garbage_event: &CollectGarbageEvent| {
            log::info!(
                "{}, {}, {}, {}",
                COLLECT_GARBAGE,
                secs_since_unix_epoch(collect_garbage_event.timestamp),
                collect_garbage_event.kind.name(),
                collect_garbage_event.discarded
            )
        };
        Box::new(logger)
    }
}

impl Logger for ReceiveMessageRequestEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |receive_message_request_event: &ReceiveMessageRequestEvent| {
            log::info!(
                "{}, {}, {}, {}, {}, {}, {}",
                RECEIVE_MESSAGE_REQUEST,
                secs_since_unix_epoch(receive_message_request_event.timestamp),
                first_seven_base64_chars(&receive_message_request_event.origin.to_bytes()),
                receive_message_request_event.request.kind.name(),
                receive_message_request_event.request.instance_id,
                receive_message_request_event.request.view,
                receive_message_request_event.request.seq
            )
        };
        Box::new(logger)
    }
}

impl Logger for SendMessageReplyEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |send_message_reply_event: &SendMessageReplyEvent| {
            log::info!(
                "{}, {}, {}, {}, {}, {}",
                SEND_MESSAGE_REPLY,
                secs_since_unix_epoch(send_message_reply_event.timestamp),
                first_seven_base64_chars(&send_message_reply_event.peer.to_bytes()),
                send_message_reply_event.kind.name(),
                send_message_reply_event.key.view,
                send_message_reply_event.key.seq
            )
        };
        Box::new(logger)
    }
}

// Get a more readable representation of a bytesequence by base64-encoding it and taking the first 7 characters.
pub(crate) fn first_seven_base64_chars(bytes: &[u8]) -> String {
    let encoded = STANDARD_NO_PAD.encode(bytes);
    if encoded.len() > 7 {
        encoded[0..7].to_string()
    } else {
        encoded
    }
}

fn secs_since_unix_epoch(timestamp: SystemTime) -> u64 {
    timestamp
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or(0)
}
