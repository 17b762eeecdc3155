/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Builders for starting a [`MessageReqService`] with event handling.
//!
//! ```ignore
//! let service = MessageReqSpec::builder()
//!     .configuration(Configuration::builder().log_events(true).build())
//!     .on_reject_message_reply(|event| penalize(event.origin))
//!     .build()
//!     .start();
//! ```
//!
//! ## Log Events
//!
//! This crate logs using the [log](https://docs.rs/log/latest/log/) crate. To get these messages
//! printed onto a terminal or to a file, set up a [logging
//! implementation](https://docs.rs/log/latest/log/#available-logging-implementations).

use std::sync::mpsc;

use typed_builder::TypedBuilder;

use crate::event_bus::*;
use crate::events::*;
use crate::message_req::service::MessageReqService;

/// Stores the user-defined parameters of a [`MessageReqService`], that is:
/// 1. The "Log Events" flag, if set to "true" then events are logged.
#[derive(Clone, TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [Configuration]. On the builder call the following methods to construct a valid [Configuration].

    Required:
    - `.log_events(...)`
"))]
pub struct Configuration {
    #[builder(setter(doc = "Enable logging? Required."))]
    pub log_events: bool,
}

/// Stores the configuration and the event handlers of a [`MessageReqService`].
#[derive(TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [MessageReqSpec]. On the builder call the following methods to construct a valid [MessageReqSpec].

    Required:
    - `.configuration(...)`

    Optional:
    - `.on_request_message(...)`
    - `.on_accept_message_reply(...)`
    - `.on_reject_message_reply(...)`
    - `.on_collect_garbage(...)`
    - `.on_receive_message_request(...)`
    - `.on_send_message_reply(...)`
"))]
pub struct MessageReqSpec {
    // Required parameters
    #[builder(setter(doc = "Set the [configuration](Configuration). Required."))]
    configuration: Configuration,
    // Optional parameters
    #[builder(default, setter(transform = |handler: impl Fn(&RequestMessageEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<RequestMessageEvent>),
    doc = "Register a handler closure to be invoked after a request for a missing message is produced. Optional."))]
    on_request_message: Option<HandlerPtr<RequestMessageEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&AcceptMessageReplyEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<AcceptMessageReplyEvent>),
    doc = "Register a handler closure to be invoked after a reply passes validation. Optional."))]
    on_accept_message_reply: Option<HandlerPtr<AcceptMessageReplyEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&RejectMessageReplyEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<RejectMessageReplyEvent>),
    doc = "Register a handler closure to be invoked after a reply is rejected. Optional."))]
    on_reject_message_reply: Option<HandlerPtr<RejectMessageReplyEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&CollectGarbageEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<CollectGarbageEvent>),
    doc = "Register a handler closure to be invoked after a pending-request table is cleared. Optional."))]
    on_collect_garbage: Option<HandlerPtr<CollectGarbageEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&ReceiveMessageRequestEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<ReceiveMessageRequestEvent>),
    doc = "Register a handler closure to be invoked after a request from a peer is received. Optional."))]
    on_receive_message_request: Option<HandlerPtr<ReceiveMessageRequestEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&SendMessageReplyEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<SendMessageReplyEvent>),
    doc = "Register a handler closure to be invoked after a reply to a peer is produced. Optional."))]
    on_send_message_reply: Option<HandlerPtr<SendMessageReplyEvent>>,
}

impl MessageReqSpec {
    /// Create the [`MessageReqService`], starting the event bus thread if there is any handler to fire.
    pub fn start(self) -> MessageReqService {
        let event_handlers = EventHandlers::new(
            self.configuration.log_events,
            self.on_request_message,
            self.on_accept_message_reply,
            self.on_reject_message_reply,
            self.on_collect_garbage,
            self.on_receive_message_request,
            self.on_send_message_reply,
        );

        if event_handlers.is_empty() {
            return MessageReqService::new(None);
        }

        let (event_publisher, event_subscriber) = mpsc::channel();
        let (event_bus_shutdown, event_bus_shutdown_receiver) = mpsc::channel();
        let event_bus = start_event_bus(
            event_handlers,
            event_subscriber,
            event_bus_shutdown_receiver,
        );

        MessageReqService::with_event_bus(
            Some(event_publisher),
            Some(event_bus),
            Some(event_bus_shutdown),
        )
    }
}
