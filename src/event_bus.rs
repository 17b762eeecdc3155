/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Thread that passes published [events](crate::events) to the registered handlers.

use std::sync::mpsc::{Receiver, TryRecvError};
use std::thread::{self, JoinHandle};

use crate::events::*;
use crate::logging::Logger;

pub(crate) type HandlerPtr<T> = Box<dyn Fn(&T) + Send>;

pub(crate) struct EventHandlers {
    pub(crate) request_message_handlers: Vec<HandlerPtr<RequestMessageEvent>>,
    pub(crate) accept_message_reply_handlers: Vec<HandlerPtr<AcceptMessageReplyEvent>>,
    pub(crate) reject_message_reply_handlers: Vec<HandlerPtr<RejectMessageReplyEvent>>,
    pub(crate) collect_garbage_handlers: Vec<HandlerPtr<CollectGarbageEvent>>,
    pub(crate) receive_message_request_handlers: Vec<HandlerPtr<ReceiveMessageRequestEvent>>,
    pub(crate) send_message_reply_handlers: Vec<HandlerPtr<SendMessageReplyEvent>>,
}

impl EventHandlers {
    /// Collect the user-provided handlers, along with the default loggers if `log_events` is set.
    pub(crate) fn new(
        log_events: bool,
        request_message_handler: Option<HandlerPtr<RequestMessageEvent>>,
        accept_message_reply_handler: Option<HandlerPtr<AcceptMessageReplyEvent>>,
        reject_message_reply_handler: Option<HandlerPtr<RejectMessageReplyEvent>>,
        collect_garbage_handler: Option<HandlerPtr<CollectGarbageEvent>>,
        receive_message_request_handler: Option<HandlerPtr<ReceiveMessageRequestEvent>>,
        send_message_reply_handler: Option<HandlerPtr<SendMessageReplyEvent>>,
    ) -> EventHandlers {
        fn handlers<T: Logger>(log_events: bool, handler: Option<HandlerPtr<T>>) -> Vec<HandlerPtr<T>> {
            let mut handlers: Vec<HandlerPtr<T>> = Vec::new();
            if log_events {
                handlers.push(T::get_logger())
            }
            if let Some(handler) = handler {
                handlers.push(handler)
            }
            handlers
        }

        EventHandlers {
            request_message_handlers: handlers(log_events, request_message_handler),
            accept_message_reply_handlers: handlers(log_events, accept_message_reply_handler),
            reject_message_reply_handlers: handlers(log_events, reject_message_reply_handler),
            collect_garbage_handlers: handlers(log_events, collect_garbage_handler),
            receive_message_request_handlers: handlers(log_events, receive_message_request_handler),
            send_message_reply_handlers: handlers(log_events, send_message_reply_handler),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.request_message_handlers.is_empty()
            && self.accept_message_reply_handlers.is_empty()
            && self.reject_message_reply_handlers.is_empty()
            && self.collect_garbage_handlers.is_empty()
            && self.receive_message_request_handlers.is_empty()
            && self.send_message_reply_handlers.is_empty()
    }

    pub(crate) fn fire_handlers(&self, event: Event) {
        match event {
            Event::RequestMessage(request_message_event) => self
                .request_message_handlers
                .iter()
                .for_each(|handler| handler(&request_message_event)),

            Event::AcceptMessageReply(accept_message_reply_event) => self
                .accept_message_reply_handlers
                .iter()
                .for_each(|handler| handler(&accept_message_reply_event)),

            Event::RejectMessageReply(reject_message_reply_event) => self
                .reject_message_reply_handlers
                .iter()
                .for_each(|handler| handler(&reject_message_reply_event)),

            Event::CollectGarbage(collect_garbage_event) => self
                .collect_garbage_handlers
                .iter()
                .for_each(|handler| handler(&collect_garbage_event)),

            Event::ReceiveMessageRequest(receive_message_request_event) => self
                .receive_message_request_handlers
                .iter()
                .for_each(|handler| handler(&receive_message_request_event)),

            Event::SendMessageReply(send_message_reply_event) => self
                .send_message_reply_handlers
                .iter()
                .for_each(|handler| handler(&send_message_reply_event)),
        }
    }
}

/// Start the thread that fires `event_handlers` for every event received on `event_subscriber`.
///
/// On shutdown, events already published are still handled before the thread exits.
pub(crate) fn start_event_bus(
    event_handlers: EventHandlers,
    event_subscriber: Receiver<Event>,
    shutdown_signal: Receiver<()>,
) -> JoinHandle<()> {
    thread::spawn(move || loop {
        match shutdown_signal.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => {
                event_subscriber
                    .try_iter()
                    .for_each(|event| event_handlers.fire_handlers(event));
                return;
            }
            Err(TryRecvError::Empty) => (),
        }

        match event_subscriber.try_recv() {
            Ok(event) => event_handlers.fire_handlers(event),
            Err(TryRecvError::Empty) => thread::yield_now(),
            Err(TryRecvError::Disconnected) => return,
        }
    })
}
