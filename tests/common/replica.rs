use ed25519_dalek::VerifyingKey;
use pbft_message_req::{
    consensus_state::ConsensusSharedData,
    message_req::{service::MessageReqService, tracker::ReplyRejection},
    messages::{AnyThreePCMessage, MessageKind, RecoveryMessage},
    types::data_types::{InstanceID, StashBinding, ThreePCKey, ViewNumber},
};

use super::network::NetworkStub;

/// A replica that runs only the message recovery protocol, on top of a consensus state that the test
/// populates directly.
pub(crate) struct Replica {
    pub(crate) state: ConsensusSharedData,
    pub(crate) service: MessageReqService,
    pub(crate) recovered: Vec<(VerifyingKey, AnyThreePCMessage)>,
    pub(crate) rejected: Vec<(VerifyingKey, ReplyRejection)>,
    network: NetworkStub,
}

impl Replica {
    pub(crate) fn new(
        verifying_key: VerifyingKey,
        network: NetworkStub,
        instance_id: InstanceID,
        view: ViewNumber,
    ) -> Replica {
        Replica {
            state: ConsensusSharedData::new(verifying_key, instance_id, view),
            service: MessageReqService::new(None),
            recovered: Vec::new(),
            rejected: Vec::new(),
            network,
        }
    }

    /// Ask every peer for the message of `kind` at `key`. Returns whether a request was sent.
    pub(crate) fn request(
        &mut self,
        kind: MessageKind,
        key: ThreePCKey,
        stash_binding: Option<StashBinding>,
    ) -> bool {
        match self
            .service
            .prepare_request(kind, key, stash_binding, &self.state)
        {
            Some(request) => {
                self.network.broadcast(RecoveryMessage::MessageReq(request));
                true
            }
            None => false,
        }
    }

    /// Handle every message in the inbox, inserting accepted messages into the consensus state.
    /// Returns the number of messages handled.
    pub(crate) fn process_messages(&mut self) -> usize {
        let mut handled = 0;
        while let Some((origin, message)) = self.network.recv() {
            match message {
                RecoveryMessage::MessageReq(request) => {
                    if let Some(reply) = self.service.handle_request(&request, &origin, &self.state) {
                        self.network.send(origin, RecoveryMessage::MessageRep(reply));
                    }
                }
                RecoveryMessage::MessageRep(reply) => {
                    match self.service.handle_reply(&reply, &origin, &self.state) {
                        Ok(msg) => {
                            self.state.insert_recovered(msg.clone(), origin);
                            self.recovered.push((origin, msg));
                        }
                        Err(rejection) => self.rejected.push((origin, rejection)),
                    }
                }
            }
            handled += 1;
        }
        handled
    }
}

/// Let the replicas exchange messages until none are in flight.
pub(crate) fn run_until_quiet(replicas: &mut [Replica]) {
    loop {
        let handled: usize = replicas
            .iter_mut()
            .map(|replica| replica.process_messages())
            .sum();
        if handled == 0 {
            return;
        }
    }
}
