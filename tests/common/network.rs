use std::{
    collections::HashMap,
    sync::mpsc::{self, Receiver, Sender, TryRecvError},
};

use borsh::{BorshDeserialize, BorshSerialize};
use ed25519_dalek::VerifyingKey;
use pbft_message_req::messages::RecoveryMessage;

/// A mock network stub which passes borsh-encoded messages between replicas using channels.
pub(crate) struct NetworkStub {
    my_verifying_key: VerifyingKey,
    all_peers: HashMap<VerifyingKey, Sender<(VerifyingKey, Vec<u8>)>>,
    inbox: Receiver<(VerifyingKey, Vec<u8>)>,
}

impl NetworkStub {
    pub(crate) fn send(&mut self, peer: VerifyingKey, message: RecoveryMessage) {
        if let Some(peer) = self.all_peers.get(&peer) {
            let _ = peer.send((self.my_verifying_key, message.try_to_vec().unwrap()));
        }
    }

    // Send `message` to every peer except the sender itself.
    pub(crate) fn broadcast(&mut self, message: RecoveryMessage) {
        let bytes = message.try_to_vec().unwrap();
        for (verifying_key, peer) in &self.all_peers {
            if *verifying_key != self.my_verifying_key {
                let _ = peer.send((self.my_verifying_key, bytes.clone()));
            }
        }
    }

    pub(crate) fn recv(&mut self) -> Option<(VerifyingKey, RecoveryMessage)> {
        match self.inbox.try_recv() {
            Ok((origin, bytes)) => Some((origin, RecoveryMessage::try_from_slice(&bytes).unwrap())),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => panic!(),
        }
    }
}

pub(crate) fn mock_network(peers: impl Iterator<Item = VerifyingKey>) -> Vec<NetworkStub> {
    let mut all_peers = HashMap::new();
    let peer_and_inboxes: Vec<(VerifyingKey, Receiver<(VerifyingKey, Vec<u8>)>)> = peers
        .map(|peer| {
            let (sender, receiver) = mpsc::channel();
            all_peers.insert(peer, sender);

            (peer, receiver)
        })
        .collect();

    peer_and_inboxes
        .into_iter()
        .map(|(my_verifying_key, inbox)| NetworkStub {
            my_verifying_key,
            all_peers: all_peers.clone(),
            inbox,
        })
        .collect()
}
