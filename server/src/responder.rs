//! Outbound message routing to connected phones.

use crate::registry::SessionId;
use log::{debug, error, warn};
use shared::ServerMessage;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;

/// Per-connection outbound channel, drained by that connection's writer task
pub type Outbox = mpsc::UnboundedSender<String>;

/// Fire-and-forget sender shared by the game loop and the network layer
///
/// Holds one outbound channel per live connection. Nothing here ever fails
/// loudly: serialization and delivery errors are logged and dropped.
#[derive(Clone, Default)]
pub struct Responder {
    peers: Arc<RwLock<HashMap<SessionId, Outbox>>>,
}

impl Responder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, session: SessionId, outbox: Outbox) {
        match self.peers.write() {
            Ok(mut peers) => {
                peers.insert(session, outbox);
            }
            Err(e) => error!("Peer table poisoned, cannot register {}: {}", session, e),
        }
    }

    pub fn unregister(&self, session: SessionId) -> bool {
        match self.peers.write() {
            Ok(mut peers) => peers.remove(&session).is_some(),
            Err(e) => {
                error!("Peer table poisoned, cannot unregister {}: {}", session, e);
                false
            }
        }
    }

    pub fn is_registered(&self, session: SessionId) -> bool {
        self.peers
            .read()
            .map(|peers| peers.contains_key(&session))
            .unwrap_or(false)
    }

    pub fn peer_count(&self) -> usize {
        self.peers.read().map(|peers| peers.len()).unwrap_or(0)
    }

    pub fn send_to(&self, session: SessionId, message: &ServerMessage) {
        let Some(text) = encode(message) else {
            return;
        };
        self.send_text(session, text);
    }

    /// Sends pre-encoded text to one session
    pub fn send_text(&self, session: SessionId, text: String) {
        let outbox = match self.peers.read() {
            Ok(peers) => peers.get(&session).cloned(),
            Err(e) => {
                error!("Peer table poisoned: {}", e);
                return;
            }
        };

        match outbox {
            Some(outbox) => {
                if outbox.send(text).is_err() {
                    warn!("Connection of {} is closing, message dropped", session);
                }
            }
            None => debug!("No connection for {}, message dropped", session),
        }
    }

    pub fn broadcast(&self, message: &ServerMessage) {
        let Some(text) = encode(message) else {
            return;
        };

        let outboxes: Vec<(SessionId, Outbox)> = match self.peers.read() {
            Ok(peers) => peers.iter().map(|(id, tx)| (*id, tx.clone())).collect(),
            Err(e) => {
                error!("Peer table poisoned: {}", e);
                return;
            }
        };

        for (session, outbox) in outboxes {
            if outbox.send(text.clone()).is_err() {
                warn!("Connection of {} is closing, broadcast dropped", session);
            }
        }
    }
}

fn encode(message: &ServerMessage) -> Option<String> {
    match message.to_json() {
        Ok(text) => Some(text),
        Err(e) => {
            error!("Failed to serialize {} message: {}", message.kind(), e);
            None
        }
    }
}
