//! Room struct definition
//!
//! A room is an isolated broadcast domain: the set of clients joined to
//! its code plus the ordered log of drawing operations committed to it.

use std::collections::HashMap;

use tokio::sync::Mutex;
use tracing::warn;

use crate::client::{Client, Frame};
use crate::message::DrawingOperation;
use crate::types::{ClientId, RoomCode};

/// Result of committing one message to a room
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Clients the frame was queued for
    pub delivered: usize,
    /// Clients removed because their outbound path failed
    pub dropped: Vec<ClientId>,
    /// Whether an operation was appended to the drawing log
    pub logged: bool,
}

/// Whiteboard room
///
/// Lock order is always `log` then `clients`. Neither lock is held
/// across a network write; delivery only queues into client buffers.
#[derive(Debug)]
pub struct Room {
    /// Room code for identification
    pub code: RoomCode,
    /// Connected clients
    clients: Mutex<HashMap<ClientId, Client>>,
    /// Append-only drawing log, in commit order
    log: Mutex<Vec<DrawingOperation>>,
}

impl Room {
    /// Create an empty room
    pub fn new(code: RoomCode) -> Self {
        Self {
            code,
            clients: Mutex::new(HashMap::new()),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Register a client and return the log it must replay first
    ///
    /// Snapshot and registration happen under the log lock, so every
    /// commit lands either in the snapshot or in the client's buffer,
    /// never both and never neither.
    pub async fn join(&self, client: Client) -> Vec<DrawingOperation> {
        let log = self.log.lock().await;
        let snapshot = log.clone();
        self.clients.lock().await.insert(client.id, client);
        snapshot
    }

    /// Remove a client from the room
    ///
    /// Returns whether the client was present. Removing an absent client
    /// is a no-op.
    pub async fn remove(&self, client_id: ClientId) -> bool {
        self.clients.lock().await.remove(&client_id).is_some()
    }

    /// Fan a frame out to every client and optionally log an operation
    ///
    /// Clients whose buffer is closed or full are removed; delivery to
    /// the rest continues. When `sender` is given and is no longer a
    /// member, nothing is delivered or logged and None is returned.
    pub async fn commit(
        &self,
        sender: Option<ClientId>,
        frame: Frame,
        op: Option<DrawingOperation>,
    ) -> Option<Delivery> {
        let mut log = self.log.lock().await;
        let mut clients = self.clients.lock().await;

        if let Some(id) = sender {
            if !clients.contains_key(&id) {
                return None;
            }
        }

        let mut delivery = Delivery::default();
        clients.retain(|id, client| match client.try_send(frame.clone()) {
            Ok(()) => {
                delivery.delivered += 1;
                true
            }
            Err(e) => {
                warn!("Dropping client {} from room {}: {}", id, self.code, e);
                delivery.dropped.push(*id);
                false
            }
        });

        if let Some(op) = op {
            log.push(op);
            delivery.logged = true;
        }

        Some(delivery)
    }

    /// Check if a client is in this room
    pub async fn contains(&self, client_id: ClientId) -> bool {
        self.clients.lock().await.contains_key(&client_id)
    }

    /// Get the number of connected clients
    pub async fn client_count(&self) -> usize {
        self.clients.lock().await.len()
    }

    /// Get the number of logged operations
    pub async fn log_len(&self) -> usize {
        self.log.lock().await.len()
    }
}
