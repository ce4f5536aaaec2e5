//! Broadcast dispatcher actor
//!
//! The single consumer of every inbound message, whether it was read from
//! a participant connection or pushed by a peer relay. Messages are
//! processed strictly in queue order: fan-out to the target room, log
//! append for drawings, and replication to the peer pool.

use std::net::SocketAddr;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::client::Frame;
use crate::error::AppError;
use crate::message::WireMessage;
use crate::registry::RoomRegistry;
use crate::replicator::PeerReplicator;
use crate::room::Delivery;
use crate::types::ClientId;

/// Where a queued message came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Read from a local participant connection
    Client(ClientId),
    /// Pushed by a peer relay
    Peer(SocketAddr),
}

/// A message waiting in the dispatcher queue
#[derive(Debug)]
pub struct Envelope {
    pub message: WireMessage,
    pub origin: Origin,
}

/// Producer side of the dispatcher queue
///
/// The queue is bounded; `submit` waits while it is full.
#[derive(Debug, Clone)]
pub struct DispatcherHandle {
    sender: mpsc::Sender<Envelope>,
}

impl DispatcherHandle {
    pub fn new(sender: mpsc::Sender<Envelope>) -> Self {
        Self { sender }
    }

    /// Queue a message for dispatch
    pub async fn submit(&self, message: WireMessage, origin: Origin) -> Result<(), AppError> {
        self.sender
            .send(Envelope { message, origin })
            .await
            .map_err(|_| AppError::ChannelSend)
    }
}

/// What the dispatcher did with one message
#[derive(Debug, PartialEq, Eq)]
pub enum Dispatched {
    /// Test message or unencodable message, delivered to no one
    Ignored,
    /// No room exists for the message's code
    NoRoom,
    /// Sent by a participant that is no longer in the room
    NotMember,
    /// Fanned out to the room
    Broadcast(Delivery),
}

/// The dispatcher actor
pub struct Dispatcher {
    registry: RoomRegistry,
    replicator: PeerReplicator,
    /// Drawings are replicated only while their hop count is below this
    max_hops: u8,
    /// Message receiver channel
    receiver: mpsc::Receiver<Envelope>,
    /// Messages processed so far, test messages excluded
    processed: u64,
}

impl Dispatcher {
    /// Create a dispatcher and the handle that feeds it
    pub fn new(
        registry: RoomRegistry,
        replicator: PeerReplicator,
        max_hops: u8,
        capacity: usize,
    ) -> (Self, DispatcherHandle) {
        let (sender, receiver) = mpsc::channel(capacity);
        let dispatcher = Self {
            registry,
            replicator,
            max_hops,
            receiver,
            processed: 0,
        };
        (dispatcher, DispatcherHandle::new(sender))
    }

    /// Run the dispatch loop
    ///
    /// Continuously receives and processes messages until all handles are
    /// dropped.
    pub async fn run(mut self) {
        info!("Dispatcher started");

        while let Some(envelope) = self.receiver.recv().await {
            self.dispatch(envelope).await;
        }

        info!("Dispatcher shutting down");
    }

    /// Process a single message
    pub async fn dispatch(&mut self, envelope: Envelope) -> Dispatched {
        let Envelope { message, origin } = envelope;

        if message.is_test() {
            debug!("Test message from {:?} ignored", origin);
            return Dispatched::Ignored;
        }

        self.processed += 1;
        if self.processed % 10 == 0 {
            debug!("Dispatched {} messages", self.processed);
        }

        let sender = match origin {
            Origin::Client(id) => Some(id),
            Origin::Peer(_) => None,
        };
        let outcome = self.deliver(&message, sender).await;

        // A participant that has left the room speaks for no one
        if outcome == Dispatched::NotMember {
            debug!("Message from {:?} rejected, sender not in room {}", origin, message.code);
            return outcome;
        }

        if message.is_drawing() && message.hops < self.max_hops {
            self.replicator.replicate(message.next_hop());
        }
        outcome
    }

    /// Fan a message out to its room and log it if it is a drawing
    async fn deliver(&self, message: &WireMessage, sender: Option<ClientId>) -> Dispatched {
        let code = message.room_code();
        let Some(room) = self.registry.get(&code).await else {
            if sender.is_some() {
                return Dispatched::NotMember;
            }
            debug!("No room {} for peer message, dropped", code);
            return Dispatched::NoRoom;
        };

        let frame = match message.encode_for_clients() {
            Ok(json) => Frame::from(json),
            Err(e) => {
                warn!("Failed to encode message for room {}: {}", code, e);
                return Dispatched::Ignored;
            }
        };

        // Undecodable drawings are still relayed, only the log skips them
        let op = if message.is_drawing() {
            match message.drawing_operation() {
                Ok(op) => Some(op),
                Err(e) => {
                    warn!("Drawing for room {} not logged: {}", code, e);
                    None
                }
            }
        } else {
            None
        };

        match room.commit(sender, frame, op).await {
            Some(delivery) => {
                debug!(
                    "Delivered to {} clients in room {}",
                    delivery.delivered, code
                );
                Dispatched::Broadcast(delivery)
            }
            None => Dispatched::NotMember,
        }
    }
}
