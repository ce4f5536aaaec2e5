//! Collaborative Whiteboard Relay Library
//!
//! A room-scoped WebSocket relay built with tokio-tungstenite. Participants
//! join a room by code, receive the room's drawing history, then see every
//! operation drawn by the others live.
//!
//! # Features
//! - Lazy room creation on first join
//! - Replay of the drawing log to late joiners, with no gap or duplicate
//! - Single ordered dispatcher for all rooms
//! - Best-effort replication of drawings to a fixed pool of peer relays
//! - HTTP ingress for pushes from peers, optional static asset serving
//!
//! # Architecture
//! - `Dispatcher` is the one consumer of a bounded `mpsc` queue fed by
//!   every connection's read task and by the HTTP ingress
//! - Each `Room` guards its client set and its drawing log with separate
//!   locks, never held across a network write
//! - Each connection has a read task (socket -> dispatcher) and a write
//!   task (client buffer -> socket)
//! - `PeerReplicator` spawns one timed push per peer and never waits
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use whiteboard_relay::{handler, ConnectionContext, Dispatcher, PeerReplicator, RoomRegistry};
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = RoomRegistry::new();
//!     let (dispatcher, handle) =
//!         Dispatcher::new(registry.clone(), PeerReplicator::disabled(), 1, 256);
//!     tokio::spawn(dispatcher.run());
//!
//!     let listener = TcpListener::bind("127.0.0.1:8080").await.unwrap();
//!     let ctx = ConnectionContext { registry, dispatcher: handle, client_buffer: 256 };
//!     handler::serve(listener, ctx).await;
//! }
//! ```

pub mod client;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod ingress;
pub mod message;
pub mod registry;
pub mod replicator;
pub mod room;
pub mod types;

// Re-export main types for convenience
pub use client::{Client, Frame, FrameReceiver};
pub use config::Config;
pub use dispatcher::{Dispatched, Dispatcher, DispatcherHandle, Envelope, Origin};
pub use error::{AppError, ConfigError, SendError};
pub use handler::{handle_connection, ConnectionContext};
pub use message::{DataType, DrawingOperation, ShapeKind, WireMessage};
pub use registry::RoomRegistry;
pub use replicator::PeerReplicator;
pub use room::{Delivery, Room};
pub use types::{ClientId, RoomCode};
