//! Client struct definition
//!
//! Represents a connected participant and its outbound channel.
//!
//! The channel itself is unbounded; the backlog limit is enforced by a
//! shared counter so that it can be lifted while the join replay is being
//! written and restored gradually afterwards.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::SendError;
use crate::types::ClientId;

/// An encoded text frame, shared by every recipient of one fan-out
pub type Frame = Arc<str>;

/// Backlog accounting shared by a client and its frame receiver
#[derive(Debug)]
struct Backlog {
    /// Frames queued and not yet taken by the write task
    queued: AtomicUsize,
    /// Steady-state limit on `queued`
    capacity: usize,
    /// Extra room granted for traffic that piled up during replay
    allowance: AtomicUsize,
    /// No limit applies until the replay is written
    replaying: AtomicBool,
}

/// Connected client handle
#[derive(Debug, Clone)]
pub struct Client {
    /// Unique identifier for this client
    pub id: ClientId,
    /// Relay → Client frame channel
    sender: mpsc::UnboundedSender<Frame>,
    backlog: Arc<Backlog>,
}

/// Receiving half of a client's frame channel, drained by the write task
#[derive(Debug)]
pub struct FrameReceiver {
    receiver: mpsc::UnboundedReceiver<Frame>,
    backlog: Arc<Backlog>,
}

impl Client {
    /// Create a client whose backlog may hold `capacity` frames once its
    /// replay is done
    pub fn channel(id: ClientId, capacity: usize) -> (Self, FrameReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let backlog = Arc::new(Backlog {
            queued: AtomicUsize::new(0),
            capacity,
            allowance: AtomicUsize::new(0),
            replaying: AtomicBool::new(true),
        });
        let client = Self {
            id,
            sender,
            backlog: Arc::clone(&backlog),
        };
        (client, FrameReceiver { receiver, backlog })
    }

    /// Queue a frame for this client without waiting
    ///
    /// A full backlog is reported the same way as a closed channel: the
    /// caller drops the client instead of stalling the fan-out.
    pub fn try_send(&self, frame: Frame) -> Result<(), SendError> {
        let backlog = &self.backlog;
        if !backlog.replaying.load(Ordering::Acquire) {
            let limit = backlog.capacity + backlog.allowance.load(Ordering::Acquire);
            if backlog.queued.load(Ordering::Acquire) >= limit {
                return Err(SendError::BufferFull);
            }
        }
        self.sender
            .send(frame)
            .map_err(|_| SendError::ChannelClosed)?;
        backlog.queued.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}

impl FrameReceiver {
    /// Mark the replay as written
    ///
    /// Whatever queued up meanwhile becomes a one-off allowance that
    /// shrinks as the write task catches up.
    pub fn finish_replay(&self) {
        let backlog = &self.backlog;
        backlog
            .allowance
            .store(backlog.queued.load(Ordering::Acquire), Ordering::Release);
        backlog.replaying.store(false, Ordering::Release);
    }

    /// Receive the next frame, or None once the client has been dropped
    pub async fn recv(&mut self) -> Option<Frame> {
        let frame = self.receiver.recv().await?;
        let backlog = &self.backlog;
        backlog.queued.fetch_sub(1, Ordering::AcqRel);
        let _ = backlog
            .allowance
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |a| a.checked_sub(1));
        Some(frame)
    }

    /// Frames currently waiting
    pub fn backlog(&self) -> usize {
        self.backlog.queued.load(Ordering::Acquire)
    }
}
