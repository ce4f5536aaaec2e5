//! Room registry
//!
//! Maps room codes to rooms. Rooms are created lazily on first join and
//! live for the lifetime of the registry.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::room::Room;
use crate::types::RoomCode;

/// Shared code → room map
///
/// Cheap to clone; every clone sees the same rooms.
#[derive(Debug, Clone, Default)]
pub struct RoomRegistry {
    rooms: Arc<RwLock<HashMap<RoomCode, Arc<Room>>>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the room for `code`, creating an empty one if absent
    ///
    /// Concurrent callers resolving the same new code all get the same
    /// instance.
    pub async fn resolve(&self, code: &RoomCode) -> Arc<Room> {
        if let Some(room) = self.rooms.read().await.get(code) {
            return Arc::clone(room);
        }

        let mut rooms = self.rooms.write().await;
        let room = Arc::clone(rooms.entry(code.clone()).or_insert_with(|| {
            info!("Room {} created", code);
            Arc::new(Room::new(code.clone()))
        }));
        debug!("Total rooms: {}", rooms.len());
        room
    }

    /// Look up an existing room without creating it
    pub async fn get(&self, code: &RoomCode) -> Option<Arc<Room>> {
        self.rooms.read().await.get(code).cloned()
    }

    /// Get the number of rooms
    pub async fn len(&self) -> usize {
        self.rooms.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rooms.read().await.is_empty()
    }
}
