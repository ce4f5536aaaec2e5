//! Basic type definitions for the whiteboard relay
//!
//! Provides newtype wrappers for type safety:
//! - `ClientId`: UUID-based unique client identifier
//! - `RoomCode`: opaque caller-supplied room code

use uuid::Uuid;

/// Unique client identifier (newtype pattern)
///
/// Wraps a UUID v4 for type-safe client identification.
/// Implements Hash and Eq for use as HashMap keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub Uuid);

impl ClientId {
    /// Create a new random client ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Room code
///
/// Opaque string chosen by whoever joins first. Two codes name the same
/// room exactly when the strings are equal; no case folding is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomCode(pub String);

impl RoomCode {
    /// Create a RoomCode from any string-like value
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Extract the room code from a join path of the form `/ws/{code}`
    ///
    /// Returns None when the path has another prefix or the code is empty.
    pub fn from_join_path(path: &str) -> Option<Self> {
        let mut parts = path.split('/');
        if parts.next() != Some("") || parts.next() != Some("ws") {
            return None;
        }
        match parts.next() {
            Some(code) if !code.is_empty() => Some(Self::new(code)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoomCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
