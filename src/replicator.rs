//! Peer replicator
//!
//! Best-effort forwarding of drawing messages to a fixed pool of peer
//! relays. Every push is an independent task bounded by a timeout; a
//! failed push is logged and forgotten.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::message::WireMessage;

/// Outbound side of peer replication
#[derive(Debug, Clone)]
pub struct PeerReplicator {
    client: reqwest::Client,
    peers: Arc<[String]>,
}

impl PeerReplicator {
    /// Create a replicator for the given peer push URLs
    pub fn new(peers: Vec<String>, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            peers: peers.into(),
        })
    }

    /// Replicator with no peers; `replicate` is a no-op
    pub fn disabled() -> Self {
        Self {
            client: reqwest::Client::new(),
            peers: Arc::from(Vec::new()),
        }
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Push `message` to every peer concurrently
    ///
    /// Returns immediately. The handles are only useful to callers that
    /// want to wait for the pushes, which the dispatcher never does.
    pub fn replicate(&self, message: WireMessage) -> Vec<JoinHandle<()>> {
        let message = Arc::new(message);
        self.peers
            .iter()
            .map(|url| {
                let client = self.client.clone();
                let url = url.clone();
                let message = Arc::clone(&message);
                tokio::spawn(async move {
                    match push(&client, &url, &message).await {
                        Ok(()) => debug!("Push to {} succeeded", url),
                        Err(e) => warn!("Push to {} failed: {}", url, e),
                    }
                })
            })
            .collect()
    }
}

/// Send one message to one peer, failing on any non-success status
async fn push(client: &reqwest::Client, url: &str, message: &WireMessage) -> Result<(), AppError> {
    client
        .post(url)
        .json(message)
        .send()
        .await?
        .error_for_status()?;
    Ok(())
}
