//! HTTP ingress
//!
//! Accepts messages pushed by peer relays on `POST /su` and queues them
//! on the local dispatcher. When a static directory is configured, every
//! other path is served from it.

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::body::Bytes;
use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use tower_http::services::ServeDir;
use tracing::{debug, warn};

use crate::dispatcher::{DispatcherHandle, Origin};
use crate::message::WireMessage;

/// Path peers push to
pub const PUSH_PATH: &str = "/su";

/// Build the HTTP router
pub fn router(dispatcher: DispatcherHandle, static_dir: Option<PathBuf>) -> Router {
    let router = Router::new()
        .route(PUSH_PATH, post(handle_push))
        .with_state(dispatcher);

    match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    }
}

/// Handle a message pushed by a peer relay
async fn handle_push(
    State(dispatcher): State<DispatcherHandle>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    body: Bytes,
) -> StatusCode {
    let message = match WireMessage::decode(&body) {
        Ok(message) => message,
        Err(e) => {
            warn!("Undecodable push from {}: {}", peer, e);
            return StatusCode::BAD_REQUEST;
        }
    };

    if message.is_test() {
        debug!("Test push from {} ignored", peer);
        return StatusCode::OK;
    }

    debug!("Push from {} for room {}", peer, message.code);
    match dispatcher.submit(message, Origin::Peer(peer)).await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            warn!("Push from {} not queued: {}", peer, e);
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
