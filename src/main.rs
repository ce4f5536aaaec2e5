//! Collaborative Whiteboard Relay - Entry Point
//!
//! Starts the dispatcher, the participant listener and the HTTP listener
//! for peer pushes and static assets.

use std::env;
use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use whiteboard_relay::{
    handler, ingress, Config, ConnectionContext, Dispatcher, PeerReplicator, RoomRegistry,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=whiteboard_relay=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("whiteboard_relay=info")),
        )
        .init();

    let mut config = Config::from_env()?;

    // Participant bind address from command line overrides the environment
    if let Some(addr) = env::args().nth(1) {
        config.ws_addr = addr;
    }

    let registry = RoomRegistry::new();
    let replicator = PeerReplicator::new(config.peers.clone(), config.push_timeout)?;
    info!("Replicating drawings to {} peers", replicator.peer_count());

    let (dispatcher, handle) = Dispatcher::new(
        registry.clone(),
        replicator,
        config.max_hops,
        config.queue_capacity,
    );
    tokio::spawn(dispatcher.run());

    // HTTP listener: peer ingress and static assets
    let http_listener = TcpListener::bind(&config.http_addr).await?;
    info!("HTTP ingress listening on {}", config.http_addr);
    let app = ingress::router(handle.clone(), config.static_dir.clone());
    tokio::spawn(async move {
        if let Err(e) = axum::serve(
            http_listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        {
            error!("HTTP server error: {}", e);
        }
    });

    // Participant listener
    let listener = TcpListener::bind(&config.ws_addr).await?;
    info!("Whiteboard relay listening on ws://{}/ws/{{code}}", config.ws_addr);

    let ctx = ConnectionContext {
        registry,
        dispatcher: handle,
        client_buffer: config.client_buffer,
    };
    handler::serve(listener, ctx).await;

    Ok(())
}
