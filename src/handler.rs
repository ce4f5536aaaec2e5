//! WebSocket connection handler
//!
//! Handles individual participant connections: handshake and room
//! resolution, replay of the room's drawing log, then the bidirectional
//! pump between the socket and the dispatcher.

use futures_util::{Sink, SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, error, info, warn};

use crate::client::Client;
use crate::dispatcher::{DispatcherHandle, Origin};
use crate::error::AppError;
use crate::message::{DrawingOperation, WireMessage};
use crate::registry::RoomRegistry;
use crate::types::{ClientId, RoomCode};

/// Everything a connection needs from the rest of the relay
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    pub registry: RoomRegistry,
    pub dispatcher: DispatcherHandle,
    /// Capacity of each client's outbound buffer
    pub client_buffer: usize,
}

/// Accept participant connections until the listener fails
pub async fn serve(listener: TcpListener, ctx: ConnectionContext) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                info!("New connection from {}", addr);
                let ctx = ctx.clone();

                // Spawn handler task for each connection
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, ctx).await {
                        error!("Connection handler error: {}", e);
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}

/// Handle a new TCP connection
///
/// Performs the WebSocket handshake on `/ws/{code}`, replays the room's
/// drawing log, then relays frames in both directions until either side
/// goes away.
pub async fn handle_connection(stream: TcpStream, ctx: ConnectionContext) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    debug!("New TCP connection from {}", peer_addr);

    // WebSocket handshake, refusing paths without a room code
    let mut room_code = None;
    let ws_stream = tokio_tungstenite::accept_hdr_async(stream, |req: &Request, resp: Response| {
        match RoomCode::from_join_path(req.uri().path()) {
            Some(code) => {
                room_code = Some(code);
                Ok(resp)
            }
            None => {
                let mut err = ErrorResponse::new(Some("Invalid URL".to_string()));
                *err.status_mut() = StatusCode::BAD_REQUEST;
                Err(err)
            }
        }
    })
    .await?;
    let room_code = room_code.ok_or_else(|| AppError::InvalidPath(peer_addr.clone()))?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let client_id = ClientId::new();
    let room = ctx.registry.resolve(&room_code).await;

    // Channel for dispatcher -> client frames
    let (client, mut frame_rx) = Client::channel(client_id, ctx.client_buffer);
    let snapshot = room.join(client).await;
    info!(
        "Client {} from {} joined room {} ({} operations to replay)",
        client_id,
        peer_addr,
        room_code,
        snapshot.len()
    );

    // Live frames queue up in the client buffer while the replay is written
    if let Err(e) = replay(&mut ws_sender, &room_code, &snapshot).await {
        warn!("Replay to {} failed: {}", client_id, e);
        room.remove(client_id).await;
        return Err(e);
    }
    frame_rx.finish_replay();

    let dispatcher = ctx.dispatcher.clone();
    let read_room = room_code.clone();

    // Spawn read task (WebSocket -> Dispatcher)
    let mut read_task = tokio::spawn(async move {
        while let Some(msg_result) = ws_receiver.next().await {
            match msg_result {
                Ok(Message::Text(text)) => {
                    let mut message = match WireMessage::decode(text.as_bytes()) {
                        Ok(message) => message,
                        Err(e) => {
                            warn!("Invalid message from {}: {}", client_id, e);
                            continue;
                        }
                    };

                    if message.is_test() {
                        debug!("Test message from {}: {:?}", client_id, message.data);
                        continue;
                    }

                    debug!("Message from {}: {:?}", client_id, message.data_type);
                    // Participants can only ever talk to the room they joined
                    message.code = read_room.to_string();
                    message.hops = 0;
                    if dispatcher
                        .submit(message, Origin::Client(client_id))
                        .await
                        .is_err()
                    {
                        debug!("Dispatcher closed, ending read task for {}", client_id);
                        break;
                    }
                }
                Ok(Message::Close(_)) => {
                    debug!("Client {} sent close frame", client_id);
                    break;
                }
                Ok(Message::Ping(_)) => {
                    // Pong is handled automatically by tungstenite
                    debug!("Ping from {}", client_id);
                }
                Ok(_) => {
                    // Binary or other message types - ignore
                }
                Err(e) => {
                    warn!("WebSocket error for {}: {}", client_id, e);
                    break;
                }
            }
        }
        debug!("Read task ended for {}", client_id);
    });

    // Spawn write task (client buffer -> WebSocket)
    let mut write_task = tokio::spawn(async move {
        while let Some(frame) = frame_rx.recv().await {
            if ws_sender
                .send(Message::Text(frame.to_string().into()))
                .await
                .is_err()
            {
                debug!("WebSocket send failed, ending write task");
                break;
            }
        }
        debug!("Write task ended for client");

        // Send close frame when done
        let _ = ws_sender.close().await;
    });

    // Wait for either task to complete, then stop the other so a client
    // dropped from the room can no longer submit
    tokio::select! {
        _ = &mut read_task => {
            debug!("Read task completed for {}", client_id);
            write_task.abort();
        }
        _ = &mut write_task => {
            debug!("Write task completed for {}", client_id);
            read_task.abort();
        }
    }

    // The dispatcher may already have dropped this client
    room.remove(client_id).await;

    info!("Client {} left room {}", client_id, room_code);

    Ok(())
}

/// Write every logged operation to `sink`, one `drawing` frame each
pub async fn replay<S>(sink: &mut S, code: &RoomCode, ops: &[DrawingOperation]) -> Result<(), AppError>
where
    S: Sink<Message, Error = WsError> + Unpin,
{
    for op in ops {
        let json = WireMessage::drawing(code, op)?.encode_for_clients()?;
        sink.send(Message::Text(json.into())).await?;
    }
    Ok(())
}
