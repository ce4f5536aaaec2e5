//! End-to-end tests against a real participant listener

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use whiteboard_relay::{
    handler, ConnectionContext, Dispatcher, DrawingOperation, Frame, PeerReplicator, Room,
    RoomCode, RoomRegistry, ShapeKind, WireMessage,
};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECT: &str =
    r#"{"type":"rect","startX":0,"startY":0,"endX":10,"endY":10,"width":10,"height":10}"#;
const CIRCLE: &str = r#"{"type":"circle","startX":5,"startY":5,"endX":8,"endY":8,"radius":3}"#;
const LINE: &str = r#"{"type":"line","startX":1,"startY":2,"endX":3,"endY":4}"#;

async fn start_relay() -> (String, RoomRegistry) {
    start_relay_with_buffer(64).await
}

async fn start_relay_with_buffer(client_buffer: usize) -> (String, RoomRegistry) {
    let registry = RoomRegistry::new();
    let (dispatcher, handle) =
        Dispatcher::new(registry.clone(), PeerReplicator::disabled(), 1, 64);
    tokio::spawn(dispatcher.run());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let ctx = ConnectionContext {
        registry: registry.clone(),
        dispatcher: handle,
        client_buffer,
    };
    tokio::spawn(handler::serve(listener, ctx));

    (format!("ws://{}", addr), registry)
}

async fn join(base: &str, code: &str) -> Socket {
    let (socket, _) = connect_async(format!("{}/ws/{}", base, code)).await.unwrap();
    socket
}

async fn send(socket: &mut Socket, data_type: &str, data: &str, code: &str) {
    let json = serde_json::json!({ "dataType": data_type, "data": data, "code": code });
    socket
        .send(Message::Text(json.to_string().into()))
        .await
        .unwrap();
}

async fn recv(socket: &mut Socket) -> WireMessage {
    loop {
        let frame = timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .expect("websocket error");
        if let Message::Text(text) = frame {
            return WireMessage::decode(text.as_bytes()).unwrap();
        }
    }
}

async fn wait_for_clients(room: &Room, expected: usize) {
    timeout(Duration::from_secs(5), async {
        while room.client_count().await != expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("room membership did not settle");
}

fn operation(data: &str) -> DrawingOperation {
    serde_json::from_str(data).unwrap()
}

fn text_at(x: usize, text: &str) -> DrawingOperation {
    DrawingOperation {
        kind: ShapeKind::Text,
        start_x: x as f64,
        start_y: 0.0,
        end_x: x as f64,
        end_y: 0.0,
        text: Some(text.to_string()),
        radius: None,
        width: None,
        height: None,
    }
}

#[tokio::test]
async fn test_late_joiner_gets_replay_then_live() {
    let (base, _registry) = start_relay().await;

    let mut a = join(&base, "R1").await;
    send(&mut a, "drawing", RECT, "R1").await;
    // The echo means the rectangle has been committed
    assert_eq!(recv(&mut a).await.data, RECT);

    let mut b = join(&base, "R1").await;
    let replayed = recv(&mut b).await;
    assert!(replayed.is_drawing());
    assert_eq!(replayed.code, "R1");
    assert_eq!(replayed.drawing_operation().unwrap(), operation(RECT));

    send(&mut a, "drawing", CIRCLE, "R1").await;
    assert_eq!(recv(&mut a).await.data, CIRCLE);
    // Live or replayed depending on how fast B's join landed, same operation either way
    assert_eq!(
        recv(&mut b).await.drawing_operation().unwrap(),
        operation(CIRCLE)
    );

    let mut c = join(&base, "R1").await;
    let kinds = vec![
        recv(&mut c).await.drawing_operation().unwrap().kind,
        recv(&mut c).await.drawing_operation().unwrap().kind,
    ];
    assert_eq!(kinds, vec![ShapeKind::Rect, ShapeKind::Circle]);
}

#[tokio::test]
async fn test_rooms_do_not_leak() {
    let (base, _registry) = start_relay().await;

    let mut abc = join(&base, "ABC").await;
    let mut xyz = join(&base, "XYZ").await;

    send(&mut abc, "drawing", RECT, "ABC").await;
    assert_eq!(recv(&mut abc).await.data, RECT);

    // The first thing XYZ sees is its own drawing
    send(&mut xyz, "drawing", LINE, "XYZ").await;
    assert_eq!(recv(&mut xyz).await.data, LINE);
}

#[tokio::test]
async fn test_messages_stay_in_joined_room() {
    let (base, registry) = start_relay().await;

    let mut a = join(&base, "R1").await;
    send(&mut a, "drawing", RECT, "SOMEWHERE_ELSE").await;

    let echoed = recv(&mut a).await;
    assert_eq!(echoed.code, "R1");
    assert!(registry
        .get(&RoomCode::new("SOMEWHERE_ELSE"))
        .await
        .is_none());
}

#[tokio::test]
async fn test_connectivity_check_is_not_relayed() {
    let (base, registry) = start_relay().await;

    let mut a = join(&base, "R1").await;
    let mut b = join(&base, "R1").await;

    send(&mut a, "test", "Connection established", "R1").await;
    send(&mut a, "drawing", LINE, "R1").await;

    assert_eq!(recv(&mut a).await.data, LINE);
    assert_eq!(
        recv(&mut b).await.drawing_operation().unwrap(),
        operation(LINE)
    );

    let room = registry.get(&RoomCode::new("R1")).await.unwrap();
    assert_eq!(room.log_len().await, 1);
}

#[tokio::test]
async fn test_malformed_drawing_relayed_not_replayed() {
    let (base, registry) = start_relay().await;

    let mut a = join(&base, "R1").await;
    send(&mut a, "drawing", "{broken", "R1").await;
    assert_eq!(recv(&mut a).await.data, "{broken");

    send(&mut a, "drawing", LINE, "R1").await;
    assert_eq!(recv(&mut a).await.data, LINE);

    let room = registry.get(&RoomCode::new("R1")).await.unwrap();
    assert_eq!(room.log_len().await, 1);

    let mut b = join(&base, "R1").await;
    assert_eq!(
        recv(&mut b).await.drawing_operation().unwrap(),
        operation(LINE)
    );
}

#[tokio::test]
async fn test_disconnect_leaves_others_served() {
    let (base, registry) = start_relay().await;

    let mut a = join(&base, "R1").await;
    let mut b = join(&base, "R1").await;
    let room = registry.resolve(&RoomCode::new("R1")).await;
    wait_for_clients(&room, 2).await;

    b.close(None).await.unwrap();
    drop(b);
    wait_for_clients(&room, 1).await;

    send(&mut a, "drawing", RECT, "R1").await;
    assert_eq!(recv(&mut a).await.data, RECT);
}

#[tokio::test]
async fn test_join_without_code_refused() {
    let (base, registry) = start_relay().await;

    assert!(connect_async(format!("{}/ws/", base)).await.is_err());
    assert!(connect_async(format!("{}/elsewhere", base)).await.is_err());
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn test_live_traffic_during_long_replay_keeps_joiner() {
    const LOGGED: usize = 2000;
    const LIVE: usize = 20;

    let (base, registry) = start_relay_with_buffer(4).await;
    let room = registry.resolve(&RoomCode::new("R1")).await;
    let filler = "x".repeat(16 * 1024);
    for i in 0..LOGGED {
        room.commit(None, Frame::from(""), Some(text_at(i, &filler)))
            .await
            .unwrap();
    }

    let mut a = join(&base, "R1").await;
    for i in 0..LOGGED {
        assert_eq!(recv(&mut a).await.drawing_operation().unwrap().start_x, i as f64);
    }

    // B does not read, so its replay backs up on the socket
    let mut b = join(&base, "R1").await;
    wait_for_clients(&room, 2).await;

    for j in 0..LIVE {
        let data = serde_json::to_string(&text_at(LOGGED + j, "live")).unwrap();
        send(&mut a, "drawing", &data, "R1").await;
        assert_eq!(recv(&mut a).await.data, data);
    }
    assert_eq!(room.client_count().await, 2);

    for i in 0..LOGGED + LIVE {
        assert_eq!(recv(&mut b).await.drawing_operation().unwrap().start_x, i as f64);
    }
    assert_eq!(room.client_count().await, 2);
}

#[tokio::test]
async fn test_dropped_client_cannot_draw() {
    let (base, registry) = start_relay_with_buffer(4).await;
    let room = registry.resolve(&RoomCode::new("R1")).await;

    let mut b = join(&base, "R1").await;
    wait_for_clients(&room, 1).await;

    // B never reads, so its buffer eventually overflows and it is dropped
    let big = Frame::from("x".repeat(64 * 1024));
    timeout(Duration::from_secs(10), async {
        loop {
            let delivery = room.commit(None, big.clone(), None).await.unwrap();
            if !delivery.dropped.is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("slow client was never dropped");
    assert_eq!(room.client_count().await, 0);

    send(&mut b, "drawing", RECT, "R1").await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    // A's first frame is its own drawing: nothing from B was logged
    let mut a = join(&base, "R1").await;
    send(&mut a, "drawing", LINE, "R1").await;
    assert_eq!(recv(&mut a).await.data, LINE);
    assert_eq!(room.log_len().await, 1);
}
