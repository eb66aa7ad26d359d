//! End-to-end tests for the `/api/v1/collab` WebSocket over a real listener.

mod common;

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Poll `$cond` until it holds, failing after a few seconds.
macro_rules! eventually {
    ($cond:expr) => {{
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            if $cond {
                break;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "condition never held: {}",
                stringify!($cond)
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }};
}

async fn serve(app: &common::TestApp) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = app.router();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("ws://{addr}/api/v1/collab")
}

async fn connect(url: &str) -> Client {
    let (client, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    client
}

async fn send_json(client: &mut Client, value: Value) {
    client.send(Message::Text(value.to_string())).await.unwrap();
}

/// Next frame, whatever its kind.
async fn next_frame(client: &mut Client) -> Message {
    tokio::time::timeout(Duration::from_secs(5), client.next())
        .await
        .expect("no frame within 5s")
        .expect("stream ended")
        .expect("websocket error")
}

/// Next text frame parsed as JSON, skipping pings and pongs.
async fn next_event(client: &mut Client) -> Value {
    loop {
        match next_frame(client).await {
            Message::Text(text) => return serde_json::from_str(&text).unwrap(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

#[tokio::test]
async fn room_events_flow_between_real_sockets() {
    let app = common::build_test_app();
    let url = serve(&app).await;

    let mut alice = connect(&url).await;
    let mut bob = connect(&url).await;
    eventually!(app.state.ws_manager.connection_count().await == 2);

    send_json(&mut bob, json!({"type": "join", "projectId": "P1", "userId": "bob"})).await;
    eventually!(app.state.rooms.member_count("P1").await == 1);
    send_json(
        &mut alice,
        json!({"type": "join", "projectId": "P1", "userId": "alice", "userName": "Alice"}),
    )
    .await;

    let joined = next_event(&mut bob).await;
    assert_eq!(joined["type"], "userJoined");
    assert_eq!(joined["userId"], "alice");
    assert_eq!(joined["userName"], "Alice");

    send_json(
        &mut alice,
        json!({"type": "camera", "payload": {"position": [1, 2, 3]}}),
    )
    .await;
    let camera = next_event(&mut bob).await;
    assert_eq!(camera["type"], "camera");
    assert_eq!(camera["userId"], "alice");
    assert_eq!(camera["position"], json!([1, 2, 3]));

    // Control frames travel on the same writer as room events.
    assert_eq!(app.state.ws_manager.ping_all().await, 2);
    assert!(matches!(next_frame(&mut alice).await, Message::Ping(_)));

    bob.close(None).await.unwrap();
    let left = next_event(&mut alice).await;
    assert_eq!(left["type"], "userLeft");
    assert_eq!(left["userId"], "bob");

    eventually!(app.state.ws_manager.connection_count().await == 1);
    assert_eq!(app.state.rooms.member_count("P1").await, 1);
}

#[tokio::test]
async fn join_to_foreign_project_stays_silent() {
    let app = common::build_test_app();
    let url = serve(&app).await;

    let mut carol = connect(&url).await;
    let mut mallory = connect(&url).await;
    send_json(&mut carol, json!({"type": "join", "projectId": "P2", "userId": "carol"})).await;
    eventually!(app.state.rooms.member_count("P2").await == 1);

    send_json(&mut mallory, json!({"type": "join", "projectId": "P2", "userId": "mallory"})).await;
    send_json(&mut mallory, json!({"type": "camera", "payload": {"zoom": 2}})).await;

    // Frames from one socket are applied in order, so once this join lands
    // the denied join and the camera frame have been handled.
    send_json(&mut mallory, json!({"type": "join", "projectId": "LEGACY", "userId": "mallory"})).await;
    eventually!(app.state.rooms.member_count("LEGACY").await == 1);

    // The next thing carol sees is the ping, not an event from mallory.
    app.state.ws_manager.ping_all().await;
    assert!(matches!(next_frame(&mut carol).await, Message::Ping(_)));
    assert_eq!(app.state.rooms.member_count("P2").await, 1);
}
