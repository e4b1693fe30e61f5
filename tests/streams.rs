//! End-to-end stream relay scenarios using a real WebSocket client.

#![allow(clippy::panic)]

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures_util::{SinkExt, StreamExt};
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use stream_gateway::app_state::AppState;
use stream_gateway::build_router;
use stream_gateway::config::GatewayConfig;

const TEST_APP_ID: &str = "dummy-app-id-123";
const TEST_USER_ID: &str = "dummy-user-id-123";
const TIMEOUT: Duration = Duration::from_secs(5);

/// Boot a gateway on an ephemeral port and return its address.
async fn boot_server_with(config: GatewayConfig) -> String {
    let state = AppState::new(config);
    let app = build_router().with_state(state);

    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("failed to bind test listener");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("listener has no local addr");
    };
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("{addr}")
}

async fn boot_server() -> String {
    boot_server_with(GatewayConfig::default()).await
}

fn handshake_token(user_id: &str, app_id: &str) -> String {
    let payload = format!("{{\"user_id\": \"{user_id}\", \"app_id\": \"{app_id}\"}}");
    BASE64.encode(payload)
}

/// Percent-encode the characters of the base64 alphabet that are unsafe in
/// a query value.
fn query_encode(value: &str) -> String {
    value
        .replace('+', "%2B")
        .replace('/', "%2F")
        .replace('=', "%3D")
}

fn ws_url_with_token(addr: &str, stream_type: &str, app_id: &str, token: &str) -> String {
    format!(
        "ws://{addr}/v1/streams/?handshake_token={}&app_id={app_id}&type={stream_type}",
        query_encode(token)
    )
}

fn ws_url_for(addr: &str, stream_type: &str, app_id: &str, user_id: &str) -> String {
    ws_url_with_token(addr, stream_type, app_id, &handshake_token(user_id, app_id))
}

fn ws_url(addr: &str, stream_type: &str) -> String {
    ws_url_for(addr, stream_type, TEST_APP_ID, TEST_USER_ID)
}

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

async fn connect(url: &str) -> WsStream {
    let Ok(Ok((ws, _))) = timeout(TIMEOUT, connect_async(url)).await else {
        panic!("failed to connect to {url}");
    };
    ws
}

async fn recv_text(ws: &mut WsStream) -> String {
    let Ok(Some(Ok(Message::Text(text)))) = timeout(TIMEOUT, ws.next()).await else {
        panic!("expected a text frame");
    };
    text.as_str().to_string()
}

#[tokio::test]
async fn writer_frames_reach_attached_reader_in_order() {
    let addr = boot_server().await;
    let mut writer = connect(&ws_url(&addr, "log_writer")).await;
    let mut reader = connect(&ws_url(&addr, "log_reader")).await;

    // Give both connection tasks time to bind into the registry.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let messages = ["log line 1", "log line 2", "[ERROR] some error!"];
    for message in messages {
        let Ok(()) = writer.send(Message::text(message)).await else {
            panic!("send failed");
        };
    }

    for expected in messages {
        assert_eq!(recv_text(&mut reader).await, expected);
    }
}

#[tokio::test]
async fn reader_with_no_writers_times_out_client_side() {
    let addr = boot_server().await;
    let mut reader = connect(&ws_url(&addr, "log_reader")).await;

    let result = timeout(Duration::from_millis(200), reader.next()).await;
    assert!(result.is_err(), "no frame should arrive without a writer");
}

#[tokio::test]
async fn oversized_frame_closes_the_writer() {
    let addr = boot_server().await;
    let mut writer = connect(&ws_url(&addr, "log_writer")).await;
    let mut reader = connect(&ws_url(&addr, "log_reader")).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    // ~700 kB, well past the default 25 kB limit.
    let long_line = "abc-123".repeat(1024 * 100);
    let Ok(()) = writer.send(Message::text(long_line)).await else {
        panic!("send failed");
    };

    let Ok(Some(Ok(Message::Close(_)))) = timeout(TIMEOUT, writer.next()).await else {
        panic!("expected the server to close the writer");
    };

    // The oversized frame must never have been forwarded.
    let result = timeout(Duration::from_millis(200), reader.next()).await;
    assert!(result.is_err(), "oversized frame must not reach readers");
}

#[tokio::test]
async fn invalid_handshake_token_yields_400() {
    let addr = boot_server().await;
    let url = ws_url_with_token(&addr, "notifications", TEST_APP_ID, "bad-tkn");

    let Err(WsError::Http(response)) = connect_async(url).await else {
        panic!("expected the upgrade to be rejected");
    };
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn mismatched_app_id_yields_400() {
    let addr = boot_server().await;
    let token = handshake_token(TEST_USER_ID, "some-other-app");
    let url = ws_url_with_token(&addr, "log_writer", TEST_APP_ID, &token);

    let Err(WsError::Http(response)) = connect_async(url).await else {
        panic!("expected the upgrade to be rejected");
    };
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn unknown_stream_type_yields_400() {
    let addr = boot_server().await;
    let url = ws_url(&addr, "log_tailer");

    let Err(WsError::Http(response)) = connect_async(url).await else {
        panic!("expected the upgrade to be rejected");
    };
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn valid_token_upgrades_to_websocket() {
    let addr = boot_server().await;

    let Ok((_ws, response)) = connect_async(ws_url(&addr, "notifications")).await else {
        panic!("expected the upgrade to succeed");
    };
    assert_eq!(response.status(), 101);
    let upgrade = response
        .headers()
        .get("upgrade")
        .and_then(|v| v.to_str().ok());
    assert_eq!(upgrade, Some("websocket"));
}

#[tokio::test]
async fn channels_are_isolated_by_identity() {
    let addr = boot_server().await;
    let mut writer = connect(&ws_url_for(&addr, "log_writer", "app-a", "user-1")).await;
    let mut reader = connect(&ws_url_for(&addr, "log_reader", "app-b", "user-1")).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let Ok(()) = writer.send(Message::text("private line")).await else {
        panic!("send failed");
    };

    let result = timeout(Duration::from_millis(200), reader.next()).await;
    assert!(result.is_err(), "frames must not cross channel boundaries");
}

#[tokio::test]
async fn reader_frames_are_not_relayed() {
    let addr = boot_server().await;
    let mut sender = connect(&ws_url(&addr, "log_reader")).await;
    let mut sibling = connect(&ws_url(&addr, "log_reader")).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let Ok(()) = sender.send(Message::text("should be discarded")).await else {
        panic!("send failed");
    };

    let result = timeout(Duration::from_millis(200), sibling.next()).await;
    assert!(result.is_err(), "reader payloads must be discarded");
}

#[tokio::test]
async fn notifications_fan_out_to_peers_and_self() {
    let addr = boot_server().await;
    let mut first = connect(&ws_url(&addr, "notifications")).await;
    let mut second = connect(&ws_url(&addr, "notifications")).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let Ok(()) = first.send(Message::text("build finished")).await else {
        panic!("send failed");
    };

    assert_eq!(recv_text(&mut second).await, "build finished");
    assert_eq!(recv_text(&mut first).await, "build finished");
}

#[tokio::test]
async fn writer_over_throttle_budget_relays_a_warning_then_drops() {
    let config = GatewayConfig {
        throttle_rate: 2.0,
        throttle_per_secs: 60.0,
        ..GatewayConfig::default()
    };
    let addr = boot_server_with(config).await;
    let mut writer = connect(&ws_url(&addr, "log_writer")).await;
    let mut reader = connect(&ws_url(&addr, "log_reader")).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    for message in ["one", "two", "three", "four"] {
        let Ok(()) = writer.send(Message::text(message)).await else {
            panic!("send failed");
        };
    }

    assert_eq!(recv_text(&mut reader).await, "one");
    assert_eq!(recv_text(&mut reader).await, "two");
    assert_eq!(
        recv_text(&mut reader).await,
        "[WARNING] Logging too frequent"
    );
    let result = timeout(Duration::from_millis(200), reader.next()).await;
    assert!(result.is_err(), "over-budget frames must be dropped");
}

#[tokio::test]
async fn writer_disconnect_is_invisible_to_readers() {
    let addr = boot_server().await;
    let mut writer = connect(&ws_url(&addr, "log_writer")).await;
    let mut reader = connect(&ws_url(&addr, "log_reader")).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let Ok(()) = writer.send(Message::text("last line")).await else {
        panic!("send failed");
    };
    assert_eq!(recv_text(&mut reader).await, "last line");

    let Ok(()) = writer.close(None).await else {
        panic!("close failed");
    };

    // The reader sees no close and no error, it simply keeps waiting.
    let result = timeout(Duration::from_millis(200), reader.next()).await;
    assert!(result.is_err(), "writer departure must not disturb readers");
}

#[tokio::test]
async fn health_endpoint_reports_healthy() {
    let addr = boot_server().await;

    let Ok(response) = reqwest::get(format!("http://{addr}/health")).await else {
        panic!("health request failed");
    };
    assert_eq!(response.status(), 200);
    let Ok(body) = response.json::<serde_json::Value>().await else {
        panic!("health body is not JSON");
    };
    assert_eq!(
        body.get("status").and_then(serde_json::Value::as_str),
        Some("healthy")
    );
}
