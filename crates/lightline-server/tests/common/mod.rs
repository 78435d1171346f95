use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use lightline_core::net::actions::{ClientAction, ServerAction};
use lightline_core::net::protocol::{WireFormat, decode_server_action, encode_client_action};
use lightline_server::build_app;
use lightline_server::config::ServerConfig;
use lightline_sim::SimConfig;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestServer {
    pub addr: SocketAddr,
    _shutdown: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Start a test server with a seeded simulation and no countdown.
    pub async fn new() -> Self {
        Self::from_config(test_config()).await
    }

    pub async fn from_config(config: ServerConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (app, _state) = build_app(config);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give the server a moment to start accepting
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            _shutdown: handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self, room: &str) -> String {
        format!("ws://{}/ws/{room}", self.addr)
    }

    pub fn ws_url_msgpack(&self, room: &str) -> String {
        format!("ws://{}/ws/{room}?format=msgpack", self.addr)
    }
}

pub fn test_config() -> ServerConfig {
    ServerConfig {
        listen_addr: "127.0.0.1:0".to_string(),
        sim: SimConfig {
            countdown_ms: 0,
            seed: Some(7),
            ..SimConfig::default()
        },
        ..ServerConfig::default()
    }
}

/// Connect a WebSocket client to the given URL.
pub async fn ws_connect(url: &str) -> WsStream {
    let (stream, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    stream
}

/// Send a client action as a JSON text frame.
pub async fn ws_send(stream: &mut WsStream, action: &ClientAction) {
    let encoded = encode_client_action(WireFormat::Json, action).unwrap();
    let text = String::from_utf8(encoded).unwrap();
    stream.send(Message::Text(text.into())).await.unwrap();
}

/// Send a client action as a MessagePack binary frame.
pub async fn ws_send_msgpack(stream: &mut WsStream, action: &ClientAction) {
    let encoded = encode_client_action(WireFormat::MessagePack, action).unwrap();
    stream.send(Message::Binary(encoded.into())).await.unwrap();
}

pub fn add_player(name: &str) -> ClientAction {
    ClientAction::AddPlayer {
        name: name.to_string(),
        color: None,
    }
}

/// Read the next server action (5s timeout). Text frames are JSON, binary
/// frames are MessagePack.
pub async fn ws_read(stream: &mut WsStream) -> ServerAction {
    ws_try_read(stream, 5000)
        .await
        .expect("Timed out waiting for WebSocket message")
}

/// Try to read the next server action, returning None on timeout.
pub async fn ws_try_read(stream: &mut WsStream, timeout_ms: u64) -> Option<ServerAction> {
    let deadline = Duration::from_millis(timeout_ms);
    tokio::time::timeout(deadline, async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return decode_server_action(WireFormat::Json, text.as_str().as_bytes()).unwrap();
                },
                Some(Ok(Message::Binary(data))) => {
                    return decode_server_action(WireFormat::MessagePack, &data).unwrap();
                },
                Some(Ok(Message::Close(_))) => panic!("WebSocket closed unexpectedly"),
                Some(Err(e)) => panic!("WebSocket error: {e}"),
                None => panic!("WebSocket stream ended"),
                _ => continue,
            }
        }
    })
    .await
    .ok()
}

/// Skip actions until one with the given wire tag arrives.
pub async fn ws_read_until(stream: &mut WsStream, kind: &str) -> ServerAction {
    for _ in 0..2000 {
        let action = ws_read(stream).await;
        if action.kind() == kind {
            return action;
        }
    }
    panic!("never received {kind}");
}

/// Wait for the server to close the socket (5s timeout).
pub async fn ws_expect_close(stream: &mut WsStream) {
    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
                _ => continue,
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "socket was not closed");
}

/// GET a JSON document from the server.
pub async fn get_json(server: &TestServer, path: &str) -> (u16, serde_json::Value) {
    let resp = reqwest::get(format!("{}{path}", server.base_url()))
        .await
        .unwrap();
    let status = resp.status().as_u16();
    let body = resp.json().await.unwrap_or(serde_json::Value::Null);
    (status, body)
}

/// Poll `path` until `check` accepts the body.
pub async fn eventually_json(
    server: &TestServer,
    path: &str,
    check: impl Fn(&serde_json::Value) -> bool,
) -> serde_json::Value {
    for _ in 0..200 {
        let (status, body) = get_json(server, path).await;
        if status == 200 && check(&body) {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("{path} never reached the expected state");
}
