use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, Query, State, WebSocketUpgrade};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use lightline_core::net::actions::{ClientAction, ServerAction};
use lightline_core::net::connection::{
    ChannelTransport, Connection, Transport, TransportConnection, over_transport,
};
use lightline_core::net::protocol::WireFormat;
use lightline_core::player::ConnectionId;

use crate::error::AppError;
use crate::game_loop::RoomCommand;
use crate::room_manager::{JoinError, JoinTicket};
use crate::state::{AppState, ConnectionGuard};

/// Query string of `/ws/{room}`: `?format=json` (default) or `?format=msgpack`.
#[derive(Debug, Default, Deserialize)]
pub struct WsParams {
    #[serde(default)]
    pub format: WireFormat,
}

pub async fn ws_handler(
    State(state): State<AppState>,
    Path(room): Path<String>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> Result<Response, AppError> {
    let max_ws = state.config.limits.max_ws_connections;
    let current = state.ws_connection_count.load(Ordering::Relaxed);
    if current >= max_ws {
        tracing::warn!(current, max = max_ws, "WS connection limit reached");
        return Err(AppError::Unavailable("too many connections".to_string()));
    }

    let ticket = state.rooms.write().await.join(&room).map_err(|e| match e {
        JoinError::InvalidName => AppError::BadRequest(e.to_string()),
        JoinError::TooManyRooms | JoinError::RoomFull => AppError::Unavailable(e.to_string()),
    })?;
    tracing::info!(
        room = %ticket.room,
        connection = ticket.connection_id,
        peers = ticket.peers,
        format = ?params.format,
        "Connection joined room"
    );

    let guard = ConnectionGuard::new(Arc::clone(&state.ws_connection_count));
    let failed = (state.clone(), ticket.room.clone(), ticket.connection_id);
    let format = params.format;
    Ok(ws
        .on_failed_upgrade(move |e| {
            let (state, room, connection_id) = failed;
            tracing::warn!(room = %room, connection = connection_id, error = %e, "WS upgrade failed");
            tokio::spawn(async move {
                state.rooms.write().await.leave(&room, connection_id);
            });
        })
        .on_upgrade(move |socket| handle_socket(socket, state, ticket, format, guard))
        .into_response())
}

async fn handle_socket(
    socket: WebSocket,
    state: AppState,
    ticket: JoinTicket,
    format: WireFormat,
    _guard: ConnectionGuard,
) {
    let JoinTicket {
        room,
        connection_id,
        channels,
        ..
    } = ticket;
    let (ws_sender, mut ws_receiver) = socket.split();

    let (transport, outbound) = ChannelTransport::pair();
    let transport: Arc<dyn Transport> = Arc::new(transport);
    let observer = over_transport::<ServerAction>(connection_id, Arc::clone(&transport), format);
    let reader = over_transport::<ServerAction>(connection_id, transport, format);
    spawn_writer(ws_sender, outbound, format);

    if channels
        .commands
        .send(RoomCommand::Connect(Box::new(observer)))
        .is_err()
    {
        tracing::warn!(room = %room, connection = connection_id, "Room loop is gone");
    } else {
        let rate = state.config.limits.ws_rate_limit_per_sec;
        read_loop(&mut ws_receiver, &reader, &channels.actions, rate, &room).await;
    }

    state.rooms.write().await.leave(&room, connection_id);
    reader.close();
    tracing::info!(room = %room, connection = connection_id, "Connection closed");
}

/// Wrap encoded bytes in the frame type matching the wire format.
fn frame(format: WireFormat, bytes: Vec<u8>) -> Option<Message> {
    match format {
        WireFormat::Json => match String::from_utf8(bytes) {
            Ok(text) => Some(Message::Text(text.into())),
            Err(e) => {
                tracing::error!(error = %e, "Encoded JSON is not UTF-8");
                None
            },
        },
        WireFormat::MessagePack => Some(Message::Binary(Bytes::from(bytes))),
    }
}

fn spawn_writer(
    mut ws_sender: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::UnboundedReceiver<Vec<u8>>,
    format: WireFormat,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(bytes) = outbound.recv().await {
            let Some(msg) = frame(format, bytes) else {
                continue;
            };
            if ws_sender.send(msg).await.is_err() {
                break;
            }
        }
        let _ = ws_sender.send(Message::Close(None)).await;
    })
}

/// Per-connection rate limiter (token bucket).
struct RateLimiter {
    tokens: f64,
    last_refill: tokio::time::Instant,
    max_tokens: f64,
    refill_rate: f64, // tokens per second
}

impl RateLimiter {
    fn new(max_tokens: f64, refill_rate: f64) -> Self {
        Self {
            tokens: max_tokens,
            last_refill: tokio::time::Instant::now(),
            max_tokens,
            refill_rate,
        }
    }

    /// Returns true if the message is allowed; false if rate-limited.
    fn allow(&mut self) -> bool {
        let now = tokio::time::Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.max_tokens);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Decode every inbound frame into the room's action queue. Undecodable
/// frames are logged and dropped; the connection stays open.
async fn read_loop(
    ws_receiver: &mut SplitStream<WebSocket>,
    reader: &TransportConnection<ServerAction>,
    actions: &mpsc::UnboundedSender<(ConnectionId, ClientAction)>,
    rate: f64,
    room: &str,
) {
    let connection = reader.id();
    let mut rate_limiter = RateLimiter::new(rate, rate);

    while let Some(Ok(msg)) = ws_receiver.next().await {
        let data: &[u8] = match &msg {
            Message::Text(text) => text.as_str().as_bytes(),
            Message::Binary(data) => &data[..],
            Message::Close(_) => break,
            _ => continue,
        };

        if !rate_limiter.allow() {
            tracing::warn!(connection, room, "Rate limited");
            continue;
        }

        if let Err(e) = reader.receive::<ClientAction>(data, actions) {
            tracing::warn!(connection, room, error = %e, "Dropped undecodable message");
        }
    }
}
