//! The connection contract shared by the authority and its observers.
//!
//! The authority and client code only ever see [`Connection`]; whether the
//! peer lives in the same process ([`LocalConnection`]) or behind a byte
//! channel ([`TransportConnection`]) is decided once, by the factory call
//! that builds the connection.

use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;

use super::protocol::{ProtocolError, WireFormat, decode_action, encode_action};
use crate::player::ConnectionId;

/// Outbound half of a link: delivers actions of type `A` to the peer.
pub trait Connection<A>: Send + Sync {
    /// Identity token, used for ownership checks.
    fn id(&self) -> ConnectionId;

    /// Fire-and-forget delivery. Failures are logged, never returned.
    fn send(&self, action: &A);

    /// Stop delivering. Further sends are dropped.
    fn close(&self);

    fn is_closed(&self) -> bool;
}

/// Receiving end of a link. `from` identifies the connection the action
/// arrived on.
pub trait ActionSink<A>: Send + Sync {
    fn deliver(&self, from: ConnectionId, action: A);
}

impl<A: Send> ActionSink<A> for mpsc::UnboundedSender<(ConnectionId, A)> {
    fn deliver(&self, from: ConnectionId, action: A) {
        if self.send((from, action)).is_err() {
            tracing::debug!(from, "Dropped action: receiver gone");
        }
    }
}

/// FIFO sink drained by a synchronous owner between ticks.
pub struct ActionQueue<A> {
    queue: Mutex<VecDeque<(ConnectionId, A)>>,
}

impl<A> Default for ActionQueue<A> {
    fn default() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
        }
    }
}

impl<A> ActionQueue<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every queued action in arrival order.
    pub fn drain(&self) -> Vec<(ConnectionId, A)> {
        match self.queue.lock() {
            Ok(mut q) => q.drain(..).collect(),
            Err(poisoned) => poisoned.into_inner().drain(..).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.queue.lock().map(|q| q.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<A: Send> ActionSink<A> for ActionQueue<A> {
    fn deliver(&self, from: ConnectionId, action: A) {
        match self.queue.lock() {
            Ok(mut q) => q.push_back((from, action)),
            Err(poisoned) => poisoned.into_inner().push_back((from, action)),
        }
    }
}

/// In-process connection: `send` hands the action straight to the peer's sink.
pub struct LocalConnection<A> {
    id: ConnectionId,
    peer: Arc<dyn ActionSink<A>>,
    closed: AtomicBool,
}

impl<A: Clone + Send + 'static> Connection<A> for LocalConnection<A> {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn send(&self, action: &A) {
        if self.is_closed() {
            return;
        }
        self.peer.deliver(self.id, action.clone());
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Relaxed);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    Closed,
    Io(String),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "transport closed"),
            Self::Io(e) => write!(f, "transport error: {e}"),
        }
    }
}

impl std::error::Error for TransportError {}

/// An ordered, bidirectional byte channel supplied by the host
/// (websocket, data channel, test pipe). Inbound bytes are pushed to
/// [`TransportConnection::receive`] by whoever owns the read side.
pub trait Transport: Send + Sync {
    fn send(&self, bytes: Vec<u8>) -> Result<(), TransportError>;
    fn close(&self);
}

/// Transport over a tokio channel. Closing drops the sender so the reading
/// task observes end-of-stream.
pub struct ChannelTransport {
    tx: Mutex<Option<mpsc::UnboundedSender<Vec<u8>>>>,
}

impl ChannelTransport {
    pub fn new(tx: mpsc::UnboundedSender<Vec<u8>>) -> Self {
        Self {
            tx: Mutex::new(Some(tx)),
        }
    }

    /// A transport plus the receiver that sees everything written to it.
    pub fn pair() -> (Self, mpsc::UnboundedReceiver<Vec<u8>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl Transport for ChannelTransport {
    fn send(&self, bytes: Vec<u8>) -> Result<(), TransportError> {
        let guard = self
            .tx
            .lock()
            .map_err(|e| TransportError::Io(e.to_string()))?;
        match guard.as_ref() {
            Some(tx) => tx.send(bytes).map_err(|_| TransportError::Closed),
            None => Err(TransportError::Closed),
        }
    }

    fn close(&self) {
        if let Ok(mut guard) = self.tx.lock() {
            guard.take();
        }
    }
}

/// Connection that serializes actions onto a [`Transport`].
pub struct TransportConnection<A> {
    id: ConnectionId,
    transport: Arc<dyn Transport>,
    format: WireFormat,
    closed: AtomicBool,
    _action: PhantomData<fn(&A)>,
}

impl<A> TransportConnection<A> {
    pub fn format(&self) -> WireFormat {
        self.format
    }

    /// Decode bytes read from the transport and hand the action to `sink`
    /// tagged with this connection's id.
    pub fn receive<B: DeserializeOwned>(
        &self,
        data: &[u8],
        sink: &dyn ActionSink<B>,
    ) -> Result<(), ProtocolError> {
        let action = decode_action::<B>(self.format, data)?;
        sink.deliver(self.id, action);
        Ok(())
    }
}

impl<A: Serialize> Connection<A> for TransportConnection<A> {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn send(&self, action: &A) {
        if self.is_closed() {
            return;
        }
        let bytes = match encode_action(self.format, action) {
            Ok(b) => b,
            Err(e) => {
                tracing::error!(connection = self.id, error = %e, "Failed to encode action");
                return;
            },
        };
        if let Err(e) = self.transport.send(bytes) {
            tracing::warn!(connection = self.id, error = %e, "Transport send failed");
        }
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::Relaxed) {
            self.transport.close();
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }
}

/// Build an in-process connection delivering to `peer`.
pub fn local<A>(id: ConnectionId, peer: Arc<dyn ActionSink<A>>) -> LocalConnection<A> {
    LocalConnection {
        id,
        peer,
        closed: AtomicBool::new(false),
    }
}

/// Build a connection writing encoded actions to `transport`.
pub fn over_transport<A>(
    id: ConnectionId,
    transport: Arc<dyn Transport>,
    format: WireFormat,
) -> TransportConnection<A> {
    TransportConnection {
        id,
        transport,
        format,
        closed: AtomicBool::new(false),
        _action: PhantomData,
    }
}
