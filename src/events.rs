use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use std::time::{SystemTime, UNIX_EPOCH};

use futures::Stream;
use tokio::sync::mpsc::{self, Receiver, Sender};
use uuid::Uuid;

use crate::compression::CompressType;
use crate::error::Error;
use crate::session::SessionListener;

pub type SessionId = Uuid;

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// A fresh per-session id, built from wall-clock nanos mixed with a
/// monotonic counter rather than a random-number generator — this crate has
/// no use for `rand` once masking is out of scope, so the `v8` custom-bytes
/// constructor is fed deterministic-but-unique entropy instead.
pub fn generate_session_id() -> SessionId {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);

    let mut bytes = [0u8; 16];
    bytes[..8].copy_from_slice(&nanos.to_be_bytes());
    bytes[8..].copy_from_slice(&seq.to_be_bytes());
    Uuid::new_v8(bytes)
}

/// A session event flattened into an enum, for callers who'd rather poll a
/// [`Stream`] than implement [`SessionListener`]'s trait methods.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Error(String),
    Handshake(Vec<CompressType>),
    Connected,
    Close(i16, String),
    Ping,
    Pong,
    Text(String, bool),
    Binary(Vec<u8>, bool),
}

/// Adapts a [`SessionListener`] onto an mpsc channel: every callback pushes
/// a [`SessionEvent`] instead of running caller logic inline.
pub struct ChannelListener {
    tx: Sender<SessionEvent>,
}

impl ChannelListener {
    pub fn new(capacity: usize) -> (Self, Receiver<SessionEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    fn push(&self, event: SessionEvent) {
        // A full or closed channel just drops the event — there's no
        // synchronous backpressure path back into frame dispatch.
        let _ = self.tx.try_send(event);
    }
}

impl SessionListener for ChannelListener {
    fn on_error(&self, error: &Error) {
        self.push(SessionEvent::Error(error.to_string()));
    }

    fn on_handshake(&self, offered: &[CompressType]) -> CompressType {
        self.push(SessionEvent::Handshake(offered.to_vec()));
        CompressType::None
    }

    fn on_connected(&self) {
        self.push(SessionEvent::Connected);
    }

    fn on_close(&self, code: i16, reason: &str) {
        self.push(SessionEvent::Close(code, reason.to_string()));
    }

    fn on_ping(&self) {
        self.push(SessionEvent::Ping);
    }

    fn on_pong(&self) {
        self.push(SessionEvent::Pong);
    }

    fn on_text(&self, text: &str, finish: bool) {
        self.push(SessionEvent::Text(text.to_string(), finish));
    }

    fn on_binary(&self, payload: &[u8], finish: bool) {
        self.push(SessionEvent::Binary(payload.to_vec(), finish));
    }
}

/// `Stream` wrapper over the receiving half of a [`ChannelListener`], so
/// callers don't need to touch the mpsc API directly.
pub struct SessionEventStream {
    receiver: Receiver<SessionEvent>,
}

impl SessionEventStream {
    pub fn new(receiver: Receiver<SessionEvent>) -> Self {
        Self { receiver }
    }
}

impl Stream for SessionEventStream {
    type Item = SessionEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        Pin::new(&mut this.receiver).poll_recv(cx)
    }
}
