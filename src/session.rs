use std::sync::{Arc, Mutex, OnceLock, Weak};

use log::{debug, error, trace, warn};

use crate::compression::{CompressType, Compressor, CompressorRegistry};
use crate::config::SessionConfig;
use crate::error::Error;
use crate::frame::{CloseCode, Frame, OpCode};
use crate::keepalive::{KeepAliveListener, KeepAliveManager};
use crate::parser::FrameParser;
use crate::transport::SendHandler;

/// Lifecycle state of a session. `Closed` and `Error` are terminal — no
/// operation is valid from either one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    Connecting,
    Connected,
    Closing,
    Closed,
    Error,
}

impl SessionState {
    fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Closed | SessionState::Error)
    }
}

/// Callback surface a caller implements to receive session events. Every
/// method defaults to a no-op, matching the source's `Listener` base class
/// with all-virtual-but-empty methods — implementors only override what they
/// care about.
pub trait SessionListener: Send + Sync {
    fn on_error(&self, _error: &Error) {}
    /// Inspect the peer's offered compressor list and pick one. Returning
    /// `CompressType::None` (the default) declines compression.
    fn on_handshake(&self, _offered: &[CompressType]) -> CompressType {
        CompressType::None
    }
    fn on_connected(&self) {}
    fn on_close(&self, _code: i16, _reason: &str) {}
    fn on_ping(&self) {}
    fn on_pong(&self) {}
    fn on_text(&self, _text: &str, _finish: bool) {}
    fn on_binary(&self, _payload: &[u8], _finish: bool) {}
}

/// Listener that never overrides anything — the default when a caller has
/// no use for the callback surface (e.g. send-only sessions in tests).
#[derive(Debug, Default)]
pub struct NullListener;

impl SessionListener for NullListener {}

/// Protocol state machine plus send/receive plumbing for one connection.
/// Owns a [`FrameParser`] for inbound bytes and a [`SendHandler`] closure for
/// outbound ones; knows nothing about sockets.
pub struct SessionContext {
    state: SessionState,
    parser: FrameParser,
    send: SendHandler,
    listener: Arc<dyn SessionListener>,
    compressor: Option<Box<dyn Compressor>>,
    registry: &'static CompressorRegistry,
    config: SessionConfig,
}

impl SessionContext {
    pub fn new(config: SessionConfig, send: SendHandler, listener: Arc<dyn SessionListener>) -> Self {
        Self {
            state: SessionState::Init,
            parser: FrameParser::with_receive_buffer_size(config.receive_buffer_size),
            send,
            listener,
            compressor: None,
            registry: CompressorRegistry::global(),
            config,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Send the initial handshake frame, offering every compressor this
    /// process has registered.
    pub fn handshake(&mut self) -> Result<(), Error> {
        let offer = self.registry.supported_compressors().to_string();
        self.handshake_with(offer)
    }

    /// Send the initial handshake frame, offering only the given compressors.
    pub fn handshake_with_types(&mut self, types: &[CompressType]) -> Result<(), Error> {
        let offer = self.registry.supported_compressors_filtered(types);
        self.handshake_with(offer)
    }

    fn handshake_with(&mut self, offer: String) -> Result<(), Error> {
        if self.state != SessionState::Init {
            return Err(Error::InvalidState(self.state));
        }
        debug!("state: Init -> Connecting");
        self.state = SessionState::Connecting;
        self.send_frame(Frame::new(true, OpCode::System, offer.into_bytes(), false));
        Ok(())
    }

    pub fn send_text(&mut self, text: &str, finish: bool) -> Result<(), Error> {
        if !matches!(self.state, SessionState::Connected) {
            return Err(Error::InvalidState(self.state));
        }
        if text.is_empty() {
            self.notify_error(Error::MessageEmpty);
            return Err(Error::MessageEmpty);
        }

        let mut payload = text.as_bytes().to_vec();
        let mut compressed = false;
        if let Some(compressor) = self.compressor.as_mut() {
            match compressor.compress(&payload) {
                Ok(out) => {
                    payload = out;
                    compressed = true;
                }
                Err(_) => {
                    self.notify_error(Error::CompressError);
                    self.close(CloseCode::INTERNAL_ERROR)?;
                    return Err(Error::CompressError);
                }
            }
        }

        self.send_frame(Frame::new(finish, OpCode::Text, payload, compressed));
        Ok(())
    }

    /// Sends raw bytes uncompressed, regardless of a negotiated compressor.
    /// [`SessionContext::on_frame`]'s binary path always attempts to
    /// decompress when a compressor is active — this asymmetry is preserved
    /// intentionally to match the source, which never compresses outbound
    /// binary frames even after a successful handshake.
    pub fn send_binary(&mut self, payload: &[u8], finish: bool) -> Result<(), Error> {
        if !matches!(self.state, SessionState::Connected) {
            return Err(Error::InvalidState(self.state));
        }
        if payload.is_empty() {
            self.notify_error(Error::MessageEmpty);
            return Err(Error::MessageEmpty);
        }

        self.send_frame(Frame::new(finish, OpCode::Binary, payload.to_vec(), false));
        Ok(())
    }

    pub fn ping(&mut self) -> Result<(), Error> {
        self.send_frame(Frame::new(true, OpCode::Ping, b"ping".to_vec(), false));
        Ok(())
    }

    pub fn pong(&mut self) -> Result<(), Error> {
        self.send_frame(Frame::new(true, OpCode::Pong, b"pong".to_vec(), false));
        Ok(())
    }

    /// Closes with `code`'s default reason text (empty if the code has
    /// none), matching the source's one-arg `Close(code)` overload, which
    /// resolves to `CloseMessage(code)`.
    pub fn close(&mut self, code: CloseCode) -> Result<(), Error> {
        self.close_with_reason(code, code.default_reason().unwrap_or(""))
    }

    pub fn close_with_reason(&mut self, code: CloseCode, reason: &str) -> Result<(), Error> {
        if self.state == SessionState::Closed {
            return Err(Error::InvalidState(self.state));
        }
        debug!("state: {:?} -> Closing", self.state);
        self.state = SessionState::Closing;

        // Short-tier payload must stay under 254 bytes total.
        if 2 + reason.len() >= 254 {
            self.notify_error(Error::ErrorReasonTooLong);
            return self.close(CloseCode::INTERNAL_ERROR);
        }

        let mut payload = Vec::with_capacity(2 + reason.len());
        // Host-endian raw copy, matching `memcpy(buffer.get(), &code, 2)` in
        // the source — not portable across differing-endian peers, kept
        // intentionally rather than normalized to network order.
        payload.extend_from_slice(&code.0.to_ne_bytes());
        payload.extend_from_slice(reason.as_bytes());

        self.send_frame(Frame::new(true, OpCode::Close, payload, false));
        Ok(())
    }

    /// Feed freshly received bytes and dispatch every frame that becomes
    /// complete as a result. Does **not** flush the keep-alive manager —
    /// only the expired-timer callback does that, matching the source.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.parser.feed(bytes);
        self.drain();
    }

    /// Expose the parser buffer's free tail directly, for a transport read
    /// to fill without an extra copy through `feed`. Empty once the
    /// configured receive buffer is full — growing it is a policy decision
    /// for the caller, not something a read triggers implicitly.
    pub fn prepare_write(&mut self) -> &mut [u8] {
        self.parser.prepare_write()
    }

    /// Commit the bytes written via `prepare_write` and drain any frames
    /// they complete.
    pub fn commit_write(&mut self, n: usize) {
        self.parser.commit_write(n);
        self.drain();
    }

    fn drain(&mut self) {
        loop {
            if self.state.is_terminal() {
                return;
            }
            match self.parser.parse_one() {
                Ok(Some(frame)) => self.on_frame(frame),
                Ok(None) => return,
                Err(err) => {
                    self.notify_error(err);
                    debug!("state: {:?} -> Error", self.state);
                    self.state = SessionState::Error;
                    return;
                }
            }
        }
    }

    fn on_frame(&mut self, frame: Frame) {
        if self.state.is_terminal() {
            return;
        }

        trace!(
            "dispatching frame opcode={:?} len={} fin={}",
            frame.header.opcode,
            frame.payload.len(),
            frame.header.fin
        );

        match frame.header.opcode {
            OpCode::System => self.on_system_frame(frame),
            OpCode::Text => self.on_text_frame(frame),
            OpCode::Binary => self.on_binary_frame(frame),
            OpCode::Close => self.on_close_frame(frame),
            OpCode::Ping => {
                self.listener.on_ping();
            }
            OpCode::Pong => {
                self.listener.on_pong();
            }
        }
    }

    fn on_system_frame(&mut self, frame: Frame) {
        let offer = String::from_utf8_lossy(&frame.payload);
        let offered = self.registry.parse_offer(&offer);

        let chosen = self.listener.on_handshake(&offered);
        self.compressor = self.registry.create(chosen);

        if self.state == SessionState::Init {
            let reply_types = match chosen {
                CompressType::None => vec![CompressType::None],
                other => vec![other],
            };
            if let Err(err) = self.handshake_with_types(&reply_types) {
                warn!("handshake reply failed: {err}");
            }
        }

        debug!("state: {:?} -> Connected", self.state);
        self.state = SessionState::Connected;
        self.listener.on_connected();
    }

    fn on_text_frame(&mut self, frame: Frame) {
        let payload = match self.decompress(&frame.payload) {
            Some(payload) => payload,
            None => return,
        };
        match String::from_utf8(payload) {
            Ok(text) => self.listener.on_text(&text, frame.header.fin),
            Err(err) => self.notify_error(Error::from(err)),
        }
    }

    /// Always attempts decompression when a compressor is active, even
    /// though [`SessionContext::send_binary`] never compresses outbound
    /// binary payloads. This asymmetry mirrors the source's `NotifyBinary`,
    /// which decompresses unconditionally regardless of what `SendBinary`
    /// actually sent.
    fn on_binary_frame(&mut self, frame: Frame) {
        let payload = match self.decompress(&frame.payload) {
            Some(payload) => payload,
            None => return,
        };
        self.listener.on_binary(&payload, frame.header.fin);
    }

    fn decompress(&mut self, payload: &[u8]) -> Option<Vec<u8>> {
        match self.compressor.as_mut() {
            Some(compressor) => match compressor.decompress(payload) {
                Ok(out) => Some(out),
                Err(_) => {
                    self.notify_error(Error::DecompressError);
                    None
                }
            },
            None => Some(payload.to_vec()),
        }
    }

    fn on_close_frame(&mut self, frame: Frame) {
        if frame.payload.len() < 2 {
            return;
        }

        let mut raw = [0u8; 2];
        raw.copy_from_slice(&frame.payload[..2]);
        let code = i16::from_ne_bytes(raw);
        let reason = String::from_utf8_lossy(&frame.payload[2..]).into_owned();

        if self.state != SessionState::Closing {
            let _ = self.close(CloseCode::CLOSE_NORMAL);
        }

        debug!("state: {:?} -> Closed", self.state);
        self.state = SessionState::Closed;
        self.listener.on_close(code, &reason);
    }

    fn send_frame(&mut self, frame: Frame) {
        debug!("sending frame opcode={:?} len={}", frame.header.opcode, frame.payload.len());
        (self.send)(frame.encode());
    }

    fn notify_error(&self, error: Error) {
        error!("session fault: {error}");
        self.listener.on_error(&error);
    }
}

/// Thin `Arc<Mutex<..>>` wrapper so a [`SessionContext`] can be shared across
/// an async callback boundary (the keep-alive timer task, a reader task) the
/// way the teacher's writer/session split relies on shared ownership rather
/// than a single task owning everything.
pub type SharedSession = Arc<Mutex<SessionContext>>;

pub fn shared(session: SessionContext) -> SharedSession {
    Arc::new(Mutex::new(session))
}

/// Wires a [`KeepAliveManager`] to a [`SharedSession`]: an expired-timer fire
/// flushes the manager and sends a `Ping`, a timeout fire closes with
/// `CLOSE_PROTOCOL_ERROR` and surfaces [`Error::KeepAliveTimeout`].
///
/// The manager isn't known at construction time — it's built from a listener
/// that must already exist — so it's filled in afterwards via [`bind`].
/// [`bind`]: SessionKeepAlive::bind
pub struct SessionKeepAlive {
    session: SharedSession,
    manager: OnceLock<Weak<KeepAliveManager>>,
}

impl SessionKeepAlive {
    pub fn new(session: SharedSession) -> Self {
        Self {
            session,
            manager: OnceLock::new(),
        }
    }

    /// Supplies the manager this listener was registered on, so an expired
    /// fire can flush it in the same way the session would on any other
    /// liveness signal. A no-op if already bound.
    pub fn bind(&self, manager: &Arc<KeepAliveManager>) {
        let _ = self.manager.set(Arc::downgrade(manager));
    }
}

impl KeepAliveListener for SessionKeepAlive {
    fn on_keep_alive_expired(&self) {
        let mut session = self.session.lock().expect("session mutex poisoned");
        let _ = session.ping();
        drop(session);

        if let Some(manager) = self.manager.get().and_then(Weak::upgrade) {
            manager.try_flush();
        }
    }

    fn on_keep_alive_timeout(&self) {
        let mut session = self.session.lock().expect("session mutex poisoned");
        session.notify_error(Error::KeepAliveTimeout);
        let _ = session.close(CloseCode::CLOSE_PROTOCOL_ERROR);
    }
}
