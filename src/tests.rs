//! End-to-end scenario tests that cross module boundaries: two loopback
//! sessions cross-wired via `send_handler`/`feed`, exercising negotiation,
//! ordinary message flow, and the keep-alive timers together.

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use crate::compression::{CompressType, CompressorRegistry};
    use crate::config::SessionConfig;
    use crate::error::Error;
    use crate::frame::{CloseCode, Frame, OpCode};
    use crate::keepalive::{KeepAliveListener, KeepAliveManager};
    use crate::session::{SessionContext, SessionListener, SessionState};
    use crate::transport::SendHandler;

    fn wire(out: Arc<Mutex<Vec<u8>>>) -> SendHandler {
        Box::new(move |bytes| out.lock().unwrap().extend_from_slice(&bytes))
    }

    #[derive(Default)]
    struct TrackingListener {
        texts: Mutex<Vec<String>>,
        binaries: Mutex<Vec<Vec<u8>>>,
        closes: Mutex<Vec<(i16, String)>>,
        errors: Mutex<Vec<String>>,
        connected: AtomicUsize,
    }

    impl SessionListener for TrackingListener {
        fn on_error(&self, error: &Error) {
            self.errors.lock().unwrap().push(error.to_string());
        }

        fn on_connected(&self) {
            self.connected.fetch_add(1, Ordering::SeqCst);
        }

        fn on_close(&self, code: i16, reason: &str) {
            self.closes.lock().unwrap().push((code, reason.to_string()));
        }

        fn on_text(&self, text: &str, _finish: bool) {
            self.texts.lock().unwrap().push(text.to_string());
        }

        fn on_binary(&self, payload: &[u8], _finish: bool) {
            self.binaries.lock().unwrap().push(payload.to_vec());
        }
    }

    fn connect_pair() -> (
        SessionContext,
        Arc<TrackingListener>,
        Arc<Mutex<Vec<u8>>>,
        SessionContext,
        Arc<TrackingListener>,
        Arc<Mutex<Vec<u8>>>,
    ) {
        let a_listener = Arc::new(TrackingListener::default());
        let b_listener = Arc::new(TrackingListener::default());

        let a_out = Arc::new(Mutex::new(Vec::new()));
        let b_out = Arc::new(Mutex::new(Vec::new()));

        let mut a = SessionContext::new(SessionConfig::default(), wire(a_out.clone()), a_listener.clone());
        let mut b = SessionContext::new(SessionConfig::default(), wire(b_out.clone()), b_listener.clone());

        a.handshake().unwrap();
        b.feed(&a_out.lock().unwrap().split_off(0));
        a.feed(&b_out.lock().unwrap().split_off(0));

        assert_eq!(a.state(), SessionState::Connected);
        assert_eq!(b.state(), SessionState::Connected);

        (a, a_listener, a_out, b, b_listener, b_out)
    }

    #[test]
    fn handshake_brings_both_peers_to_connected() {
        let (_, a_listener, _, _, b_listener, _) = connect_pair();
        assert_eq!(a_listener.connected.load(Ordering::SeqCst), 1);
        assert_eq!(b_listener.connected.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn text_and_binary_messages_round_trip_between_peers() {
        let (_a, _, _, mut b, b_listener, _) = connect_pair();

        let frame = Frame::new(true, OpCode::Text, b"hello peer".to_vec(), false);
        b.feed(&frame.encode());
        assert_eq!(b_listener.texts.lock().unwrap().last().unwrap(), "hello peer");

        let binary_frame = Frame::new(true, OpCode::Binary, vec![10, 20, 30], false);
        b.feed(&binary_frame.encode());
        assert_eq!(b_listener.binaries.lock().unwrap().last().unwrap(), &vec![10, 20, 30]);
    }

    #[test]
    fn close_handshake_reaches_closed_on_both_sides() {
        let (mut a, a_listener, _a_out, mut b, b_listener, b_out) = connect_pair();

        a.close_with_reason(CloseCode::CLOSE_NORMAL, "done").unwrap();

        let mut body = Vec::new();
        body.extend_from_slice(&CloseCode::CLOSE_NORMAL.0.to_ne_bytes());
        body.extend_from_slice(b"done");
        let close_frame = Frame::new(true, OpCode::Close, body, false);

        b.feed(&close_frame.encode());
        assert_eq!(b.state(), SessionState::Closed);
        assert_eq!(b_listener.closes.lock().unwrap().last().unwrap(), &(1000, "done".to_string()));
        assert_eq!(a.state(), SessionState::Closing);

        // `b` wasn't already Closing, so it echoed its own close frame back
        // with no explicit reason — that reply must carry the code's
        // default reason text, not an empty one.
        let echoed = b_out.lock().unwrap().split_off(0);
        let (header, header_len) = crate::frame::FrameHeader::decode(&echoed).unwrap();
        assert_eq!(header.opcode, OpCode::Close);
        let payload = &echoed[header_len..header_len + header.length as usize];
        let reply_reason = String::from_utf8_lossy(&payload[2..]).into_owned();
        assert_eq!(reply_reason, "close normal");

        a.feed(&echoed);
        assert_eq!(a.state(), SessionState::Closed);
        assert_eq!(
            a_listener.closes.lock().unwrap().last().unwrap(),
            &(1000, "close normal".to_string())
        );
    }

    #[test]
    fn handshake_offer_lists_every_globally_registered_compressor() {
        // The global registry always carries at least `none`; the offer
        // frame's payload is exactly its semicolon-joined name list.
        let registry = CompressorRegistry::global();

        let a_out = Arc::new(Mutex::new(Vec::new()));
        let mut a = SessionContext::new(SessionConfig::default(), wire(a_out.clone()), Arc::new(TrackingListener::default()));
        a.handshake().unwrap();

        let written = a_out.lock().unwrap().clone();
        let (_, header_len) = crate::frame::FrameHeader::decode(&written).unwrap();
        let offer = String::from_utf8(written[header_len..].to_vec()).unwrap();
        assert_eq!(offer, registry.supported_compressors());
    }

    #[test]
    fn peer_selecting_none_still_reaches_connected() {
        struct DecliningListener;
        impl SessionListener for DecliningListener {
            fn on_handshake(&self, _offered: &[CompressType]) -> CompressType {
                CompressType::None
            }
        }

        let a_out = Arc::new(Mutex::new(Vec::new()));
        let mut a = SessionContext::new(SessionConfig::default(), wire(a_out.clone()), Arc::new(DecliningListener));
        let offer = Frame::new(true, OpCode::System, b"none".to_vec(), false);
        a.feed(&offer.encode());
        assert_eq!(a.state(), SessionState::Connected);
    }

    struct RecordingKeepAliveListener {
        expired: AtomicUsize,
        timeout: AtomicUsize,
    }

    impl KeepAliveListener for RecordingKeepAliveListener {
        fn on_keep_alive_expired(&self) {
            self.expired.fetch_add(1, Ordering::SeqCst);
        }
        fn on_keep_alive_timeout(&self) {
            self.timeout.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn keep_alive_timeout_fires_after_expired_without_a_flush() {
        let listener = Arc::new(RecordingKeepAliveListener {
            expired: AtomicUsize::new(0),
            timeout: AtomicUsize::new(0),
        });
        let manager = KeepAliveManager::new(Duration::from_millis(100), Duration::from_millis(300), listener.clone());
        manager.flush().await;

        tokio::time::advance(Duration::from_millis(350)).await;
        tokio::task::yield_now().await;

        assert_eq!(listener.expired.load(Ordering::SeqCst), 1);
        assert_eq!(listener.timeout.load(Ordering::SeqCst), 1);
    }
}
