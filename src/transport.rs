/// The only thing this core asks of a transport: the ability to hand it
/// encoded bytes to write out. Matches `SendHandler = std::function<void(Buffer)>`
/// in the source — a single sink closure, not a trait with read/write/close
/// methods, since this crate never opens a socket itself.
///
/// Concrete wiring (TCP, TLS, a test loopback) lives outside this crate;
/// `SessionContext::new` takes one of these and never inspects where the
/// bytes actually go.
pub type SendHandler = Box<dyn FnMut(Vec<u8>) + Send>;
