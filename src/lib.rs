//! A transport-agnostic binary message-streaming protocol engine.
//!
//! This crate implements a small, deliberately non-WebSocket-compliant
//! framing protocol: fixed-nibble opcodes, 254/255 length-marker sentinels
//! instead of WebSocket's 126/127, no masking, and a handshake expressed as
//! an ordinary first frame rather than an HTTP Upgrade. It is built around a
//! synchronous, buffer-only parser and a session state machine that knows
//! nothing about sockets — callers supply a [`transport::SendHandler`]
//! closure and feed inbound bytes in as they arrive.
//!
//! Concrete transports, TLS, and real compression algorithms are all
//! external collaborators; this crate only ships the `none` compressor and
//! sketches the rest through the [`compression::Compressor`] trait.

pub mod buffer;
pub mod compression;
pub mod config;
pub mod error;
pub mod events;
pub mod frame;
pub mod keepalive;
pub mod parser;
pub mod session;
pub mod transport;

pub use compression::{CompressType, Compressor, CompressorRegistry};
pub use config::SessionConfig;
pub use error::Error;
pub use events::{generate_session_id, ChannelListener, SessionEvent, SessionEventStream, SessionId};
pub use frame::{CloseCode, Frame, FrameHeader, OpCode};
pub use keepalive::{KeepAliveListener, KeepAliveManager};
pub use parser::FrameParser;
pub use session::{shared, NullListener, SessionContext, SessionKeepAlive, SessionListener, SessionState, SharedSession};
pub use transport::SendHandler;

#[cfg(test)]
mod tests;
