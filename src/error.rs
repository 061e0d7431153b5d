use std::string::FromUtf8Error;
use thiserror::Error;

use crate::session::SessionState;

/// Everything that can go wrong inside the core. No panics, no unwinds across
/// the session boundary — every fallible path returns one of these and, where
/// the spec calls for it, also reaches the listener through `on_error`.
#[derive(Error, Debug)]
pub enum Error {
    #[error("attempted to send an empty text or binary message")]
    MessageEmpty,

    #[error("close reason would overflow the short-tier payload (2 + reason bytes must be < 254)")]
    ErrorReasonTooLong,

    #[error("compressor failed to compress the payload")]
    CompressError,

    #[error("compressor failed to decompress the payload")]
    DecompressError,

    #[error("keep-alive timeout elapsed without activity")]
    KeepAliveTimeout,

    #[error("invalid opcode: {0:#x}")]
    InvalidOpcode(u8),

    #[error("frame header claims a length that does not fit in memory on this platform")]
    LengthOverflow,

    #[error("buffer too short to contain a complete frame header")]
    IncompleteHeader,

    #[error("operation is not valid in session state {0:?}")]
    InvalidState(SessionState),

    #[error("{source}")]
    Utf8 {
        #[from]
        source: FromUtf8Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
