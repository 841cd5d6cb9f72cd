//! Protocol error types.

use thiserror::Error;

/// Errors produced while encoding, decoding, or interpreting RESP frames.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The first byte of a frame is not a known RESP type marker.
    #[error("invalid type marker byte 0x{0:02x}")]
    BadTypeMarker(u8),

    /// A frame header carried something that is not a decimal integer.
    #[error("invalid integer in frame: {0:?}")]
    InvalidInteger(String),

    /// A bulk or array header declared a negative length other than -1.
    #[error("invalid length {0} in frame header")]
    InvalidLength(i64),

    /// A frame exceeds the size the decoder is willing to buffer.
    #[error("frame of {size} bytes exceeds maximum {max}")]
    FrameTooLarge {
        /// Declared or accumulated frame size.
        size: usize,
        /// Maximum size the decoder accepts.
        max: usize,
    },

    /// A bulk payload was not followed by CRLF.
    #[error("bulk payload missing CRLF terminator")]
    MissingTerminator,

    /// Array replies nested deeper than the decoder supports.
    #[error("array nesting exceeds {max} levels")]
    NestingTooDeep {
        /// Maximum nesting depth the decoder accepts.
        max: usize,
    },

    /// The reply parsed fine but has the wrong shape for the requested
    /// conversion (e.g. asking for an integer out of a bulk string).
    #[error("expected {expected} reply, found {found}")]
    UnexpectedReply {
        /// Reply shape the caller asked for.
        expected: &'static str,
        /// Reply shape the server actually sent.
        found: &'static str,
    },

    /// The server answered with an error reply (`-ERR ...`).
    #[error("server error: {0}")]
    Server(String),
}
