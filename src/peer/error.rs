use std::net::SocketAddr;

use thiserror::Error;

use super::message::MessageId;
use super::session::SessionState;

/// Errors that can occur during peer communication.
///
/// Any error returned by a [`PeerSession`](super::PeerSession) operation
/// leaves the session closed.
#[derive(Debug, Error)]
pub enum PeerError {
    /// Network I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The TCP connection could not be established.
    #[error("failed to connect to {addr}: {reason}")]
    ConnectionFailed { addr: SocketAddr, reason: String },

    /// The connection was closed by the peer.
    #[error("connection closed")]
    ConnectionClosed,

    /// A read or write did not complete within the configured timeout.
    #[error("timeout")]
    Timeout,

    /// The peer sent an invalid handshake.
    #[error("invalid handshake")]
    InvalidHandshake,

    /// The peer's info hash doesn't match ours.
    #[error("info hash mismatch")]
    InfoHashMismatch,

    /// Received a malformed protocol message.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// A frame's length prefix exceeds the configured maximum.
    #[error("message too large: {0} bytes")]
    MessageTooLarge(usize),

    /// The peer sent a well-formed message the session cannot accept now.
    #[error("unexpected message: expected {expected:?}, got {got:?}")]
    UnexpectedMessage {
        expected: MessageId,
        got: Option<MessageId>,
    },

    /// A piece message does not echo the pending request.
    #[error(
        "protocol mismatch: requested piece {index} at {begin} ({length} bytes), \
         got piece {got_index} at {got_begin} ({got_length} bytes)"
    )]
    ProtocolMismatch {
        index: u32,
        begin: u32,
        length: u32,
        got_index: u32,
        got_begin: u32,
        got_length: usize,
    },

    /// The operation is not valid in the session's current state.
    #[error("cannot {operation} in state {state:?}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    /// The requested piece index does not exist in the torrent.
    #[error("piece {0} out of range")]
    InvalidPiece(usize),

    /// The configured block size cannot split a piece.
    #[error("invalid block size {0}")]
    InvalidBlockSize(u32),

    /// The piece is longer than a 32-bit block offset can address.
    #[error("piece {index} is too large: {size} bytes")]
    PieceTooLarge { index: usize, size: u64 },

    /// The output buffer cannot hold the piece.
    #[error("buffer too small: piece needs {needed} bytes, buffer holds {available}")]
    BufferTooSmall { needed: usize, available: usize },

    /// The assembled piece does not match its published hash.
    #[error("hash mismatch for piece {0}")]
    HashMismatch(usize),
}

impl PeerError {
    /// Returns `true` for failures where a fresh session to the same or
    /// another peer may succeed.
    pub fn is_transient(&self) -> bool {
        !matches!(
            self,
            PeerError::InvalidPiece(_)
                | PeerError::InvalidBlockSize(_)
                | PeerError::PieceTooLarge { .. }
                | PeerError::BufferTooSmall { .. }
        )
    }
}
