//! Client configuration.
//!
//! All tunable parameters of a download live in [`ClientConfig`], with
//! defaults taken from [`constants`](crate::constants).

use crate::constants::{
    BLOCK_SIZE, CONNECTION_TIMEOUT, DEFAULT_PORT, HTTP_TRACKER_TIMEOUT, MAX_MESSAGE_SIZE,
    MAX_PIECE_ATTEMPTS, PEER_READ_TIMEOUT, PEER_WRITE_TIMEOUT,
};
use crate::peer::PeerId;
use std::time::Duration;

/// Settings shared by the tracker client, peer sessions and the downloader.
///
/// # Examples
///
/// ```
/// use seedling::config::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::default()
///     .with_read_timeout(Duration::from_secs(5))
///     .with_strict_handshake(false);
/// assert_eq!(config.block_size, 16384);
/// assert!(!config.strict_handshake);
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Our peer ID, sent in handshakes and announces.
    pub peer_id: PeerId,
    /// Port reported to trackers.
    pub listen_port: u16,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Bound on every blocking receive from a peer.
    pub read_timeout: Duration,
    /// Bound on every send to a peer.
    pub write_timeout: Duration,
    /// Size of each block request.
    pub block_size: u32,
    /// Largest frame accepted from a peer.
    pub max_message_size: usize,
    /// Reject handshakes whose protocol string or info hash differ from ours.
    pub strict_handshake: bool,
    /// HTTP tracker request timeout.
    pub tracker_timeout: Duration,
    /// How many sessions the downloader may open for a single piece.
    pub max_piece_attempts: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            peer_id: PeerId::generate(),
            listen_port: DEFAULT_PORT,
            connect_timeout: CONNECTION_TIMEOUT,
            read_timeout: PEER_READ_TIMEOUT,
            write_timeout: PEER_WRITE_TIMEOUT,
            block_size: BLOCK_SIZE,
            max_message_size: MAX_MESSAGE_SIZE,
            strict_handshake: true,
            tracker_timeout: HTTP_TRACKER_TIMEOUT,
            max_piece_attempts: MAX_PIECE_ATTEMPTS,
        }
    }
}

impl ClientConfig {
    pub fn with_peer_id(mut self, peer_id: PeerId) -> Self {
        self.peer_id = peer_id;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn with_strict_handshake(mut self, strict: bool) -> Self {
        self.strict_handshake = strict;
        self
    }

    pub fn with_max_piece_attempts(mut self, attempts: usize) -> Self {
        self.max_piece_attempts = attempts.max(1);
        self
    }
}
