//! Protocol constants and default tuning parameters.
//!
//! Defaults for [`ClientConfig`](crate::config::ClientConfig) live here, next
//! to the fixed values of the wire protocol.

use std::time::Duration;

// ============================================================================
// Client identification
// ============================================================================

/// Client ID prefix for peer ID generation (Azureus-style)
pub const CLIENT_PREFIX: &[u8; 8] = b"-SD0001-";

/// Default port reported to trackers
pub const DEFAULT_PORT: u16 = 6881;

// ============================================================================
// Wire protocol
// ============================================================================

/// Protocol name sent in the handshake
pub const PROTOCOL: &[u8; 19] = b"BitTorrent protocol";

/// Total length of a handshake message
pub const HANDSHAKE_LEN: usize = 68;

/// Standard block size (16 KiB); requests larger than this are commonly refused
pub const BLOCK_SIZE: u32 = 16384;

/// Largest frame accepted from a peer (length prefix excluded).
/// A piece message carries at most one block plus 9 bytes of header, and
/// bitfields for very large torrents stay well under this.
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

// ============================================================================
// Timeouts
// ============================================================================

/// TCP connect timeout for peer connections
pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(3);

/// Timeout for any single read from a peer
pub const PEER_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for any single write to a peer
pub const PEER_WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP tracker request timeout
pub const HTTP_TRACKER_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Retry policy
// ============================================================================

/// Attempts per piece before the downloader gives up
pub const MAX_PIECE_ATTEMPTS: usize = 3;
