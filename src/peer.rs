//! Peer wire protocol (BEP-3)
//!
//! Everything needed to pull verified pieces from a single peer:
//!
//! - [`PeerTransport`] frames messages over any async byte stream, with a
//!   timeout on every read and write
//! - [`PeerSession`] walks one connection through handshake, bitfield,
//!   interest and unchoke, then serves block requests one at a time
//! - [`download_piece`] splits a piece into 16 KiB blocks, fetches them in
//!   order and checks the result against the piece's SHA-1
//!
//! # Examples
//!
//! ```
//! use seedling::peer::{plan_blocks, Message};
//!
//! let blocks: Vec<_> = plan_blocks(0, 40_000, 16_384).collect();
//! assert_eq!(blocks.len(), 3);
//! assert_eq!(blocks[2].offset, 32_768);
//! assert_eq!(blocks[2].length, 7_232);
//!
//! let request = blocks[0].to_message();
//! assert_eq!(request.encode().len(), 17);
//! assert!(matches!(request, Message::Request { index: 0, begin: 0, length: 16_384 }));
//! ```

mod bitfield;
mod error;
mod message;
mod peer_id;
mod piece;
mod session;
mod transport;

pub use bitfield::Bitfield;
pub use error::PeerError;
pub use message::{Handshake, Message, MessageId};
pub use peer_id::PeerId;
pub use piece::{
    compute_block_count, compute_block_length, download_piece, plan_blocks, verify_piece,
    BlockRequest,
};
pub use session::{PeerSession, SessionState};
pub use transport::PeerTransport;

#[cfg(test)]
mod tests;
