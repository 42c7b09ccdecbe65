//! Torrent metainfo resolution ([BEP-3]).
//!
//! A torrent file (`.torrent`) is a bencoded dictionary describing the content
//! to be shared. This module extracts what a downloader needs from it:
//!
//! - **announce** - Tracker URL
//! - **info** - The dictionary whose SHA-1 is the info hash
//!   - `length` - Total size of the payload
//!   - `piece length` - Size of each piece in bytes
//!   - `pieces` - Concatenated 20-byte SHA-1 hashes of each piece
//!   - `name` - Suggested file name (optional)
//!
//! The info hash is computed over the `info` dictionary re-encoded from the
//! decoded tree. Because [`Dict`](crate::bencode::Dict) keeps entries in source
//! order, the re-encoding is byte-identical to the span in the original file.
//!
//! # Examples
//!
//! ```no_run
//! use seedling::metainfo::TorrentInfo;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let data = std::fs::read("sample.torrent")?;
//! let torrent = TorrentInfo::from_bytes(&data)?;
//!
//! println!("Tracker URL: {}", torrent.announce);
//! println!("Info hash: {}", torrent.info_hash);
//! println!("Number of pieces: {}", torrent.piece_count());
//! # Ok(())
//! # }
//! ```
//!
//! [BEP-3]: http://bittorrent.org/beps/bep_0003.html

mod error;
mod info_hash;
mod torrent;

pub use error::MetainfoError;
pub use info_hash::InfoHash;
pub use torrent::{TorrentInfo, PIECE_HASH_LEN};
