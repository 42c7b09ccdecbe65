//! Tracker communication ([BEP-3], [BEP-23]).
//!
//! Trackers hand out the addresses of peers in a swarm. This module builds
//! the HTTP announce request, performs it with [`HttpTracker`], and parses the
//! bencoded response body. Peers are expected in the compact format: one
//! 6-byte record per peer, 4 bytes of IPv4 address then a 2-byte port, both
//! in network byte order.
//!
//! # Examples
//!
//! ```no_run
//! use seedling::metainfo::TorrentInfo;
//! use seedling::peer::PeerId;
//! use seedling::tracker::{AnnounceRequest, HttpTracker};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let torrent = TorrentInfo::from_bytes(&std::fs::read("sample.torrent")?)?;
//! let tracker = HttpTracker::new(&torrent.announce, Duration::from_secs(30))?;
//!
//! let request = AnnounceRequest::new(torrent.info_hash, PeerId::generate(), 6881, torrent.length);
//! let response = tracker.announce(&request).await?;
//! for peer in &response.peers {
//!     println!("{}", peer);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! [BEP-3]: http://bittorrent.org/beps/bep_0003.html
//! [BEP-23]: http://bittorrent.org/beps/bep_0023.html

mod error;
mod http;
mod response;

pub use error::TrackerError;
pub use http::{AnnounceRequest, HttpTracker};
pub use response::{parse_compact_peers, AnnounceResponse, PeerAddress, COMPACT_PEER_LEN};
