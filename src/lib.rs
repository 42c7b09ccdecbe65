//! seedling - a minimal BitTorrent client core
//!
//! Downloads a single-file torrent sequentially, one piece and one peer
//! connection at a time.
//!
//! # Modules
//!
//! - [`bencode`] - BEP-3 Bencode decoding/encoding with order-preserving dictionaries
//! - [`metainfo`] - Torrent metadata and the info hash
//! - [`tracker`] - HTTP tracker announces and compact peer lists
//! - [`peer`] - Peer wire protocol sessions and piece assembly
//! - [`download`] - Sequential piece downloads across a list of peers
//! - [`config`] - Timeouts and other tunables
//!
//! # Example
//!
//! ```no_run
//! use seedling::config::ClientConfig;
//! use seedling::download::Downloader;
//! use seedling::metainfo::TorrentInfo;
//! use seedling::tracker::{AnnounceRequest, HttpTracker};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let info = TorrentInfo::from_bytes(&std::fs::read("sample.torrent")?)?;
//! let config = ClientConfig::default();
//!
//! let tracker = HttpTracker::new(&info.announce, config.tracker_timeout)?;
//! let request = AnnounceRequest::new(info.info_hash, config.peer_id, config.listen_port, info.length);
//! let peers = tracker.announce(&request).await?.peers;
//!
//! let addrs = peers.iter().map(|p| p.to_socket_addr()).collect();
//! let mut downloader = Downloader::new(info, config, addrs);
//! let payload = downloader.download_all().await?;
//! # Ok(())
//! # }
//! ```

pub mod bencode;
pub mod config;
pub mod constants;
pub mod download;
pub mod metainfo;
pub mod peer;
pub mod tracker;

pub use bencode::{decode, encode, BencodeError, Value};
pub use config::ClientConfig;
pub use download::{DownloadError, Downloader};
pub use metainfo::{InfoHash, MetainfoError, TorrentInfo};
pub use peer::{download_piece, Message, PeerError, PeerId, PeerSession};
pub use tracker::{AnnounceRequest, AnnounceResponse, HttpTracker, PeerAddress, TrackerError};
