//! Sequential download orchestration.
//!
//! [`Downloader`] fetches pieces one at a time from a list of peers. A session
//! is kept for as long as it keeps producing verified pieces; after any
//! failure it is closed and the next peer is tried on a fresh session, up to
//! [`ClientConfig::max_piece_attempts`] sessions per piece.

use crate::config::ClientConfig;
use crate::metainfo::TorrentInfo;
use crate::peer::{download_piece, Bitfield, PeerError, PeerSession};
use std::net::SocketAddr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("no peers to download from")]
    NoPeers,

    #[error("piece {0} out of range")]
    InvalidPiece(usize),

    #[error("no peer has piece {0}")]
    PieceUnavailable(usize),

    #[error("piece {index} failed after {attempts} attempts: {source}")]
    PieceFailed {
        index: usize,
        attempts: usize,
        #[source]
        source: PeerError,
    },

    #[error("cannot allocate {0} bytes for download")]
    TooLarge(u64),

    #[error(transparent)]
    Peer(#[from] PeerError),
}

/// Downloads a torrent's pieces from a fixed list of peers.
pub struct Downloader {
    info: TorrentInfo,
    config: ClientConfig,
    peers: Vec<SocketAddr>,
    next_peer: usize,
    session: Option<PeerSession>,
}

impl Downloader {
    pub fn new(info: TorrentInfo, config: ClientConfig, peers: Vec<SocketAddr>) -> Self {
        Self {
            info,
            config,
            peers,
            next_peer: 0,
            session: None,
        }
    }

    pub fn info(&self) -> &TorrentInfo {
        &self.info
    }

    /// Downloads and verifies one piece, returning exactly its bytes.
    pub async fn download_piece(&mut self, index: usize) -> Result<Vec<u8>, DownloadError> {
        let size = self
            .info
            .piece_size(index)
            .ok_or(DownloadError::InvalidPiece(index))?;
        let mut piece = zeroed(size)?;
        self.fetch_into(index, &mut piece).await?;
        Ok(piece)
    }

    /// Downloads every piece in order and returns the whole payload.
    pub async fn download_all(&mut self) -> Result<Vec<u8>, DownloadError> {
        let mut payload = zeroed(self.info.length)?;
        let piece_length = self.info.piece_length as usize;

        for index in 0..self.info.piece_count() {
            let start = index * piece_length;
            let end = (start + piece_length).min(payload.len());
            self.fetch_into(index, &mut payload[start..end]).await?;
        }

        tracing::debug!(bytes = payload.len(), "download complete");
        Ok(payload)
    }

    /// Closes the current session, if any.
    pub async fn finish(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close().await;
        }
    }

    async fn fetch_into(&mut self, index: usize, out: &mut [u8]) -> Result<usize, DownloadError> {
        if self.peers.is_empty() {
            return Err(DownloadError::NoPeers);
        }

        let mut attempts = 0;
        let mut last_error = None;

        while attempts < self.config.max_piece_attempts {
            attempts += 1;

            let mut session = match self.session.take() {
                Some(session) => session,
                None => match self.open_session().await {
                    Ok(session) => session,
                    Err(e) => {
                        tracing::debug!(
                            piece = index,
                            attempt = attempts,
                            "could not open session: {}",
                            e
                        );
                        last_error = Some(e);
                        continue;
                    }
                },
            };

            let has_piece = session
                .bitfield()
                .map(|bits| Bitfield::from_bytes(bits.clone(), self.info.piece_count()))
                .is_some_and(|bitfield| bitfield.has_piece(index));
            if !has_piece {
                tracing::debug!(addr = ?session.addr(), piece = index, "peer does not have piece");
                session.close().await;
                continue;
            }

            match download_piece(&mut session, &self.info, index, out).await {
                Ok(written) => {
                    self.session = Some(session);
                    return Ok(written);
                }
                Err(e) if !e.is_transient() => {
                    session.close().await;
                    return Err(e.into());
                }
                Err(e) => {
                    tracing::warn!(
                        addr = ?session.addr(),
                        piece = index,
                        attempt = attempts,
                        "piece attempt failed: {}",
                        e
                    );
                    session.close().await;
                    last_error = Some(e);
                }
            }
        }

        Err(match last_error {
            Some(source) => DownloadError::PieceFailed {
                index,
                attempts,
                source,
            },
            None => DownloadError::PieceUnavailable(index),
        })
    }

    async fn open_session(&mut self) -> Result<PeerSession, PeerError> {
        let addr = self.peers[self.next_peer % self.peers.len()];
        self.next_peer += 1;

        let mut session = PeerSession::connect(addr, &self.config).await?;
        session
            .prepare(&self.info.info_hash, &self.config.peer_id)
            .await?;
        Ok(session)
    }
}

/// Allocates a zero-filled buffer, failing instead of aborting when the
/// torrent declares more bytes than can be allocated.
fn zeroed(len: u64) -> Result<Vec<u8>, DownloadError> {
    let size = usize::try_from(len).map_err(|_| DownloadError::TooLarge(len))?;
    let mut buf = Vec::new();
    buf.try_reserve_exact(size)
        .map_err(|_| DownloadError::TooLarge(len))?;
    buf.resize(size, 0);
    Ok(buf)
}
