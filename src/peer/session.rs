use super::error::PeerError;
use super::message::{Handshake, Message, MessageId};
use super::peer_id::PeerId;
use super::piece::BlockRequest;
use super::transport::PeerTransport;
use crate::config::ClientConfig;
use crate::metainfo::InfoHash;
use bytes::Bytes;
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Where a [`PeerSession`] is in the download handshake.
///
/// ```text
/// Connected -> HandshakeSent -> HandshakeVerified -> AwaitingBitfield
///   -> BitfieldReceived -> Interested -> AwaitingUnchoke -> Ready
///   -> (per block) Requesting -> Receiving -> Ready ... -> Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    HandshakeSent,
    HandshakeVerified,
    AwaitingBitfield,
    BitfieldReceived,
    Interested,
    AwaitingUnchoke,
    Ready,
    Requesting,
    Receiving,
    Closed,
}

/// A download session with a single peer.
///
/// The session owns one connection for its whole life and walks it through
/// handshake, bitfield, interest and unchoke before serving block requests,
/// one at a time. Every call sends, then waits for the answer; nothing is
/// pipelined.
///
/// Any error returned by a session operation closes the session. Retrying
/// means opening a new one.
///
/// # Examples
///
/// ```no_run
/// use seedling::config::ClientConfig;
/// use seedling::metainfo::TorrentInfo;
/// use seedling::peer::{download_piece, PeerSession};
///
/// # async fn example(torrent: TorrentInfo) -> Result<(), Box<dyn std::error::Error>> {
/// let config = ClientConfig::default();
/// let addr = "192.168.1.100:6881".parse()?;
///
/// let mut session = PeerSession::connect(addr, &config).await?;
/// session.prepare(&torrent.info_hash, &config.peer_id).await?;
///
/// let mut piece = vec![0u8; torrent.piece_length as usize];
/// let written = download_piece(&mut session, &torrent, 0, &mut piece).await?;
/// session.close().await;
/// # Ok(())
/// # }
/// ```
pub struct PeerSession<S = TcpStream> {
    addr: Option<SocketAddr>,
    state: SessionState,
    strict_handshake: bool,
    block_size: u32,
    peer_id: Option<PeerId>,
    bitfield: Option<Bytes>,
    bytes_downloaded: u64,
    transport: Option<PeerTransport<S>>,
}

impl PeerSession<TcpStream> {
    /// Opens a TCP connection to `addr`.
    ///
    /// Fails with [`PeerError::ConnectionFailed`] if the connection is refused
    /// or does not complete within the connect timeout. No retry is attempted.
    pub async fn connect(addr: SocketAddr, config: &ClientConfig) -> Result<Self, PeerError> {
        tracing::debug!(%addr, "connecting to peer");

        let stream = match timeout(config.connect_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(PeerError::ConnectionFailed {
                    addr,
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                return Err(PeerError::ConnectionFailed {
                    addr,
                    reason: "connect timed out".into(),
                })
            }
        };

        let mut session = Self::from_stream(stream, config);
        session.addr = Some(addr);
        Ok(session)
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> PeerSession<S> {
    /// Wraps an already connected stream.
    pub fn from_stream(stream: S, config: &ClientConfig) -> Self {
        Self {
            addr: None,
            state: SessionState::Connected,
            strict_handshake: config.strict_handshake,
            block_size: config.block_size,
            peer_id: None,
            bitfield: None,
            bytes_downloaded: 0,
            transport: Some(PeerTransport::new(
                stream,
                config.read_timeout,
                config.write_timeout,
                config.max_message_size,
            )),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    pub fn addr(&self) -> Option<SocketAddr> {
        self.addr
    }

    /// The remote peer's ID, once the handshake has completed.
    pub fn peer_id(&self) -> Option<PeerId> {
        self.peer_id
    }

    /// The raw payload of the peer's `bitfield` message, once received.
    pub fn bitfield(&self) -> Option<&Bytes> {
        self.bitfield.as_ref()
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    pub fn bytes_downloaded(&self) -> u64 {
        self.bytes_downloaded
    }

    /// Exchanges handshakes and returns the remote peer's ID.
    ///
    /// With strict validation enabled, a non-standard protocol string fails
    /// with [`PeerError::InvalidHandshake`] and a different info hash with
    /// [`PeerError::InfoHashMismatch`]. Otherwise both are only logged.
    pub async fn handshake(
        &mut self,
        info_hash: &InfoHash,
        our_id: &PeerId,
    ) -> Result<PeerId, PeerError> {
        let result = self.try_handshake(info_hash, our_id).await;
        self.settle(result)
    }

    /// Reads the peer's `bitfield`, which must be the first message after the handshake.
    pub async fn receive_bitfield(&mut self) -> Result<Bytes, PeerError> {
        let result = self.try_receive_bitfield().await;
        self.settle(result)
    }

    /// Sends `interested`.
    pub async fn declare_interest(&mut self) -> Result<(), PeerError> {
        let result = self.try_declare_interest().await;
        self.settle(result)
    }

    /// Waits for `unchoke`; afterwards the session is ready for block requests.
    pub async fn await_unchoke(&mut self) -> Result<(), PeerError> {
        let result = self.try_await_unchoke().await;
        self.settle(result)
    }

    /// Runs handshake, bitfield, interest and unchoke in order.
    pub async fn prepare(
        &mut self,
        info_hash: &InfoHash,
        our_id: &PeerId,
    ) -> Result<PeerId, PeerError> {
        let peer_id = self.handshake(info_hash, our_id).await?;
        self.receive_bitfield().await?;
        self.declare_interest().await?;
        self.await_unchoke().await?;
        Ok(peer_id)
    }

    /// Requests one block and copies the answer into `piece` at the block's offset.
    ///
    /// The `piece` message must echo the request's index, offset and length,
    /// otherwise the call fails with [`PeerError::ProtocolMismatch`] and
    /// nothing is written.
    pub async fn fetch_block(
        &mut self,
        request: &BlockRequest,
        piece: &mut [u8],
    ) -> Result<usize, PeerError> {
        let result = self.try_fetch_block(request, piece).await;
        self.settle(result)
    }

    /// Releases the connection. Calling this more than once is harmless.
    pub async fn close(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            if let Err(e) = transport.shutdown().await {
                tracing::trace!(addr = ?self.addr, "shutdown failed: {}", e);
            }
            tracing::debug!(addr = ?self.addr, "session closed");
        }
        self.state = SessionState::Closed;
    }

    async fn try_handshake(
        &mut self,
        info_hash: &InfoHash,
        our_id: &PeerId,
    ) -> Result<PeerId, PeerError> {
        self.require(SessionState::Connected, "handshake")?;

        let handshake = Handshake::new(*info_hash.as_bytes(), *our_id.as_bytes());
        self.transport()?.send_handshake(&handshake).await?;
        self.state = SessionState::HandshakeSent;

        let theirs = self.transport()?.receive_handshake().await?;

        if !theirs.has_standard_protocol() {
            if self.strict_handshake {
                return Err(PeerError::InvalidHandshake);
            }
            tracing::warn!(addr = ?self.addr, "peer sent a non-standard protocol string");
        }

        if &theirs.info_hash != info_hash.as_bytes() {
            if self.strict_handshake {
                return Err(PeerError::InfoHashMismatch);
            }
            tracing::warn!(addr = ?self.addr, "peer echoed a different info hash");
        }

        let peer_id = PeerId(theirs.peer_id);
        tracing::debug!(addr = ?self.addr, %peer_id, "handshake complete");

        self.peer_id = Some(peer_id);
        self.state = SessionState::HandshakeVerified;
        Ok(peer_id)
    }

    async fn try_receive_bitfield(&mut self) -> Result<Bytes, PeerError> {
        self.require(SessionState::HandshakeVerified, "receive bitfield")?;
        self.state = SessionState::AwaitingBitfield;

        let Message::Bitfield(bits) = self.receive_expected(MessageId::Bitfield).await? else {
            return Err(PeerError::InvalidMessage("bitfield".into()));
        };

        tracing::trace!(addr = ?self.addr, bytes = bits.len(), "received bitfield");
        self.bitfield = Some(bits.clone());
        self.state = SessionState::BitfieldReceived;
        Ok(bits)
    }

    async fn try_declare_interest(&mut self) -> Result<(), PeerError> {
        self.require(SessionState::BitfieldReceived, "declare interest")?;
        self.transport()?.send_message(&Message::Interested).await?;
        self.state = SessionState::Interested;
        Ok(())
    }

    async fn try_await_unchoke(&mut self) -> Result<(), PeerError> {
        self.require(SessionState::Interested, "await unchoke")?;
        self.state = SessionState::AwaitingUnchoke;
        self.receive_expected(MessageId::Unchoke).await?;

        tracing::debug!(addr = ?self.addr, "unchoked");
        self.state = SessionState::Ready;
        Ok(())
    }

    async fn try_fetch_block(
        &mut self,
        request: &BlockRequest,
        piece: &mut [u8],
    ) -> Result<usize, PeerError> {
        self.require(SessionState::Ready, "request a block")?;

        let start = request.offset as usize;
        let end = start + request.length as usize;
        if end > piece.len() {
            return Err(PeerError::BufferTooSmall {
                needed: end,
                available: piece.len(),
            });
        }

        self.state = SessionState::Requesting;
        tracing::trace!(
            addr = ?self.addr,
            index = request.piece,
            begin = request.offset,
            length = request.length,
            "requesting block"
        );
        self.transport()?.send_message(&request.to_message()).await?;

        self.state = SessionState::Receiving;
        let Message::Piece { index, begin, data } =
            self.receive_expected(MessageId::Piece).await?
        else {
            return Err(PeerError::InvalidMessage("piece".into()));
        };

        if index != request.piece || begin != request.offset || data.len() != request.length as usize {
            return Err(PeerError::ProtocolMismatch {
                index: request.piece,
                begin: request.offset,
                length: request.length,
                got_index: index,
                got_begin: begin,
                got_length: data.len(),
            });
        }

        piece[start..end].copy_from_slice(&data);
        self.bytes_downloaded += data.len() as u64;
        self.state = SessionState::Ready;
        Ok(data.len())
    }

    async fn receive_expected(&mut self, expected: MessageId) -> Result<Message, PeerError> {
        let message = self.transport()?.receive_message().await?;
        if message.id() != Some(expected) {
            return Err(PeerError::UnexpectedMessage {
                expected,
                got: message.id(),
            });
        }
        Ok(message)
    }

    fn require(&self, expected: SessionState, operation: &'static str) -> Result<(), PeerError> {
        if self.state != expected {
            return Err(PeerError::InvalidState {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }

    fn transport(&mut self) -> Result<&mut PeerTransport<S>, PeerError> {
        let state = self.state;
        self.transport.as_mut().ok_or(PeerError::InvalidState {
            operation: "use the connection",
            state,
        })
    }

    fn settle<T>(&mut self, result: Result<T, PeerError>) -> Result<T, PeerError> {
        if let Err(ref e) = result {
            tracing::debug!(addr = ?self.addr, state = ?self.state, "session failed: {}", e);
            // Dropping the transport closes the socket.
            self.transport = None;
            self.state = SessionState::Closed;
        }
        result
    }
}
