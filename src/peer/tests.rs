use super::*;
use crate::config::ClientConfig;
use crate::metainfo::{InfoHash, TorrentInfo};
use bytes::Bytes;
use sha1::{Digest, Sha1};
use std::time::Duration;
use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};

const REMOTE_ID: [u8; 20] = *b"-XX0100-remotepeer01";

struct FakePeer {
    stream: DuplexStream,
}

impl FakePeer {
    async fn read_handshake(&mut self) -> Handshake {
        let mut buf = [0u8; 68];
        self.stream.read_exact(&mut buf).await.unwrap();
        Handshake::decode(&buf).unwrap()
    }

    async fn send_handshake(&mut self, info_hash: [u8; 20]) {
        let handshake = Handshake::new(info_hash, REMOTE_ID);
        self.stream.write_all(&handshake.encode()).await.unwrap();
    }

    async fn send(&mut self, message: Message) {
        self.stream.write_all(&message.encode()).await.unwrap();
    }

    async fn read_message(&mut self) -> Message {
        let mut len = [0u8; 4];
        self.stream.read_exact(&mut len).await.unwrap();
        let mut body = vec![0u8; u32::from_be_bytes(len) as usize];
        self.stream.read_exact(&mut body).await.unwrap();
        Message::decode_body(Bytes::from(body)).unwrap()
    }

    /// Plays the remote side up to the point where blocks may be requested.
    async fn open(&mut self, info_hash: [u8; 20]) {
        self.read_handshake().await;
        self.send_handshake(info_hash).await;
        self.send(Message::Bitfield(Bytes::from_static(&[0xff]))).await;
        assert_eq!(self.read_message().await, Message::Interested);
        self.send(Message::Unchoke).await;
    }

    /// Answers `count` requests from `payload`, returning what was asked for.
    async fn serve(
        &mut self,
        payload: &[u8],
        piece_length: usize,
        count: usize,
    ) -> Vec<(u32, u32, u32)> {
        let mut seen = Vec::new();
        for _ in 0..count {
            let Message::Request {
                index,
                begin,
                length,
            } = self.read_message().await
            else {
                panic!("expected request");
            };
            let start = index as usize * piece_length + begin as usize;
            let data = Bytes::copy_from_slice(&payload[start..start + length as usize]);
            self.send(Message::Piece { index, begin, data }).await;
            seen.push((index, begin, length));
        }
        seen
    }
}

fn pair(config: &ClientConfig) -> (PeerSession<DuplexStream>, FakePeer) {
    let (local, remote) = duplex(1 << 20);
    (
        PeerSession::from_stream(local, config),
        FakePeer { stream: remote },
    )
}

fn test_config() -> ClientConfig {
    ClientConfig::default().with_peer_id(PeerId(*b"-SD0001-localpeer001"))
}

fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

fn torrent_for(payload: &[u8], piece_length: usize) -> TorrentInfo {
    let mut pieces = Vec::new();
    for chunk in payload.chunks(piece_length) {
        pieces.extend_from_slice(&Sha1::digest(chunk));
    }

    let mut data = format!(
        "d8:announce18:http://tracker/ann4:infod6:lengthi{}e4:name4:test12:piece lengthi{}e6:pieces{}:",
        payload.len(),
        piece_length,
        pieces.len()
    )
    .into_bytes();
    data.extend_from_slice(&pieces);
    data.extend_from_slice(b"ee");

    TorrentInfo::from_bytes(&data).unwrap()
}

#[test]
fn test_peer_id_generate() {
    let id1 = PeerId::generate();
    let id2 = PeerId::generate();
    assert_ne!(id1.0, id2.0);
    assert_eq!(id1.client_id(), Some("SD0001"));
    assert_eq!(id1.to_hex().len(), 40);
}

#[test]
fn test_bitfield_from_bytes() {
    let bf = Bitfield::from_bytes(Bytes::from_static(&[0b1010_0000, 0x01]), 12);

    assert!(bf.has_piece(0));
    assert!(!bf.has_piece(1));
    assert!(bf.has_piece(2));
    assert!(!bf.has_piece(11));
    assert!(!bf.has_piece(15));
    assert_eq!(bf.count(), 2);
    assert!(!bf.is_complete());
}

#[test]
fn test_bitfield_short_payload() {
    let bf = Bitfield::from_bytes(Bytes::from_static(&[0xff]), 10);
    assert!(bf.has_piece(7));
    assert!(!bf.has_piece(8));
    assert_eq!(bf.count(), 8);
}

#[test]
fn test_handshake_encode_decode() {
    let handshake = Handshake::new([1u8; 20], [2u8; 20]);
    let encoded = handshake.encode();
    assert_eq!(encoded.len(), 68);
    assert_eq!(encoded[0], 19);
    assert_eq!(&encoded[1..20], b"BitTorrent protocol");
    assert_eq!(&encoded[20..28], &[0u8; 8]);

    let decoded = Handshake::decode(&encoded).unwrap();
    assert_eq!(decoded.info_hash, [1u8; 20]);
    assert_eq!(decoded.peer_id, [2u8; 20]);
    assert!(decoded.has_standard_protocol());
}

#[test]
fn test_handshake_decode_short() {
    assert!(matches!(
        Handshake::decode(&[19u8; 40]),
        Err(PeerError::InvalidHandshake)
    ));
}

#[test]
fn test_message_encode_decode() {
    let messages = vec![
        Message::KeepAlive,
        Message::Choke,
        Message::Unchoke,
        Message::Interested,
        Message::NotInterested,
        Message::Have { piece: 42 },
        Message::Bitfield(Bytes::from_static(&[0xf0, 0x01])),
        Message::Request {
            index: 1,
            begin: 0,
            length: 16384,
        },
        Message::Piece {
            index: 3,
            begin: 16384,
            data: Bytes::from_static(b"hello world"),
        },
        Message::Cancel {
            index: 1,
            begin: 0,
            length: 16384,
        },
        Message::Port(6881),
    ];

    for msg in messages {
        let decoded = Message::decode(msg.encode()).unwrap();
        assert_eq!(decoded, msg);
    }
}

#[test]
fn test_message_wire_layout() {
    assert_eq!(&Message::Interested.encode()[..], &[0, 0, 0, 1, 2]);
    assert_eq!(
        &Message::Request {
            index: 1,
            begin: 0x4000,
            length: 0x4000
        }
        .encode()[..],
        &[0, 0, 0, 13, 6, 0, 0, 0, 1, 0, 0, 0x40, 0, 0, 0, 0x40, 0]
    );
}

#[test]
fn test_message_bounds_checked() {
    // have with three payload bytes
    assert!(matches!(
        Message::decode_body(Bytes::from_static(&[4, 0, 0, 1])),
        Err(PeerError::InvalidMessage(_))
    ));
    // piece without a full header
    assert!(matches!(
        Message::decode_body(Bytes::from_static(&[7, 0, 0, 0, 1, 0])),
        Err(PeerError::InvalidMessage(_))
    ));
    // unchoke with a payload
    assert!(matches!(
        Message::decode_body(Bytes::from_static(&[1, 0])),
        Err(PeerError::InvalidMessage(_))
    ));
    assert!(matches!(
        Message::decode_body(Bytes::from_static(&[20])),
        Err(PeerError::InvalidMessage(_))
    ));
    assert!(matches!(
        Message::decode(Bytes::from_static(&[0, 0, 0, 5, 4])),
        Err(PeerError::InvalidMessage(_))
    ));
}

#[test]
fn test_plan_blocks() {
    let blocks: Vec<_> = plan_blocks(2, 40_000, 16_384).collect();
    assert_eq!(
        blocks,
        vec![
            BlockRequest::new(2, 0, 16_384),
            BlockRequest::new(2, 16_384, 16_384),
            BlockRequest::new(2, 32_768, 7_232),
        ]
    );

    let exact: Vec<_> = plan_blocks(0, 32_768, 16_384).collect();
    assert_eq!(exact.len(), 2);
    assert_eq!(exact[1].length, 16_384);

    assert_eq!(compute_block_count(1, 16_384), 1);
    assert_eq!(compute_block_length(1, 0, 16_384), 1);

    assert_eq!(compute_block_count(40_000, 0), 0);
    assert_eq!(plan_blocks(0, 40_000, 0).count(), 0);
}

#[test]
fn test_plan_blocks_stays_within_u32_offsets() {
    let last = plan_blocks(0, 1 << 33, 1 << 31).last().unwrap();
    assert_eq!(last.offset, 1 << 31);
    assert_eq!(plan_blocks(0, 1 << 33, 1 << 31).count(), 2);
}

#[test]
fn test_verify_piece() {
    let data = b"piece data";
    let hash: [u8; 20] = Sha1::digest(data).into();
    assert!(verify_piece(data, &hash));
    assert!(!verify_piece(b"piece datA", &hash));
}

#[test]
fn test_peer_error_is_transient() {
    assert!(PeerError::Timeout.is_transient());
    assert!(PeerError::HashMismatch(0).is_transient());
    assert!(!PeerError::InvalidPiece(7).is_transient());
}

#[tokio::test]
async fn test_transport_skips_keep_alives() {
    let (local, mut remote) = duplex(1024);
    let mut transport =
        PeerTransport::new(local, Duration::from_secs(5), Duration::from_secs(5), 1 << 20);

    remote.write_all(&Message::KeepAlive.encode()).await.unwrap();
    remote.write_all(&Message::KeepAlive.encode()).await.unwrap();
    remote
        .write_all(&Message::Have { piece: 9 }.encode())
        .await
        .unwrap();

    assert_eq!(
        transport.receive_message().await.unwrap(),
        Message::Have { piece: 9 }
    );
}

#[tokio::test]
async fn test_transport_rejects_oversized_frame() {
    let (local, mut remote) = duplex(1024);
    let mut transport =
        PeerTransport::new(local, Duration::from_secs(5), Duration::from_secs(5), 1024);

    remote.write_all(&[0, 0, 0x10, 0, 7]).await.unwrap();

    assert!(matches!(
        transport.receive_frame().await,
        Err(PeerError::MessageTooLarge(4096))
    ));
}

#[tokio::test]
async fn test_handshake_returns_remote_peer_id() {
    let config = test_config();
    let info_hash = InfoHash::from([7u8; 20]);
    let (mut session, mut peer) = pair(&config);

    let remote = tokio::spawn(async move {
        let theirs = peer.read_handshake().await;
        peer.send_handshake([7u8; 20]).await;
        (peer, theirs)
    });

    let peer_id = session.handshake(&info_hash, &config.peer_id).await.unwrap();
    assert_eq!(peer_id, PeerId(REMOTE_ID));
    assert_eq!(peer_id.to_hex(), hex::encode(REMOTE_ID));
    assert_eq!(session.state(), SessionState::HandshakeVerified);

    let (_peer, sent) = remote.await.unwrap();
    assert_eq!(sent.info_hash, [7u8; 20]);
    assert_eq!(sent.peer_id, *config.peer_id.as_bytes());
    assert_eq!(sent.reserved, [0u8; 8]);
}

#[tokio::test]
async fn test_handshake_tolerates_split_reads() {
    let config = test_config();
    let info_hash = InfoHash::from([7u8; 20]);
    let (mut session, mut peer) = pair(&config);

    let remote = tokio::spawn(async move {
        peer.read_handshake().await;
        let bytes = Handshake::new([7u8; 20], REMOTE_ID).encode();
        for chunk in bytes.chunks(23) {
            peer.stream.write_all(chunk).await.unwrap();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        peer
    });

    let peer_id = session.handshake(&info_hash, &config.peer_id).await.unwrap();
    assert_eq!(peer_id, PeerId(REMOTE_ID));
    let _peer = remote.await.unwrap();
}

#[tokio::test]
async fn test_strict_handshake_rejects_other_info_hash() {
    let config = test_config();
    let info_hash = InfoHash::from([7u8; 20]);
    let (mut session, mut peer) = pair(&config);

    let remote = tokio::spawn(async move {
        peer.read_handshake().await;
        peer.send_handshake([8u8; 20]).await;
        peer
    });

    let err = session
        .handshake(&info_hash, &config.peer_id)
        .await
        .unwrap_err();
    assert!(matches!(err, PeerError::InfoHashMismatch));
    assert!(session.is_closed());
    let _peer = remote.await.unwrap();
}

#[tokio::test]
async fn test_lenient_handshake_accepts_other_info_hash() {
    let config = test_config().with_strict_handshake(false);
    let info_hash = InfoHash::from([7u8; 20]);
    let (mut session, mut peer) = pair(&config);

    let remote = tokio::spawn(async move {
        peer.read_handshake().await;
        peer.send_handshake([8u8; 20]).await;
        peer
    });

    let peer_id = session.handshake(&info_hash, &config.peer_id).await.unwrap();
    assert_eq!(peer_id, PeerId(REMOTE_ID));
    let _peer = remote.await.unwrap();
}

#[tokio::test]
async fn test_strict_handshake_rejects_protocol() {
    let config = test_config();
    let info_hash = InfoHash::from([7u8; 20]);
    let (mut session, mut peer) = pair(&config);

    let remote = tokio::spawn(async move {
        peer.read_handshake().await;
        let mut bytes = Handshake::new([7u8; 20], REMOTE_ID).encode().to_vec();
        bytes[1..20].copy_from_slice(b"NotTorrent protocol");
        peer.stream.write_all(&bytes).await.unwrap();
        peer
    });

    let err = session
        .handshake(&info_hash, &config.peer_id)
        .await
        .unwrap_err();
    assert!(matches!(err, PeerError::InvalidHandshake));
    let _peer = remote.await.unwrap();
}

#[tokio::test]
async fn test_prepare_skips_keep_alives() {
    let config = test_config();
    let info_hash = InfoHash::from([7u8; 20]);
    let (mut session, mut peer) = pair(&config);

    let remote = tokio::spawn(async move {
        peer.read_handshake().await;
        peer.send_handshake([7u8; 20]).await;
        peer.send(Message::KeepAlive).await;
        peer.send(Message::Bitfield(Bytes::from_static(&[0x80]))).await;
        assert_eq!(peer.read_message().await, Message::Interested);
        peer.send(Message::KeepAlive).await;
        peer.send(Message::Unchoke).await;
        peer
    });

    session.prepare(&info_hash, &config.peer_id).await.unwrap();
    assert_eq!(session.state(), SessionState::Ready);
    assert_eq!(session.bitfield().map(|b| &b[..]), Some(&[0x80u8][..]));
    let _peer = remote.await.unwrap();
}

#[tokio::test]
async fn test_unexpected_message_instead_of_bitfield() {
    let config = test_config();
    let info_hash = InfoHash::from([7u8; 20]);
    let (mut session, mut peer) = pair(&config);

    let remote = tokio::spawn(async move {
        peer.read_handshake().await;
        peer.send_handshake([7u8; 20]).await;
        peer.send(Message::Unchoke).await;
        peer
    });

    session.handshake(&info_hash, &config.peer_id).await.unwrap();
    let err = session.receive_bitfield().await.unwrap_err();
    assert!(matches!(
        err,
        PeerError::UnexpectedMessage {
            expected: MessageId::Bitfield,
            got: Some(MessageId::Unchoke),
        }
    ));
    assert!(session.is_closed());
    let _peer = remote.await.unwrap();
}

#[tokio::test]
async fn test_operation_out_of_order() {
    let config = test_config();
    let (mut session, _peer) = pair(&config);

    let err = session.declare_interest().await.unwrap_err();
    assert!(matches!(
        err,
        PeerError::InvalidState {
            state: SessionState::Connected,
            ..
        }
    ));
    assert!(session.is_closed());
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let config = test_config();
    let (mut session, _peer) = pair(&config);

    session.close().await;
    session.close().await;
    assert_eq!(session.state(), SessionState::Closed);

    let err = session
        .handshake(&InfoHash::from([0u8; 20]), &config.peer_id)
        .await
        .unwrap_err();
    assert!(matches!(err, PeerError::InvalidState { .. }));
}

#[tokio::test]
async fn test_silent_peer_times_out() {
    let config = test_config().with_read_timeout(Duration::from_millis(50));
    let info_hash = InfoHash::from([7u8; 20]);
    let (mut session, mut peer) = pair(&config);

    let remote = tokio::spawn(async move {
        peer.read_handshake().await;
        peer.send_handshake([7u8; 20]).await;
        peer
    });

    session.handshake(&info_hash, &config.peer_id).await.unwrap();
    let err = session.receive_bitfield().await.unwrap_err();
    assert!(matches!(err, PeerError::Timeout));
    assert!(session.is_closed());
    let _peer = remote.await.unwrap();
}

#[tokio::test]
async fn test_peer_hangs_up() {
    let config = test_config();
    let info_hash = InfoHash::from([7u8; 20]);
    let (mut session, mut peer) = pair(&config);

    let remote = tokio::spawn(async move {
        peer.read_handshake().await;
        drop(peer);
    });

    let err = session
        .handshake(&info_hash, &config.peer_id)
        .await
        .unwrap_err();
    assert!(matches!(err, PeerError::ConnectionClosed));
    remote.await.unwrap();
}

#[tokio::test]
async fn test_connect_refused() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = PeerSession::connect(addr, &test_config()).await.err().unwrap();
    assert!(matches!(err, PeerError::ConnectionFailed { .. }));
}

#[tokio::test]
async fn test_download_piece_in_blocks() {
    let config = test_config();
    // Two pieces: 3 full blocks, then 848 bytes.
    let data = payload(50_000);
    let info = torrent_for(&data, 49_152);
    let info_hash = *info.info_hash.as_bytes();
    let (mut session, mut peer) = pair(&config);

    let served = data.clone();
    let remote = tokio::spawn(async move {
        peer.open(info_hash).await;
        let first = peer.serve(&served, 49_152, 3).await;
        let second = peer.serve(&served, 49_152, 1).await;
        (peer, first, second)
    });

    session.prepare(&info.info_hash, &config.peer_id).await.unwrap();

    let mut buf = vec![0u8; 49_152];
    let written = download_piece(&mut session, &info, 0, &mut buf).await.unwrap();
    assert_eq!(written, 49_152);
    assert_eq!(&buf[..], &data[..49_152]);

    let mut last = vec![0u8; 49_152];
    let written = download_piece(&mut session, &info, 1, &mut last).await.unwrap();
    assert_eq!(written, 848);
    assert_eq!(&last[..848], &data[49_152..]);
    assert_eq!(session.bytes_downloaded(), 50_000);

    let (_peer, first, second) = remote.await.unwrap();
    assert_eq!(
        first,
        vec![(0, 0, 16_384), (0, 16_384, 16_384), (0, 32_768, 16_384)]
    );
    assert_eq!(second, vec![(1, 0, 848)]);
}

#[tokio::test]
async fn test_download_piece_hash_mismatch() {
    let config = test_config();
    let data = payload(20_000);
    let info = torrent_for(&data, 20_000);
    let info_hash = *info.info_hash.as_bytes();
    let (mut session, mut peer) = pair(&config);

    let mut corrupted = data.clone();
    corrupted[17_000] ^= 0xff;
    let remote = tokio::spawn(async move {
        peer.open(info_hash).await;
        peer.serve(&corrupted, 20_000, 2).await;
        peer
    });

    session.prepare(&info.info_hash, &config.peer_id).await.unwrap();

    let mut buf = vec![0u8; 20_000];
    let err = download_piece(&mut session, &info, 0, &mut buf).await.unwrap_err();
    assert!(matches!(err, PeerError::HashMismatch(0)));
    assert_eq!(session.state(), SessionState::Ready);
    let _peer = remote.await.unwrap();
}

#[tokio::test]
async fn test_download_piece_checks_buffer_and_index() {
    let config = test_config();
    let data = payload(1_000);
    let info = torrent_for(&data, 512);
    let (mut session, _peer) = pair(&config);

    let mut small = vec![0u8; 511];
    assert!(matches!(
        download_piece(&mut session, &info, 0, &mut small).await,
        Err(PeerError::BufferTooSmall {
            needed: 512,
            available: 511
        })
    ));

    // The last piece only needs its true length.
    let mut small = vec![0u8; 100];
    assert!(matches!(
        download_piece(&mut session, &info, 1, &mut small).await,
        Err(PeerError::BufferTooSmall { needed: 488, .. })
    ));

    assert!(matches!(
        download_piece(&mut session, &info, 2, &mut small).await,
        Err(PeerError::InvalidPiece(2))
    ));
    assert_eq!(session.state(), SessionState::Connected);
}

#[tokio::test]
async fn test_download_piece_rejects_zero_block_size() {
    let mut config = test_config();
    config.block_size = 0;
    let data = payload(1_000);
    let info = torrent_for(&data, 1_000);
    let (mut session, _peer) = pair(&config);

    let mut buf = vec![0u8; 1_000];
    let err = download_piece(&mut session, &info, 0, &mut buf).await.unwrap_err();
    assert!(matches!(err, PeerError::InvalidBlockSize(0)));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_mismatched_block_leaves_buffer_untouched() {
    let config = test_config();
    let data = payload(1_000);
    let info = torrent_for(&data, 1_000);
    let info_hash = *info.info_hash.as_bytes();
    let (mut session, mut peer) = pair(&config);

    let remote = tokio::spawn(async move {
        peer.open(info_hash).await;
        let Message::Request { index, length, .. } = peer.read_message().await else {
            panic!("expected request");
        };
        let data = Bytes::from(vec![0x55u8; length as usize]);
        peer.send(Message::Piece {
            index,
            begin: 64,
            data,
        })
        .await;
        peer
    });

    session.prepare(&info.info_hash, &config.peer_id).await.unwrap();

    let mut buf = vec![0xaau8; 1_000];
    let err = download_piece(&mut session, &info, 0, &mut buf).await.unwrap_err();
    assert!(matches!(
        err,
        PeerError::ProtocolMismatch {
            begin: 0,
            got_begin: 64,
            ..
        }
    ));
    assert!(buf.iter().all(|&b| b == 0xaa));
    assert!(session.is_closed());
    let _peer = remote.await.unwrap();
}

#[tokio::test]
async fn test_choke_during_download() {
    let config = test_config();
    let data = payload(1_000);
    let info = torrent_for(&data, 1_000);
    let info_hash = *info.info_hash.as_bytes();
    let (mut session, mut peer) = pair(&config);

    let remote = tokio::spawn(async move {
        peer.open(info_hash).await;
        peer.read_message().await;
        peer.send(Message::Choke).await;
        peer
    });

    session.prepare(&info.info_hash, &config.peer_id).await.unwrap();

    let mut buf = vec![0u8; 1_000];
    let err = download_piece(&mut session, &info, 0, &mut buf).await.unwrap_err();
    assert!(matches!(
        err,
        PeerError::UnexpectedMessage {
            expected: MessageId::Piece,
            got: Some(MessageId::Choke),
        }
    ));
    let _peer = remote.await.unwrap();
}
