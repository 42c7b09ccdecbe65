use super::error::PeerError;
use super::message::Message;
use super::session::PeerSession;
use crate::metainfo::TorrentInfo;
use sha1::{Digest, Sha1};
use tokio::io::{AsyncRead, AsyncWrite};

/// One `request` message worth of a piece.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlockRequest {
    pub piece: u32,
    pub offset: u32,
    pub length: u32,
}

impl BlockRequest {
    pub fn new(piece: u32, offset: u32, length: u32) -> Self {
        Self {
            piece,
            offset,
            length,
        }
    }

    pub fn to_message(&self) -> Message {
        Message::Request {
            index: self.piece,
            begin: self.offset,
            length: self.length,
        }
    }
}

/// Number of blocks in a piece. A zero block size plans no blocks.
pub fn compute_block_count(piece_length: u64, block_size: u32) -> u32 {
    if block_size == 0 {
        return 0;
    }
    u32::try_from(piece_length.div_ceil(block_size as u64)).unwrap_or(u32::MAX)
}

pub fn compute_block_length(piece_length: u64, block_index: u32, block_size: u32) -> u32 {
    let offset = block_index as u64 * block_size as u64;
    let remaining = piece_length.saturating_sub(offset);
    remaining.min(block_size as u64) as u32
}

/// Splits a piece into block requests in increasing offset order.
///
/// Every block is `block_size` long except possibly the last, which covers
/// exactly what remains of the piece. Planning stops at the first offset
/// that does not fit the wire's 32-bit `begin` field.
pub fn plan_blocks(
    piece: u32,
    piece_length: u64,
    block_size: u32,
) -> impl Iterator<Item = BlockRequest> {
    (0..compute_block_count(piece_length, block_size)).map_while(move |block| {
        let offset = u32::try_from(block as u64 * block_size as u64).ok()?;
        Some(BlockRequest::new(
            piece,
            offset,
            compute_block_length(piece_length, block, block_size),
        ))
    })
}

/// Returns true if `data` hashes to `expected`.
pub fn verify_piece(data: &[u8], expected: &[u8; 20]) -> bool {
    let digest: [u8; 20] = Sha1::digest(data).into();
    &digest == expected
}

/// Downloads one piece through a ready session into `output`.
///
/// Blocks are requested one at a time in increasing offset order. When the
/// last block arrives the piece is checked against its hash from `info`.
/// Returns the number of bytes written, which is the piece's true length.
///
/// A hash mismatch leaves the session usable; any wire error closes it.
/// The piece is never retried here.
pub async fn download_piece<S>(
    session: &mut PeerSession<S>,
    info: &TorrentInfo,
    piece_index: usize,
    output: &mut [u8],
) -> Result<usize, PeerError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (Some(size), Some(expected)) = (info.piece_size(piece_index), info.piece_hash(piece_index))
    else {
        return Err(PeerError::InvalidPiece(piece_index));
    };
    let piece = u32::try_from(piece_index).map_err(|_| PeerError::InvalidPiece(piece_index))?;

    let block_size = session.block_size();
    if block_size == 0 {
        return Err(PeerError::InvalidBlockSize(block_size));
    }

    if u32::try_from(size).is_err() {
        return Err(PeerError::PieceTooLarge {
            index: piece_index,
            size,
        });
    }

    let size = size as usize;
    if output.len() < size {
        return Err(PeerError::BufferTooSmall {
            needed: size,
            available: output.len(),
        });
    }

    tracing::debug!(
        piece = piece_index,
        size,
        blocks = compute_block_count(size as u64, block_size),
        "downloading piece"
    );

    let target = &mut output[..size];
    let mut received = 0;
    for request in plan_blocks(piece, size as u64, block_size) {
        received += session.fetch_block(&request, target).await?;
    }

    if !verify_piece(target, expected) {
        tracing::warn!(piece = piece_index, "piece failed hash check");
        return Err(PeerError::HashMismatch(piece_index));
    }

    tracing::debug!(piece = piece_index, bytes = received, "piece verified");
    Ok(received)
}
