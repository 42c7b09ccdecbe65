use bytes::Bytes;

/// A bitfield representing which pieces a peer has.
///
/// Each bit represents whether a piece is available (1) or not (0).
/// Bits are numbered from the high bit of the first byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitfield {
    bits: Bytes,
    piece_count: usize,
}

impl Bitfield {
    /// Wraps the payload of a `bitfield` message.
    ///
    /// A payload shorter than `piece_count` bits reads as missing pieces past
    /// its end; spare trailing bits are ignored.
    pub fn from_bytes(bits: Bytes, piece_count: usize) -> Self {
        Self { bits, piece_count }
    }

    /// Returns true if the piece at the given index is available.
    pub fn has_piece(&self, index: usize) -> bool {
        if index >= self.piece_count {
            return false;
        }
        let bit_index = 7 - (index % 8);
        self.bits
            .get(index / 8)
            .is_some_and(|byte| (byte >> bit_index) & 1 == 1)
    }

    /// Returns the number of pieces that are available.
    pub fn count(&self) -> usize {
        (0..self.piece_count).filter(|&i| self.has_piece(i)).count()
    }

    /// Returns true if all pieces are available.
    pub fn is_complete(&self) -> bool {
        self.count() == self.piece_count
    }

    /// Returns the total number of pieces.
    pub fn piece_count(&self) -> usize {
        self.piece_count
    }

    /// Returns the raw bytes of the bitfield.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }
}
