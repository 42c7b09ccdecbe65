use thiserror::Error;

use crate::bencode::BencodeError;

/// Errors that can occur when resolving torrent metainfo.
#[derive(Debug, Error)]
pub enum MetainfoError {
    /// The torrent file contains invalid bencode.
    #[error("bencode error: {0}")]
    Bencode(#[from] BencodeError),

    /// A required field is missing from the torrent file.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// A field is present but has the wrong bencode type.
    #[error("type mismatch for field {field}: expected {expected}")]
    TypeMismatch {
        field: &'static str,
        expected: &'static str,
    },

    /// A field has the right type but an unusable value.
    #[error("invalid field: {0}")]
    InvalidField(&'static str),

    /// The `pieces` string is not a whole number of 20-byte hashes.
    #[error("malformed piece hashes: {0} bytes is not a multiple of 20")]
    MalformedPieceHashes(usize),

    /// The number of piece hashes disagrees with `length` and `piece length`.
    #[error("piece count mismatch: expected {expected} hashes, found {actual}")]
    PieceCountMismatch { expected: usize, actual: usize },

    /// The info hash has an invalid length (must be 20 bytes).
    #[error("invalid info hash length")]
    InvalidInfoHashLength,
}
