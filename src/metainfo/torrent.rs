use super::error::MetainfoError;
use super::info_hash::InfoHash;
use crate::bencode::{decode, encode, Value};
use bytes::Bytes;

/// Length of a single SHA-1 piece hash.
pub const PIECE_HASH_LEN: usize = 20;

/// Metadata resolved from a single-file torrent.
///
/// Built once per torrent and read-only afterwards, so it can be shared by
/// reference across any number of peer sessions.
///
/// # Examples
///
/// ```
/// use seedling::metainfo::TorrentInfo;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut data = b"d8:announce18:http://tracker/ann4:infod6:lengthi10e4:name4:demo\
///     12:piece lengthi4e6:pieces60:".to_vec();
/// data.extend_from_slice(&[0u8; 60]);
/// data.extend_from_slice(b"ee");
///
/// let info = TorrentInfo::from_bytes(&data)?;
/// assert_eq!(info.announce, "http://tracker/ann");
/// assert_eq!(info.piece_count(), 3);
/// assert_eq!(info.piece_size(2), Some(2));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TorrentInfo {
    /// Tracker announce URL.
    pub announce: String,
    /// Suggested file name, if the torrent carries one.
    pub name: Option<String>,
    /// Total payload size in bytes.
    pub length: u64,
    /// SHA-1 of the `info` dictionary exactly as it appeared in the source.
    pub info_hash: InfoHash,
    /// Nominal size of each piece in bytes.
    pub piece_length: u64,
    /// SHA-1 of each piece, in piece order.
    pub piece_hashes: Vec<[u8; PIECE_HASH_LEN]>,
    raw_info: Bytes,
}

impl TorrentInfo {
    /// Decodes a torrent document and resolves its metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The data is not valid bencode
    /// - `announce`, `info`, `info.length`, `info.piece length` or `info.pieces` is missing
    /// - A field has the wrong type or a non-positive size
    /// - The `pieces` length is not a multiple of 20, or the hash count does not
    ///   match `ceil(length / piece length)`
    pub fn from_bytes(data: &[u8]) -> Result<Self, MetainfoError> {
        let root = decode(data)?;
        Self::from_value(&root)
    }

    /// Resolves metadata from an already decoded torrent document.
    pub fn from_value(root: &Value) -> Result<Self, MetainfoError> {
        if root.as_dict().is_none() {
            return Err(MetainfoError::TypeMismatch {
                field: "root",
                expected: "dict",
            });
        }

        let announce = root
            .get(b"announce")
            .ok_or(MetainfoError::MissingField("announce"))?
            .as_bytes()
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .ok_or(MetainfoError::TypeMismatch {
                field: "announce",
                expected: "string",
            })?;

        let info_value = root
            .get(b"info")
            .ok_or(MetainfoError::MissingField("info"))?;
        if info_value.as_dict().is_none() {
            return Err(MetainfoError::TypeMismatch {
                field: "info",
                expected: "dict",
            });
        }

        let length = positive_integer(info_value, b"length", "info.length")?;
        let piece_length = positive_integer(info_value, b"piece length", "info.piece length")?;

        let pieces = info_value
            .get(b"pieces")
            .ok_or(MetainfoError::MissingField("info.pieces"))?
            .as_bytes()
            .ok_or(MetainfoError::TypeMismatch {
                field: "info.pieces",
                expected: "string",
            })?;

        if pieces.len() % PIECE_HASH_LEN != 0 {
            return Err(MetainfoError::MalformedPieceHashes(pieces.len()));
        }

        let piece_hashes: Vec<[u8; PIECE_HASH_LEN]> = pieces
            .chunks_exact(PIECE_HASH_LEN)
            .map(|chunk| {
                let mut arr = [0u8; PIECE_HASH_LEN];
                arr.copy_from_slice(chunk);
                arr
            })
            .collect();

        let expected = length.div_ceil(piece_length);
        if piece_hashes.len() as u64 != expected {
            return Err(MetainfoError::PieceCountMismatch {
                expected: expected as usize,
                actual: piece_hashes.len(),
            });
        }

        let name = info_value
            .get(b"name")
            .and_then(|v| v.as_bytes())
            .map(|b| String::from_utf8_lossy(b).into_owned());

        // The dict keeps source order, so this reproduces the original span.
        let raw_info = Bytes::from(encode(info_value)?);
        let info_hash = InfoHash::from_info_bytes(&raw_info);

        tracing::debug!(
            %info_hash,
            length,
            piece_length,
            pieces = piece_hashes.len(),
            "resolved torrent metainfo"
        );

        Ok(Self {
            announce,
            name,
            length,
            info_hash,
            piece_length,
            piece_hashes,
            raw_info,
        })
    }

    /// Returns the bencoded info dictionary the info hash was computed over.
    pub fn raw_info(&self) -> &Bytes {
        &self.raw_info
    }

    pub fn piece_count(&self) -> usize {
        self.piece_hashes.len()
    }

    /// Returns the true byte length of a piece.
    ///
    /// Every piece is `piece_length` long except the last, which holds the
    /// remainder of `length` (or a full piece when the remainder is zero).
    /// Returns `None` for an index past the last piece.
    pub fn piece_size(&self, index: usize) -> Option<u64> {
        let count = self.piece_count();
        if index >= count {
            return None;
        }

        let remainder = self.length % self.piece_length;
        if index == count - 1 && remainder != 0 {
            Some(remainder)
        } else {
            Some(self.piece_length)
        }
    }

    pub fn piece_hash(&self, index: usize) -> Option<&[u8; PIECE_HASH_LEN]> {
        self.piece_hashes.get(index)
    }
}

fn positive_integer(
    info: &Value,
    key: &[u8],
    field: &'static str,
) -> Result<u64, MetainfoError> {
    let value = info
        .get(key)
        .ok_or(MetainfoError::MissingField(field))?
        .to_integer()
        .map_err(|_| MetainfoError::TypeMismatch {
            field,
            expected: "integer",
        })?;

    if value <= 0 {
        return Err(MetainfoError::InvalidField(field));
    }

    Ok(value as u64)
}
