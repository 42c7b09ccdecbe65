use thiserror::Error;

/// Errors produced while decoding or inspecting bencode.
///
/// Every syntax violation carries the byte offset at which it was detected.
#[derive(Debug, Error)]
pub enum BencodeError {
    /// The input violates bencode syntax.
    #[error("malformed document at offset {offset}: {reason}")]
    Malformed { offset: usize, reason: String },

    /// A string declares more bytes than remain in the input.
    #[error("truncated input at offset {offset}: string declares {declared} bytes, {available} available")]
    Truncated {
        offset: usize,
        declared: usize,
        available: usize,
    },

    /// Containers are nested deeper than the decoder allows.
    #[error("nesting too deep at offset {offset}")]
    NestingTooDeep { offset: usize },

    /// A complete value was decoded but bytes remain after it.
    #[error("trailing data after value at offset {offset}")]
    TrailingData { offset: usize },

    /// A scalar accessor was applied to the wrong kind of value.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl BencodeError {
    pub(crate) fn malformed(offset: usize, reason: impl Into<String>) -> Self {
        BencodeError::Malformed {
            offset,
            reason: reason.into(),
        }
    }

    /// Returns `true` if this error belongs to the malformed-document family
    /// (as opposed to truncation or a type mismatch).
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            BencodeError::Malformed { .. }
                | BencodeError::NestingTooDeep { .. }
                | BencodeError::TrailingData { .. }
        )
    }
}
