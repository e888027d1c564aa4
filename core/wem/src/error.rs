//! Error types for WWRIFF to Ogg conversion.

use std::collections::TryReserveError;

use riff::RiffError;
use thiserror::Error;

/// Result type alias for conversion operations.
pub type WemResult<T> = Result<T, WemError>;

/// Failures of the bit-level primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BitError {
    /// A read went past the end of the source.
    #[error("Bit underrun: {requested} bits requested, {available} available")]
    Underrun {
        /// Bits asked for.
        requested: u32,
        /// Bits left in the source.
        available: u64,
    },

    /// More than 32 bits were requested in a single read or write.
    #[error("Cannot transfer {count} bits at once")]
    TooWide {
        /// Bits asked for.
        count: u32,
    },
}

/// Errors from the codebook library codec.
#[derive(Debug, Error)]
pub enum CodebookError {
    /// The library or a codebook bitstream is malformed.
    #[error("Corrupt codebook data: {message}")]
    Corrupt {
        /// Description of the inconsistency.
        message: String,
    },

    /// A stripped setup header referenced a codebook the library does not have.
    #[error("Codebook index {index} out of range, library holds {count}, try --inline")]
    IndexOutOfRange {
        /// The library key, after the +1 adjustment.
        index: usize,
        /// Number of codebooks in the library.
        count: usize,
    },

    #[error(transparent)]
    Bit(#[from] BitError),

    #[error("Buffer allocation failed: {0}")]
    Buffer(#[from] TryReserveError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CodebookError {
    /// Create a new corrupt codebook error with the given message.
    pub fn corrupt(message: impl Into<String>) -> Self {
        CodebookError::Corrupt {
            message: message.into(),
        }
    }
}

/// Errors that can occur while converting one item.
#[derive(Debug, Error)]
pub enum WemError {
    #[error(transparent)]
    Bit(#[from] BitError),

    #[error(transparent)]
    Riff(#[from] RiffError),

    #[error(transparent)]
    Codebook(#[from] CodebookError),

    /// A chunk that may appear once appeared twice.
    #[error("Duplicate {chunk} chunk")]
    DuplicateChunk {
        /// Name of the repeated chunk.
        chunk: &'static str,
    },

    /// Required chunks are missing from the document.
    #[error("Incomplete WWRIFF, missing {}", missing.join(", "))]
    IncompleteDescriptor {
        /// Names of the absent chunks.
        missing: Vec<&'static str>,
    },

    /// A framed packet runs past the end of the `data` chunk.
    #[error("Packet at {offset} needs {needed} bytes, {available} available")]
    TruncatedPacket {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// The input contains invalid or inconsistent data.
    #[error("Corrupt data: {message}")]
    Corrupt {
        /// Description of the inconsistency.
        message: String,
    },

    /// The stream is not Vorbis.
    #[error("Unsupported codec 0x{format_tag:04X}, only Vorbis (0xFFFF) is handled")]
    NotVorbis {
        /// The `fmt` format tag found.
        format_tag: u16,
    },

    /// The setup header carries inline codebooks but external ones were configured.
    #[error("Setup header references codebook 0x342, codebooks look inline, try --inline")]
    InlineCodebooksDetected,

    /// The Vorbis header validator rejected a header packet.
    #[error("Vorbis headers rejected: {message}")]
    HeaderRejected {
        /// What the validator reported.
        message: String,
    },

    #[error("Buffer allocation failed: {0}")]
    Buffer(#[from] TryReserveError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Ogg read error: {0}")]
    OggRead(#[from] ogg::OggReadError),
}

impl WemError {
    /// Create a new corrupt data error with the given message.
    pub fn corrupt(message: impl Into<String>) -> Self {
        WemError::Corrupt {
            message: message.into(),
        }
    }

    /// Create a new header rejection error.
    pub fn header_rejected(message: impl Into<String>) -> Self {
        WemError::HeaderRejected {
            message: message.into(),
        }
    }

    /// True for bit underruns anywhere in the stack and for truncated
    /// packets, which mean the input was cut short.
    pub fn is_underrun(&self) -> bool {
        matches!(
            self,
            WemError::Bit(BitError::Underrun { .. })
                | WemError::Codebook(CodebookError::Bit(BitError::Underrun { .. }))
                | WemError::TruncatedPacket { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corrupt_error() {
        let err = WemError::corrupt("bad vorb size");
        assert!(matches!(err, WemError::Corrupt { .. }));
        assert!(err.to_string().contains("bad vorb size"));
    }

    #[test]
    fn test_incomplete_descriptor_names_missing() {
        let err = WemError::IncompleteDescriptor {
            missing: vec!["vorb", "data"],
        };
        assert_eq!(err.to_string(), "Incomplete WWRIFF, missing vorb, data");
    }

    #[test]
    fn test_not_vorbis_display() {
        let err = WemError::NotVorbis { format_tag: 0x0002 };
        assert!(err.to_string().contains("0x0002"));
    }

    #[test]
    fn test_underrun_detection() {
        let bit = BitError::Underrun {
            requested: 8,
            available: 3,
        };
        assert!(WemError::from(bit).is_underrun());
        assert!(WemError::from(CodebookError::from(bit)).is_underrun());
        assert!(!WemError::corrupt("x").is_underrun());
        let packet = WemError::TruncatedPacket {
            offset: 4,
            needed: 10,
            available: 3,
        };
        assert!(packet.is_underrun());
    }

    #[test]
    fn test_codebook_index_display() {
        let err = CodebookError::IndexOutOfRange { index: 600, count: 598 };
        let msg = err.to_string();
        assert!(msg.contains("600"));
        assert!(msg.contains("598"));
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let wem_err: WemError = io_err.into();
        assert!(matches!(wem_err, WemError::Io(_)));
    }
}
