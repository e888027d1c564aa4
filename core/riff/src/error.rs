//! Error types for RIFF chunk scanning.

use std::collections::TryReserveError;

use thiserror::Error;

/// Result type alias for RIFF operations.
pub type Result<T> = std::result::Result<T, RiffError>;

/// Errors raised while scanning a RIFF document.
#[derive(Debug, Error)]
pub enum RiffError {
    /// The data is not a RIFF document, or violates its nesting rules.
    #[error("Not RIFF data at offset {offset}: {reason}")]
    NotRiff {
        /// Absolute offset of the offending header.
        offset: usize,
        /// What was wrong.
        reason: String,
    },

    /// A chunk violates the size accounting of its document.
    #[error("Corrupted RIFF at offset {offset}: {message}")]
    Corrupted {
        /// Absolute offset of the offending chunk header.
        offset: usize,
        /// Description of the inconsistency.
        message: String,
    },

    /// The buffer ended before the root header could be read.
    #[error("Incomplete RIFF data: {needed} more bytes needed")]
    Incomplete {
        /// How many more bytes were required.
        needed: usize,
    },

    /// A chunk payload could not be allocated.
    #[error("Buffer allocation failed: {0}")]
    Buffer(#[from] TryReserveError),
}

impl RiffError {
    pub fn not_riff(offset: usize, reason: impl Into<String>) -> Self {
        RiffError::NotRiff {
            offset,
            reason: reason.into(),
        }
    }

    pub fn corrupted(offset: usize, message: impl Into<String>) -> Self {
        RiffError::Corrupted {
            offset,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_riff_display() {
        let err = RiffError::not_riff(12, "nested LIST");
        assert!(matches!(err, RiffError::NotRiff { offset: 12, .. }));
        assert!(err.to_string().contains("nested LIST"));
    }

    #[test]
    fn test_corrupted_display() {
        let err = RiffError::corrupted(40, "overrun");
        let msg = err.to_string();
        assert!(msg.contains("40"));
        assert!(msg.contains("overrun"));
    }
}
