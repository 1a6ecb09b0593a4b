//! Error types for qrpos-core

use crate::session::TransferState;

/// Result type alias for qrpos operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core protocol errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Device never confirmed it entered receive mode
    #[error("Device did not confirm transfer start")]
    NoStartConfirmation,

    /// A chunk went unacknowledged for the whole poll window
    #[error("No acknowledgment for chunk {index}")]
    NoAckForChunk {
        index: usize,
    },

    /// Timeout waiting for response
    ///
    /// The upload engine reports its own expired waits as
    /// `NoStartConfirmation` or `NoAckForChunk`.
    #[error("Timeout waiting for response after {millis}ms")]
    Timeout {
        millis: u64,
    },

    /// Operation cancelled by the caller
    #[error("Operation cancelled")]
    Cancelled,

    /// Slot number outside the device range
    #[error("Slot {slot} out of range (valid: {min}..={max})")]
    SlotOutOfRange {
        slot: u32,
        min: u32,
        max: u32,
    },

    /// Chunk size must be at least one byte
    #[error("Invalid chunk size: {0}")]
    InvalidChunkSize(usize),

    /// Invalid transfer state transition
    #[error("Invalid transfer state: cannot {action} from {state}")]
    InvalidTransferState {
        action: &'static str,
        state: TransferState,
    },
}

impl Error {
    /// Check if error is recoverable (a fresh transfer might succeed)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NoStartConfirmation | Self::NoAckForChunk { .. } | Self::Timeout { .. }
        )
    }

    /// Check if error was raised before any bytes reached the wire
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::SlotOutOfRange { .. } | Self::InvalidChunkSize(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expired_waits_are_recoverable() {
        assert!(Error::NoStartConfirmation.is_recoverable());
        assert!(Error::NoAckForChunk { index: 3 }.is_recoverable());
        assert!(Error::Timeout { millis: 5000 }.is_recoverable());
        assert!(!Error::Cancelled.is_recoverable());
        assert!(!Error::InvalidChunkSize(0).is_recoverable());
    }

    #[test]
    fn test_timeout_message() {
        let err = Error::Timeout { millis: 4900 };
        assert_eq!(err.to_string(), "Timeout waiting for response after 4900ms");
    }
}
