//! Transfer session state machine
//!
//! A session lives for exactly one upload and tracks:
//! - Target slot, file size and chunk size
//! - Current chunk index
//! - Terminal outcome (done or failed)
//!
//! Sessions are never resumed. A failed transfer is discarded and a retry
//! starts a new session at chunk 0.

use std::fmt;
use std::ops::Range;

use tracing::trace;

use crate::error::{Error, Result};
use crate::slot::SlotId;

/// Why a transfer stopped early
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// Handshake reply lacked the start marker
    NoStartConfirmation,

    /// Chunk with this index was never acknowledged
    NoAckForChunk(usize),

    /// Caller cancelled the transfer
    Cancelled,

    /// Underlying link failed mid-transfer
    LinkFailure,
}

impl FailureReason {
    /// Protocol error matching this reason, if it is a protocol failure
    pub fn protocol_error(self) -> Option<Error> {
        match self {
            Self::NoStartConfirmation => Some(Error::NoStartConfirmation),
            Self::NoAckForChunk(index) => Some(Error::NoAckForChunk { index }),
            Self::Cancelled => Some(Error::Cancelled),
            Self::LinkFailure => None,
        }
    }
}

/// Transfer state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    /// Nothing sent yet
    Idle,

    /// `sending` command written and confirmed
    HandshakeSent,

    /// Waiting to send (or acknowledge) the chunk at this index
    Transferring(usize),

    /// Every chunk acknowledged
    Done,

    /// Transfer aborted
    Failed(FailureReason),
}

impl TransferState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("Idle"),
            Self::HandshakeSent => f.write_str("HandshakeSent"),
            Self::Transferring(index) => write!(f, "Transferring({})", index),
            Self::Done => f.write_str("Done"),
            Self::Failed(reason) => write!(f, "Failed({:?})", reason),
        }
    }
}

/// One image transfer
#[derive(Debug, Clone)]
pub struct TransferSession {
    slot: SlotId,
    size: usize,
    chunk_size: usize,
    total_chunks: usize,
    bytes_acked: usize,
    state: TransferState,
}

impl TransferSession {
    /// Create an idle session
    ///
    /// # Errors
    ///
    /// Returns `InvalidChunkSize` for a zero chunk size.
    pub fn new(slot: SlotId, size: usize, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::InvalidChunkSize(chunk_size));
        }

        Ok(Self {
            slot,
            size,
            chunk_size,
            total_chunks: size.div_ceil(chunk_size),
            bytes_acked: 0,
            state: TransferState::Idle,
        })
    }

    pub fn slot(&self) -> SlotId {
        self.slot
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// `ceil(size / chunk_size)`
    pub fn total_chunks(&self) -> usize {
        self.total_chunks
    }

    pub fn state(&self) -> TransferState {
        self.state
    }

    /// Bytes covered by acknowledged chunks
    pub fn bytes_acked(&self) -> usize {
        self.bytes_acked
    }

    /// Index of the chunk in flight, if transferring
    pub fn current_chunk(&self) -> Option<usize> {
        match self.state {
            TransferState::Transferring(index) => Some(index),
            _ => None,
        }
    }

    /// Byte range of chunk `index` within the payload
    pub fn chunk_range(&self, index: usize) -> Option<Range<usize>> {
        if index >= self.total_chunks {
            return None;
        }

        let start = index * self.chunk_size;
        let end = (start + self.chunk_size).min(self.size);
        Some(start..end)
    }

    /// Idle → HandshakeSent
    pub fn handshake_confirmed(&mut self) -> Result<()> {
        self.expect(TransferState::Idle, "confirm handshake")?;
        self.state = TransferState::HandshakeSent;
        Ok(())
    }

    /// HandshakeSent → Transferring(0)
    ///
    /// An empty payload has no chunks and completes immediately.
    pub fn begin(&mut self) -> Result<()> {
        self.expect(TransferState::HandshakeSent, "begin transfer")?;
        self.state = if self.total_chunks == 0 {
            TransferState::Done
        } else {
            TransferState::Transferring(0)
        };
        Ok(())
    }

    /// Transferring(i) → Transferring(i + 1), or Done after the last chunk
    pub fn chunk_acked(&mut self) -> Result<TransferState> {
        let index = self.current_chunk().ok_or(Error::InvalidTransferState {
            action: "acknowledge chunk",
            state: self.state,
        })?;

        if let Some(range) = self.chunk_range(index) {
            self.bytes_acked = range.end;
        }

        self.state = if index + 1 >= self.total_chunks {
            TransferState::Done
        } else {
            TransferState::Transferring(index + 1)
        };

        trace!(
            chunk = index,
            total = self.total_chunks,
            bytes_acked = self.bytes_acked,
            "Chunk acknowledged"
        );

        Ok(self.state)
    }

    /// Any non-terminal state → Failed(reason)
    pub fn fail(&mut self, reason: FailureReason) -> Result<()> {
        if self.state.is_terminal() {
            return Err(Error::InvalidTransferState {
                action: "fail transfer",
                state: self.state,
            });
        }

        trace!(from = %self.state, ?reason, "Transfer failed");
        self.state = TransferState::Failed(reason);
        Ok(())
    }

    fn expect(&self, expected: TransferState, action: &'static str) -> Result<()> {
        if self.state != expected {
            return Err(Error::InvalidTransferState {
                action,
                state: self.state,
            });
        }
        Ok(())
    }
}
