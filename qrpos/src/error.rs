//! High-level error types

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Protocol error: {0}")]
    Core(#[from] qrpos_core::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] qrpos_transport::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] qrpos_types::Error),

    #[error("Device not connected")]
    NotConnected,
}

impl Error {
    /// Protocol-level cause, if any
    pub fn protocol(&self) -> Option<&qrpos_core::Error> {
        match self {
            Self::Core(e) => Some(e),
            _ => None,
        }
    }

    /// Whether the error was raised before anything was written
    pub fn is_precondition(&self) -> bool {
        match self {
            Self::Core(e) => e.is_precondition(),
            Self::Validation(_) | Self::NotConnected => true,
            Self::Transport(_) => false,
        }
    }

    /// Check if a fresh attempt might succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Core(e) => e.is_recoverable(),
            Self::Transport(qrpos_transport::Error::Io(_) | qrpos_transport::Error::WriteTimeout) => true,
            _ => false,
        }
    }

    /// Check if error requires reconnection
    pub fn requires_reconnect(&self) -> bool {
        matches!(
            self,
            Self::NotConnected
                | Self::Transport(qrpos_transport::Error::Io(_) | qrpos_transport::Error::NotConnected)
        )
    }
}
