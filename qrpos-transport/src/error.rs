//! Transport errors

use std::io;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Port not found: {port}")]
    NotFound { port: String },

    #[error("Permission denied on {port}: port in use by another process or insufficient privileges")]
    PermissionDenied { port: String },

    #[error("Failed to open {port}: {reason}")]
    Other { port: String, reason: String },

    #[error("Not connected")]
    NotConnected,

    #[error("Already connected")]
    AlreadyConnected,

    #[error("Write timeout")]
    WriteTimeout,

    #[error("Invalid link configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Distinguishes why a port could not be opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorKind {
    NotFound,
    PermissionDenied,
    Other,
}

impl Error {
    /// Classify an open failure
    pub fn connection_kind(&self) -> Option<ConnectionErrorKind> {
        match self {
            Self::NotFound { .. } => Some(ConnectionErrorKind::NotFound),
            Self::PermissionDenied { .. } => Some(ConnectionErrorKind::PermissionDenied),
            Self::Other { .. } | Self::InvalidConfig(_) => Some(ConnectionErrorKind::Other),
            _ => None,
        }
    }

    /// Whether another open attempt could succeed
    ///
    /// Only a missing port or an unclassified open failure qualifies; a
    /// bad configuration or a busy port fails the same way every time.
    pub fn is_transient_open_failure(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Other { .. })
    }

    /// Build an open error from a serialport failure
    pub fn from_open(port: &str, err: serialport::Error) -> Self {
        let port = port.to_string();
        let description = err.description.to_lowercase();

        match err.kind {
            serialport::ErrorKind::NoDevice => Self::NotFound { port },
            serialport::ErrorKind::Io(io::ErrorKind::NotFound) => Self::NotFound { port },
            serialport::ErrorKind::Io(io::ErrorKind::PermissionDenied) => {
                Self::PermissionDenied { port }
            }
            // Windows reports a busy port as an opaque "Access is denied"
            _ if description.contains("access is denied")
                || description.contains("permission denied") =>
            {
                Self::PermissionDenied { port }
            }
            _ if description.contains("not found") || description.contains("no such file") => {
                Self::NotFound { port }
            }
            _ => Self::Other {
                port,
                reason: err.description,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serial_err(kind: serialport::ErrorKind, description: &str) -> serialport::Error {
        serialport::Error::new(kind, description)
    }

    #[test]
    fn test_classify_not_found() {
        let err = Error::from_open("COM9", serial_err(serialport::ErrorKind::NoDevice, "gone"));
        assert_eq!(err.connection_kind(), Some(ConnectionErrorKind::NotFound));

        let err = Error::from_open(
            "/dev/ttyUSB7",
            serial_err(serialport::ErrorKind::Io(io::ErrorKind::NotFound), "No such file or directory"),
        );
        assert_eq!(err.connection_kind(), Some(ConnectionErrorKind::NotFound));
    }

    #[test]
    fn test_classify_permission() {
        let err = Error::from_open(
            "/dev/ttyUSB0",
            serial_err(serialport::ErrorKind::Io(io::ErrorKind::PermissionDenied), "denied"),
        );
        assert_eq!(err.connection_kind(), Some(ConnectionErrorKind::PermissionDenied));

        let err = Error::from_open(
            "COM3",
            serial_err(serialport::ErrorKind::Unknown, "Access is denied."),
        );
        assert_eq!(err.connection_kind(), Some(ConnectionErrorKind::PermissionDenied));
    }

    #[test]
    fn test_classify_other() {
        let err = Error::from_open(
            "COM3",
            serial_err(serialport::ErrorKind::InvalidInput, "baud rate not supported"),
        );
        assert_eq!(err.connection_kind(), Some(ConnectionErrorKind::Other));
        assert!(err.to_string().contains("baud rate not supported"));
    }

    #[test]
    fn test_non_connection_errors() {
        assert_eq!(Error::NotConnected.connection_kind(), None);
        assert_eq!(Error::WriteTimeout.connection_kind(), None);
        assert_eq!(Error::AlreadyConnected.connection_kind(), None);
    }

    #[test]
    fn test_invalid_config_is_open_failure() {
        let err = Error::InvalidConfig("baud rate must be non-zero".into());
        assert_eq!(err.connection_kind(), Some(ConnectionErrorKind::Other));
        assert!(!err.is_transient_open_failure());
    }

    #[test]
    fn test_transient_open_failures() {
        let port = || "COM3".to_string();
        assert!(Error::NotFound { port: port() }.is_transient_open_failure());
        assert!(Error::Other { port: port(), reason: "busy".into() }.is_transient_open_failure());
        assert!(!Error::PermissionDenied { port: port() }.is_transient_open_failure());
        assert!(!Error::AlreadyConnected.is_transient_open_failure());
        assert!(!Error::NotConnected.is_transient_open_failure());
    }
}
