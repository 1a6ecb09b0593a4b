//! Transport layer for QR payment terminals
//!
//! Provides the byte channel to the device: a line-oriented serial port.

pub mod config;
pub mod error;
pub mod serial;

pub use config::LinkConfig;
pub use error::{ConnectionErrorKind, Error, Result};
pub use serial::{SerialTransport, list_ports, probe_port};

use std::time::Duration;

use async_trait::async_trait;

/// Transport trait for different communication methods
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open the channel
    async fn connect(&mut self) -> Result<()>;

    /// Close the channel; closing a closed channel is a no-op
    async fn disconnect(&mut self) -> Result<()>;

    /// Check if connected
    fn is_connected(&self) -> bool;

    /// Write raw bytes and flush
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Read one line, waiting at most `timeout`
    ///
    /// Returns the line without its terminator, or `None` if no complete
    /// line arrived in time. Partial input stays buffered for the next read.
    async fn read_line(&mut self, timeout: Duration) -> Result<Option<String>>;

    /// Drop any buffered input
    async fn discard_input(&mut self) -> Result<()>;

    /// Get port name
    fn port_name(&self) -> String;
}
