//! # qrpos
//!
//! Driver for serial-attached QR payment display terminals.
//!
//! ## Features
//!
//! - Chunked image upload with per-chunk acknowledgment
//! - Slot management, rotation control and payment screens
//! - Async/await API using Tokio, with cancellable polling
//! - Port discovery and baud rate probing
//!
//! ## Quick Start
//!
//! ```no_run
//! use qrpos::{Terminal, TerminalConfig};
//!
//! #[tokio::main]
//! async fn main() -> qrpos::Result<()> {
//!     // Connect to device
//!     let mut terminal = Terminal::new(TerminalConfig::new("/dev/ttyUSB0"));
//!     terminal.connect().await?;
//!
//!     // Show a payment QR and keep it on screen
//!     terminal.present_payment_qr("payment_qr.jpg", 1).await?;
//!
//!     // Back to the slideshow
//!     terminal.resume_rotation().await?;
//!
//!     terminal.disconnect().await;
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod control;
pub mod error;
pub mod exchange;
pub mod link;
pub mod retry;
pub mod terminal;
pub mod upload;

#[cfg(test)]
mod testing;

// Re-exports
pub use control::DeviceControl;
pub use error::{Error, Result};
pub use exchange::Exchange;
pub use link::Link;
pub use retry::Retry;
pub use terminal::{SharedTerminal, Terminal, TerminalConfig};
pub use upload::{UploadEngine, UploadOptions};

// Re-export protocol and transport types
pub use qrpos_core::{
    Command, FailureReason, Response, ResponseMode, RetryPolicy, Screen, ScreenKind, SlotId,
    TransferState,
};
pub use qrpos_transport::config::PROBE_BAUD_RATES;
pub use qrpos_transport::{LinkConfig, Transport, list_ports, probe_port};
pub use qrpos_types::{BatchReport, ImageAsset, ImageLimits, PortInfo, TransferReport};
pub use tokio_util::sync::CancellationToken;

/// For implementing `Transport` outside this crate
pub use async_trait::async_trait;
