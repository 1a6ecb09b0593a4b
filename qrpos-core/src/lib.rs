//! # qrpos-core
//!
//! Core protocol implementation for QR payment display terminals.
//!
//! This crate provides the low-level protocol primitives:
//! - Command vocabulary and text framing
//! - Response disciplines and response parsing
//! - Slot numbering
//! - Bounded retry policies
//! - Transfer session state machine

pub mod command;
pub mod constants;
pub mod error;
pub mod response;
pub mod retry;
pub mod session;
pub mod slot;

pub use command::{Command, Screen, ScreenKind};
pub use error::{Error, Result};
pub use response::{Response, ResponseMode};
pub use retry::RetryPolicy;
pub use session::{FailureReason, TransferSession, TransferState};
pub use slot::SlotId;

/// Field delimiter inside a command frame
pub const DELIMITER: &str = "**";

/// Frame terminator
pub const TERMINATOR: u8 = b'\n';

/// Line that ends a multi-line response
pub const SENTINEL: &str = "exit";
