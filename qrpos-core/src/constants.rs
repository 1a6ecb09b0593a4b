//! Protocol constants

use std::time::Duration;

/// Default chunk size for image transfers (bytes)
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Lowest device slot
pub const MIN_SLOT: u32 = 1;

/// Highest device slot
pub const MAX_SLOT: u32 = 99;

/// Extension given to every stored image
pub const IMAGE_EXTENSION: &str = "jpeg";

/// Reads allowed while waiting for a chunk acknowledgment
pub const ACK_ATTEMPTS: u32 = 50;

/// Reads allowed while accumulating a multi-line response
pub const SENTINEL_ATTEMPTS: u32 = 100;

/// Spacing between polled reads
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Substring the device sends when it enters receive mode
pub const START_MARKER: &str = "start";

/// Substring the device sends after storing a chunk
pub const ACK_MARKER: &str = "ok";

/// Command verbs
pub mod verbs {
    pub const SENDING: &str = "sending";
    pub const DELETE: &str = "delete";
    pub const CLEAR: &str = "clear";
    pub const FREE_SIZE: &str = "freeSize";
    pub const FILE_INFO: &str = "fileinfo";
    pub const SET_TIMER: &str = "settimer";
    pub const START_ROTATION: &str = "startrotation";
    pub const STOP_ROTATION: &str = "stoprotation";
}

/// Display screen verbs
pub mod screens {
    pub const WELCOME: &str = "WelcomeScreen";
    pub const TOTAL: &str = "DisplayTotalScreen";
    pub const QR_CODE: &str = "DisplayQRCodeScreen";
    pub const SUCCESS: &str = "DisplaySuccessQRCodeScreen";
    pub const FAIL: &str = "DisplayFailQRCodeScreen";
    pub const CANCEL: &str = "DisplayCancelQRCodeScreen";
}
