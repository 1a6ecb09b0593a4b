//! Response disciplines and response parsing

use std::sync::LazyLock;

use regex::Regex;

use crate::constants::{ACK_MARKER, START_MARKER};
use crate::SENTINEL;

/// How the reply to a command is read
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ResponseMode {
    /// Read one line; the device may not answer at all
    Immediate,

    /// Read lines until the `exit` sentinel or the read budget runs out
    Accumulated,
}

/// Reply read back from the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Nothing arrived before the read timed out
    Empty,

    /// Single line (Immediate mode)
    Line(String),

    /// Multi-line text, each line followed by `\n`
    Accumulated {
        text: String,
        sentinel_seen: bool,
    },
}

impl Response {
    /// Response text ("" for `Empty`)
    pub fn text(&self) -> &str {
        match self {
            Self::Empty => "",
            Self::Line(line) => line,
            Self::Accumulated { text, .. } => text,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text().is_empty()
    }

    /// Whether an accumulated response ended with the sentinel
    pub fn sentinel_seen(&self) -> bool {
        matches!(self, Self::Accumulated { sentinel_seen: true, .. })
    }

    /// Case-insensitive substring test over the whole text
    pub fn contains(&self, needle: &str) -> bool {
        contains_ignore_case(self.text(), needle)
    }

    /// Whether the device confirmed it entered receive mode
    pub fn confirms_start(&self) -> bool {
        self.contains(START_MARKER)
    }
}

/// Case-insensitive substring test
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Whether a line is the end-of-response sentinel
pub fn is_sentinel(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case(SENTINEL)
}

/// Whether a line acknowledges a chunk
pub fn is_ack(line: &str) -> bool {
    contains_ignore_case(line, ACK_MARKER)
}

static FREE_SIZE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*exit").expect("free size pattern is valid"));

/// Extract the free-memory figure from a `freeSize` response
///
/// The figure is the integer immediately preceding the sentinel. Text
/// without such an integer, or one that does not fit in `u32`, yields
/// `None`.
///
/// # Examples
///
/// ```
/// use qrpos_core::response::parse_free_size;
///
/// assert_eq!(parse_free_size("free 12345\nexit\n"), Some(12345));
/// assert_eq!(parse_free_size("FREE 77 EXIT"), Some(77));
/// assert_eq!(parse_free_size("free memory\nexit\n"), None);
/// ```
pub fn parse_free_size(text: &str) -> Option<u32> {
    let lowered = text.to_lowercase();
    FREE_SIZE
        .captures(&lowered)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
