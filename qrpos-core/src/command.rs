//! Terminal command vocabulary
//!
//! Every command is a single text line: a verb followed by `**`-delimited
//! fields, terminated by `\n`. Chunk payloads are the only frames that are
//! not commands; they are written raw.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::constants::{screens, verbs};
use crate::response::ResponseMode;
use crate::slot::SlotId;
use crate::{DELIMITER, TERMINATOR};

/// Outbound command frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Open an image transfer into a slot
    Sending {
        slot: SlotId,
        size: usize,
        chunk_size: usize,
    },

    /// Delete the image stored in a slot
    Delete(SlotId),

    /// Clear the image stored in a slot
    Clear(SlotId),

    /// Query free storage
    FreeSize,

    /// List stored files
    FileInfo,

    /// Set the rotation interval in seconds
    SetTimer(u32),

    /// Start the slideshow
    StartRotation,

    /// Stop the slideshow
    StopRotation,

    /// Switch the display to a payment screen
    Screen(Screen),
}

impl Command {
    /// Command verb as sent on the wire
    pub fn verb(&self) -> &str {
        match self {
            Self::Sending { .. } => verbs::SENDING,
            Self::Delete(_) => verbs::DELETE,
            Self::Clear(_) => verbs::CLEAR,
            Self::FreeSize => verbs::FREE_SIZE,
            Self::FileInfo => verbs::FILE_INFO,
            Self::SetTimer(_) => verbs::SET_TIMER,
            Self::StartRotation => verbs::START_ROTATION,
            Self::StopRotation => verbs::STOP_ROTATION,
            Self::Screen(screen) => screen.kind.verb(),
        }
    }

    /// Response discipline the device uses for this command
    pub fn response_mode(&self) -> ResponseMode {
        match self {
            Self::StartRotation | Self::StopRotation | Self::Screen(_) => ResponseMode::Immediate,
            _ => ResponseMode::Accumulated,
        }
    }

    /// Frame text without the terminator
    ///
    /// # Examples
    ///
    /// ```
    /// use qrpos_core::{Command, SlotId};
    ///
    /// let slot = SlotId::new(3).unwrap();
    /// assert_eq!(Command::Delete(slot).text(), "delete**3.jpeg**");
    /// assert_eq!(Command::SetTimer(10).text(), "settimer**10");
    /// ```
    pub fn text(&self) -> String {
        match self {
            Self::Sending {
                slot,
                size,
                chunk_size,
            } => join(self.verb(), &[slot.filename(), size.to_string(), chunk_size.to_string()]),
            // The firmware expects a trailing delimiter on slot commands
            Self::Delete(slot) | Self::Clear(slot) => {
                format!("{}{}", join(self.verb(), &[slot.filename()]), DELIMITER)
            }
            Self::SetTimer(seconds) => join(self.verb(), &[seconds.to_string()]),
            Self::FreeSize | Self::FileInfo | Self::StartRotation | Self::StopRotation => {
                self.verb().to_string()
            }
            Self::Screen(screen) => join(self.verb(), &screen.fields),
        }
    }

    /// Encode command to wire bytes (text plus newline)
    pub fn encode(&self) -> Bytes {
        let text = self.text();
        let mut buf = BytesMut::with_capacity(text.len() + 1);
        buf.put_slice(text.as_bytes());
        buf.put_u8(TERMINATOR);
        buf.freeze()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

fn join(verb: &str, fields: &[String]) -> String {
    let mut text = String::from(verb);
    for field in fields {
        text.push_str(DELIMITER);
        text.push_str(field);
    }
    text
}

/// Payment screens the terminal can show
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ScreenKind {
    Welcome,
    Total,
    QrCode,
    Success,
    Fail,
    Cancel,
}

impl ScreenKind {
    pub fn verb(self) -> &'static str {
        match self {
            Self::Welcome => screens::WELCOME,
            Self::Total => screens::TOTAL,
            Self::QrCode => screens::QR_CODE,
            Self::Success => screens::SUCCESS,
            Self::Fail => screens::FAIL,
            Self::Cancel => screens::CANCEL,
        }
    }
}

/// Screen command with its positional fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    pub kind: ScreenKind,
    pub fields: Vec<String>,
}

impl Screen {
    /// Build a screen from raw positional fields
    ///
    /// Delimiters and line breaks inside a field would split the frame, so
    /// they are stripped.
    pub fn new<I, S>(kind: ScreenKind, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields = fields
            .into_iter()
            .map(|field| {
                field
                    .into()
                    .replace(DELIMITER, "")
                    .replace(['\r', '\n'], "")
            })
            .collect();

        Self { kind, fields }
    }

    /// Idle screen showing the merchant name
    pub fn welcome(merchant: impl Into<String>) -> Self {
        Self::new(ScreenKind::Welcome, [merchant.into()])
    }

    /// Invoice totals screen; fields are shown in the given order
    pub fn total<I, S>(amounts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(ScreenKind::Total, amounts)
    }

    /// Dynamic QR screen: payment URI, amount, payee account
    pub fn qr_code(
        payment_uri: impl Into<String>,
        amount: impl Into<String>,
        payee: impl Into<String>,
    ) -> Self {
        Self::new(
            ScreenKind::QrCode,
            [payment_uri.into(), amount.into(), payee.into()],
        )
    }

    /// Payment outcome screen: reference, order id, date
    pub fn outcome(
        kind: ScreenKind,
        reference: impl Into<String>,
        order_id: impl Into<String>,
        date: impl Into<String>,
    ) -> Self {
        Self::new(kind, [reference.into(), order_id.into(), date.into()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn slot(n: u32) -> SlotId {
        SlotId::new(n).unwrap()
    }

    #[test]
    fn test_sending_frame() {
        let cmd = Command::Sending {
            slot: slot(1),
            size: 5000,
            chunk_size: 1024,
        };
        assert_eq!(cmd.text(), "sending**1.jpeg**5000**1024");
        assert_eq!(cmd.encode().as_ref(), b"sending**1.jpeg**5000**1024\n");
    }

    #[test]
    fn test_slot_commands_have_trailing_delimiter() {
        assert_eq!(Command::Delete(slot(9)).text(), "delete**9.jpeg**");
        assert_eq!(Command::Clear(slot(99)).text(), "clear**99.jpeg**");
    }

    #[test]
    fn test_bare_commands() {
        assert_eq!(Command::FreeSize.text(), "freeSize");
        assert_eq!(Command::FileInfo.text(), "fileinfo");
        assert_eq!(Command::StartRotation.text(), "startrotation");
        assert_eq!(Command::StopRotation.text(), "stoprotation");
        assert_eq!(Command::SetTimer(30).text(), "settimer**30");
    }

    #[test]
    fn test_response_modes() {
        assert_eq!(Command::StartRotation.response_mode(), ResponseMode::Immediate);
        assert_eq!(Command::StopRotation.response_mode(), ResponseMode::Immediate);
        assert_eq!(Command::FreeSize.response_mode(), ResponseMode::Accumulated);
        assert_eq!(Command::Delete(slot(1)).response_mode(), ResponseMode::Accumulated);
        assert_eq!(
            Command::Screen(Screen::welcome("shop")).response_mode(),
            ResponseMode::Immediate
        );
    }

    #[test]
    fn test_screen_frames() {
        let welcome = Command::Screen(Screen::welcome("bonrix"));
        assert_eq!(welcome.text(), "WelcomeScreen**bonrix");

        let total = Command::Screen(Screen::total(["2390.32", "50", "50", "2390.32"]));
        assert_eq!(total.text(), "DisplayTotalScreen**2390.32**50**50**2390.32");

        let success = Command::Screen(Screen::outcome(
            ScreenKind::Success,
            "1234567890",
            "ORD10594565",
            "29-03-2023",
        ));
        assert_eq!(
            success.text(),
            "DisplaySuccessQRCodeScreen**1234567890**ORD10594565**29-03-2023"
        );
    }

    #[test]
    fn test_screen_fields_are_sanitized() {
        let screen = Screen::welcome("evil**name\n");
        assert_eq!(screen.fields, vec!["evilname".to_string()]);
    }
}
