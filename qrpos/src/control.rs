//! Device management commands

use tracing::{debug, info, warn};

use qrpos_core::response::parse_free_size;
use qrpos_core::{Command, Response, ResponseMode, Screen, SlotId};

use crate::error::{Error, Result};
use crate::exchange::Exchange;

/// Slot management, rotation and screen commands
///
/// Delete, clear and the rotation commands are fire-and-forget: once the
/// preconditions hold, an I/O failure is logged and reported as `Ok(false)`
/// rather than escalated.
pub struct DeviceControl<'a> {
    exchange: &'a mut Exchange,
}

impl<'a> DeviceControl<'a> {
    pub fn new(exchange: &'a mut Exchange) -> Self {
        Self { exchange }
    }

    /// Delete the image in `slot`
    ///
    /// # Errors
    ///
    /// `SlotOutOfRange` or `NotConnected`; nothing is written in either case.
    pub async fn delete(&mut self, slot: u32) -> Result<bool> {
        let slot = SlotId::new(slot)?;
        self.fire_and_forget(Command::Delete(slot)).await
    }

    /// Clear the image in `slot`
    pub async fn clear(&mut self, slot: u32) -> Result<bool> {
        let slot = SlotId::new(slot)?;
        self.fire_and_forget(Command::Clear(slot)).await
    }

    /// Free storage reported by the device
    ///
    /// `None` if the link is closed, the exchange fails, or the reply holds
    /// no figure before `exit`.
    pub async fn free_size(&mut self) -> Option<u32> {
        let response = match self.send(Command::FreeSize).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Failed to query free memory: {}", e);
                return None;
            }
        };

        let free = parse_free_size(response.text());
        if free.is_none() {
            debug!("No free memory figure in {:?}", response.text());
        }
        free
    }

    /// Raw file listing
    pub async fn file_info(&mut self) -> Result<String> {
        let response = self.send(Command::FileInfo).await?;
        Ok(response.text().to_string())
    }

    /// Set the rotation interval; the reply is read and dropped
    pub async fn set_timer(&mut self, seconds: u32) -> Result<()> {
        self.send(Command::SetTimer(seconds)).await?;
        info!("Rotation timer set to {}s", seconds);
        Ok(())
    }

    pub async fn start_rotation(&mut self) -> Result<bool> {
        self.fire_and_forget(Command::StartRotation).await
    }

    pub async fn stop_rotation(&mut self) -> Result<bool> {
        self.fire_and_forget(Command::StopRotation).await
    }

    /// Switch the display to a payment screen
    pub async fn show_screen(&mut self, screen: Screen) -> Result<Response> {
        self.send(Command::Screen(screen)).await
    }

    async fn send(&mut self, command: Command) -> Result<Response> {
        self.ensure_open()?;
        self.exchange.send(&command, command.response_mode()).await
    }

    async fn fire_and_forget(&mut self, command: Command) -> Result<bool> {
        self.ensure_open()?;

        match self.exchange.send(&command, command.response_mode()).await {
            Ok(_) => {
                debug!("{} sent", command);
                Ok(true)
            }
            Err(e) => {
                warn!("Failed to send {}: {}", command, e);
                Ok(false)
            }
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if !self.exchange.link().is_open() {
            return Err(Error::NotConnected);
        }
        Ok(())
    }
}
