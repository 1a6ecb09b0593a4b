//! High-level terminal interface

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use qrpos_core::constants::{DEFAULT_CHUNK_SIZE, MAX_SLOT};
use qrpos_core::{Response, Screen, SlotId};
use qrpos_transport::{LinkConfig, Transport};
use qrpos_types::{BatchEntry, BatchReport, ImageAsset, ImageLimits, TransferReport};

use crate::batch::image_files;
use crate::control::DeviceControl;
use crate::error::Result;
use crate::exchange::Exchange;
use crate::link::Link;
use crate::upload::{UploadEngine, UploadOptions};

/// Default number of connection attempts
pub const DEFAULT_CONNECT_ATTEMPTS: u32 = 3;

/// Default pause between connection attempts
pub const DEFAULT_CONNECT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Terminal that several tasks can drive, one exchange at a time
pub type SharedTerminal = Arc<tokio::sync::Mutex<Terminal>>;

/// Terminal settings
#[derive(Debug, Clone, PartialEq)]
pub struct TerminalConfig {
    pub link: LinkConfig,
    pub chunk_size: usize,
    pub connect_attempts: u32,
    pub connect_retry_delay: Duration,
    pub limits: ImageLimits,
}

impl TerminalConfig {
    pub fn new(port: impl Into<String>) -> Self {
        Self::with_link(LinkConfig::new(port))
    }

    pub fn with_link(link: LinkConfig) -> Self {
        Self {
            link,
            chunk_size: DEFAULT_CHUNK_SIZE,
            connect_attempts: DEFAULT_CONNECT_ATTEMPTS,
            connect_retry_delay: DEFAULT_CONNECT_RETRY_DELAY,
            limits: ImageLimits::DISPLAY,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Set connection attempts and the pause between them
    pub fn with_connect_retry(mut self, attempts: u32, delay: Duration) -> Self {
        self.connect_attempts = attempts;
        self.connect_retry_delay = delay;
        self
    }

    pub fn with_limits(mut self, limits: ImageLimits) -> Self {
        self.limits = limits;
        self
    }
}

/// QR payment display terminal
///
/// Owns the link to one device and exposes the whole command set.
///
/// # Examples
///
/// ```no_run
/// use qrpos::{Terminal, TerminalConfig};
///
/// #[tokio::main]
/// async fn main() -> qrpos::Result<()> {
///     let mut terminal = Terminal::new(TerminalConfig::new("/dev/ttyUSB0"));
///
///     terminal.connect().await?;
///
///     let report = terminal.upload("payment_qr.jpg", 1).await?;
///     println!("Stored {}", report);
///
///     if let Some(free) = terminal.free_size().await {
///         println!("Free memory: {} KB", free);
///     }
///
///     terminal.disconnect().await;
///     Ok(())
/// }
/// ```
pub struct Terminal {
    exchange: Exchange,
    config: TerminalConfig,
}

impl Terminal {
    /// Terminal on a serial port
    pub fn new(config: TerminalConfig) -> Self {
        let link = Link::serial(config.link.clone());
        Self {
            exchange: Exchange::new(link),
            config,
        }
    }

    /// Terminal over any transport, timed by `config.link`
    pub fn with_transport(transport: impl Transport + 'static, config: TerminalConfig) -> Self {
        let link = Link::with_transport(transport)
            .with_settle_delay(config.link.settle_delay)
            .with_read_timeout(config.link.read_timeout);

        Self {
            exchange: Exchange::new(link),
            config,
        }
    }

    pub fn config(&self) -> &TerminalConfig {
        &self.config
    }

    /// Check if connected
    pub fn is_connected(&self) -> bool {
        self.exchange.link().is_open()
    }

    /// Connect, retrying per the configuration
    ///
    /// # Errors
    ///
    /// Returns the last connection error; a port held by another process
    /// fails on the first attempt.
    pub async fn connect(&mut self) -> Result<()> {
        let attempts = self.config.connect_attempts;
        let delay = self.config.connect_retry_delay;

        self.exchange.link_mut().open_with_retry(attempts, delay).await
    }

    /// Disconnect; safe to call at any time
    pub async fn disconnect(&mut self) {
        self.exchange.link_mut().close().await;
    }

    /// Default options for this terminal
    pub fn upload_options(&self) -> UploadOptions {
        UploadOptions::new()
            .with_chunk_size(self.config.chunk_size)
            .with_limits(self.config.limits)
    }

    /// Upload the image at `path` into `slot`
    pub async fn upload(&mut self, path: impl AsRef<Path>, slot: u32) -> Result<TransferReport> {
        let options = self.upload_options();
        self.upload_with(path, slot, options).await
    }

    /// Upload with explicit options (progress, cancellation, chunk size)
    pub async fn upload_with(
        &mut self,
        path: impl AsRef<Path>,
        slot: u32,
        options: UploadOptions,
    ) -> Result<TransferReport> {
        self.uploader(options).upload(path, slot).await
    }

    /// Upload an image already held in memory
    pub async fn upload_asset(&mut self, asset: &ImageAsset, slot: u32) -> Result<TransferReport> {
        let slot = SlotId::new(slot)?;
        let options = self.upload_options();
        self.uploader(options).upload_asset(asset, slot).await
    }

    /// Upload files into slots 1, 2, ... in order
    ///
    /// A failed file does not stop the batch. Files beyond the last slot are
    /// reported as skipped.
    pub async fn upload_batch<I, P>(&mut self, paths: I) -> BatchReport
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut report = BatchReport::default();

        if let Some(free) = self.free_size().await {
            info!("Device free memory: {} KB", free);
        }

        for (index, path) in paths.into_iter().enumerate() {
            let path = path.as_ref().to_path_buf();
            let slot = index as u32 + 1;

            if slot > MAX_SLOT {
                warn!("Skipping {}: all {} slots used", path.display(), MAX_SLOT);
                report.skipped.push(path);
                continue;
            }

            info!("Uploading {}/{}: {}", slot, MAX_SLOT, path.display());
            let outcome = self.upload(&path, slot).await.map_err(|e| {
                warn!("Failed to upload {}: {}", path.display(), e);
                e.to_string()
            });

            report.entries.push(BatchEntry { path, slot, outcome });
        }

        info!("Batch upload finished: {}", report);
        report
    }

    /// Upload every image found directly inside `dir`
    pub async fn upload_dir(&mut self, dir: impl AsRef<Path>) -> Result<BatchReport> {
        let files = image_files(dir)?;
        info!("Found {} image files", files.len());
        Ok(self.upload_batch(files).await)
    }

    /// Upload a payment QR and hold it on screen
    ///
    /// Rotation is stopped after the upload so the code stays visible until
    /// `resume_rotation`.
    pub async fn present_payment_qr(
        &mut self,
        path: impl AsRef<Path>,
        slot: u32,
    ) -> Result<TransferReport> {
        let report = self.upload(path, slot).await?;

        if !self.stop_rotation().await? {
            warn!("QR uploaded but rotation may still be running");
        }

        Ok(report)
    }

    /// Restart the slideshow after a payment
    pub async fn resume_rotation(&mut self) -> Result<bool> {
        self.start_rotation().await
    }

    pub async fn delete(&mut self, slot: u32) -> Result<bool> {
        self.control().delete(slot).await
    }

    pub async fn clear(&mut self, slot: u32) -> Result<bool> {
        self.control().clear(slot).await
    }

    pub async fn free_size(&mut self) -> Option<u32> {
        self.control().free_size().await
    }

    pub async fn file_info(&mut self) -> Result<String> {
        self.control().file_info().await
    }

    pub async fn set_timer(&mut self, seconds: u32) -> Result<()> {
        self.control().set_timer(seconds).await
    }

    pub async fn start_rotation(&mut self) -> Result<bool> {
        self.control().start_rotation().await
    }

    pub async fn stop_rotation(&mut self) -> Result<bool> {
        self.control().stop_rotation().await
    }

    pub async fn show_screen(&mut self, screen: Screen) -> Result<Response> {
        self.control().show_screen(screen).await
    }

    /// Device control surface over this terminal's link
    pub fn control(&mut self) -> DeviceControl<'_> {
        DeviceControl::new(&mut self.exchange)
    }

    /// Upload engine over this terminal's link
    pub fn uploader(&mut self, options: UploadOptions) -> UploadEngine<'_> {
        UploadEngine::new(&mut self.exchange, options)
    }

    /// Raw command exchange
    pub fn exchange(&mut self) -> &mut Exchange {
        &mut self.exchange
    }

    pub fn into_shared(self) -> SharedTerminal {
        Arc::new(tokio::sync::Mutex::new(self))
    }
}
