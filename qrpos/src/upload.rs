//! Chunked image upload
//!
//! One call runs one `TransferSession`:
//!
//! ```text
//! Idle --sending**N.jpeg**size**chunk--> HandshakeSent --> Transferring(0)
//!   Transferring(i) --chunk i, "ok"--> Transferring(i + 1) ... --> Done
//! ```
//!
//! A missing `start` or a missing ack fails the session. Nothing is rolled
//! back on the device; the caller retries the whole upload.

use std::fmt;
use std::path::Path;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use qrpos_core::constants::DEFAULT_CHUNK_SIZE;
use qrpos_core::response::is_ack;
use qrpos_core::{
    Command, FailureReason, ResponseMode, RetryPolicy, SlotId, TransferSession, TransferState,
};
use qrpos_types::{ImageAsset, ImageLimits, TransferReport};

use crate::error::{Error, Result};
use crate::exchange::Exchange;

/// Progress callback: `(chunks_done, total_chunks)`
pub type ProgressFn = Box<dyn FnMut(usize, usize) + Send>;

/// Per-upload settings
pub struct UploadOptions {
    pub chunk_size: usize,
    pub limits: ImageLimits,
    pub cancel: CancellationToken,
    progress: Option<ProgressFn>,
}

impl UploadOptions {
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            limits: ImageLimits::default(),
            cancel: CancellationToken::new(),
            progress: None,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_limits(mut self, limits: ImageLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Abort the upload when `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Call `progress` after every acknowledged chunk
    pub fn on_progress(mut self, progress: impl FnMut(usize, usize) + Send + 'static) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for UploadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadOptions")
            .field("chunk_size", &self.chunk_size)
            .field("limits", &self.limits)
            .field("cancelled", &self.cancel.is_cancelled())
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

/// Drives chunked uploads over a borrowed exchange
pub struct UploadEngine<'a> {
    exchange: &'a mut Exchange,
    options: UploadOptions,
    session: Option<TransferSession>,
}

impl<'a> UploadEngine<'a> {
    pub fn new(exchange: &'a mut Exchange, options: UploadOptions) -> Self {
        Self {
            exchange,
            options,
            session: None,
        }
    }

    /// Validate the image at `path` and store it in `slot`
    ///
    /// # Errors
    ///
    /// In order: `SlotOutOfRange`, then a validation error, then
    /// `NotConnected`; none of these write anything. After that,
    /// `NoStartConfirmation`, `NoAckForChunk`, `Cancelled`, or a transport
    /// error.
    pub async fn upload(&mut self, path: impl AsRef<Path>, slot: u32) -> Result<TransferReport> {
        let slot = SlotId::new(slot)?;
        let asset = ImageAsset::from_path_with_limits(path, &self.options.limits)?;

        self.upload_asset(&asset, slot).await
    }

    /// Store an already validated image in `slot`
    pub async fn upload_asset(&mut self, asset: &ImageAsset, slot: SlotId) -> Result<TransferReport> {
        let mut session = TransferSession::new(slot, asset.len(), self.options.chunk_size)?;

        if !self.exchange.link().is_open() {
            return Err(Error::NotConnected);
        }

        let result = self.transfer(&mut session, asset).await;

        if let Err(e) = &result {
            if !session.state().is_terminal() {
                session.fail(failure_reason(e))?;
            }
        }

        self.session = Some(session);
        result
    }

    /// Session of the most recent upload attempt
    pub fn last_session(&self) -> Option<&TransferSession> {
        self.session.as_ref()
    }

    async fn transfer(
        &mut self,
        session: &mut TransferSession,
        asset: &ImageAsset,
    ) -> Result<TransferReport> {
        let cancel = self.options.cancel.clone();
        let filename = session.slot().filename();
        let total = session.total_chunks();

        info!(
            "Uploading {} as {} ({} bytes, {} chunks of {})",
            asset,
            filename,
            session.size(),
            total,
            session.chunk_size()
        );

        let handshake = Command::Sending {
            slot: session.slot(),
            size: session.size(),
            chunk_size: session.chunk_size(),
        };
        let reply = self
            .exchange
            .send_cancellable(&handshake, ResponseMode::Accumulated, &cancel)
            .await?;

        if !reply.confirms_start() {
            warn!("Device did not confirm transfer start: {:?}", reply.text());
            return Err(qrpos_core::Error::NoStartConfirmation.into());
        }

        session.handshake_confirmed()?;
        session.begin()?;

        while let TransferState::Transferring(index) = session.state() {
            if cancel.is_cancelled() {
                return Err(qrpos_core::Error::Cancelled.into());
            }

            let Some(range) = session.chunk_range(index) else {
                break;
            };
            let chunk = asset.data().slice(range);

            self.exchange.discard_input().await;
            self.exchange.write_raw(&chunk).await?;
            debug!("Sent chunk {}/{} ({} bytes)", index + 1, total, chunk.len());

            let ack = self
                .exchange
                .await_line(is_ack, RetryPolicy::ACK, &cancel)
                .await?;

            if ack.is_none() {
                warn!("No acknowledgment for chunk {}", index);
                return Err(qrpos_core::Error::NoAckForChunk { index }.into());
            }

            session.chunk_acked()?;
            if let Some(progress) = self.options.progress.as_mut() {
                progress(index + 1, total);
            }
        }

        info!("Upload of {} completed", filename);

        Ok(TransferReport {
            filename,
            bytes: session.size(),
            chunks: total,
            chunk_size: session.chunk_size(),
            completed_at: Utc::now(),
        })
    }
}

fn failure_reason(error: &Error) -> FailureReason {
    match error.protocol() {
        Some(qrpos_core::Error::NoStartConfirmation) => FailureReason::NoStartConfirmation,
        Some(qrpos_core::Error::NoAckForChunk { index }) => FailureReason::NoAckForChunk(*index),
        Some(qrpos_core::Error::Cancelled) => FailureReason::Cancelled,
        _ => FailureReason::LinkFailure,
    }
}
