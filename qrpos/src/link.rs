//! Connection lifecycle over the serial channel

use std::time::Duration;

use tracing::{debug, info, warn};

use qrpos_transport::{
    ConnectionErrorKind, LinkConfig, SerialTransport, Transport,
    config::{DEFAULT_SETTLE_DELAY, DEFAULT_TIMEOUT},
};

use crate::error::{Error, Result};

/// Open channel to the device
///
/// Owns its transport exclusively: one exchange at a time, `&mut self`
/// everywhere. States: disconnected → connected → disconnected.
pub struct Link {
    transport: Box<dyn Transport>,
    settle_delay: Duration,
    read_timeout: Duration,
}

impl Link {
    /// Serial link with the given parameters
    pub fn serial(config: LinkConfig) -> Self {
        let settle_delay = config.settle_delay;
        let read_timeout = config.read_timeout;

        Self {
            transport: Box::new(SerialTransport::new(config)),
            settle_delay,
            read_timeout,
        }
    }

    /// Link over any transport
    pub fn with_transport(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Box::new(transport),
            settle_delay: DEFAULT_SETTLE_DELAY,
            read_timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the post-open stabilization delay
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Set the single-line read timeout
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    pub fn port_name(&self) -> String {
        self.transport.port_name()
    }

    /// Check if open
    pub fn is_open(&self) -> bool {
        self.transport.is_connected()
    }

    /// Open the channel and wait for the device to settle
    ///
    /// # Errors
    ///
    /// Returns a transport error whose `connection_kind()` tells a missing
    /// port from one held by another process.
    ///
    /// Opening an open link does nothing.
    pub async fn open(&mut self) -> Result<()> {
        if self.is_open() {
            debug!("{} already open", self.transport.port_name());
            return Ok(());
        }

        info!("Connecting to {}...", self.transport.port_name());

        self.transport.connect().await?;

        // The board reboots on open and drops early bytes
        tokio::time::sleep(self.settle_delay).await;

        info!("Connected to {}", self.transport.port_name());
        Ok(())
    }

    /// Open, retrying failed attempts
    ///
    /// Only a missing port or an unclassified open failure is retried; a
    /// busy port or a bad configuration is reported immediately.
    pub async fn open_with_retry(&mut self, attempts: u32, delay: Duration) -> Result<()> {
        let attempts = attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.open().await {
                Ok(()) => return Ok(()),
                Err(Error::Transport(e)) if attempt < attempts && e.is_transient_open_failure() => {
                    warn!(
                        "Connection attempt {}/{} to {} failed: {}",
                        attempt,
                        attempts,
                        self.transport.port_name(),
                        e
                    );
                    attempt += 1;
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    if let Error::Transport(inner) = &e {
                        if inner.connection_kind() == Some(ConnectionErrorKind::PermissionDenied) {
                            warn!("Close other applications using the port or run with sufficient privileges");
                        }
                    }
                    return Err(e);
                }
            }
        }
    }

    /// Close the channel
    ///
    /// Idempotent; failures are logged, never returned.
    pub async fn close(&mut self) {
        if !self.is_open() {
            return;
        }

        if let Err(e) = self.transport.disconnect().await {
            warn!("Error closing {}: {}", self.transport.port_name(), e);
        } else {
            info!("Serial connection closed");
        }
    }

    /// Transport of an open link
    pub(crate) fn transport_mut(&mut self) -> Result<&mut (dyn Transport + 'static)> {
        if !self.is_open() {
            return Err(Error::NotConnected);
        }
        Ok(self.transport.as_mut())
    }
}
