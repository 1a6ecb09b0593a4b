//! Command/response exchange over an open link

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use qrpos_core::response::{contains_ignore_case, is_sentinel};
use qrpos_core::{Command, Response, ResponseMode, RetryPolicy};

use crate::error::{Error, Result};
use crate::link::Link;
use crate::retry::Retry;

/// Writes commands and reads replies under a response discipline
///
/// Owns the `Link`, so exactly one exchange runs at a time.
pub struct Exchange {
    link: Link,
}

impl Exchange {
    pub fn new(link: Link) -> Self {
        Self { link }
    }

    pub fn link(&self) -> &Link {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut Link {
        &mut self.link
    }

    pub fn into_link(self) -> Link {
        self.link
    }

    /// Send a command and read its reply
    ///
    /// `Immediate` reads one line within the link read timeout; silence is
    /// `Response::Empty`. `Accumulated` reads until the `exit` sentinel or
    /// the `RetryPolicy::SENTINEL` budget runs out, and returns whatever
    /// arrived either way.
    pub async fn send(&mut self, command: &Command, mode: ResponseMode) -> Result<Response> {
        self.send_cancellable(command, mode, &CancellationToken::new())
            .await
    }

    /// `send`, aborting with `Cancelled` when `cancel` fires
    pub async fn send_cancellable(
        &mut self,
        command: &Command,
        mode: ResponseMode,
        cancel: &CancellationToken,
    ) -> Result<Response> {
        debug!("Sending command: {}", command);
        self.write_raw(&command.encode()).await?;

        let response = match mode {
            ResponseMode::Immediate => self.read_immediate(cancel).await?,
            ResponseMode::Accumulated => self.read_accumulated(cancel).await?,
        };

        debug!("Response to {}: {:?}", command.verb(), response.text());
        Ok(response)
    }

    /// Write raw bytes and flush
    pub async fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        self.link.transport_mut()?.send(data).await?;
        Ok(())
    }

    /// Drop stale input; failures are logged, not returned
    pub async fn discard_input(&mut self) {
        let result = match self.link.transport_mut() {
            Ok(transport) => transport.discard_input().await.map_err(Error::from),
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            warn!("Failed to clear input buffer: {}", e);
        }
    }

    /// Poll for a line containing `needle` (case-insensitive)
    pub async fn await_line_containing(
        &mut self,
        needle: &str,
        policy: RetryPolicy,
        cancel: &CancellationToken,
    ) -> Result<Option<String>> {
        self.await_line(|line| contains_ignore_case(line, needle), policy, cancel)
            .await
    }

    /// Poll for a line accepted by `matches`
    ///
    /// Each attempt reads for at most one policy interval. Returns `None`
    /// once the policy is exhausted.
    pub async fn await_line(
        &mut self,
        matches: impl Fn(&str) -> bool,
        policy: RetryPolicy,
        cancel: &CancellationToken,
    ) -> Result<Option<String>> {
        let mut retry = Retry::new(policy, cancel.clone());

        while retry.next().await? {
            if let Some(line) = self.read_line(policy.interval, cancel).await? {
                trace!("Poll {}/{}: {:?}", retry.attempts(), policy.attempts, line);
                if matches(&line) {
                    return Ok(Some(line));
                }
            }
        }

        Ok(None)
    }

    async fn read_immediate(&mut self, cancel: &CancellationToken) -> Result<Response> {
        let timeout = self.link.read_timeout();

        Ok(match self.read_line(timeout, cancel).await? {
            Some(line) if !line.trim().is_empty() => Response::Line(line.trim().to_string()),
            _ => Response::Empty,
        })
    }

    async fn read_accumulated(&mut self, cancel: &CancellationToken) -> Result<Response> {
        let policy = RetryPolicy::SENTINEL;
        let mut retry = Retry::new(policy, cancel.clone());
        let mut text = String::new();

        while retry.next().await? {
            let Some(line) = self.read_line(policy.interval, cancel).await? else {
                continue;
            };

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            text.push_str(line);
            text.push('\n');

            if is_sentinel(line) {
                return Ok(Response::Accumulated {
                    text,
                    sentinel_seen: true,
                });
            }
        }

        debug!("No sentinel after {} reads", retry.attempts());
        Ok(Response::Accumulated {
            text,
            sentinel_seen: false,
        })
    }

    async fn read_line(
        &mut self,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Option<String>> {
        let transport = self.link.transport_mut()?;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(qrpos_core::Error::Cancelled.into()),
            line = transport.read_line(timeout) => Ok(line?),
        }
    }
}
