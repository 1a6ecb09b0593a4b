//! Serial port transport
//!
//! `serialport` is blocking, so every port operation runs on tokio's
//! blocking pool. The port handle and the line buffer sit behind one mutex
//! so a cancelled read can never leave them out of step.

use std::io::{self, Read, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::BytesMut;
use parking_lot::Mutex;
use serialport::{ClearBuffer, SerialPort, SerialPortType};
use tracing::{debug, trace, warn};

use qrpos_types::PortInfo;

use crate::config::LinkConfig;
use crate::{Transport, error::*};

const READ_BUFFER_SIZE: usize = 256;

struct PortState {
    port: Box<dyn SerialPort>,
    pending: BytesMut,
}

/// Serial transport for payment terminals
pub struct SerialTransport {
    config: LinkConfig,
    state: Option<Arc<Mutex<PortState>>>,
}

impl SerialTransport {
    /// Create new serial transport
    pub fn new(config: LinkConfig) -> Self {
        Self {
            config,
            state: None,
        }
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Run a blocking port operation on the blocking pool
    async fn with_port<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PortState) -> Result<T> + Send + 'static,
    {
        let state = self.state.clone().ok_or(Error::NotConnected)?;

        tokio::task::spawn_blocking(move || op(&mut state.lock()))
            .await
            .map_err(|e| Error::Io(io::Error::other(e)))?
    }
}

fn open_port(config: &LinkConfig) -> Result<Box<dyn SerialPort>> {
    let mut port = serialport::new(&config.port, config.baud_rate)
        .data_bits(config.data_bits)
        .parity(config.parity)
        .stop_bits(config.stop_bits)
        .flow_control(config.flow_control())
        .timeout(config.read_timeout)
        .open()
        .map_err(|e| Error::from_open(&config.port, e))?;

    if config.dsrdtr {
        port.write_data_terminal_ready(true)
            .map_err(|e| Error::from_open(&config.port, e))?;
    }

    Ok(port)
}

/// Split the first complete line off the buffer
fn take_line(pending: &mut BytesMut) -> Option<String> {
    let pos = pending.iter().position(|b| *b == b'\n')?;
    let raw = pending.split_to(pos + 1);
    let line = String::from_utf8_lossy(&raw);
    Some(line.trim_end_matches(['\r', '\n']).to_string())
}

fn read_line_blocking(state: &mut PortState, timeout: Duration) -> Result<Option<String>> {
    let deadline = Instant::now() + timeout;
    let mut buf = [0u8; READ_BUFFER_SIZE];

    loop {
        if let Some(line) = take_line(&mut state.pending) {
            return Ok(Some(line));
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(None);
        }

        state
            .port
            .set_timeout(remaining)
            .map_err(|e| Error::Io(e.into()))?;

        match state.port.read(&mut buf) {
            Ok(0) => return Ok(None),
            Ok(n) => {
                trace!("Received {} bytes: {}", n, hex::encode(&buf[..n.min(32)]));
                state.pending.extend_from_slice(&buf[..n]);
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut => return Ok(None),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::Io(e)),
        }
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn connect(&mut self) -> Result<()> {
        if self.is_connected() {
            return Err(Error::AlreadyConnected);
        }

        self.config.validate()?;

        debug!(
            "Opening {} ({} baud, {:?}, {:?}, {:?}, flow {:?})...",
            self.config.port,
            self.config.baud_rate,
            self.config.data_bits,
            self.config.parity,
            self.config.stop_bits,
            self.config.flow_control()
        );

        let config = self.config.clone();
        let port = tokio::task::spawn_blocking(move || open_port(&config))
            .await
            .map_err(|e| Error::Io(io::Error::other(e)))??;

        debug!("Opened {}", self.config.port);

        self.state = Some(Arc::new(Mutex::new(PortState {
            port,
            pending: BytesMut::with_capacity(READ_BUFFER_SIZE),
        })));

        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if self.state.take().is_some() {
            debug!("Closed {}", self.config.port);
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.state.is_some()
    }

    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let data = data.to_vec();
        let read_timeout = self.config.read_timeout;
        let write_timeout = self.config.write_timeout;

        trace!(
            "Sending {} bytes: {}",
            data.len(),
            hex::encode(&data[..data.len().min(16)])
        );

        self.with_port(move |state| {
            state
                .port
                .set_timeout(write_timeout)
                .map_err(|e| Error::Io(e.into()))?;

            let written = state
                .port
                .write_all(&data)
                .and_then(|_| state.port.flush());

            // Restore the read timeout even if the write failed
            let restored = state.port.set_timeout(read_timeout);

            match written {
                Err(e) if e.kind() == io::ErrorKind::TimedOut => return Err(Error::WriteTimeout),
                Err(e) => return Err(Error::Io(e)),
                Ok(()) => {}
            }
            restored.map_err(|e| Error::Io(e.into()))
        })
        .await
    }

    async fn read_line(&mut self, timeout: Duration) -> Result<Option<String>> {
        self.with_port(move |state| read_line_blocking(state, timeout))
            .await
    }

    async fn discard_input(&mut self) -> Result<()> {
        self.with_port(|state| {
            if !state.pending.is_empty() {
                trace!("Discarding {} buffered bytes", state.pending.len());
                state.pending.clear();
            }
            state
                .port
                .clear(ClearBuffer::Input)
                .map_err(|e| Error::Io(e.into()))
        })
        .await
    }

    fn port_name(&self) -> String {
        self.config.port.clone()
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        if self.is_connected() {
            warn!("Serial transport dropped while still connected");
        }
    }
}

/// List serial ports present on the host
pub fn list_ports() -> Result<Vec<PortInfo>> {
    let ports = serialport::available_ports().map_err(|e| Error::Io(e.into()))?;

    Ok(ports
        .into_iter()
        .map(|port| {
            let mut info = PortInfo::new(port.port_name);
            match port.port_type {
                SerialPortType::UsbPort(usb) => {
                    info.hardware_id = Some(match &usb.serial_number {
                        Some(serial) => format!("USB VID:PID={:04X}:{:04X} SER={}", usb.vid, usb.pid, serial),
                        None => format!("USB VID:PID={:04X}:{:04X}", usb.vid, usb.pid),
                    });
                    info.description = usb.product;
                    info.manufacturer = usb.manufacturer;
                }
                SerialPortType::PciPort => info.description = Some("PCI serial port".into()),
                SerialPortType::BluetoothPort => info.description = Some("Bluetooth serial port".into()),
                SerialPortType::Unknown => {}
            }
            info
        })
        .collect())
}

/// Find the first baud rate at which `port` opens
///
/// Each candidate is opened and closed immediately; no bytes are written.
pub async fn probe_port(port: &str, baud_rates: &[u32]) -> Option<u32> {
    for &baud in baud_rates {
        let config = LinkConfig::new(port)
            .with_baud_rate(baud)
            .with_read_timeout(Duration::from_secs(2))
            .with_write_timeout(Duration::from_secs(2));

        let opened = tokio::task::spawn_blocking(move || open_port(&config).map(drop)).await;

        match opened {
            Ok(Ok(())) => {
                debug!("{} opened at {} baud", port, baud);
                return Some(baud);
            }
            Ok(Err(e)) => {
                debug!("{} failed at {} baud: {}", port, baud, e);
                // Every baud rate fails the same way for these
                if matches!(
                    e.connection_kind(),
                    Some(ConnectionErrorKind::NotFound | ConnectionErrorKind::PermissionDenied)
                ) {
                    warn!("{}: {}", port, e);
                    return None;
                }
            }
            Err(e) => {
                warn!("Probe task for {} failed: {}", port, e);
                return None;
            }
        }
    }

    None
}
