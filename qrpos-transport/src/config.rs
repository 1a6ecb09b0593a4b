//! Serial link configuration

use std::time::Duration;

pub use serialport::{DataBits, FlowControl, Parity, StopBits};

use crate::error::{Error, Result};

/// Default baud rate of the terminal firmware
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default read and write timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Delay after opening before the device accepts bytes
///
/// The board resets when the control lines are asserted on open and drops
/// anything written during boot.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Baud rates tried when probing an unknown port
pub const PROBE_BAUD_RATES: [u32; 4] = [9600, 115200, 19200, 38400];

/// Serial link parameters
///
/// Immutable once the link is opened.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use qrpos_transport::LinkConfig;
///
/// let config = LinkConfig::new("/dev/ttyUSB0")
///     .with_baud_rate(115200)
///     .with_read_timeout(Duration::from_secs(2));
/// assert_eq!(config.baud_rate, 115200);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    pub port: String,
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    /// Software flow control (XON/XOFF)
    pub xonxoff: bool,
    /// Hardware flow control (RTS/CTS)
    pub rtscts: bool,
    /// Assert DTR after opening
    pub dsrdtr: bool,
    pub settle_delay: Duration,
}

impl LinkConfig {
    /// Default framing (9600 8N1, no flow control) on the given port
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            read_timeout: DEFAULT_TIMEOUT,
            write_timeout: DEFAULT_TIMEOUT,
            xonxoff: false,
            rtscts: false,
            dsrdtr: false,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_data_bits(mut self, data_bits: DataBits) -> Self {
        self.data_bits = data_bits;
        self
    }

    pub fn with_parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    pub fn with_stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.stop_bits = stop_bits;
        self
    }

    /// Set read timeout
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set write timeout
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn with_software_flow_control(mut self, enabled: bool) -> Self {
        self.xonxoff = enabled;
        self
    }

    pub fn with_hardware_flow_control(mut self, enabled: bool) -> Self {
        self.rtscts = enabled;
        self
    }

    pub fn with_dtr(mut self, enabled: bool) -> Self {
        self.dsrdtr = enabled;
        self
    }

    /// Set the post-open stabilization delay
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Flow control mode implied by the flags
    pub fn flow_control(&self) -> FlowControl {
        if self.rtscts {
            FlowControl::Hardware
        } else if self.xonxoff {
            FlowControl::Software
        } else {
            FlowControl::None
        }
    }

    /// Reject combinations the driver cannot honor
    pub fn validate(&self) -> Result<()> {
        if self.port.trim().is_empty() {
            return Err(Error::InvalidConfig("port name is empty".into()));
        }
        if self.baud_rate == 0 {
            return Err(Error::InvalidConfig("baud rate must be positive".into()));
        }
        if self.xonxoff && self.rtscts {
            return Err(Error::InvalidConfig(
                "software and hardware flow control are mutually exclusive".into(),
            ));
        }
        if self.read_timeout.is_zero() || self.write_timeout.is_zero() {
            return Err(Error::InvalidConfig("timeouts must be non-zero".into()));
        }
        Ok(())
    }
}
