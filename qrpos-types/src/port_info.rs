//! Serial port descriptions

use std::fmt;

/// Serial port discovered on the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// Device path (`/dev/ttyUSB0`, `COM3`)
    pub device: String,

    /// Human-readable description
    pub description: Option<String>,

    /// Hardware identifier (USB VID:PID and serial number)
    pub hardware_id: Option<String>,

    /// Adapter manufacturer
    pub manufacturer: Option<String>,
}

impl PortInfo {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            description: None,
            hardware_id: None,
            manufacturer: None,
        }
    }
}

impl fmt::Display for PortInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.description {
            Some(description) => write!(f, "{} - {}", self.device, description),
            None => f.write_str(&self.device),
        }
    }
}
