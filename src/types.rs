/// One rangefinder sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    /// Signal confidence reported by the sensor (0..=63 in standard scans).
    pub quality: u8,
    /// Heading in degrees, [0, 360).
    pub angle: f64,
    /// Range in millimeters. 0 means no return.
    pub distance: f64,
}

impl Measurement {
    pub fn new(quality: u8, angle: f64, distance: f64) -> Self {
        Self {
            quality,
            angle,
            distance,
        }
    }
}

/// Measurements captured during one revolution, in the order the device sent them.
pub type Scan = Vec<Measurement>;

/// Device identification returned by the GET_INFO request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub model: u8,
    /// Firmware version as (major, minor).
    pub firmware: (u8, u8),
    pub hardware: u8,
    pub serial_number: [u8; 16],
}

impl DeviceInfo {
    /// Serial number as an uppercase hex string.
    pub fn serial_hex(&self) -> String {
        self.serial_number
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect()
    }
}

/// Health state reported by the GET_HEALTH request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Good,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Health {
    pub status: HealthStatus,
    pub error_code: u16,
}

/// Parsed 7-byte response descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    /// Payload size of one response in bytes.
    pub size: u32,
    /// True for single-response requests, false for streamed responses.
    pub single: bool,
    pub data_type: u8,
}
