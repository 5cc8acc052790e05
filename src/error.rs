/// Errors that can occur while acquiring scans or forwarding them.
#[derive(Debug, thiserror::Error)]
pub enum LidarError {
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("OSC encode error: {0:?}")]
    OscEncode(rosc::OscError),

    #[error("Signal handler error: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error("Invalid destination host: {0:?}")]
    InvalidHost(String),

    #[error("Could not resolve {host}:{port}: {reason}")]
    AddressResolution {
        host: String,
        port: u16,
        reason: String,
    },

    #[error("Invalid response descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("Unexpected response: expected type 0x{expected:02x}, got 0x{actual:02x}")]
    UnexpectedResponse { expected: u8, actual: u8 },

    #[error("New scan flags mismatch")]
    ScanFlagMismatch,

    #[error("Check bit not equal to 1")]
    CheckBit,

    #[error("RPLidar hardware failure, error code: {0}")]
    DeviceUnhealthy(u16),

    #[error("Interrupted")]
    Interrupted,

    #[error("Not connected")]
    NotConnected,
}

impl From<rosc::OscError> for LidarError {
    fn from(e: rosc::OscError) -> Self {
        LidarError::OscEncode(e)
    }
}
