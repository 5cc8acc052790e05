//! Capability boundary between the acquisition loop and the rangefinder.

use crate::device::RpLidar;
use crate::signal::Shutdown;
use crate::transport::{SerialTransport, Transport};
use crate::types::Scan;
use crate::{LidarError, Result};

/// An open rangefinder session.
pub trait ScanSource {
    /// Block until the next scan is ready.
    fn next_scan(&mut self) -> Result<Scan>;

    /// Ask the device to stop scanning.
    fn stop(&mut self) -> Result<()>;

    /// Release the connection. Must be safe to call after a failed `stop`.
    fn disconnect(&mut self) -> Result<()>;
}

/// Opens rangefinder sessions.
pub trait Connector {
    type Source: ScanSource;

    fn connect(&mut self, port: &str) -> Result<Self::Source>;
}

impl<T: Transport> ScanSource for RpLidar<T> {
    fn next_scan(&mut self) -> Result<Scan> {
        RpLidar::next_scan(self)
    }

    fn stop(&mut self) -> Result<()> {
        RpLidar::stop(self)
    }

    fn disconnect(&mut self) -> Result<()> {
        RpLidar::disconnect(self);
        Ok(())
    }
}

/// Connects to an RPLIDAR over a serial port.
#[derive(Debug, Clone)]
pub struct SerialConnector {
    pub baud_rate: u32,
    pub shutdown: Shutdown,
}

impl SerialConnector {
    pub fn new(baud_rate: u32, shutdown: Shutdown) -> Self {
        Self {
            baud_rate,
            shutdown,
        }
    }
}

impl Connector for SerialConnector {
    type Source = RpLidar<SerialTransport>;

    fn connect(&mut self, port: &str) -> Result<Self::Source> {
        let lidar = RpLidar::open(port, self.baud_rate, self.shutdown.clone())?;
        handshake(lidar)
    }
}

/// Log the device identity and start scanning.
///
/// Device info is informational only: a unit that garbles `GET_INFO` is
/// still scanned. The port is released if the scan cannot be started.
pub(crate) fn handshake<T: Transport>(mut lidar: RpLidar<T>) -> Result<RpLidar<T>> {
    match lidar.info() {
        Ok(info) => log::info!(
            "RPLidar model {} firmware {}.{:02} hardware {} serial {}",
            info.model,
            info.firmware.0,
            info.firmware.1,
            info.hardware,
            info.serial_hex()
        ),
        Err(LidarError::Interrupted) => {
            lidar.disconnect();
            return Err(LidarError::Interrupted);
        }
        Err(e) => {
            log::warn!("Could not read device info: {}", e);
            if let Err(e) = lidar.clear_input() {
                lidar.disconnect();
                return Err(e);
            }
        }
    }
    if let Err(e) = lidar.start_scan() {
        lidar.disconnect();
        return Err(e);
    }
    Ok(lidar)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{CMD_GET_HEALTH, CMD_GET_INFO, CMD_SCAN};
    use crate::transport::mock::MockTransport;

    #[test]
    fn test_rplidar_as_scan_source() {
        let mut t = MockTransport::new();
        t.reply(CMD_GET_HEALTH, vec![0xA5, 0x5A, 0x03, 0x00, 0x00, 0x00, 0x06, 0, 0, 0]);
        t.reply(CMD_SCAN, vec![0xA5, 0x5A, 0x05, 0x00, 0x00, 0x40, 0x81]);
        let mut lidar = RpLidar::with_transport(t, Shutdown::new());
        lidar.start_scan().unwrap();

        let source: &mut dyn ScanSource = &mut lidar;
        source.stop().unwrap();
        source.disconnect().unwrap();
        source.disconnect().unwrap();
        assert!(!lidar.is_connected());
    }

    #[test]
    fn test_handshake_survives_garbled_info() {
        let mut t = MockTransport::new();
        // wrong second sync byte, followed by trailing junk
        t.reply(CMD_GET_INFO, vec![0xA5, 0x00, 0x14, 0x00, 0x00, 0x00, 0x04, 0xFF, 0xFF]);
        t.reply(CMD_GET_HEALTH, vec![0xA5, 0x5A, 0x03, 0x00, 0x00, 0x00, 0x06, 0, 0, 0]);
        t.reply(CMD_SCAN, vec![0xA5, 0x5A, 0x05, 0x00, 0x00, 0x40, 0x81]);

        let lidar = handshake(RpLidar::with_transport(t, Shutdown::new())).unwrap();
        assert!(lidar.is_connected());
        assert!(lidar.is_scanning());
    }

    #[test]
    fn test_handshake_releases_port_on_interrupt() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        let lidar = RpLidar::with_transport(MockTransport::new(), shutdown);
        assert!(matches!(handshake(lidar), Err(LidarError::Interrupted)));
    }
}
