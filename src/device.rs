use crate::protocol::{self, DESCRIPTOR_LEN, HEALTH_LEN, INFO_LEN, MEASUREMENT_LEN};
use crate::scan::ScanAssembler;
use crate::signal::Shutdown;
use crate::transport::{self, SerialTransport, Transport};
use crate::types::{Descriptor, DeviceInfo, Health, HealthStatus, Measurement, Scan};
use crate::{LidarError, Result};
use std::time::Duration;

/// Backlog (in measurements) above which the input buffer is considered stale.
pub const MAX_BUFFERED_MEASUREMENTS: usize = 500;

#[cfg(not(test))]
const STOP_SETTLE: Duration = Duration::from_millis(100);
#[cfg(test)]
const STOP_SETTLE: Duration = Duration::from_millis(1);

#[cfg(not(test))]
const RESET_SETTLE: Duration = Duration::from_secs(2);
#[cfg(test)]
const RESET_SETTLE: Duration = Duration::from_millis(1);

/// An RPLIDAR A-series rangefinder in standard scan mode.
pub struct RpLidar<T: Transport> {
    transport: Option<T>,
    shutdown: Shutdown,
    scanning: bool,
    motor_running: bool,
    assembler: ScanAssembler,
}

impl RpLidar<SerialTransport> {
    /// Open the rangefinder on a serial port.
    pub fn open(port: &str, baud_rate: u32, shutdown: Shutdown) -> Result<Self> {
        let transport = SerialTransport::open(port, baud_rate)?;
        Ok(Self::with_transport(transport, shutdown))
    }
}

impl<T: Transport> RpLidar<T> {
    pub fn with_transport(transport: T, shutdown: Shutdown) -> Self {
        Self {
            transport: Some(transport),
            shutdown,
            scanning: false,
            motor_running: false,
            assembler: ScanAssembler::new(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning
    }

    fn transport(&mut self) -> Result<&mut T> {
        self.transport.as_mut().ok_or(LidarError::NotConnected)
    }

    fn send_command(&mut self, cmd: u8, payload: &[u8]) -> Result<()> {
        let buf = protocol::build_command(cmd, payload);
        log::trace!("-> {:02x?}", buf);
        self.transport()?.write_all(&buf)
    }

    fn read_bytes<const N: usize>(&mut self) -> Result<[u8; N]> {
        let shutdown = self.shutdown.clone();
        let mut buf = [0u8; N];
        transport::read_exact(self.transport()?, &mut buf, &shutdown)?;
        Ok(buf)
    }

    fn read_descriptor(&mut self) -> Result<Descriptor> {
        let raw = self.read_bytes::<DESCRIPTOR_LEN>()?;
        protocol::parse_descriptor(&raw)
    }

    /// Query model, firmware, hardware revision and serial number.
    pub fn info(&mut self) -> Result<DeviceInfo> {
        self.send_command(protocol::CMD_GET_INFO, &[])?;
        let desc = self.read_descriptor()?;
        protocol::expect_descriptor(&desc, protocol::TYPE_INFO, INFO_LEN, true)?;
        let raw = self.read_bytes::<INFO_LEN>()?;
        Ok(protocol::parse_info(&raw))
    }

    /// Query the device health state.
    pub fn health(&mut self) -> Result<Health> {
        self.send_command(protocol::CMD_GET_HEALTH, &[])?;
        let desc = self.read_descriptor()?;
        protocol::expect_descriptor(&desc, protocol::TYPE_HEALTH, HEALTH_LEN, true)?;
        let raw = self.read_bytes::<HEALTH_LEN>()?;
        Ok(protocol::parse_health(&raw))
    }

    /// Spin up the motor: DTR low for A1 units, PWM for A2 and later.
    pub fn start_motor(&mut self) -> Result<()> {
        log::debug!("Starting motor");
        self.transport()?.set_dtr(false)?;
        let pwm = protocol::build_pwm_cmd(protocol::DEFAULT_MOTOR_PWM);
        self.transport()?.write_all(&pwm)?;
        self.motor_running = true;
        Ok(())
    }

    pub fn stop_motor(&mut self) -> Result<()> {
        log::debug!("Stopping motor");
        let pwm = protocol::build_pwm_cmd(0);
        self.transport()?.write_all(&pwm)?;
        std::thread::sleep(Duration::from_millis(1));
        self.transport()?.set_dtr(true)?;
        self.motor_running = false;
        Ok(())
    }

    /// Check health and request a standard scan.
    ///
    /// A device reporting an error state gets one reset before giving up.
    pub fn start_scan(&mut self) -> Result<()> {
        if self.scanning {
            return Ok(());
        }
        if !self.motor_running {
            self.start_motor()?;
        }

        let mut health = self.health()?;
        if health.status == HealthStatus::Error {
            log::warn!(
                "RPLidar reports error state (code {}), trying to reset...",
                health.error_code
            );
            self.reset()?;
            health = self.health()?;
            if health.status == HealthStatus::Error {
                return Err(LidarError::DeviceUnhealthy(health.error_code));
            }
        } else if health.status == HealthStatus::Warning {
            log::warn!("RPLidar health warning, error code: {}", health.error_code);
        }

        self.send_command(protocol::CMD_SCAN, &[])?;
        let desc = self.read_descriptor()?;
        protocol::expect_descriptor(&desc, protocol::TYPE_SCAN, MEASUREMENT_LEN, false)?;
        self.scanning = true;
        self.assembler.reset();
        log::debug!("Standard scan started");
        Ok(())
    }

    /// Read and decode the next node of the running scan.
    pub fn next_measurement(&mut self) -> Result<(bool, Measurement)> {
        let backlog = self.transport()?.bytes_to_read()?;
        if backlog > MAX_BUFFERED_MEASUREMENTS * MEASUREMENT_LEN {
            log::warn!(
                "Too many bytes in the input buffer: {}/{}. Cleaning buffer...",
                backlog,
                MAX_BUFFERED_MEASUREMENTS * MEASUREMENT_LEN
            );
            self.stop()?;
            self.start_scan()?;
        }
        let raw = self.read_bytes::<MEASUREMENT_LEN>()?;
        protocol::parse_measurement(&raw)
    }

    /// Block until the next full revolution is available.
    ///
    /// Starts the scan on first use.
    pub fn next_scan(&mut self) -> Result<Scan> {
        if !self.scanning {
            self.start_scan()?;
        }
        loop {
            let (new_scan, m) = self.next_measurement()?;
            if let Some(scan) = self.assembler.push(new_scan, m) {
                return Ok(scan);
            }
        }
    }

    /// Stop the scan and drop whatever is left in the input buffer.
    pub fn stop(&mut self) -> Result<()> {
        log::debug!("Stopping scan");
        self.send_command(protocol::CMD_STOP, &[])?;
        std::thread::sleep(STOP_SETTLE);
        self.scanning = false;
        self.assembler.reset();
        self.transport()?.clear_input()
    }

    /// Drop whatever is left in the input buffer.
    pub fn clear_input(&mut self) -> Result<()> {
        self.transport()?.clear_input()
    }

    /// Soft-reset the core. The device reboots and the scan is lost.
    pub fn reset(&mut self) -> Result<()> {
        log::debug!("Resetting device");
        self.send_command(protocol::CMD_RESET, &[])?;
        std::thread::sleep(RESET_SETTLE);
        self.scanning = false;
        self.assembler.reset();
        self.transport()?.clear_input()
    }

    /// Stop the motor and release the port.
    pub fn disconnect(&mut self) {
        if self.transport.is_none() {
            return;
        }
        if self.motor_running {
            if let Err(e) = self.stop_motor() {
                log::warn!("Failed to stop motor: {}", e);
            }
        }
        self.transport = None;
        self.scanning = false;
        log::info!("Serial port closed");
    }
}
