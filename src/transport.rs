use crate::signal::Shutdown;
use crate::{LidarError, Result};
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{Read, Write};
use std::time::Duration;

/// Serial read timeout. Reads wake up this often to check the shutdown flag.
pub const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Byte-level link to the rangefinder.
pub trait Transport {
    /// Read available bytes. Returns 0 when the read timed out.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    fn write_all(&mut self, data: &[u8]) -> Result<()>;

    /// Bytes waiting in the input buffer.
    fn bytes_to_read(&mut self) -> Result<usize>;

    /// Discard everything in the input buffer.
    fn clear_input(&mut self) -> Result<()>;

    /// Drive the DTR line. On A1 units DTR low spins the motor.
    fn set_dtr(&mut self, level: bool) -> Result<()>;
}

/// Serial transport over the `serialport` crate.
///
/// 8N1, no flow control, with a short read timeout so that a blocked read
/// never outlives a shutdown request by more than [`READ_TIMEOUT`].
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    /// Open a serial port, e.g. "/dev/ttyUSB0" or "COM5".
    pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
        let port = serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(READ_TIMEOUT)
            .open()?;

        log::info!("Opened serial port: {} at {} baud", path, baud_rate);
        Ok(SerialTransport { port })
    }
}

impl Transport for SerialTransport {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        quiet_read(self.port.read(buf))
    }

    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.port.write_all(data)?;
        self.port.flush()?;
        Ok(())
    }

    fn bytes_to_read(&mut self) -> Result<usize> {
        Ok(self.port.bytes_to_read()? as usize)
    }

    fn clear_input(&mut self) -> Result<()> {
        self.port.clear(ClearBuffer::Input)?;
        Ok(())
    }

    fn set_dtr(&mut self, level: bool) -> Result<()> {
        self.port.write_data_terminal_ready(level)?;
        Ok(())
    }
}

/// Treat a timed-out or signal-interrupted read as an empty one.
///
/// A signal landing on the reading thread makes `ppoll` fail with `EINTR`;
/// the caller loops back and checks the shutdown flag either way.
fn quiet_read(res: std::io::Result<usize>) -> Result<usize> {
    match res {
        Ok(n) => Ok(n),
        Err(e)
            if matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::Interrupted
            ) =>
        {
            Ok(0)
        }
        Err(e) => Err(e.into()),
    }
}

/// Fill `buf` completely.
///
/// Blocks for as long as the device stays silent; the only way out of a
/// silent link is the shutdown flag, which yields [`LidarError::Interrupted`].
pub fn read_exact<T: Transport + ?Sized>(
    transport: &mut T,
    buf: &mut [u8],
    shutdown: &Shutdown,
) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        if shutdown.is_triggered() {
            return Err(LidarError::Interrupted);
        }
        match transport.read(&mut buf[filled..]) {
            Ok(n) => filled += n,
            Err(LidarError::Io(e)) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
