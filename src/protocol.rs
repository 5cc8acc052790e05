use crate::types::{Descriptor, DeviceInfo, Health, HealthStatus, Measurement};
use crate::{LidarError, Result};

// -- Framing --
pub const SYNC_BYTE: u8 = 0xA5;
pub const SYNC_BYTE2: u8 = 0x5A;
pub const DESCRIPTOR_LEN: usize = 7;

// -- Request bytes (after the 0xA5 sync byte) --
pub const CMD_STOP: u8 = 0x25;
pub const CMD_RESET: u8 = 0x40;
pub const CMD_SCAN: u8 = 0x20;
pub const CMD_GET_INFO: u8 = 0x50;
pub const CMD_GET_HEALTH: u8 = 0x52;
pub const CMD_SET_PWM: u8 = 0xF0;

// -- Response data types and sizes --
pub const TYPE_INFO: u8 = 0x04;
pub const TYPE_HEALTH: u8 = 0x06;
pub const TYPE_SCAN: u8 = 0x81;
pub const INFO_LEN: usize = 20;
pub const HEALTH_LEN: usize = 3;
pub const MEASUREMENT_LEN: usize = 5;

pub const DEFAULT_BAUD_RATE: u32 = 115_200;
pub const DEFAULT_MOTOR_PWM: u16 = 660;

/// Build a request packet.
/// Without payload: [0xA5, cmd]
/// With payload:    [0xA5, cmd, len, payload..., checksum]
/// The checksum is the XOR of every preceding byte.
pub fn build_command(cmd: u8, payload: &[u8]) -> Vec<u8> {
    let mut buf = vec![SYNC_BYTE, cmd];
    if payload.is_empty() {
        return buf;
    }
    buf.push(payload.len() as u8);
    buf.extend_from_slice(payload);
    let checksum = buf.iter().fold(0u8, |acc, b| acc ^ b);
    buf.push(checksum);
    buf
}

/// Build the motor PWM request (A2 and later; ignored by A1 units).
pub fn build_pwm_cmd(pwm: u16) -> Vec<u8> {
    build_command(CMD_SET_PWM, &pwm.to_le_bytes())
}

/// Parse a response descriptor.
///
/// Layout:
/// - `[0..2]`: 0xA5 0x5A
/// - `[2..6]`: u32 LE, low 30 bits = response size, top 2 bits = send mode
/// - `[6]`: data type
pub fn parse_descriptor(data: &[u8; DESCRIPTOR_LEN]) -> Result<Descriptor> {
    if data[0] != SYNC_BYTE || data[1] != SYNC_BYTE2 {
        return Err(LidarError::InvalidDescriptor(format!(
            "bad sync bytes {:02x} {:02x}",
            data[0], data[1]
        )));
    }
    let word = u32::from_le_bytes([data[2], data[3], data[4], data[5]]);
    Ok(Descriptor {
        size: word & 0x3FFF_FFFF,
        single: (word >> 30) == 0,
        data_type: data[6],
    })
}

/// Check a descriptor against the response we asked for.
pub fn expect_descriptor(
    desc: &Descriptor,
    data_type: u8,
    size: usize,
    single: bool,
) -> Result<()> {
    if desc.data_type != data_type {
        return Err(LidarError::UnexpectedResponse {
            expected: data_type,
            actual: desc.data_type,
        });
    }
    if desc.size as usize != size {
        return Err(LidarError::InvalidDescriptor(format!(
            "wrong body size {} (expected {})",
            desc.size, size
        )));
    }
    if desc.single != single {
        return Err(LidarError::InvalidDescriptor("wrong send mode".into()));
    }
    Ok(())
}

/// Decode one 5-byte standard scan node.
///
/// Returns the start-of-revolution flag alongside the measurement.
/// - `[0]`: bit 0 = new scan, bit 1 = inverted new scan, bits 2..8 = quality
/// - `[1..3]`: bit 0 of `[1]` = check bit, remaining 15 bits = angle * 64
/// - `[3..5]`: u16 LE distance * 4
pub fn parse_measurement(raw: &[u8; MEASUREMENT_LEN]) -> Result<(bool, Measurement)> {
    let new_scan = raw[0] & 0x01 == 1;
    let inverted = (raw[0] >> 1) & 0x01 == 1;
    if new_scan == inverted {
        return Err(LidarError::ScanFlagMismatch);
    }
    if raw[1] & 0x01 != 1 {
        return Err(LidarError::CheckBit);
    }
    let quality = raw[0] >> 2;
    let angle = ((raw[1] as u16 >> 1) | ((raw[2] as u16) << 7)) as f64 / 64.0;
    let distance = u16::from_le_bytes([raw[3], raw[4]]) as f64 / 4.0;
    Ok((new_scan, Measurement::new(quality, angle, distance)))
}

/// Decode the GET_INFO payload.
pub fn parse_info(raw: &[u8; INFO_LEN]) -> DeviceInfo {
    let mut serial_number = [0u8; 16];
    serial_number.copy_from_slice(&raw[4..20]);
    DeviceInfo {
        model: raw[0],
        firmware: (raw[2], raw[1]),
        hardware: raw[3],
        serial_number,
    }
}

/// Decode the GET_HEALTH payload. Unknown status values are treated as errors.
pub fn parse_health(raw: &[u8; HEALTH_LEN]) -> Health {
    let status = match raw[0] {
        0 => HealthStatus::Good,
        1 => HealthStatus::Warning,
        _ => HealthStatus::Error,
    };
    Health {
        status,
        error_code: u16::from_le_bytes([raw[1], raw[2]]),
    }
}

/// Encode a node the way the device does, for building test streams.
#[cfg(test)]
pub(crate) fn encode_node(new_scan: bool, quality: u8, angle: f64, distance: f64) -> [u8; 5] {
    let angle_q6 = (angle * 64.0).round() as u16;
    let dist_q2 = (distance * 4.0).round() as u16;
    let flags = if new_scan { 0b01 } else { 0b10 };
    [
        (quality << 2) | flags,
        ((angle_q6 << 1) as u8) | 0x01,
        (angle_q6 >> 7) as u8,
        dist_q2 as u8,
        (dist_q2 >> 8) as u8,
    ]
}
