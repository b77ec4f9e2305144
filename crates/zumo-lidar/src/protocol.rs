//! Range sensor wire format.
//!
//! Host to sensor: `[0xA5] [opcode]`, and for commands with a payload
//! `[0xA5] [opcode | 0x80] [len] [payload..] [xor]` where `xor` covers every
//! preceding byte.
//!
//! Sensor to host: a 7-byte header `[0xA5] [0x5A] [size:30|subtype:2 LE] [type]`
//! followed by `size`-byte records.

use crate::error::{Error, Result};

/// First byte of every command packet.
pub const CMD_SYNC_BYTE: u8 = 0xA5;
/// Opcode flag marking a command that carries a payload.
pub const CMDFLAG_HAS_PAYLOAD: u8 = 0x80;
/// First response header byte.
pub const ANS_SYNC_BYTE1: u8 = 0xA5;
/// Second response header byte.
pub const ANS_SYNC_BYTE2: u8 = 0x5A;

/// Response type of the scan stream.
pub const ANS_TYPE_MEASUREMENT: u8 = 0x81;
/// Response type of [`Command::GetInfo`].
pub const ANS_TYPE_DEVINFO: u8 = 0x04;
/// Response type of [`Command::GetHealth`].
pub const ANS_TYPE_DEVHEALTH: u8 = 0x06;

/// Response header length.
pub const HEADER_LEN: usize = 7;
/// Measurement record length.
pub const MEASUREMENT_LEN: usize = 5;
/// Health record length.
pub const HEALTH_LEN: usize = 3;
/// Device info record length.
pub const INFO_LEN: usize = 20;

const SIZE_MASK: u32 = 0x3FFF_FFFF;
const SUBTYPE_SHIFT: u32 = 30;
const QUALITY_SHIFT: u8 = 2;
const SYNC_BIT: u8 = 0x1;
const CHECK_BIT: u16 = 0x1;
const ANGLE_SHIFT: u16 = 1;

/// Sensor commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    /// Leave scan mode.
    Stop = 0x25,
    /// Soft reset.
    Reset = 0x40,
    /// Start streaming measurements.
    Scan = 0x20,
    /// Start streaming without waiting for the motor to settle.
    ForceScan = 0x21,
    /// Request model, firmware and serial number.
    GetInfo = 0x50,
    /// Request health status.
    GetHealth = 0x52,
}

impl Command {
    /// The opcode byte.
    pub fn opcode(self) -> u8 {
        self as u8
    }
}

/// Encodes a command packet.
///
/// Payload-free commands are two bytes and carry no checksum.
pub fn encode_command(opcode: u8, payload: &[u8]) -> Result<Vec<u8>> {
    if payload.is_empty() {
        return Ok(vec![CMD_SYNC_BYTE, opcode]);
    }
    let len = u8::try_from(payload.len()).map_err(|_| Error::InvalidData("payload longer than 255 bytes"))?;

    let cmd = opcode | CMDFLAG_HAS_PAYLOAD;
    let mut packet = Vec::with_capacity(payload.len() + 4);
    packet.extend_from_slice(&[CMD_SYNC_BYTE, cmd, len]);
    packet.extend_from_slice(payload);
    packet.push(xor(&packet));
    Ok(packet)
}

/// Decodes a command packet into its opcode (flag cleared) and payload,
/// verifying the checksum when there is one.
pub fn decode_command(packet: &[u8]) -> Result<(u8, Vec<u8>)> {
    let (&sync, rest) = packet.split_first().ok_or(Error::InvalidData("empty command packet"))?;
    if sync != CMD_SYNC_BYTE {
        return Err(Error::InvalidData("missing command sync byte"));
    }
    let (&cmd, rest) = rest.split_first().ok_or(Error::InvalidData("truncated command packet"))?;

    if cmd & CMDFLAG_HAS_PAYLOAD == 0 {
        return if rest.is_empty() {
            Ok((cmd, Vec::new()))
        } else {
            Err(Error::InvalidData("trailing bytes after payload-free command"))
        };
    }

    let (&len, rest) = rest.split_first().ok_or(Error::InvalidData("missing payload length"))?;
    if rest.len() != len as usize + 1 {
        return Err(Error::InvalidData("payload length does not match packet"));
    }
    let (payload, checksum) = rest.split_at(len as usize);
    let expected = xor(&packet[..packet.len() - 1]);
    let actual = checksum[0];
    if expected != actual {
        return Err(Error::ChecksumMismatch { expected, actual });
    }
    Ok((cmd & !CMDFLAG_HAS_PAYLOAD, payload.to_vec()))
}

fn xor(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, b| acc ^ b)
}

/// Response descriptor preceding every answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHeader {
    /// Size of each following record, bytes.
    pub size: u32,
    /// Two-bit send mode.
    pub subtype: u8,
    /// Response type.
    pub kind: u8,
}

impl ResponseHeader {
    /// Decodes a 7-byte header.
    pub fn decode(bytes: &[u8; HEADER_LEN]) -> Result<Self> {
        if bytes[0] != ANS_SYNC_BYTE1 || bytes[1] != ANS_SYNC_BYTE2 {
            return Err(Error::InvalidData("missing response sync bytes"));
        }
        let word = u32::from_le_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]);
        Ok(ResponseHeader {
            size: word & SIZE_MASK,
            subtype: (word >> SUBTYPE_SHIFT) as u8,
            kind: bytes[6],
        })
    }

    /// Fails unless this header announces records of `kind` at least `min_size` bytes long.
    pub fn expect(&self, kind: u8, min_size: usize) -> Result<()> {
        if self.kind != kind || (self.size as usize) < min_size {
            return Err(Error::UnexpectedResponse {
                kind: self.kind,
                size: self.size,
            });
        }
        Ok(())
    }
}

/// `true` if `b` can open a measurement record: the start flag and its inverse disagree.
pub fn is_measurement_start(b: u8) -> bool {
    ((b >> 1) ^ b) & SYNC_BIT == 1
}

/// `true` if `b` can be the second byte of a measurement record.
pub fn is_measurement_check(b: u8) -> bool {
    u16::from(b) & CHECK_BIT == 1
}

/// One range sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    /// Signal quality, 0..=63.
    pub quality: u8,
    /// First sample of a new revolution.
    pub start: bool,
    /// Beam angle, degrees clockwise from the sensor's front.
    pub angle_deg: f64,
    /// Distance in millimetres, 0 when the sample is invalid.
    pub distance_mm: f64,
}

impl Measurement {
    /// Decodes a 5-byte measurement record.
    pub fn decode(bytes: &[u8; MEASUREMENT_LEN]) -> Result<Self> {
        if !is_measurement_start(bytes[0]) {
            return Err(Error::InvalidData("measurement start flag and inverse agree"));
        }
        if !is_measurement_check(bytes[1]) {
            return Err(Error::InvalidData("measurement check bit clear"));
        }
        let angle_q6 = u16::from_le_bytes([bytes[1], bytes[2]]) >> ANGLE_SHIFT;
        let distance_q2 = u16::from_le_bytes([bytes[3], bytes[4]]);
        Ok(Measurement {
            quality: bytes[0] >> QUALITY_SHIFT,
            start: bytes[0] & SYNC_BIT == SYNC_BIT,
            angle_deg: f64::from(angle_q6) / 64.0,
            distance_mm: f64::from(distance_q2) / 4.0,
        })
    }
}

/// Sensor self-check status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// Working normally.
    Good,
    /// Working, but something needs attention.
    Warning,
    /// Not working.
    Error,
    /// A status byte this driver does not know.
    Unknown(u8),
}

/// Answer to [`Command::GetHealth`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceHealth {
    /// Overall status.
    pub status: HealthStatus,
    /// Vendor error code, meaningful when `status` is not good.
    pub error_code: u16,
}

impl DeviceHealth {
    /// Decodes a 3-byte health record.
    pub fn decode(bytes: &[u8; HEALTH_LEN]) -> Self {
        let status = match bytes[0] {
            0 => HealthStatus::Good,
            1 => HealthStatus::Warning,
            2 => HealthStatus::Error,
            other => HealthStatus::Unknown(other),
        };
        DeviceHealth {
            status,
            error_code: u16::from_le_bytes([bytes[1], bytes[2]]),
        }
    }
}

/// Answer to [`Command::GetInfo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Model id.
    pub model: u8,
    /// Firmware version as `(major, minor)`.
    pub firmware: (u8, u8),
    /// Hardware revision.
    pub hardware: u8,
    /// Serial number.
    pub serial: [u8; 16],
}

impl DeviceInfo {
    /// Decodes a 20-byte info record.
    pub fn decode(bytes: &[u8; INFO_LEN]) -> Self {
        let mut serial = [0u8; 16];
        serial.copy_from_slice(&bytes[4..]);
        DeviceInfo {
            model: bytes[0],
            firmware: (bytes[2], bytes[1]),
            hardware: bytes[3],
            serial,
        }
    }

    /// Serial number as uppercase hex.
    pub fn serial_hex(&self) -> String {
        self.serial.iter().map(|b| format!("{:02X}", b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_payload_free_command() {
        let packet = encode_command(Command::Scan.opcode(), &[]).unwrap();
        assert_eq!(packet, vec![0xA5, 0x20]);
        assert_eq!(decode_command(&packet).unwrap(), (0x20, Vec::new()));
    }

    #[test]
    fn test_encode_command_with_payload() {
        let packet = encode_command(0xF0, &[0x02, 0x94]).unwrap();
        // 0xA5 ^ 0xF0 ^ 0x02 ^ 0x02 ^ 0x94 = 0xC1
        assert_eq!(packet, vec![0xA5, 0xF0, 0x02, 0x02, 0x94, 0xC1]);
        assert_eq!(decode_command(&packet).unwrap(), (0x70, vec![0x02, 0x94]));
    }

    #[test]
    fn test_checksum_mismatch() {
        let mut packet = encode_command(0x10, &[0x01]).unwrap();
        let last = packet.len() - 1;
        packet[last] ^= 0xFF;
        assert!(matches!(
            decode_command(&packet),
            Err(Error::ChecksumMismatch { .. })
        ));
        assert!(matches!(decode_command(&[0xA5]), Err(Error::InvalidData(_))));
        assert!(matches!(decode_command(&[0x00, 0x20]), Err(Error::InvalidData(_))));
    }

    #[test]
    fn test_header_decode() {
        // size 5, subtype 1 (continuous), measurement
        let header = ResponseHeader::decode(&[0xA5, 0x5A, 0x05, 0x00, 0x00, 0x40, 0x81]).unwrap();
        assert_eq!(header.size, 5);
        assert_eq!(header.subtype, 1);
        assert_eq!(header.kind, ANS_TYPE_MEASUREMENT);
        assert!(header.expect(ANS_TYPE_MEASUREMENT, MEASUREMENT_LEN).is_ok());
        assert!(matches!(
            header.expect(ANS_TYPE_DEVHEALTH, HEALTH_LEN),
            Err(Error::UnexpectedResponse { kind: 0x81, size: 5 })
        ));
        assert!(ResponseHeader::decode(&[0xA5, 0x00, 0, 0, 0, 0, 0]).is_err());
    }

    #[test]
    fn test_measurement_decode() {
        // quality 15, start flag set: 15 << 2 | 0b01
        // angle 90.0 deg = 5760 q6 -> (5760 << 1) | 1 = 11521 = 0x2D01
        // distance 1234.5 mm = 4938 q2 = 0x134A
        let m = Measurement::decode(&[0x3D, 0x01, 0x2D, 0x4A, 0x13]).unwrap();
        assert_eq!(m.quality, 15);
        assert!(m.start);
        assert_eq!(m.angle_deg, 90.0);
        assert_eq!(m.distance_mm, 1234.5);
    }

    #[test]
    fn test_measurement_check_bits() {
        // Start flag and inverse both set
        assert!(Measurement::decode(&[0x03, 0x01, 0x00, 0x00, 0x00]).is_err());
        // Check bit clear
        assert!(Measurement::decode(&[0x02, 0x00, 0x00, 0x00, 0x00]).is_err());
        assert!(is_measurement_start(0x02));
        assert!(!is_measurement_start(0x00));
    }

    #[test]
    fn test_health_and_info_decode() {
        let health = DeviceHealth::decode(&[0x02, 0x34, 0x12]);
        assert_eq!(health.status, HealthStatus::Error);
        assert_eq!(health.error_code, 0x1234);

        let mut bytes = [0u8; INFO_LEN];
        bytes[0] = 0x18;
        bytes[1] = 0x1D; // minor
        bytes[2] = 0x01; // major
        bytes[3] = 0x07;
        bytes[4] = 0xAB;
        let info = DeviceInfo::decode(&bytes);
        assert_eq!(info.model, 0x18);
        assert_eq!(info.firmware, (1, 29));
        assert_eq!(info.hardware, 7);
        assert!(info.serial_hex().starts_with("AB00"));
        assert_eq!(info.serial_hex().len(), 32);
    }
}
