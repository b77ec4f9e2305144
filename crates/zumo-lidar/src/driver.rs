//! Command/response driver with bounded waits.

use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, trace};

use crate::error::{Error, Result};
use crate::protocol::{
    self, ANS_SYNC_BYTE1, ANS_SYNC_BYTE2, ANS_TYPE_DEVHEALTH, ANS_TYPE_DEVINFO,
    ANS_TYPE_MEASUREMENT, Command, DeviceHealth, DeviceInfo, HEADER_LEN, HEALTH_LEN, INFO_LEN,
    MEASUREMENT_LEN, Measurement, ResponseHeader,
};
use crate::transport::Transport;

/// Host-side driver for the range sensor.
///
/// Every call that waits for the sensor takes a timeout and returns
/// [`Error::Timeout`] once it expires, so a silent or unplugged sensor never
/// hangs the caller.
pub struct RangeSensor<T: Transport> {
    transport: T,
    scanning: bool,
}

impl<T: Transport> RangeSensor<T> {
    /// Wraps an open transport.
    pub fn new(transport: T) -> Self {
        RangeSensor {
            transport,
            scanning: false,
        }
    }

    /// Leaves scan mode.
    pub fn stop(&mut self) -> Result<()> {
        self.send(Command::Stop, &[])?;
        self.scanning = false;
        Ok(())
    }

    /// Soft-resets the sensor. It needs a moment before it answers again.
    pub fn reset(&mut self) -> Result<()> {
        self.send(Command::Reset, &[])?;
        self.scanning = false;
        Ok(())
    }

    /// Queries the sensor's health.
    pub fn health(&mut self, timeout: Duration) -> Result<DeviceHealth> {
        let deadline = Instant::now() + timeout;
        self.send(Command::GetHealth, &[])?;
        let header = self.wait_header(deadline, timeout)?;
        header.expect(ANS_TYPE_DEVHEALTH, HEALTH_LEN)?;

        let mut record = [0u8; HEALTH_LEN];
        self.read_exact(&mut record, deadline, timeout)?;
        let health = DeviceHealth::decode(&record);
        debug!(?health, "Sensor health");
        Ok(health)
    }

    /// Queries model, firmware and serial number.
    pub fn device_info(&mut self, timeout: Duration) -> Result<DeviceInfo> {
        let deadline = Instant::now() + timeout;
        self.send(Command::GetInfo, &[])?;
        let header = self.wait_header(deadline, timeout)?;
        header.expect(ANS_TYPE_DEVINFO, INFO_LEN)?;

        let mut record = [0u8; INFO_LEN];
        self.read_exact(&mut record, deadline, timeout)?;
        let info = DeviceInfo::decode(&record);
        info!(
            model = info.model,
            firmware = ?info.firmware,
            hardware = info.hardware,
            serial = %info.serial_hex(),
            "Sensor identified"
        );
        Ok(info)
    }

    /// Stops any running scan, then starts a new one.
    ///
    /// # Arguments
    /// * `force` - Start without waiting for the motor to reach speed
    /// * `timeout` - How long to wait for the scan response header
    ///
    /// # Returns
    /// * `Result<()>` - Ok once the sensor confirmed a measurement stream
    pub fn start_scan(&mut self, force: bool, timeout: Duration) -> Result<()> {
        self.stop()?;
        let deadline = Instant::now() + timeout;
        let cmd = if force { Command::ForceScan } else { Command::Scan };
        self.send(cmd, &[])?;

        let header = self.wait_header(deadline, timeout)?;
        header.expect(ANS_TYPE_MEASUREMENT, MEASUREMENT_LEN)?;
        self.scanning = true;
        info!(force, "Scan started");
        Ok(())
    }

    /// Waits for the next measurement record, skipping bytes until one with
    /// valid check bits lines up.
    pub fn wait_point(&mut self, timeout: Duration) -> Result<Measurement> {
        if !self.scanning {
            return Err(Error::NotOpen);
        }
        let deadline = Instant::now() + timeout;
        let mut record = [0u8; MEASUREMENT_LEN];
        let mut pos = 0;

        while pos < MEASUREMENT_LEN {
            let b = self.read_byte(deadline, timeout)?;
            match pos {
                0 if !protocol::is_measurement_start(b) => continue,
                1 if !protocol::is_measurement_check(b) => {
                    trace!(byte = b, "Measurement check bit clear, resyncing");
                    pos = 0;
                    continue;
                }
                _ => {}
            }
            record[pos] = b;
            pos += 1;
        }
        Measurement::decode(&record)
    }

    /// `true` between a successful [`start_scan`](Self::start_scan) and the next stop or reset.
    pub fn is_scanning(&self) -> bool {
        self.scanning
    }

    /// The underlying transport.
    pub fn into_inner(self) -> T {
        self.transport
    }

    fn send(&mut self, cmd: Command, payload: &[u8]) -> Result<()> {
        let packet = protocol::encode_command(cmd.opcode(), payload)?;
        let mut written = 0;
        while written < packet.len() {
            let n = self.transport.write(&packet[written..])?;
            if n == 0 {
                return Err(Error::Io(std::io::ErrorKind::WriteZero.into()));
            }
            written += n;
        }
        self.transport.flush()?;
        trace!(?cmd, "Command sent");
        Ok(())
    }

    fn wait_header(&mut self, deadline: Instant, timeout: Duration) -> Result<ResponseHeader> {
        let mut bytes = [0u8; HEADER_LEN];
        let mut pos = 0;

        while pos < HEADER_LEN {
            let b = self.read_byte(deadline, timeout)?;
            match pos {
                0 if b != ANS_SYNC_BYTE1 => continue,
                // A repeated first sync byte may still start the header
                1 if b != ANS_SYNC_BYTE2 => {
                    if b != ANS_SYNC_BYTE1 {
                        pos = 0;
                    }
                    continue;
                }
                _ => {}
            }
            bytes[pos] = b;
            pos += 1;
        }
        ResponseHeader::decode(&bytes)
    }

    fn read_exact(&mut self, buf: &mut [u8], deadline: Instant, timeout: Duration) -> Result<()> {
        for slot in buf.iter_mut() {
            *slot = self.read_byte(deadline, timeout)?;
        }
        Ok(())
    }

    fn read_byte(&mut self, deadline: Instant, timeout: Duration) -> Result<u8> {
        let mut byte = [0u8; 1];
        loop {
            if self.transport.read(&mut byte)? == 1 {
                return Ok(byte[0]);
            }
            if Instant::now() >= deadline {
                return Err(Error::Timeout(timeout));
            }
            thread::yield_now();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::HealthStatus;
    use crate::transport::MockTransport;

    const WAIT: Duration = Duration::from_millis(20);

    fn sensor() -> (MockTransport, RangeSensor<MockTransport>) {
        let mock = MockTransport::new();
        let sensor = RangeSensor::new(mock.clone());
        (mock, sensor)
    }

    fn header(size: u32, kind: u8) -> Vec<u8> {
        let mut bytes = vec![ANS_SYNC_BYTE1, ANS_SYNC_BYTE2];
        bytes.extend_from_slice(&(size | 1 << 30).to_le_bytes());
        bytes.push(kind);
        bytes
    }

    #[test]
    fn test_start_scan_stops_first() {
        let (mock, mut sensor) = sensor();
        // Leftover bytes from an earlier scan precede the header
        mock.inject_read(&[0x3D, 0x01, 0xA5, 0xA5]);
        mock.inject_read(&header(5, ANS_TYPE_MEASUREMENT));

        sensor.start_scan(false, WAIT).unwrap();
        assert!(sensor.is_scanning());
        assert_eq!(mock.get_written(), vec![0xA5, 0x25, 0xA5, 0x20]);
    }

    #[test]
    fn test_start_scan_rejects_wrong_response() {
        let (mock, mut sensor) = sensor();
        mock.inject_read(&header(3, ANS_TYPE_DEVHEALTH));
        assert!(matches!(
            sensor.start_scan(true, WAIT),
            Err(Error::UnexpectedResponse { kind: ANS_TYPE_DEVHEALTH, size: 3 })
        ));
        assert!(!sensor.is_scanning());
        assert_eq!(mock.get_written(), vec![0xA5, 0x25, 0xA5, 0x21]);
    }

    #[test]
    fn test_silent_sensor_times_out() {
        let (_mock, mut sensor) = sensor();
        let start = Instant::now();
        assert!(matches!(sensor.start_scan(false, WAIT), Err(Error::Timeout(_))));
        assert!(matches!(sensor.wait_point(WAIT), Err(Error::NotOpen)));
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_wait_point_resyncs() {
        let (mock, mut sensor) = sensor();
        mock.inject_read(&header(5, ANS_TYPE_MEASUREMENT));
        sensor.start_scan(false, WAIT).unwrap();
        // 0x00 fails the start check, then 0x3D 0x00 fails the check bit
        mock.inject_read(&[0x00, 0x3D, 0x00, 0x3D, 0x01, 0x2D, 0x4A, 0x13]);
        let m = sensor.wait_point(WAIT).unwrap();
        assert_eq!(m.quality, 15);
        assert!(m.start);
        assert_eq!(m.angle_deg, 90.0);
        assert_eq!(m.distance_mm, 1234.5);
        assert!(matches!(sensor.wait_point(WAIT), Err(Error::Timeout(_))));

        sensor.stop().unwrap();
        assert!(matches!(sensor.wait_point(WAIT), Err(Error::NotOpen)));
    }

    #[test]
    fn test_health_and_info() {
        let (mock, mut sensor) = sensor();
        mock.inject_read(&header(3, ANS_TYPE_DEVHEALTH));
        mock.inject_read(&[0x00, 0x00, 0x00]);
        let health = sensor.health(WAIT).unwrap();
        assert_eq!(health.status, HealthStatus::Good);
        assert_eq!(mock.get_written(), vec![0xA5, 0x52]);

        mock.clear_written();
        mock.inject_read(&header(20, ANS_TYPE_DEVINFO));
        let mut record = [0u8; INFO_LEN];
        record[0] = 0x18;
        record[2] = 0x01;
        mock.inject_read(&record);
        let info = sensor.device_info(WAIT).unwrap();
        assert_eq!(info.model, 0x18);
        assert_eq!(info.firmware, (1, 0));
        assert_eq!(mock.get_written(), vec![0xA5, 0x50]);
    }

    #[test]
    fn test_truncated_record_times_out() {
        let (mock, mut sensor) = sensor();
        mock.inject_read(&header(3, ANS_TYPE_DEVHEALTH));
        mock.inject_read(&[0x00]);
        assert!(matches!(sensor.health(WAIT), Err(Error::Timeout(_))));
    }
}
