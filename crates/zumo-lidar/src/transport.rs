//! Byte transports the driver runs over.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;

/// A byte pipe to the sensor.
///
/// `read` must not block for long: the driver polls it against its own
/// deadline and treats `Ok(0)` as "nothing yet".
pub trait Transport: Send {
    /// Read data into buffer, returns number of bytes read
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize>;

    /// Write data from buffer, returns number of bytes written
    fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Flush any pending writes
    fn flush(&mut self) -> Result<()>;

    /// Bytes waiting to be read, if the transport can tell
    fn available(&mut self) -> Result<usize> {
        Ok(0)
    }
}

/// In-memory transport for tests and replay.
///
/// Clones share the same buffers, so a test can keep one handle to inject
/// responses while the driver owns another.
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockInner>>,
}

#[derive(Default)]
struct MockInner {
    read_buffer: VecDeque<u8>,
    write_buffer: Vec<u8>,
}

impl MockTransport {
    /// Empty transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes for the driver to read.
    pub fn inject_read(&self, data: &[u8]) {
        self.inner.lock().read_buffer.extend(data);
    }

    /// Everything the driver has written so far.
    pub fn get_written(&self) -> Vec<u8> {
        self.inner.lock().write_buffer.clone()
    }

    /// Forget written bytes.
    pub fn clear_written(&self) {
        self.inner.lock().write_buffer.clear();
    }

    /// Drop unread bytes.
    pub fn clear_read(&self) {
        self.inner.lock().read_buffer.clear();
    }
}

impl Transport for MockTransport {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let mut inner = self.inner.lock();
        let n = inner.read_buffer.len().min(buffer.len());
        for (slot, byte) in buffer.iter_mut().zip(inner.read_buffer.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.inner.lock().write_buffer.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn available(&mut self) -> Result<usize> {
        Ok(self.inner.lock().read_buffer.len())
    }
}

#[cfg(feature = "serial")]
pub use serial::SerialTransport;

#[cfg(feature = "serial")]
mod serial {
    use std::io::{Read, Write};
    use std::time::Duration;

    use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
    use tracing::info;

    use super::Transport;
    use crate::error::Result;

    /// UART link to the sensor, 8N1 without flow control.
    pub struct SerialTransport {
        port: Box<dyn SerialPort>,
    }

    impl SerialTransport {
        /// Opens a serial port.
        ///
        /// # Arguments
        /// * `path` - Serial port path (e.g., "/dev/ttyUSB0")
        /// * `baud_rate` - Baud rate, 115200 for the stock sensor
        pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
            let port = serialport::new(path, baud_rate)
                .data_bits(DataBits::Eight)
                .parity(Parity::None)
                .stop_bits(StopBits::One)
                .flow_control(FlowControl::None)
                .timeout(Duration::from_millis(1))
                .open()?;
            info!(path, baud_rate, "Opened serial port");
            Ok(SerialTransport { port })
        }
    }

    impl Transport for SerialTransport {
        fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
            match self.port.read(buffer) {
                Ok(n) => Ok(n),
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
                Err(e) => Err(e.into()),
            }
        }

        fn write(&mut self, data: &[u8]) -> Result<usize> {
            Ok(self.port.write(data)?)
        }

        fn flush(&mut self) -> Result<()> {
            self.port.flush()?;
            Ok(())
        }

        fn available(&mut self) -> Result<usize> {
            Ok(self.port.bytes_to_read()? as usize)
        }
    }
}
