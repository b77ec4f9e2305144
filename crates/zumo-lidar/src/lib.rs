//! Host side of the single-beam range sensor.
//!
//! [`protocol`] encodes command packets and decodes response headers and
//! measurement records. [`RangeSensor`] drives a [`Transport`] with every
//! read bounded by a caller-supplied timeout, and [`BeamSelector`] reduces a
//! scan revolution to the one forward reading the localization cycle consumes.

#![warn(missing_docs)]

pub mod beam;
pub mod driver;
pub mod error;
pub mod protocol;
pub mod transport;

pub use beam::BeamSelector;
pub use driver::RangeSensor;
pub use error::{Error, Result};
pub use protocol::{Command, DeviceHealth, DeviceInfo, HealthStatus, Measurement, ResponseHeader};
pub use transport::{MockTransport, Transport};
#[cfg(feature = "serial")]
pub use transport::SerialTransport;
