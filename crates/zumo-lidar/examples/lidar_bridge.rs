//! Streams the forward beam of a serial range sensor to the localization app.
//!
//! Usage: `lidar_bridge [PORT] [ADDR]`, e.g. `lidar_bridge /dev/ttyUSB0 127.0.0.1:5555`.
//! Each revolution sends an idle command followed by the reading in millimetres.

use std::env;
use std::io::Write;
use std::net::TcpStream;
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use zumo_lidar::{BeamSelector, Error, HealthStatus, RangeSensor, SerialTransport};

const BAUD_RATE: u32 = 115_200;
const WAIT: Duration = Duration::from_millis(1000);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let mut args = env::args().skip(1);
    let port = args.next().unwrap_or_else(|| "/dev/ttyUSB0".to_string());
    let addr = args.next().unwrap_or_else(|| "127.0.0.1:5555".to_string());

    let mut sensor = RangeSensor::new(SerialTransport::open(&port, BAUD_RATE)?);
    sensor.device_info(WAIT)?;
    let health = sensor.health(WAIT)?;
    if health.status == HealthStatus::Error {
        warn!(code = health.error_code, "Sensor reports an error, resetting");
        sensor.reset()?;
        std::thread::sleep(Duration::from_secs(2));
    }

    let mut stream = TcpStream::connect(&addr)?;
    info!(%addr, "Connected to localization");

    sensor.start_scan(false, WAIT)?;
    let mut beam = BeamSelector::new(0.0, 3.0);
    loop {
        match sensor.wait_point(WAIT) {
            Ok(m) => {
                if let Some(mm) = beam.push(m) {
                    write!(stream, "0\n{:.0}\n", mm)?;
                }
            }
            Err(Error::Timeout(_)) => {
                warn!("No data from sensor, restarting scan");
                sensor.start_scan(false, WAIT)?;
            }
            Err(e) => return Err(e.into()),
        }
    }
}
