//! Turning wire messages into filter inputs.

use tracing::warn;

use crate::error::IngestError;

/// Largest accepted change between consecutive readings, as a fraction of the previous one.
pub const MAX_RELATIVE_JUMP: f64 = 0.2;

/// Parses a range reading in millimetres and returns it in metres.
pub fn parse_reading_mm(raw: &str) -> Result<f64, IngestError> {
    let trimmed = raw.trim();
    match trimmed.parse::<f64>() {
        Ok(mm) if mm.is_finite() && mm >= 0.0 => Ok(mm / 1000.0),
        _ => Err(IngestError::MalformedReading(trimmed.to_string())),
    }
}

/// Rejects implausible range readings before they reach the filter.
///
/// A reading is rejected when it is exactly zero or differs from the
/// previously delivered reading by more than [`MAX_RELATIVE_JUMP`] of that
/// previous value. Every delivered reading becomes the new reference,
/// accepted or not, so the gate recovers after a real jump in one cycle.
#[derive(Debug, Clone)]
pub struct ReadingGate {
    previous: f64,
    max_jump: f64,
}

impl Default for ReadingGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadingGate {
    /// A gate with no history. Its first non-zero reading is always rejected.
    pub fn new() -> Self {
        Self::with_max_jump(MAX_RELATIVE_JUMP)
    }

    /// A gate with a custom relative jump threshold.
    pub fn with_max_jump(max_jump: f64) -> Self {
        ReadingGate {
            previous: 0.0,
            max_jump,
        }
    }

    /// Checks `reading` (metres) against the previous one and records it.
    pub fn admit(&mut self, reading: f64) -> Result<f64, IngestError> {
        let previous = self.previous;
        self.previous = reading;

        if reading == 0.0 || (reading - previous).abs() > self.max_jump * previous {
            warn!(reading, previous, "Range reading rejected");
            return Err(IngestError::SensorReadingInvalid { reading, previous });
        }
        Ok(reading)
    }

    /// The reference the next reading is compared with.
    pub fn previous(&self) -> f64 {
        self.previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reading_mm() {
        assert_eq!(parse_reading_mm("1250").unwrap(), 1.25);
        assert_eq!(parse_reading_mm(" 487.5\n").unwrap(), 0.4875);
        assert_eq!(parse_reading_mm("0").unwrap(), 0.0);
        assert!(matches!(parse_reading_mm("abc"), Err(IngestError::MalformedReading(_))));
        assert!(matches!(parse_reading_mm("-4"), Err(IngestError::MalformedReading(_))));
        assert!(matches!(parse_reading_mm("inf"), Err(IngestError::MalformedReading(_))));
    }

    #[test]
    fn test_first_reading_bootstraps() {
        let mut gate = ReadingGate::new();
        // Nothing is within 20% of 0
        assert!(gate.admit(1.0).is_err());
        assert_eq!(gate.previous(), 1.0);
        assert_eq!(gate.admit(1.1).unwrap(), 1.1);
    }

    #[test]
    fn test_zero_is_rejected() {
        let mut gate = ReadingGate::new();
        gate.admit(1.0).ok();
        assert_eq!(
            gate.admit(0.0),
            Err(IngestError::SensorReadingInvalid {
                reading: 0.0,
                previous: 1.0
            })
        );
    }

    #[test]
    fn test_jump_threshold() {
        let mut gate = ReadingGate::new();
        gate.admit(1.0).ok();
        // 1.0 -> 1.19 is inside 20%
        assert!(gate.admit(1.19).is_ok());
        // 1.19 -> 1.5 is a 26% jump
        assert!(gate.admit(1.5).is_err());
        // Rejected reading is still the reference: 1.5 -> 1.6 is fine
        assert!(gate.admit(1.6).is_ok());
    }
}
