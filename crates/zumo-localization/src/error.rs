//! Error types for the particle filter and the reading/command ingestion path.

use thiserror::Error;

/// Errors raised while constructing or configuring a [`ParticleFilter`](crate::ParticleFilter).
#[derive(Error, Debug, PartialEq)]
pub enum FilterError {
    /// A filter parameter is out of range.
    #[error("Invalid filter configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Errors raised while turning wire messages into filter inputs.
///
/// None of these abort a cycle. The caller logs them and carries on with the
/// reading treated as absent.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IngestError {
    /// The reading is zero or jumped more than the allowed fraction away from the previous one.
    #[error("Range reading {reading:.3} m rejected (previous {previous:.3} m)")]
    SensorReadingInvalid {
        /// Rejected reading, metres.
        reading: f64,
        /// Reading it was compared against, metres.
        previous: f64,
    },

    /// A command symbol outside `"0"`..=`"4"`.
    #[error("Unknown command symbol {0:?}")]
    UnknownCommand(String),

    /// A reading that is not a finite, non-negative number of millimetres.
    #[error("Malformed range reading {0:?}")]
    MalformedReading(String),
}
