//! Error types for data validation in airhub-types.

use thiserror::Error;
use time::OffsetDateTime;

/// Errors raised while parsing or validating sensor data.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The reading type name is not one of the four known kinds.
    #[error("Unknown reading type: {0}")]
    UnknownReadingType(String),

    /// The unit does not belong to the reading type it was paired with.
    #[error("Unit '{unit}' does not match reading type {reading_type}")]
    UnitMismatch {
        reading_type: crate::ReadingType,
        unit: String,
    },

    /// NaN or infinite measurement value.
    #[error("Value {0} is not a finite number")]
    NonFiniteValue(f64),

    /// Device identifier is empty.
    #[error("Device id cannot be empty")]
    EmptyDeviceId,

    /// Time range whose start is after its end.
    #[error("Invalid time range: start {start} is after end {end}")]
    InvalidRange {
        start: OffsetDateTime,
        end: OffsetDateTime,
    },
}

/// Result type alias using airhub-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
