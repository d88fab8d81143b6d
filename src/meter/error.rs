use thiserror::Error;

/// Errors raised by the level meter
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeterError {
    /// Rejected at construction time; the meter is never built
    #[error("Invalid meter configuration: {0}")]
    Configuration(String),

    /// A snapshot whose value and peak series differ in length
    #[error("Snapshot has {values} values but {peaks} peaks")]
    InvariantViolation { values: usize, peaks: usize },

    /// A NaN or infinite level, which would keep the animation from settling
    #[error("Channel {channel} has a non-finite level")]
    NonFinite { channel: usize },
}
