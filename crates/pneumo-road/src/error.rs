//! Error types for pneumo-road.

use thiserror::Error;

/// Result type for road profile construction.
pub type Result<T> = std::result::Result<T, Error>;

/// Road profile configuration errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A numeric parameter is out of range.
    #[error("invalid road parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    /// A tabulated profile has no samples.
    #[error("tabulated road profile is empty")]
    EmptyTable,

    /// Tabulated sample times are not strictly increasing.
    #[error("tabulated road times must be strictly increasing (sample {index} at t={time})")]
    UnsortedTable { index: usize, time: f64 },
}
