//! Error types for pneumo-kinematics.

use std::fmt;

use thiserror::Error;

/// Result type for kinematic solves.
pub type Result<T> = std::result::Result<T, Error>;

/// Cylinder chamber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Chamber {
    /// Piston (cap) side
    Head,
    /// Annular rod side
    Rod,
}

impl fmt::Display for Chamber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Head => write!(f, "head"),
            Self::Rod => write!(f, "rod"),
        }
    }
}

/// Geometry errors: a kinematic solve fell outside the physical range.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Requested wheel position cannot be reached by the lever.
    #[error("position {position:.6} m exceeds lever length {lever_length:.6} m")]
    PositionOutOfRange { position: f64, lever_length: f64 },

    /// A chamber would shrink below its residual volume.
    #[error("{chamber} chamber volume {volume:.3e} m³ below residual minimum {minimum:.3e} m³")]
    ResidualVolume {
        chamber: Chamber,
        volume: f64,
        minimum: f64,
    },

    /// Geometry parameters are inconsistent or non-physical.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),
}
