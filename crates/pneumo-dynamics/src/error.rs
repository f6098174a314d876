//! Error types for pneumo-dynamics.

use thiserror::Error;

/// Result type for dynamics evaluation and integration.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while evaluating or integrating the body dynamics.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The state or its derivative became NaN/Inf, or the solver gave up.
    #[error("integration diverged at t={time:.6} s: {reason}")]
    IntegrationDiverged { time: f64, reason: String },

    /// The adaptive step shrank below the configured minimum.
    #[error("step size {step:.3e} s below minimum at t={time:.6} s")]
    StepSizeUnderflow { time: f64, step: f64 },

    /// A corner left its kinematic range.
    #[error(transparent)]
    Geometry(#[from] pneumo_kinematics::Error),
}
