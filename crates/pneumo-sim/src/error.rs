//! Error types for pneumo-sim.

use std::time::Duration;

use pneumo_gas::GasNode;
use thiserror::Error;

use crate::control::{Command, LoopState};

/// Result type for simulation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the simulation core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Configuration rejected; the run never starts with it.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Kinematic solve outside the physical range.
    #[error("geometry: {0}")]
    Geometry(#[from] pneumo_kinematics::Error),

    /// Negative or non-finite gas state.
    #[error("numerical instability at {node}: {quantity} = {value}")]
    NumericalInstability {
        node: GasNode,
        quantity: &'static str,
        value: f64,
    },

    /// The body integrator failed.
    #[error("integration diverged at t={time:.6} s: {reason}")]
    IntegrationDiverged { time: f64, reason: String },

    /// Control command not valid in the current state.
    #[error("cannot {command} while {from}")]
    InvalidTransition { from: LoopState, command: Command },

    /// The worker did not acknowledge shutdown in time.
    #[error("worker did not stop within {0:?}")]
    ShutdownTimeout(Duration),

    /// The worker thread panicked.
    #[error("simulation worker panicked")]
    WorkerPanicked,

    /// The worker is no longer running.
    #[error("simulation worker is not running")]
    WorkerStopped,

    /// The worker thread could not be started.
    #[error("failed to start simulation worker: {0}")]
    WorkerSpawn(String),
}

impl From<pneumo_gas::Error> for Error {
    fn from(err: pneumo_gas::Error) -> Self {
        match err {
            pneumo_gas::Error::NumericalInstability {
                node,
                quantity,
                value,
            } => Self::NumericalInstability {
                node,
                quantity,
                value,
            },
            pneumo_gas::Error::Configuration(msg) => Self::Configuration(msg),
            pneumo_gas::Error::Geometry(err) => Self::Geometry(err),
        }
    }
}

impl From<pneumo_dynamics::Error> for Error {
    fn from(err: pneumo_dynamics::Error) -> Self {
        match err {
            pneumo_dynamics::Error::IntegrationDiverged { time, reason } => {
                Self::IntegrationDiverged { time, reason }
            }
            pneumo_dynamics::Error::StepSizeUnderflow { time, step } => Self::IntegrationDiverged {
                time,
                reason: format!("step size {step:.3e} s below minimum"),
            },
            pneumo_dynamics::Error::Geometry(err) => Self::Geometry(err),
        }
    }
}

impl From<pneumo_road::Error> for Error {
    fn from(err: pneumo_road::Error) -> Self {
        Self::Configuration(format!("road: {err}"))
    }
}
