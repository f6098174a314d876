//! Error types for pneumo-gas.

use thiserror::Error;

use crate::network::GasNode;

/// Result type for gas network operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the gas network.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A step produced a negative or non-finite pressure, mass or temperature.
    /// The step is rejected and the network keeps its previous state.
    #[error("numerical instability at {node}: {quantity} = {value}")]
    NumericalInstability {
        node: GasNode,
        quantity: &'static str,
        value: f64,
    },

    /// Gas configuration is invalid.
    #[error("invalid gas configuration: {0}")]
    Configuration(String),

    /// Chamber volumes could not be solved.
    #[error(transparent)]
    Geometry(#[from] pneumo_kinematics::Error),
}
