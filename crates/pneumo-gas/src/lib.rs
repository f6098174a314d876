//! Pneumostab Gas Network
//!
//! Lumped control-volume model of the stabilizer's pneumatics: two chambers
//! per corner cylinder, a shared receiver tank, check/relief valves and the
//! diagonal coupling behind the master isolation valve.
//!
//! # Valve Dispatch
//!
//! Valve behaviour is a closed set of variants ([`ValveKind`]) matched
//! exhaustively in [`flow`]; there is no string or integer kind code.
//!
//! # Thermodynamics
//!
//! Each volume is an ideal gas in either isothermal or adiabatic mode.
//! Between gas steps the body dynamics read pressures at fixed mass through
//! [`GasVolumeState::pressure_at`].

mod error;
mod network;
mod thermo;
mod valve;

pub use error::{Error, Result};
pub use network::{
    CheckValveConfig, GasConfig, GasNetwork, GasNode, LineMode, LineState, LineValveFlags,
    ReliefValveConfig, TankState, ValveFlags, DIAGONAL_PAIRS,
};
pub use thermo::{GasProperties, GasVolumeState, ThermoMode};
pub use valve::{circle_area, flow, orifice_mass_flow, Valve, ValveKind};
