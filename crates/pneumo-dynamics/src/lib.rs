//! Pneumostab Body Dynamics
//!
//! Three-degree-of-freedom sprung body (heave, roll, pitch) on four
//! lever/cylinder corners.
//!
//! # Forces
//!
//! Each corner contributes a one-sided spring, a viscous damper and, when
//! enabled, the cylinder force projected through the lever geometry. The
//! springs carry a static preload equal to the corner weight, so with
//! pneumatics off the body rests at zero heave.
//!
//! # Integration
//!
//! [`DormandPrince`] integrates any [`OdeSystem`] with an adaptive
//! Dormand–Prince 5(4) scheme. NaN/Inf in a stage derivative or in the new
//! state aborts with [`Error::IntegrationDiverged`].

mod error;
mod model;
mod solver;
mod state;

pub use error::{Error, Result};
pub use model::{CornerForce, CornerKinematics, RigidBodyModel};
pub use solver::{DormandPrince, OdeSystem, SolverConfig};
pub use state::{BodyParams, RigidBodyState, SuspensionParams, STATE_DIM};
