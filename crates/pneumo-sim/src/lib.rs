//! Pneumostab Simulation Loop
//!
//! Couples road excitation, body dynamics and the gas network into one
//! fixed-step simulation and runs it in real time on a worker thread.
//!
//! # Architecture
//!
//! - **Physics**: one tick = body integration with gas masses frozen, then
//!   the transactional gas step. Rejected ticks are retried with halved
//!   substeps before a [`Fault`] is recorded.
//! - **Loop**: [`SimulationLoop`] owns the worker and accepts lifecycle
//!   [`Command`]s and [`ConfigPatch`]es, applied at tick boundaries.
//! - **Bus**: [`StateBus`] holds only the latest [`StateSnapshot`].
//!
//! # Usage
//!
//! ```ignore
//! let sim = SimulationLoop::spawn(SimulationConfig::default())?;
//! sim.control(Command::Start)?;
//! if let Some(snapshot) = sim.subscribe() {
//!     println!("t = {}", snapshot.sim_time);
//! }
//! ```

mod bus;
mod config;
mod control;
mod error;
mod physics;
mod runner;
mod snapshot;

pub use bus::StateBus;
pub use config::{ConfigPatch, SimulationConfig, MAX_DT, MAX_RETRIES};
pub use control::{Command, LoopState};
pub use error::{Error, Result};
pub use physics::Physics;
pub use runner::{SimulationLoop, DEFAULT_SHUTDOWN_TIMEOUT};
pub use snapshot::{Fault, FaultKind, StateSnapshot, WheelCornerState};
