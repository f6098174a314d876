//! Pneumostab Road Excitation
//!
//! Per-corner road displacement signals keyed by simulation time.
//!
//! # Profiles
//!
//! - **Sine**: `A·sin(2πft + φ + φᵢ)` with a per-corner phase offset
//! - **ISO 8608**: class-based random road, synthesised by harmonic
//!   superposition with seeded random phases; rear wheels follow the front
//!   wheels on the same track after `wheelbase / speed`
//! - **Table**: externally supplied samples, linearly interpolated and
//!   clamped at the edges
//!
//! # Determinism
//!
//! Every [`RoadExcitation`] owns its random generator. All randomness is
//! consumed at construction, after which the signal is a pure function of
//! time: the same seed and the same time always give the same value, and
//! [`RoadExcitation::restart`] rebuilds the identical signal.

mod error;
mod excitation;
mod iso8608;
mod profile;

pub use error::{Error, Result};
pub use excitation::{RoadExcitation, RoadSamples};
pub use iso8608::RoadClass;
pub use profile::{RoadProfile, RoadSample, MAX_COMPONENTS};
