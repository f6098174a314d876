//! Pneumostab Corner Kinematics
//!
//! Lever/cylinder geometry for a four-corner pneumatic stabilizer.
//!
//! # Corner Model
//!
//! Each corner is a planar linkage seen in the lateral/vertical plane:
//! - a lever of length `L` hinged on the body at a pivot `pivot_offset` from
//!   the centreline, carrying the wheel at its tip
//! - a double-acting cylinder whose barrel is hinged on the frame and whose
//!   rod is pinned part-way along the lever
//!
//! The wheel's vertical position relative to the pivot is `L·sin(angle)`, so
//! the track is always `2·(L + pivot_offset)`. Cylinder stroke is measured
//! from the neutral hinge distance, which makes `stroke(0) = 0` by
//! construction.
//!
//! # Interference
//!
//! Lever and cylinder barrel are treated as 2D capsules. The clearance is the
//! minimum segment distance minus both radii; a negative value means the
//! parts overlap.
//!
//! Everything in this crate is pure and stateless.

mod capsule;
mod corner;
mod error;
mod geometry;

pub use capsule::{interference, segment_distance, Segment};
pub use corner::CornerId;
pub use error::{Chamber, Error, Result};
pub use geometry::{CornerGeometry, CylinderState, LeverState};

/// Minimum chamber volume as a fraction of the full chamber volume.
pub const RESIDUAL_VOLUME_FRACTION: f64 = 0.005;

/// Number of suspension corners.
pub const CORNER_COUNT: usize = 4;
