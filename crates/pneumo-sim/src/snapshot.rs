//! Immutable per-step state snapshots.

use std::fmt;

use pneumo_dynamics::RigidBodyState;
use pneumo_gas::{LineState, TankState, ValveFlags};
use pneumo_kinematics::{CornerId, CORNER_COUNT};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Kinematic state of one wheel corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WheelCornerState {
    pub corner: CornerId,
    /// Lever angle (rad)
    pub lever_angle: f64,
    /// Cylinder stroke from neutral (m)
    pub stroke: f64,
    /// Head chamber volume (m³)
    pub volume_head: f64,
    /// Rod chamber volume (m³)
    pub volume_rod: f64,
    /// Piston position from the fully retracted end (m)
    pub piston_position: f64,
    /// Road height under the wheel (m)
    pub road_input: f64,
    /// Lever/barrel clearance; negative means interference (m)
    pub clearance: f64,
}

/// What kind of failure stopped the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    Configuration,
    Geometry,
    NumericalInstability,
    IntegrationDiverged,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "configuration"),
            Self::Geometry => write!(f, "geometry"),
            Self::NumericalInstability => write!(f, "numerical instability"),
            Self::IntegrationDiverged => write!(f, "integration diverged"),
        }
    }
}

/// A tick that could not be completed even after all retries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fault {
    pub kind: FaultKind,
    /// Last error message
    pub message: String,
    /// Simulation time of the failed tick's start (s)
    pub sim_time: f64,
    /// Retries attempted
    pub retries: u32,
}

impl Fault {
    /// Fault from the error of the last attempt.
    pub fn from_error(error: &Error, sim_time: f64, retries: u32) -> Self {
        let kind = match error {
            Error::Geometry(_) => FaultKind::Geometry,
            Error::NumericalInstability { .. } => FaultKind::NumericalInstability,
            Error::IntegrationDiverged { .. } => FaultKind::IntegrationDiverged,
            Error::Configuration(_)
            | Error::InvalidTransition { .. }
            | Error::ShutdownTimeout(_)
            | Error::WorkerPanicked
            | Error::WorkerStopped
            | Error::WorkerSpawn(_) => FaultKind::Configuration,
        };
        Self {
            kind,
            message: error.to_string(),
            sim_time,
            retries,
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at t={:.6} s after {} retries: {}",
            self.kind, self.sim_time, self.retries, self.message
        )
    }
}

/// Full simulation state at one step. Never mutated after publication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Simulation time (s)
    pub sim_time: f64,
    /// Accepted ticks since construction or reset
    pub step_count: u64,
    pub body: RigidBodyState,
    pub corners: [WheelCornerState; CORNER_COUNT],
    pub lines: [LineState; CORNER_COUNT],
    pub tank: TankState,
    pub valves: ValveFlags,
    /// Set when the loop stopped on this snapshot
    pub fault: Option<Fault>,
}

impl StateSnapshot {
    pub fn corner(&self, corner: CornerId) -> &WheelCornerState {
        &self.corners[corner.index()]
    }

    pub fn line(&self, corner: CornerId) -> &LineState {
        &self.lines[corner.index()]
    }

    pub fn is_faulted(&self) -> bool {
        self.fault.is_some()
    }

    /// Smallest clearance over all corners (m).
    pub fn min_clearance(&self) -> f64 {
        self.corners
            .iter()
            .map(|c| c.clearance)
            .fold(f64::INFINITY, f64::min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::physics::Physics;

    #[test]
    fn fault_kind_follows_error() {
        let err = Error::IntegrationDiverged {
            time: 0.5,
            reason: "state component 0 is NaN".into(),
        };
        let fault = Fault::from_error(&err, 0.5, 4);
        assert_eq!(fault.kind, FaultKind::IntegrationDiverged);
        assert_eq!(fault.retries, 4);
        assert!(fault.to_string().contains("after 4 retries"));
    }

    #[test]
    fn snapshot_serialises_to_json() {
        let snapshot = Physics::new(SimulationConfig::default()).unwrap().snapshot();
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"step_count\":0"));
        let back: StateSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.step_count, 0);
        assert_eq!(back.corners[3].corner, CornerId::RearRight);
        assert_eq!(back.fault, None);
    }

    #[test]
    fn neutral_corners_have_clearance() {
        let snapshot = Physics::new(SimulationConfig::default()).unwrap().snapshot();
        assert!(snapshot.min_clearance() > 0.0);
        let fl = snapshot.corner(CornerId::FrontLeft);
        assert_eq!(fl.stroke, 0.0);
        assert!((fl.piston_position - 0.1).abs() < 1e-12);
    }
}
