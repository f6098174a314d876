//! Body parameters and the rigid-body state vector.

use serde::{Deserialize, Serialize};

/// Length of the state vector `[z, φ, θ, ż, φ̇, θ̇]`.
pub const STATE_DIM: usize = 6;

/// Sprung-mass properties.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyParams {
    /// Sprung mass (kg)
    pub mass: f64,
    /// Roll moment of inertia (kg·m²)
    pub roll_inertia: f64,
    /// Pitch moment of inertia (kg·m²)
    pub pitch_inertia: f64,
    /// Front-to-rear axle distance (m)
    pub wheelbase: f64,
    /// Gravitational acceleration (m/s²)
    pub gravity: f64,
}

impl Default for BodyParams {
    fn default() -> Self {
        Self {
            mass: 400.0,
            roll_inertia: 60.0,
            pitch_inertia: 180.0,
            wheelbase: 2.0,
            gravity: 9.81,
        }
    }
}

impl BodyParams {
    /// Static load carried by each corner (N).
    pub fn corner_load(&self) -> f64 {
        self.mass * self.gravity / 4.0
    }
}

/// Per-corner spring/damper and the pneumatic switch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SuspensionParams {
    /// Spring rate per corner (N/m)
    pub spring_rate: f64,
    /// Damping coefficient per corner (N·s/m)
    pub damping: f64,
    /// Whether cylinder forces act on the body
    pub pneumatics_enabled: bool,
}

impl Default for SuspensionParams {
    fn default() -> Self {
        Self {
            spring_rate: 100_000.0,
            damping: 2_500.0,
            pneumatics_enabled: true,
        }
    }
}

impl SuspensionParams {
    /// Spring compression at zero deflection so the springs alone carry
    /// `corner_load` (m).
    pub fn preload(&self, corner_load: f64) -> f64 {
        corner_load / self.spring_rate
    }
}

/// Heave, roll, pitch and their rates.
///
/// Heave is positive up, roll positive lifts the left side, pitch positive
/// lowers the front.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RigidBodyState {
    /// Heave (m)
    pub heave: f64,
    /// Roll (rad)
    pub roll: f64,
    /// Pitch (rad)
    pub pitch: f64,
    /// Heave rate (m/s)
    pub heave_rate: f64,
    /// Roll rate (rad/s)
    pub roll_rate: f64,
    /// Pitch rate (rad/s)
    pub pitch_rate: f64,
}

impl RigidBodyState {
    pub fn to_array(&self) -> [f64; STATE_DIM] {
        [
            self.heave,
            self.roll,
            self.pitch,
            self.heave_rate,
            self.roll_rate,
            self.pitch_rate,
        ]
    }

    pub fn from_array(y: [f64; STATE_DIM]) -> Self {
        Self {
            heave: y[0],
            roll: y[1],
            pitch: y[2],
            heave_rate: y[3],
            roll_rate: y[4],
            pitch_rate: y[5],
        }
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_round_trip() {
        let state = RigidBodyState {
            heave: 0.01,
            roll: -0.02,
            pitch: 0.03,
            heave_rate: 0.1,
            roll_rate: -0.2,
            pitch_rate: 0.3,
        };
        assert_eq!(RigidBodyState::from_array(state.to_array()), state);
    }

    #[test]
    fn nan_is_not_finite() {
        let state = RigidBodyState {
            pitch_rate: f64::NAN,
            ..RigidBodyState::default()
        };
        assert!(!state.is_finite());
        assert!(RigidBodyState::default().is_finite());
    }

    #[test]
    fn preload_carries_corner_load() {
        let body = BodyParams::default();
        let suspension = SuspensionParams::default();
        let preload = suspension.preload(body.corner_load());
        assert!((4.0 * suspension.spring_rate * preload - body.mass * body.gravity).abs() < 1e-9);
    }
}
