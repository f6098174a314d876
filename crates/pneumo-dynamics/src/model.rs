//! Force assembly and equations of motion for the sprung body.
//!
//! Corner `i` sits at `(xᵢ, yᵢ)` in the body frame: `xᵢ = ±wheelbase/2`
//! (front positive) and `yᵢ = ±track/2` (left positive). Its vertical
//! displacement and velocity are
//!
//! ```text
//! zᵢ = z + yᵢ·sin φ − xᵢ·sin θ
//! żᵢ = ż + yᵢ·cos φ·φ̇ − xᵢ·cos θ·θ̇
//! ```
//!
//! and its suspension deflection is `δᵢ = zᵢ − rᵢ(t)` for road height `rᵢ`.
//! The wheel's position relative to the lever pivot is `−δᵢ`.
//!
//! Per corner, acting upwards on the body:
//! - spring: `k·max(s₀ − δᵢ, 0)`, never pulling; `s₀` is the static preload
//! - damper: `−c·(żᵢ − ṙᵢ)`
//! - cylinder: `−F_cyl·(d stroke / d position)`
//!
//! ```text
//! M·z̈  = ΣFᵢ − M·g
//! Ix·φ̈ = ΣFᵢ·yᵢ·cos φ
//! Iy·θ̈ = −ΣFᵢ·xᵢ·cos θ
//! ```

use pneumo_gas::GasNetwork;
use pneumo_kinematics::{CornerGeometry, CornerId, CylinderState, LeverState, CORNER_COUNT};
use pneumo_road::RoadExcitation;

use crate::error::Result;
use crate::solver::OdeSystem;
use crate::state::{BodyParams, RigidBodyState, SuspensionParams, STATE_DIM};

/// Suspension motion at one corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CornerKinematics {
    /// Body-over-road extension from the static position (m)
    pub deflection: f64,
    /// Extension rate (m/s)
    pub deflection_rate: f64,
    /// Road height under the wheel (m)
    pub road: f64,
    /// Road vertical velocity (m/s)
    pub road_rate: f64,
    /// Lever orientation
    pub lever: LeverState,
}

/// Force contributions at one corner, positive pushing the body up (N).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CornerForce {
    pub spring: f64,
    pub damper: f64,
    pub pneumatic: f64,
}

impl CornerForce {
    pub fn total(&self) -> f64 {
        self.spring + self.damper + self.pneumatic
    }
}

/// Right-hand side of the body equations for one tick.
///
/// Borrows the road and, when pneumatics are enabled, the gas network whose
/// masses stay frozen while the solver runs.
#[derive(Debug, Clone, Copy)]
pub struct RigidBodyModel<'a> {
    body: &'a BodyParams,
    suspension: &'a SuspensionParams,
    corners: &'a [CornerGeometry; CORNER_COUNT],
    road: &'a RoadExcitation,
    gas: Option<&'a GasNetwork>,
}

impl<'a> RigidBodyModel<'a> {
    pub fn new(
        body: &'a BodyParams,
        suspension: &'a SuspensionParams,
        corners: &'a [CornerGeometry; CORNER_COUNT],
        road: &'a RoadExcitation,
    ) -> Self {
        Self {
            body,
            suspension,
            corners,
            road,
            gas: None,
        }
    }

    /// Attach the gas network supplying cylinder pressures.
    #[must_use]
    pub fn with_gas(mut self, gas: &'a GasNetwork) -> Self {
        self.gas = Some(gas);
        self
    }

    /// Body-frame `(x, y)` of a corner's wheel.
    pub fn corner_position(&self, corner: CornerId) -> (f64, f64) {
        let geometry = &self.corners[corner.index()];
        (
            corner.axle() * self.body.wheelbase / 2.0,
            corner.side() * geometry.track() / 2.0,
        )
    }

    /// Deflection, rates and lever state of one corner.
    pub fn corner_kinematics(
        &self,
        t: f64,
        state: &RigidBodyState,
        corner: CornerId,
    ) -> Result<CornerKinematics> {
        let (x, y) = self.corner_position(corner);
        let z = state.heave + y * state.roll.sin() - x * state.pitch.sin();
        let z_rate = state.heave_rate + y * state.roll.cos() * state.roll_rate
            - x * state.pitch.cos() * state.pitch_rate;
        let road = self.road.displacement(corner, t);
        let road_rate = self.road.velocity(corner, t);
        let deflection = z - road;
        let lever = LeverState::from_position(&self.corners[corner.index()], -deflection)?;
        Ok(CornerKinematics {
            deflection,
            deflection_rate: z_rate - road_rate,
            road,
            road_rate,
            lever,
        })
    }

    /// Cylinder states at every corner.
    pub fn cylinder_states(
        &self,
        t: f64,
        state: &RigidBodyState,
    ) -> Result<[CylinderState; CORNER_COUNT]> {
        let mut out = [CylinderState {
            stroke: 0.0,
            volume_head: 0.0,
            volume_rod: 0.0,
        }; CORNER_COUNT];
        for corner in CornerId::ALL {
            let kin = self.corner_kinematics(t, state, corner)?;
            out[corner.index()] = self.corners[corner.index()].cylinder_state(kin.lever)?;
        }
        Ok(out)
    }

    fn spring_compression(&self, deflection: f64) -> f64 {
        self.suspension.preload(self.body.corner_load()) - deflection
    }

    /// Force contributions at one corner.
    pub fn corner_force(
        &self,
        t: f64,
        state: &RigidBodyState,
        corner: CornerId,
    ) -> Result<CornerForce> {
        let kin = self.corner_kinematics(t, state, corner)?;
        let compression = self.spring_compression(kin.deflection);
        let spring = self.suspension.spring_rate * compression.max(0.0);
        let damper = -self.suspension.damping * kin.deflection_rate;

        let pneumatic = match self.gas {
            Some(gas) if self.suspension.pneumatics_enabled => {
                let geometry = &self.corners[corner.index()];
                let cylinder = geometry.cylinder_state(kin.lever)?;
                let (p_head, p_rod) = gas.chamber_pressures_at(corner, &cylinder);
                let axial = geometry.piston_force(p_head, p_rod, gas.config().ambient_pressure);
                -axial * geometry.motion_ratio(kin.lever.angle)
            }
            _ => 0.0,
        };

        Ok(CornerForce {
            spring,
            damper,
            pneumatic,
        })
    }

    /// `[z̈, φ̈, θ̈]`.
    pub fn accelerations(&self, t: f64, state: &RigidBodyState) -> Result<[f64; 3]> {
        let mut force = 0.0;
        let mut roll_moment = 0.0;
        let mut pitch_moment = 0.0;
        for corner in CornerId::ALL {
            let f = self.corner_force(t, state, corner)?.total();
            let (x, y) = self.corner_position(corner);
            force += f;
            roll_moment += f * y * state.roll.cos();
            pitch_moment -= f * x * state.pitch.cos();
        }
        Ok([
            force / self.body.mass - self.body.gravity,
            roll_moment / self.body.roll_inertia,
            pitch_moment / self.body.pitch_inertia,
        ])
    }

    /// Kinetic plus gravitational plus spring potential energy (J).
    ///
    /// Gas energy is not included.
    pub fn mechanical_energy(&self, t: f64, state: &RigidBodyState) -> f64 {
        let kinetic = 0.5 * self.body.mass * state.heave_rate.powi(2)
            + 0.5 * self.body.roll_inertia * state.roll_rate.powi(2)
            + 0.5 * self.body.pitch_inertia * state.pitch_rate.powi(2);
        let gravitational = self.body.mass * self.body.gravity * state.heave;
        let elastic: f64 = CornerId::ALL
            .iter()
            .map(|&corner| {
                let (x, y) = self.corner_position(corner);
                let z = state.heave + y * state.roll.sin() - x * state.pitch.sin();
                let compression = self.spring_compression(z - self.road.displacement(corner, t));
                0.5 * self.suspension.spring_rate * compression.max(0.0).powi(2)
            })
            .sum();
        kinetic + gravitational + elastic
    }
}

impl OdeSystem<STATE_DIM> for RigidBodyModel<'_> {
    fn rhs(&self, t: f64, y: &[f64; STATE_DIM]) -> Result<[f64; STATE_DIM]> {
        let state = RigidBodyState::from_array(*y);
        let [heave_acc, roll_acc, pitch_acc] = self.accelerations(t, &state)?;
        Ok([
            state.heave_rate,
            state.roll_rate,
            state.pitch_rate,
            heave_acc,
            roll_acc,
            pitch_acc,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::{DormandPrince, SolverConfig};
    use pneumo_gas::GasConfig;
    use pneumo_road::RoadProfile;

    struct Fixture {
        body: BodyParams,
        suspension: SuspensionParams,
        corners: [CornerGeometry; CORNER_COUNT],
        road: RoadExcitation,
    }

    impl Fixture {
        fn new(pneumatics: bool) -> Self {
            let body = BodyParams::default();
            Self {
                suspension: SuspensionParams {
                    pneumatics_enabled: pneumatics,
                    ..SuspensionParams::default()
                },
                corners: [CornerGeometry::default(); CORNER_COUNT],
                road: RoadExcitation::new(&RoadProfile::Flat, body.wheelbase).unwrap(),
                body,
            }
        }

        fn model(&self) -> RigidBodyModel<'_> {
            RigidBodyModel::new(&self.body, &self.suspension, &self.corners, &self.road)
        }
    }

    #[test]
    fn static_equilibrium_at_zero_heave() {
        let fixture = Fixture::new(false);
        let acc = fixture.model().accelerations(0.0, &RigidBodyState::default()).unwrap();
        for a in acc {
            assert!(a.abs() < 1e-9, "{acc:?}");
        }
    }

    #[test]
    fn heave_is_restored() {
        let fixture = Fixture::new(false);
        let model = fixture.model();
        let up = RigidBodyState {
            heave: 0.005,
            ..RigidBodyState::default()
        };
        let down = RigidBodyState {
            heave: -0.005,
            ..RigidBodyState::default()
        };
        assert!(model.accelerations(0.0, &up).unwrap()[0] < 0.0);
        assert!(model.accelerations(0.0, &down).unwrap()[0] > 0.0);
    }

    #[test]
    fn roll_and_pitch_are_restored() {
        let fixture = Fixture::new(false);
        let model = fixture.model();
        let rolled = RigidBodyState {
            roll: 0.01,
            ..RigidBodyState::default()
        };
        let pitched = RigidBodyState {
            pitch: 0.01,
            ..RigidBodyState::default()
        };
        assert!(model.accelerations(0.0, &rolled).unwrap()[1] < 0.0);
        assert!(model.accelerations(0.0, &pitched).unwrap()[2] < 0.0);
    }

    #[test]
    fn springs_never_pull() {
        let fixture = Fixture::new(false);
        let model = fixture.model();
        // Lifted far beyond the preload: springs fully unloaded
        let lifted = RigidBodyState {
            heave: 0.05,
            ..RigidBodyState::default()
        };
        for corner in CornerId::ALL {
            assert_eq!(model.corner_force(0.0, &lifted, corner).unwrap().spring, 0.0);
        }
        let acc = model.accelerations(0.0, &lifted).unwrap();
        assert!((acc[0] + fixture.body.gravity).abs() < 1e-12);
    }

    #[test]
    fn damper_opposes_motion() {
        let fixture = Fixture::new(false);
        let moving = RigidBodyState {
            heave_rate: 0.1,
            ..RigidBodyState::default()
        };
        let force = fixture
            .model()
            .corner_force(0.0, &moving, CornerId::FrontLeft)
            .unwrap();
        assert!((force.damper + 250.0).abs() < 1e-9);
    }

    #[test]
    fn cylinder_pushes_back_on_bump() {
        let fixture = Fixture::new(true);
        let cylinders = fixture
            .model()
            .cylinder_states(0.0, &RigidBodyState::default())
            .unwrap();
        let gas = GasNetwork::new(GasConfig::default(), &cylinders).unwrap();
        let model = fixture.model().with_gas(&gas);

        let neutral = model
            .corner_force(0.0, &RigidBodyState::default(), CornerId::RearLeft)
            .unwrap()
            .pneumatic;
        let compressed = RigidBodyState {
            heave: -0.03,
            ..RigidBodyState::default()
        };
        let bumped = model
            .corner_force(0.0, &compressed, CornerId::RearLeft)
            .unwrap()
            .pneumatic;
        assert!(bumped > neutral);
    }

    #[test]
    fn disabled_pneumatics_ignore_gas() {
        let fixture = Fixture::new(false);
        let cylinders = fixture
            .model()
            .cylinder_states(0.0, &RigidBodyState::default())
            .unwrap();
        let gas = GasNetwork::new(GasConfig::default(), &cylinders).unwrap();
        let force = fixture
            .model()
            .with_gas(&gas)
            .corner_force(0.0, &RigidBodyState::default(), CornerId::FrontRight)
            .unwrap();
        assert_eq!(force.pneumatic, 0.0);
    }

    #[test]
    fn lever_out_of_range_is_a_geometry_error() {
        let fixture = Fixture::new(false);
        let sunk = RigidBodyState {
            heave: -1.0,
            ..RigidBodyState::default()
        };
        let err = fixture.model().accelerations(0.0, &sunk).unwrap_err();
        assert!(matches!(err, crate::Error::Geometry(_)));
    }

    #[test]
    fn free_damped_oscillation_loses_energy() {
        let fixture = Fixture::new(false);
        let model = fixture.model();
        let mut solver = DormandPrince::new(SolverConfig::default().with_tolerances(1e-10, 1e-13));
        let mut state = RigidBodyState {
            heave: 0.003,
            roll: 0.002,
            pitch: -0.002,
            ..RigidBodyState::default()
        };
        let e0 = model.mechanical_energy(0.0, &state);
        let mut previous = e0;
        let dt = 1e-3;
        for step in 0..2000 {
            let t0 = step as f64 * dt;
            let y = solver.integrate(&model, t0, state.to_array(), t0 + dt).unwrap();
            state = RigidBodyState::from_array(y);
            let e = model.mechanical_energy(t0 + dt, &state);
            assert!(e <= previous + 1e-7, "energy rose at step {step}: {previous} -> {e}");
            previous = e;
        }
        assert!(previous < e0 - 1.0, "{e0} -> {previous}");
    }
}
