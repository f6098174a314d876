//! Deterministic physics core: one tick advances gas and body together.
//!
//! A tick integrates the body over `dt` with chamber masses frozen, moves
//! the chambers to the resulting cylinder volumes and then steps the gas
//! network over the same interval. Nothing is committed until every part
//! has succeeded.
//!
//! A rejected tick is retried from the same starting state with the step
//! split into 2, 4, 8, ... substeps, up to `max_retries` times. When the
//! last retry fails too the core records a [`Fault`] and stays where it was.

use pneumo_dynamics::{DormandPrince, RigidBodyModel, RigidBodyState};
use pneumo_gas::GasNetwork;
use pneumo_kinematics::{CornerId, CylinderState, CORNER_COUNT};
use pneumo_road::RoadExcitation;
use tracing::{debug, error, warn};

use crate::config::SimulationConfig;
use crate::error::Result;
use crate::snapshot::{Fault, StateSnapshot, WheelCornerState};

/// Result of a successful advance, not yet committed.
struct Advance {
    body: RigidBodyState,
    gas: GasNetwork,
    solver: DormandPrince,
    corners: [WheelCornerState; CORNER_COUNT],
    time: f64,
}

/// The simulation state and the components that evolve it.
#[derive(Debug, Clone)]
pub struct Physics {
    config: SimulationConfig,
    road: RoadExcitation,
    gas: GasNetwork,
    solver: DormandPrince,
    body: RigidBodyState,
    corners: [WheelCornerState; CORNER_COUNT],
    time: f64,
    step_count: u64,
    fault: Option<Fault>,
}

impl Physics {
    /// Build the initial state for `config`: body at rest, gas at its
    /// configured initial pressures.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let road = RoadExcitation::new(&config.road, config.body.wheelbase)?;
        Self::from_parts(config, road)
    }

    fn from_parts(config: SimulationConfig, road: RoadExcitation) -> Result<Self> {
        let body = RigidBodyState::default();
        let (cylinders, corners) = corner_states(&config, &road, 0.0, &body)?;
        let gas = GasNetwork::new(config.gas, &cylinders)?;
        Ok(Self {
            solver: DormandPrince::new(config.solver),
            config,
            road,
            gas,
            body,
            corners,
            time: 0.0,
            step_count: 0,
            fault: None,
        })
    }

    /// Return to the freshly constructed state under the current config.
    pub fn reset(&mut self) -> Result<()> {
        let mut road = self.road.clone();
        road.restart();
        *self = Self::from_parts(self.config.clone(), road)?;
        debug!("physics reset");
        Ok(())
    }

    /// Switch to a new configuration, keeping the current state.
    ///
    /// On error nothing changes.
    pub fn apply_config(&mut self, config: SimulationConfig) -> Result<()> {
        config.validate()?;

        let road = if config.road != self.config.road
            || config.body.wheelbase != self.config.body.wheelbase
        {
            RoadExcitation::new(&config.road, config.body.wheelbase)?
        } else {
            self.road.clone()
        };
        let mut gas = self.gas.clone();
        gas.set_config(config.gas)?;
        let (_, corners) = corner_states(&config, &road, self.time, &self.body)?;

        if config.solver != self.config.solver {
            self.solver.set_config(config.solver);
        }
        debug!(dt = config.dt, road = config.road.label(), "configuration applied");
        self.road = road;
        self.gas = gas;
        self.corners = corners;
        self.config = config;
        Ok(())
    }

    /// Advance by one physics step, retrying with smaller substeps on
    /// rejection.
    pub fn tick(&mut self) -> std::result::Result<(), Fault> {
        let mut attempt = 0u32;
        loop {
            match self.advance(1u32 << attempt) {
                Ok(advance) => {
                    self.commit(advance);
                    return Ok(());
                }
                Err(err) if attempt < self.config.max_retries => {
                    warn!(
                        t = self.time,
                        attempt,
                        substeps = 1u32 << attempt,
                        error = %err,
                        "tick rejected, retrying with a smaller step"
                    );
                    attempt += 1;
                }
                Err(err) => {
                    let fault = Fault::from_error(&err, self.time, attempt);
                    error!(%fault, "tick failed after all retries");
                    self.fault = Some(fault.clone());
                    return Err(fault);
                }
            }
        }
    }

    fn advance(&self, substeps: u32) -> Result<Advance> {
        let dt = self.config.dt;
        let h = dt / f64::from(substeps);
        let mut gas = self.gas.clone();
        let mut solver = self.solver.clone();
        let mut body = self.body;
        let mut t = self.time;

        for i in 1..=substeps {
            let t_next = if i == substeps {
                self.time + dt
            } else {
                self.time + h * f64::from(i)
            };
            let model = RigidBodyModel::new(
                &self.config.body,
                &self.config.suspension,
                &self.config.corners,
                &self.road,
            )
            .with_gas(&gas);
            let y = solver.integrate(&model, t, body.to_array(), t_next)?;
            body = RigidBodyState::from_array(y);
            let cylinders = model.cylinder_states(t_next, &body)?;
            gas.step(t_next - t, &cylinders)?;
            t = t_next;
        }

        let (_, corners) = corner_states(&self.config, &self.road, t, &body)?;
        Ok(Advance {
            body,
            gas,
            solver,
            corners,
            time: t,
        })
    }

    fn commit(&mut self, advance: Advance) {
        for (old, new) in self.corners.iter().zip(&advance.corners) {
            if new.clearance < 0.0 && old.clearance >= 0.0 {
                warn!(
                    corner = %new.corner,
                    clearance = new.clearance,
                    t = advance.time,
                    "lever/cylinder interference"
                );
            }
        }
        self.body = advance.body;
        self.gas = advance.gas;
        self.solver = advance.solver;
        self.corners = advance.corners;
        self.time = advance.time;
        self.step_count += 1;
        self.fault = None;
    }

    /// Immutable copy of the current state.
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            sim_time: self.time,
            step_count: self.step_count,
            body: self.body,
            corners: self.corners,
            lines: *self.gas.lines(),
            tank: *self.gas.tank(),
            valves: *self.gas.flags(),
            fault: self.fault.clone(),
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    pub fn body(&self) -> &RigidBodyState {
        &self.body
    }

    pub fn gas(&self) -> &GasNetwork {
        &self.gas
    }

    pub fn road(&self) -> &RoadExcitation {
        &self.road
    }

    pub fn fault(&self) -> Option<&Fault> {
        self.fault.as_ref()
    }

    /// Mark the state as faulted without advancing.
    pub(crate) fn set_fault(&mut self, fault: Fault) {
        self.fault = Some(fault);
    }

    /// Body mechanical energy at the current time (J).
    pub fn mechanical_energy(&self) -> f64 {
        RigidBodyModel::new(
            &self.config.body,
            &self.config.suspension,
            &self.config.corners,
            &self.road,
        )
        .mechanical_energy(self.time, &self.body)
    }
}

fn corner_states(
    config: &SimulationConfig,
    road: &RoadExcitation,
    t: f64,
    body: &RigidBodyState,
) -> Result<(
    [CylinderState; CORNER_COUNT],
    [WheelCornerState; CORNER_COUNT],
)> {
    let model = RigidBodyModel::new(&config.body, &config.suspension, &config.corners, road);
    let cylinders = model.cylinder_states(t, body)?;
    let mut corners = [WheelCornerState {
        corner: CornerId::FrontLeft,
        lever_angle: 0.0,
        stroke: 0.0,
        volume_head: 0.0,
        volume_rod: 0.0,
        piston_position: 0.0,
        road_input: 0.0,
        clearance: 0.0,
    }; CORNER_COUNT];

    for corner in CornerId::ALL {
        let geometry = &config.corners[corner.index()];
        let kin = model.corner_kinematics(t, body, corner)?;
        let cylinder = cylinders[corner.index()];
        corners[corner.index()] = WheelCornerState {
            corner,
            lever_angle: kin.lever.angle,
            stroke: cylinder.stroke,
            volume_head: cylinder.volume_head,
            volume_rod: cylinder.volume_rod,
            piston_position: geometry.stroke_max / 2.0 + cylinder.stroke,
            road_input: kin.road,
            clearance: geometry.clearance(kin.lever.angle),
        };
    }
    Ok((cylinders, corners))
}
