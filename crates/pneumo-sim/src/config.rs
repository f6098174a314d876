//! Simulation configuration and partial updates.

use pneumo_dynamics::{BodyParams, SolverConfig, SuspensionParams};
use pneumo_gas::GasConfig;
use pneumo_kinematics::{CornerGeometry, CornerId, CORNER_COUNT};
use pneumo_road::RoadProfile;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Largest accepted physics step (s).
pub const MAX_DT: f64 = 0.1;

/// Largest accepted retry count; the last retry runs `2^MAX_RETRIES` substeps.
pub const MAX_RETRIES: u32 = 12;

/// Everything needed to build and run a simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Corner geometry, indexed by `CornerId::index()`
    pub corners: [CornerGeometry; CORNER_COUNT],
    /// Sprung body
    pub body: BodyParams,
    /// Springs, dampers and the pneumatic switch
    pub suspension: SuspensionParams,
    /// Gas network
    pub gas: GasConfig,
    /// Road excitation
    pub road: RoadProfile,
    /// Body integrator tolerances
    pub solver: SolverConfig,
    /// Physics step (s)
    pub dt: f64,
    /// Simulated seconds per wall-clock second; 0 holds the state
    pub speed: f64,
    /// Step halvings tried before a tick is declared faulted
    pub max_retries: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            corners: [CornerGeometry::default(); CORNER_COUNT],
            body: BodyParams::default(),
            suspension: SuspensionParams::default(),
            gas: GasConfig::default(),
            road: RoadProfile::Flat,
            solver: SolverConfig::default(),
            dt: 1e-3,
            speed: 1.0,
            max_retries: 4,
        }
    }
}

impl SimulationConfig {
    /// Use the same geometry on all four corners.
    #[must_use]
    pub fn with_corner_geometry(mut self, geometry: CornerGeometry) -> Self {
        self.corners = [geometry; CORNER_COUNT];
        self
    }

    /// Set the body parameters.
    #[must_use]
    pub fn with_body(mut self, body: BodyParams) -> Self {
        self.body = body;
        self
    }

    /// Set the suspension parameters.
    #[must_use]
    pub fn with_suspension(mut self, suspension: SuspensionParams) -> Self {
        self.suspension = suspension;
        self
    }

    /// Enable or disable cylinder forces on the body.
    #[must_use]
    pub fn with_pneumatics(mut self, enabled: bool) -> Self {
        self.suspension.pneumatics_enabled = enabled;
        self
    }

    /// Set the gas network configuration.
    #[must_use]
    pub fn with_gas(mut self, gas: GasConfig) -> Self {
        self.gas = gas;
        self
    }

    /// Set the road profile.
    #[must_use]
    pub fn with_road(mut self, road: RoadProfile) -> Self {
        self.road = road;
        self
    }

    /// Set the integrator configuration.
    #[must_use]
    pub fn with_solver(mut self, solver: SolverConfig) -> Self {
        self.solver = solver;
        self
    }

    /// Set the physics step.
    #[must_use]
    pub fn with_dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    /// Set the speed multiplier.
    #[must_use]
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    /// Set the retry bound.
    #[must_use]
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Reject anything the simulation could not run with.
    pub fn validate(&self) -> Result<()> {
        for corner in CornerId::ALL {
            self.corners[corner.index()]
                .validate()
                .map_err(|e| Error::Configuration(format!("corner {corner}: {e}")))?;
        }

        let body = &self.body;
        for (name, value) in [
            ("body.mass", body.mass),
            ("body.roll_inertia", body.roll_inertia),
            ("body.pitch_inertia", body.pitch_inertia),
            ("body.wheelbase", body.wheelbase),
            ("suspension.spring_rate", self.suspension.spring_rate),
            ("solver.rtol", self.solver.rtol),
            ("solver.atol", self.solver.atol),
            ("solver.min_step", self.solver.min_step),
        ] {
            positive(name, value)?;
        }
        non_negative("body.gravity", body.gravity)?;
        non_negative("suspension.damping", self.suspension.damping)?;
        non_negative("speed", self.speed)?;
        if self.solver.max_steps == 0 {
            return Err(Error::Configuration("solver.max_steps must be at least 1".into()));
        }

        if !self.dt.is_finite() || self.dt <= 0.0 || self.dt > MAX_DT {
            return Err(Error::Configuration(format!(
                "dt must be in (0, {MAX_DT}] s, got {}",
                self.dt
            )));
        }
        if self.max_retries > MAX_RETRIES {
            return Err(Error::Configuration(format!(
                "max_retries must be at most {MAX_RETRIES}, got {}",
                self.max_retries
            )));
        }

        self.gas
            .validate()
            .map_err(|e| Error::Configuration(format!("gas: {e}")))?;
        self.road.validate()?;
        Ok(())
    }
}

fn positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::Configuration(format!("{name} must be positive, got {value}")))
    }
}

fn non_negative(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(Error::Configuration(format!(
            "{name} must be non-negative, got {value}"
        )))
    }
}

/// A partial configuration; unset fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigPatch {
    pub corners: Option<[CornerGeometry; CORNER_COUNT]>,
    pub body: Option<BodyParams>,
    pub suspension: Option<SuspensionParams>,
    pub gas: Option<GasConfig>,
    pub road: Option<RoadProfile>,
    pub solver: Option<SolverConfig>,
    pub dt: Option<f64>,
    pub speed: Option<f64>,
    pub max_retries: Option<u32>,
}

impl ConfigPatch {
    /// Patch with nothing set.
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_corners(mut self, corners: [CornerGeometry; CORNER_COUNT]) -> Self {
        self.corners = Some(corners);
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: BodyParams) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_suspension(mut self, suspension: SuspensionParams) -> Self {
        self.suspension = Some(suspension);
        self
    }

    #[must_use]
    pub fn with_gas(mut self, gas: GasConfig) -> Self {
        self.gas = Some(gas);
        self
    }

    #[must_use]
    pub fn with_road(mut self, road: RoadProfile) -> Self {
        self.road = Some(road);
        self
    }

    #[must_use]
    pub fn with_solver(mut self, solver: SolverConfig) -> Self {
        self.solver = Some(solver);
        self
    }

    #[must_use]
    pub fn with_dt(mut self, dt: f64) -> Self {
        self.dt = Some(dt);
        self
    }

    #[must_use]
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    #[must_use]
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Whether no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Fold `later` over `self`; fields set in `later` win.
    #[must_use]
    pub fn merge(self, later: ConfigPatch) -> Self {
        Self {
            corners: later.corners.or(self.corners),
            body: later.body.or(self.body),
            suspension: later.suspension.or(self.suspension),
            gas: later.gas.or(self.gas),
            road: later.road.or(self.road),
            solver: later.solver.or(self.solver),
            dt: later.dt.or(self.dt),
            speed: later.speed.or(self.speed),
            max_retries: later.max_retries.or(self.max_retries),
        }
    }

    /// `base` with this patch applied, validated.
    pub fn apply(&self, base: &SimulationConfig) -> Result<SimulationConfig> {
        let config = SimulationConfig {
            corners: self.corners.unwrap_or(base.corners),
            body: self.body.unwrap_or(base.body),
            suspension: self.suspension.unwrap_or(base.suspension),
            gas: self.gas.unwrap_or(base.gas),
            road: self.road.clone().unwrap_or_else(|| base.road.clone()),
            solver: self.solver.unwrap_or(base.solver),
            dt: self.dt.unwrap_or(base.dt),
            speed: self.speed.unwrap_or(base.speed),
            max_retries: self.max_retries.unwrap_or(base.max_retries),
        };
        config.validate()?;
        Ok(config)
    }
}
