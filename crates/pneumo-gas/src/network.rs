//! Four-line gas network with a shared receiver tank.
//!
//! # Topology
//!
//! ```text
//!  atmosphere ──intake──▶ chamber ──exhaust──▶ tank ──safety relief──▶ atmosphere
//!                            │
//!                            └──line relief──▶ atmosphere
//!
//!  FL.head ◀──coupling──▶ RR.head      FR.head ◀──coupling──▶ RL.head
//!  FL.rod  ◀──coupling──▶ RR.rod       FR.rod  ◀──coupling──▶ RL.rod
//! ```
//!
//! Every chamber pumps: compression pushes gas through its exhaust check
//! valve into the tank, expansion draws fresh air through its intake check
//! valve. The diagonal coupling orifices only conduct while the master
//! isolation valve is closed, which also seals the lines from atmosphere.
//!
//! # Stepping
//!
//! [`GasNetwork::step`] is transactional: it works on a copy, and the
//! network only changes when every volume ends the step with finite,
//! non-negative pressure, mass and temperature.

use std::fmt;

use pneumo_kinematics::{Chamber, CornerId, CylinderState, CORNER_COUNT};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::thermo::{GasProperties, GasVolumeState, ThermoMode};
use crate::valve::{flow, Valve};

const CHAMBERS: [Chamber; 2] = [Chamber::Head, Chamber::Rod];

/// Diagonal line pairs joined by the coupling orifices.
pub const DIAGONAL_PAIRS: [(CornerId, CornerId); 2] = [
    (CornerId::FrontLeft, CornerId::RearRight),
    (CornerId::FrontRight, CornerId::RearLeft),
];

/// A place gas can live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GasNode {
    /// One chamber of one corner cylinder
    Chamber { corner: CornerId, chamber: Chamber },
    /// Receiver tank
    Tank,
    /// Infinite reservoir at ambient conditions
    Atmosphere,
}

impl fmt::Display for GasNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chamber { corner, chamber } => write!(f, "{corner} {chamber} chamber"),
            Self::Tank => write!(f, "tank"),
            Self::Atmosphere => write!(f, "atmosphere"),
        }
    }
}

/// Check valve parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CheckValveConfig {
    /// Opening pressure difference (Pa)
    pub delta_p_threshold: f64,
    /// Throat diameter (m)
    pub diameter: f64,
}

/// Relief valve parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReliefValveConfig {
    /// Opening pressure, absolute (Pa)
    pub setpoint: f64,
    /// Throat diameter (m)
    pub diameter: f64,
    /// Whether the discharge coefficient applies
    pub throttled: bool,
}

/// Gas network configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GasConfig {
    /// Ambient pressure (Pa)
    pub ambient_pressure: f64,
    /// Ambient temperature (K)
    pub ambient_temperature: f64,
    /// Gas properties
    pub gas: GasProperties,
    /// Thermodynamic mode for every control volume
    pub thermo_mode: ThermoMode,
    /// Initial pressure in every chamber (Pa)
    pub initial_line_pressure: f64,
    /// Initial tank pressure (Pa)
    pub initial_tank_pressure: f64,
    /// Tank volume (m³)
    pub tank_volume: f64,
    /// Discharge coefficient for throttled orifices
    pub discharge_coefficient: f64,
    /// Atmosphere → chamber check valves
    pub intake: CheckValveConfig,
    /// Chamber → tank check valves
    pub exhaust: CheckValveConfig,
    /// Per-line relief to atmosphere
    pub line_relief: ReliefValveConfig,
    /// Tank safety relief to atmosphere
    pub tank_relief: ReliefValveConfig,
    /// Diagonal coupling orifice diameter (m)
    pub coupling_diameter: f64,
    /// Master isolation valve closed
    pub isolation_closed: bool,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            ambient_pressure: 101_325.0,
            ambient_temperature: 293.15,
            gas: GasProperties::default(),
            thermo_mode: ThermoMode::Isothermal,
            initial_line_pressure: 300_000.0,
            initial_tank_pressure: 300_000.0,
            tank_volume: 0.02,
            discharge_coefficient: 0.7,
            intake: CheckValveConfig {
                delta_p_threshold: 2_000.0,
                diameter: 0.006,
            },
            exhaust: CheckValveConfig {
                delta_p_threshold: 5_000.0,
                diameter: 0.005,
            },
            line_relief: ReliefValveConfig {
                setpoint: 1_000_000.0,
                diameter: 0.004,
                throttled: true,
            },
            tank_relief: ReliefValveConfig {
                setpoint: 600_000.0,
                diameter: 0.008,
                throttled: false,
            },
            coupling_diameter: 0.003,
            isolation_closed: false,
        }
    }
}

impl GasConfig {
    /// Set the thermodynamic mode.
    #[must_use]
    pub fn with_thermo_mode(mut self, mode: ThermoMode) -> Self {
        self.thermo_mode = mode;
        self
    }

    /// Set the master isolation valve.
    #[must_use]
    pub fn with_isolation_closed(mut self, closed: bool) -> Self {
        self.isolation_closed = closed;
        self
    }

    /// Set the initial chamber pressure.
    #[must_use]
    pub fn with_initial_line_pressure(mut self, pressure: f64) -> Self {
        self.initial_line_pressure = pressure;
        self
    }

    /// Set the initial tank pressure.
    #[must_use]
    pub fn with_initial_tank_pressure(mut self, pressure: f64) -> Self {
        self.initial_tank_pressure = pressure;
        self
    }

    /// Set the tank safety relief.
    #[must_use]
    pub fn with_tank_relief(mut self, relief: ReliefValveConfig) -> Self {
        self.tank_relief = relief;
        self
    }

    /// Set the per-line relief.
    #[must_use]
    pub fn with_line_relief(mut self, relief: ReliefValveConfig) -> Self {
        self.line_relief = relief;
        self
    }

    /// Check every parameter for physical sense.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("ambient_pressure", self.ambient_pressure),
            ("ambient_temperature", self.ambient_temperature),
            ("gas_constant", self.gas.gas_constant),
            ("initial_line_pressure", self.initial_line_pressure),
            ("initial_tank_pressure", self.initial_tank_pressure),
            ("tank_volume", self.tank_volume),
            ("discharge_coefficient", self.discharge_coefficient),
            ("intake.diameter", self.intake.diameter),
            ("exhaust.diameter", self.exhaust.diameter),
            ("line_relief.setpoint", self.line_relief.setpoint),
            ("line_relief.diameter", self.line_relief.diameter),
            ("tank_relief.setpoint", self.tank_relief.setpoint),
            ("tank_relief.diameter", self.tank_relief.diameter),
            ("coupling_diameter", self.coupling_diameter),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::Configuration(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        for (name, value) in [
            ("intake.delta_p_threshold", self.intake.delta_p_threshold),
            ("exhaust.delta_p_threshold", self.exhaust.delta_p_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::Configuration(format!(
                    "{name} must be non-negative, got {value}"
                )));
            }
        }
        if !self.gas.gamma.is_finite() || self.gas.gamma <= 1.0 {
            return Err(Error::Configuration(format!(
                "gamma must exceed 1, got {}",
                self.gas.gamma
            )));
        }
        if self.discharge_coefficient > 1.0 {
            return Err(Error::Configuration(format!(
                "discharge_coefficient must be at most 1, got {}",
                self.discharge_coefficient
            )));
        }
        Ok(())
    }
}

/// Per-line operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineMode {
    /// Normal operation, open to atmosphere through intake and relief
    #[default]
    Connected,
    /// A chamber is above the line relief setpoint and venting
    ReliefActive,
    /// Isolation valve closed: sealed from atmosphere, diagonally coupled
    ClosedAtmo,
}

impl LineMode {
    /// Mode after a step, given the isolation flag and whether any chamber
    /// sits above the relief setpoint.
    pub fn next(self, isolation_closed: bool, above_setpoint: bool) -> Self {
        match (self, isolation_closed, above_setpoint) {
            (_, true, _) => Self::ClosedAtmo,
            (Self::ClosedAtmo, false, _) => Self::Connected,
            (Self::Connected, false, true) => Self::ReliefActive,
            (Self::ReliefActive, false, false) => Self::Connected,
            (mode, false, _) => mode,
        }
    }

    /// Whether the line may exchange gas with atmosphere.
    pub fn vents_to_atmosphere(self) -> bool {
        !matches!(self, Self::ClosedAtmo)
    }
}

impl fmt::Display for LineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected => write!(f, "connected"),
            Self::ReliefActive => write!(f, "relief-active"),
            Self::ClosedAtmo => write!(f, "closed-atmo"),
        }
    }
}

/// Gas state of one corner line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineState {
    /// Corner this line serves
    pub corner: CornerId,
    /// Head-side chamber
    pub head: GasVolumeState,
    /// Rod-side chamber
    pub rod: GasVolumeState,
    /// Operating mode
    pub mode: LineMode,
}

impl LineState {
    pub fn chamber(&self, chamber: Chamber) -> &GasVolumeState {
        match chamber {
            Chamber::Head => &self.head,
            Chamber::Rod => &self.rod,
        }
    }

    pub fn chamber_mut(&mut self, chamber: Chamber) -> &mut GasVolumeState {
        match chamber {
            Chamber::Head => &mut self.head,
            Chamber::Rod => &mut self.rod,
        }
    }

    /// Higher of the two chamber pressures.
    pub fn peak_pressure(&self) -> f64 {
        self.head.pressure.max(self.rod.pressure)
    }
}

/// Receiver tank.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TankState {
    pub gas: GasVolumeState,
}

/// Open/closed state of every valve during the last accepted step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LineValveFlags {
    pub intake_head: bool,
    pub intake_rod: bool,
    pub exhaust_head: bool,
    pub exhaust_rod: bool,
    pub relief: bool,
}

/// Valve flags for the whole network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValveFlags {
    /// Per-line flags, indexed by `CornerId::index()`
    pub lines: [LineValveFlags; CORNER_COUNT],
    /// Tank safety relief venting
    pub tank_relief: bool,
    /// Master isolation valve closed
    pub isolation_closed: bool,
}

#[derive(Debug, Clone, Copy)]
enum FlowPath {
    Intake(CornerId, Chamber),
    Exhaust(CornerId, Chamber),
    LineRelief(CornerId),
    TankRelief,
    Coupling,
}

/// Mass moved along one path during a step.
#[derive(Debug, Clone, Copy)]
struct Transfer {
    path: FlowPath,
    from: GasNode,
    to: GasNode,
    mass: f64,
    temperature: f64,
}

#[derive(Debug, Clone, Copy)]
struct ValveSet {
    intake: Valve,
    exhaust: Valve,
    line_relief: Valve,
    tank_relief: Valve,
    isolation: Valve,
}

impl ValveSet {
    fn from_config(config: &GasConfig) -> Self {
        let cd = config.discharge_coefficient;
        Self {
            intake: Valve::check(config.intake.delta_p_threshold, config.intake.diameter, cd),
            exhaust: Valve::check(config.exhaust.delta_p_threshold, config.exhaust.diameter, cd),
            line_relief: Valve::relief(
                config.line_relief.setpoint,
                config.line_relief.throttled,
                config.line_relief.diameter,
                cd,
            ),
            tank_relief: Valve::relief(
                config.tank_relief.setpoint,
                config.tank_relief.throttled,
                config.tank_relief.diameter,
                cd,
            ),
            isolation: Valve::isolation(config.coupling_diameter, cd, !config.isolation_closed),
        }
    }
}

/// The complete gas network: four lines, the tank and their valves.
#[derive(Debug, Clone)]
pub struct GasNetwork {
    config: GasConfig,
    valves: ValveSet,
    lines: [LineState; CORNER_COUNT],
    tank: TankState,
    flags: ValveFlags,
}

impl GasNetwork {
    /// Fill every chamber and the tank at their configured initial pressures.
    pub fn new(config: GasConfig, cylinders: &[CylinderState; CORNER_COUNT]) -> Result<Self> {
        config.validate()?;
        let t = config.ambient_temperature;
        let mode = config.thermo_mode;
        let initial_mode = LineMode::Connected.next(config.isolation_closed, false);

        let lines = CornerId::ALL.map(|corner| {
            let cylinder = &cylinders[corner.index()];
            LineState {
                corner,
                head: GasVolumeState::new(
                    config.initial_line_pressure,
                    t,
                    cylinder.volume_head,
                    config.gas,
                    mode,
                ),
                rod: GasVolumeState::new(
                    config.initial_line_pressure,
                    t,
                    cylinder.volume_rod,
                    config.gas,
                    mode,
                ),
                mode: initial_mode,
            }
        });
        let tank = TankState {
            gas: GasVolumeState::new(
                config.initial_tank_pressure,
                t,
                config.tank_volume,
                config.gas,
                mode,
            ),
        };

        let network = Self {
            valves: ValveSet::from_config(&config),
            flags: ValveFlags {
                isolation_closed: config.isolation_closed,
                ..ValveFlags::default()
            },
            config,
            lines,
            tank,
        };
        network.check_state(&network.lines, &network.tank)?;
        Ok(network)
    }

    pub fn config(&self) -> &GasConfig {
        &self.config
    }

    pub fn lines(&self) -> &[LineState; CORNER_COUNT] {
        &self.lines
    }

    pub fn line(&self, corner: CornerId) -> &LineState {
        &self.lines[corner.index()]
    }

    pub fn tank(&self) -> &TankState {
        &self.tank
    }

    pub fn flags(&self) -> &ValveFlags {
        &self.flags
    }

    /// Total gas mass held in the lines and the tank (kg).
    pub fn total_mass(&self) -> f64 {
        self.lines
            .iter()
            .map(|line| line.head.mass + line.rod.mass)
            .sum::<f64>()
            + self.tank.gas.mass
    }

    /// Chamber pressures a corner would see at `cylinder` with no mass
    /// exchange, as `(p_head, p_rod)`.
    pub fn chamber_pressures_at(&self, corner: CornerId, cylinder: &CylinderState) -> (f64, f64) {
        let line = self.line(corner);
        (
            line.head.pressure_at(cylinder.volume_head),
            line.rod.pressure_at(cylinder.volume_rod),
        )
    }

    /// Swap in a new configuration, keeping the current gas state.
    ///
    /// Valve parameters and the isolation flag take effect on the next
    /// step; initial pressures and the tank volume only matter at
    /// construction.
    pub fn set_config(&mut self, config: GasConfig) -> Result<()> {
        config.validate()?;
        if config.isolation_closed != self.config.isolation_closed {
            debug!(closed = config.isolation_closed, "isolation valve switched");
        }
        self.valves = ValveSet::from_config(&config);
        self.flags.isolation_closed = config.isolation_closed;
        self.config = config;
        Ok(())
    }

    /// Advance the network by `dt` with the chambers moved to `cylinders`.
    ///
    /// On error the network is left exactly as it was.
    pub fn step(&mut self, dt: f64, cylinders: &[CylinderState; CORNER_COUNT]) -> Result<()> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(Error::Configuration(format!(
                "gas step must be positive, got {dt}"
            )));
        }

        let mode = self.config.thermo_mode;
        let ambient_t = self.config.ambient_temperature;
        let mut lines = self.lines;
        let mut tank = self.tank;

        for (line, cylinder) in lines.iter_mut().zip(cylinders) {
            line.head.update_thermo(cylinder.volume_head, mode, ambient_t);
            line.rod.update_thermo(cylinder.volume_rod, mode, ambient_t);
        }
        tank.gas.update_thermo(tank.gas.volume, mode, ambient_t);

        let transfers = self.transfers(&lines, &tank, dt);

        for transfer in &transfers {
            if let Some(volume) = node_mut(&mut lines, &mut tank, transfer.from) {
                volume.remove_mass(transfer.mass);
            }
        }
        for transfer in &transfers {
            if let Some(volume) = node_mut(&mut lines, &mut tank, transfer.to) {
                volume.add_mass(transfer.mass, transfer.temperature);
            }
        }

        self.check_state(&lines, &tank)?;

        let mut flags = ValveFlags {
            isolation_closed: self.config.isolation_closed,
            ..ValveFlags::default()
        };
        for transfer in transfers.iter().filter(|t| t.mass > 0.0) {
            match transfer.path {
                FlowPath::Intake(corner, Chamber::Head) => flags.lines[corner.index()].intake_head = true,
                FlowPath::Intake(corner, Chamber::Rod) => flags.lines[corner.index()].intake_rod = true,
                FlowPath::Exhaust(corner, Chamber::Head) => flags.lines[corner.index()].exhaust_head = true,
                FlowPath::Exhaust(corner, Chamber::Rod) => flags.lines[corner.index()].exhaust_rod = true,
                FlowPath::LineRelief(corner) => flags.lines[corner.index()].relief = true,
                FlowPath::TankRelief => flags.tank_relief = true,
                FlowPath::Coupling => {}
            }
        }
        if flags.tank_relief != self.flags.tank_relief {
            debug!(
                open = flags.tank_relief,
                pressure = tank.gas.pressure,
                "tank relief valve switched"
            );
        }

        let setpoint = self.config.line_relief.setpoint;
        for line in &mut lines {
            let next = line
                .mode
                .next(self.config.isolation_closed, line.peak_pressure() > setpoint);
            if next != line.mode {
                debug!(corner = %line.corner, from = %line.mode, to = %next, "line mode changed");
                line.mode = next;
            }
        }

        self.lines = lines;
        self.tank = tank;
        self.flags = flags;
        Ok(())
    }

    fn transfers(
        &self,
        lines: &[LineState; CORNER_COUNT],
        tank: &TankState,
        dt: f64,
    ) -> Vec<Transfer> {
        let gas = &self.config.gas;
        let p_atm = self.config.ambient_pressure;
        let t_atm = self.config.ambient_temperature;
        let mut transfers = Vec::with_capacity(4 * CORNER_COUNT + 6);

        for line in lines {
            let corner = line.corner;
            let vents = line.mode.vents_to_atmosphere();
            for chamber in CHAMBERS {
                let node = GasNode::Chamber { corner, chamber };
                let volume = line.chamber(chamber);

                if vents {
                    let rate = flow(&self.valves.intake, p_atm, volume.pressure, t_atm, gas);
                    if rate > 0.0 {
                        let cap = self.equalization_mass(
                            lines,
                            tank,
                            GasNode::Atmosphere,
                            node,
                            self.valves.intake.closing_delta_p(),
                        );
                        transfers.push(Transfer {
                            path: FlowPath::Intake(corner, chamber),
                            from: GasNode::Atmosphere,
                            to: node,
                            mass: (rate * dt).min(cap),
                            temperature: t_atm,
                        });
                    }
                }

                let rate = flow(
                    &self.valves.exhaust,
                    volume.pressure,
                    tank.gas.pressure,
                    volume.temperature,
                    gas,
                );
                if rate > 0.0 {
                    let cap = self.equalization_mass(
                        lines,
                        tank,
                        node,
                        GasNode::Tank,
                        self.valves.exhaust.closing_delta_p(),
                    );
                    transfers.push(Transfer {
                        path: FlowPath::Exhaust(corner, chamber),
                        from: node,
                        to: GasNode::Tank,
                        mass: (rate * dt).min(cap),
                        temperature: volume.temperature,
                    });
                }

                if vents {
                    let rate = flow(
                        &self.valves.line_relief,
                        volume.pressure,
                        p_atm,
                        volume.temperature,
                        gas,
                    );
                    if rate > 0.0 {
                        transfers.push(Transfer {
                            path: FlowPath::LineRelief(corner),
                            from: node,
                            to: GasNode::Atmosphere,
                            mass: rate * dt,
                            temperature: volume.temperature,
                        });
                    }
                }
            }
        }

        let rate = flow(
            &self.valves.tank_relief,
            tank.gas.pressure,
            p_atm,
            tank.gas.temperature,
            gas,
        );
        if rate > 0.0 {
            transfers.push(Transfer {
                path: FlowPath::TankRelief,
                from: GasNode::Tank,
                to: GasNode::Atmosphere,
                mass: rate * dt,
                temperature: tank.gas.temperature,
            });
        }

        if self.config.isolation_closed {
            for (a, b) in DIAGONAL_PAIRS {
                for chamber in CHAMBERS {
                    let va = lines[a.index()].chamber(chamber);
                    let vb = lines[b.index()].chamber(chamber);
                    let rate = flow(&self.valves.isolation, va.pressure, vb.pressure, va.temperature, gas);
                    let node_a = GasNode::Chamber { corner: a, chamber };
                    let node_b = GasNode::Chamber { corner: b, chamber };
                    let (from, to, rate, temperature) = if rate >= 0.0 {
                        (node_a, node_b, rate, va.temperature)
                    } else {
                        (node_b, node_a, -rate, vb.temperature)
                    };
                    if rate > 0.0 {
                        let cap = self.equalization_mass(lines, tank, from, to, 0.0);
                        transfers.push(Transfer {
                            path: FlowPath::Coupling,
                            from,
                            to,
                            mass: (rate * dt).min(cap),
                            temperature,
                        });
                    }
                }
            }
        }

        transfers
    }

    /// Mass that brings `from` and `to` to within `delta_p` of each other,
    /// linearised at the current state. Atmosphere absorbs anything.
    fn equalization_mass(
        &self,
        lines: &[LineState; CORNER_COUNT],
        tank: &TankState,
        from: GasNode,
        to: GasNode,
        delta_p: f64,
    ) -> f64 {
        let side = |node: GasNode| match node_ref(lines, tank, node) {
            Some(v) => (v.pressure, v.gas_constant * v.temperature / v.volume),
            None => (self.config.ambient_pressure, 0.0),
        };
        let (p_from, k_from) = side(from);
        let (p_to, k_to) = side(to);
        let stiffness = k_from + k_to;
        if stiffness <= 0.0 {
            return f64::INFINITY;
        }
        ((p_from - p_to - delta_p) / stiffness).max(0.0)
    }

    fn check_state(&self, lines: &[LineState; CORNER_COUNT], tank: &TankState) -> Result<()> {
        for line in lines {
            for chamber in CHAMBERS {
                if let Some((quantity, value)) = line.chamber(chamber).invalid_quantity() {
                    return Err(Error::NumericalInstability {
                        node: GasNode::Chamber {
                            corner: line.corner,
                            chamber,
                        },
                        quantity,
                        value,
                    });
                }
            }
        }
        if let Some((quantity, value)) = tank.gas.invalid_quantity() {
            return Err(Error::NumericalInstability {
                node: GasNode::Tank,
                quantity,
                value,
            });
        }
        Ok(())
    }
}

fn node_ref<'a>(
    lines: &'a [LineState; CORNER_COUNT],
    tank: &'a TankState,
    node: GasNode,
) -> Option<&'a GasVolumeState> {
    match node {
        GasNode::Chamber { corner, chamber } => Some(lines[corner.index()].chamber(chamber)),
        GasNode::Tank => Some(&tank.gas),
        GasNode::Atmosphere => None,
    }
}

fn node_mut<'a>(
    lines: &'a mut [LineState; CORNER_COUNT],
    tank: &'a mut TankState,
    node: GasNode,
) -> Option<&'a mut GasVolumeState> {
    match node {
        GasNode::Chamber { corner, chamber } => Some(lines[corner.index()].chamber_mut(chamber)),
        GasNode::Tank => Some(&mut tank.gas),
        GasNode::Atmosphere => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pneumo_kinematics::{CornerGeometry, LeverState};

    fn neutral_cylinders() -> [CylinderState; CORNER_COUNT] {
        let geometry = CornerGeometry::default();
        let state = geometry
            .cylinder_state(LeverState::from_angle(&geometry, 0.0))
            .unwrap();
        [state; CORNER_COUNT]
    }

    fn cylinders_at(angle: f64) -> [CylinderState; CORNER_COUNT] {
        let geometry = CornerGeometry::default();
        let state = geometry
            .cylinder_state(LeverState::from_angle(&geometry, angle))
            .unwrap();
        [state; CORNER_COUNT]
    }

    #[test]
    fn default_config_is_valid() {
        assert!(GasConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_non_physical_config() {
        let mut config = GasConfig::default();
        config.tank_volume = 0.0;
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));

        let mut config = GasConfig::default();
        config.gas.gamma = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn quiescent_network_stays_put() {
        let cylinders = neutral_cylinders();
        let mut network = GasNetwork::new(GasConfig::default(), &cylinders).unwrap();
        let before = *network.lines();
        for _ in 0..100 {
            network.step(1e-3, &cylinders).unwrap();
        }
        assert_eq!(network.lines(), &before);
        assert_eq!(network.flags(), &ValveFlags::default());
    }

    #[test]
    fn compression_pumps_into_tank() {
        let config = GasConfig::default().with_initial_line_pressure(120_000.0);
        let mut network = GasNetwork::new(config, &neutral_cylinders()).unwrap();
        let tank_before = network.tank().gas.mass;

        // Wheel lifted: head chamber compressed, rod chamber expanded
        let bump = cylinders_at(0.3);
        assert!(bump[0].volume_head < neutral_cylinders()[0].volume_head);
        network.step(1e-3, &bump).unwrap();

        let flags = network.flags().lines[0];
        assert!(flags.exhaust_head);
        assert!(flags.intake_rod);
        assert!(!flags.exhaust_rod);
        assert!(network.tank().gas.mass > tank_before);
    }

    #[test]
    fn check_valves_never_backflow() {
        // Tank far above the chambers: exhaust valves stay shut
        let config = GasConfig::default().with_initial_tank_pressure(500_000.0);
        let cylinders = neutral_cylinders();
        let mut network = GasNetwork::new(config, &cylinders).unwrap();
        let line_mass: f64 = network.lines().iter().map(|l| l.head.mass + l.rod.mass).sum();
        network.step(1e-3, &cylinders).unwrap();
        let after: f64 = network.lines().iter().map(|l| l.head.mass + l.rod.mass).sum();
        assert_eq!(line_mass, after);
    }

    #[test]
    fn isolation_closes_lines_to_atmosphere() {
        let config = GasConfig::default()
            .with_isolation_closed(true)
            .with_initial_line_pressure(120_000.0);
        let mut network = GasNetwork::new(config, &neutral_cylinders()).unwrap();
        assert!(network
            .lines()
            .iter()
            .all(|l| l.mode == LineMode::ClosedAtmo));

        // Rod chambers expand below atmosphere but may not draw in air
        network.step(1e-3, &cylinders_at(0.3)).unwrap();
        assert!(network.flags().lines.iter().all(|f| !f.intake_rod));
        assert!(network.flags().isolation_closed);
    }

    #[test]
    fn coupling_equalises_diagonals() {
        let config = GasConfig::default().with_isolation_closed(true);
        let mut cylinders = neutral_cylinders();
        let mut network = GasNetwork::new(config, &cylinders).unwrap();
        // Squeeze FL only, then hold
        cylinders[CornerId::FrontLeft.index()] = cylinders_at(0.2)[0];
        for _ in 0..2000 {
            network.step(1e-3, &cylinders).unwrap();
        }
        let fl = network.line(CornerId::FrontLeft).head.pressure;
        let rr = network.line(CornerId::RearRight).head.pressure;
        let fr = network.line(CornerId::FrontRight).head.pressure;
        assert!((fl - rr).abs() < 0.05 * (fl - fr).abs().max(1.0) + 5_000.0);
        assert!(rr > fr, "coupling carried gas to the diagonal");
    }

    #[test]
    fn equal_diagonals_exchange_nothing() {
        let config = GasConfig::default().with_isolation_closed(true);
        let cylinders = neutral_cylinders();
        let mut network = GasNetwork::new(config, &cylinders).unwrap();
        for _ in 0..10_000 {
            network.step(1e-3, &cylinders).unwrap();
        }
        for (a, b) in DIAGONAL_PAIRS {
            assert_eq!(network.line(a).head.pressure, network.line(b).head.pressure);
            assert_eq!(network.line(a).rod.pressure, network.line(b).rod.pressure);
        }
    }

    #[test]
    fn tank_relief_vents_to_setpoint() {
        let config = GasConfig::default().with_initial_tank_pressure(800_000.0);
        let setpoint = config.tank_relief.setpoint;
        let cylinders = neutral_cylinders();
        let mut network = GasNetwork::new(config, &cylinders).unwrap();

        let mut last = network.tank().gas.mass;
        while network.tank().gas.pressure > setpoint {
            network.step(1e-3, &cylinders).unwrap();
            assert!(network.tank().gas.mass < last);
            last = network.tank().gas.mass;
        }
        network.step(1e-3, &cylinders).unwrap();
        assert!(!network.flags().tank_relief);
        assert_eq!(network.tank().gas.mass, last);
    }

    #[test]
    fn line_relief_drives_mode() {
        let relief = ReliefValveConfig {
            setpoint: 350_000.0,
            diameter: 0.004,
            throttled: true,
        };
        let config = GasConfig::default()
            .with_line_relief(relief)
            .with_initial_tank_pressure(900_000.0)
            .with_tank_relief(ReliefValveConfig {
                setpoint: 1_000_000.0,
                diameter: 0.008,
                throttled: false,
            })
            .with_initial_line_pressure(400_000.0);
        let cylinders = neutral_cylinders();
        let mut network = GasNetwork::new(config, &cylinders).unwrap();

        network.step(1e-3, &cylinders).unwrap();
        assert!(network.lines().iter().all(|l| l.mode == LineMode::ReliefActive));
        assert!(network.flags().lines[0].relief);

        for _ in 0..5_000 {
            network.step(1e-3, &cylinders).unwrap();
        }
        assert!(network.lines().iter().all(|l| l.mode == LineMode::Connected));
        assert!(network.line(CornerId::FrontLeft).peak_pressure() <= relief.setpoint);
    }

    #[test]
    fn line_mode_transitions() {
        use LineMode::*;
        assert_eq!(Connected.next(false, true), ReliefActive);
        assert_eq!(ReliefActive.next(false, true), ReliefActive);
        assert_eq!(ReliefActive.next(false, false), Connected);
        assert_eq!(Connected.next(true, false), ClosedAtmo);
        assert_eq!(ReliefActive.next(true, true), ClosedAtmo);
        assert_eq!(ClosedAtmo.next(false, true), Connected);
    }

    #[test]
    fn failed_step_leaves_state_untouched() {
        let cylinders = neutral_cylinders();
        let mut network = GasNetwork::new(GasConfig::default(), &cylinders).unwrap();
        let before = *network.lines();
        let mut broken = cylinders;
        broken[2].volume_rod = f64::NAN;
        let err = network.step(1e-3, &broken).unwrap_err();
        assert!(matches!(
            err,
            Error::NumericalInstability {
                node: GasNode::Chamber {
                    corner: CornerId::RearLeft,
                    chamber: Chamber::Rod
                },
                ..
            }
        ));
        assert_eq!(network.lines(), &before);
    }

    #[test]
    fn frozen_pressures_follow_volume() {
        let network = GasNetwork::new(GasConfig::default(), &neutral_cylinders()).unwrap();
        let bump = cylinders_at(0.2)[0];
        let (p_head, p_rod) = network.chamber_pressures_at(CornerId::FrontLeft, &bump);
        assert!(p_head > 300_000.0);
        assert!(p_rod < 300_000.0);
    }

    #[test]
    fn node_display() {
        let node = GasNode::Chamber {
            corner: CornerId::RearRight,
            chamber: Chamber::Head,
        };
        assert_eq!(node.to_string(), "RR head chamber");
        assert_eq!(GasNode::Tank.to_string(), "tank");
    }
}
