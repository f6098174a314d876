//! Valves and compressible orifice flow.
//!
//! # Orifice Equation
//!
//! For upstream pressure `p₁`, downstream `p₂` and ratio `r = p₂/p₁`:
//!
//! ```text
//! r ≤ r*:  ṁ = A·p₁·√(γ/(R·T₁))·(2/(γ+1))^((γ+1)/(2(γ-1)))           (choked)
//! r > r*:  ṁ = A·p₁·√(2γ/(R·T₁·(γ-1))·(r^(2/γ) − r^((γ+1)/γ)))        (subsonic)
//! ```
//!
//! with `r* = (2/(γ+1))^(γ/(γ-1))`. `A` is the effective throat area: the
//! geometric area times the discharge coefficient, except for an
//! unthrottled relief valve which uses the ideal (geometric) area.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::thermo::GasProperties;

/// Valve variants with their actuation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValveKind {
    /// One-way valve opening once `p_up − p_down` exceeds the threshold.
    Check { delta_p_threshold: f64 },
    /// Vent opening once the upstream pressure exceeds the setpoint.
    Relief { setpoint: f64, throttled: bool },
    /// Diagonal coupling orifice behind the master isolation valve.
    Isolation { coupling_diameter: f64 },
}

/// A valve instance: kind, throat geometry and current open flag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Valve {
    /// Variant and actuation parameters
    pub kind: ValveKind,
    /// Geometric throat area (m²)
    pub area: f64,
    /// Discharge coefficient applied to throttled flow
    pub discharge_coefficient: f64,
    /// Whether the valve is open
    pub open: bool,
}

impl Valve {
    /// Check valve with a circular throat.
    pub fn check(delta_p_threshold: f64, diameter: f64, discharge_coefficient: f64) -> Self {
        Self {
            kind: ValveKind::Check { delta_p_threshold },
            area: circle_area(diameter),
            discharge_coefficient,
            open: false,
        }
    }

    /// Relief valve with a circular throat.
    pub fn relief(setpoint: f64, throttled: bool, diameter: f64, discharge_coefficient: f64) -> Self {
        Self {
            kind: ValveKind::Relief { setpoint, throttled },
            area: circle_area(diameter),
            discharge_coefficient,
            open: false,
        }
    }

    /// Master isolation valve; `open` starts as given.
    pub fn isolation(coupling_diameter: f64, discharge_coefficient: f64, open: bool) -> Self {
        Self {
            kind: ValveKind::Isolation { coupling_diameter },
            area: circle_area(coupling_diameter),
            discharge_coefficient,
            open,
        }
    }

    /// Throat area used in the orifice equation.
    pub fn effective_area(&self) -> f64 {
        match self.kind {
            ValveKind::Relief { throttled: false, .. } => self.area,
            ValveKind::Relief { throttled: true, .. }
            | ValveKind::Check { .. }
            | ValveKind::Isolation { .. } => self.area * self.discharge_coefficient,
        }
    }

    /// Whether the valve passes flow at these pressures.
    ///
    /// For the isolation valve this is the coupling path, which is active
    /// while the master valve is closed.
    pub fn conducts(&self, p_up: f64, p_down: f64) -> bool {
        match self.kind {
            ValveKind::Check { delta_p_threshold } => p_up - p_down > delta_p_threshold,
            ValveKind::Relief { setpoint, .. } => p_up > setpoint && p_up > p_down,
            ValveKind::Isolation { .. } => !self.open,
        }
    }

    /// Pressure difference at which this valve stops conducting.
    pub(crate) fn closing_delta_p(&self) -> f64 {
        match self.kind {
            ValveKind::Check { delta_p_threshold } => delta_p_threshold.max(0.0),
            ValveKind::Relief { .. } | ValveKind::Isolation { .. } => 0.0,
        }
    }
}

/// Area of a circle of the given diameter.
pub fn circle_area(diameter: f64) -> f64 {
    PI * (diameter / 2.0).powi(2)
}

/// Orifice mass flow from `p_up` to `p_down` through `area` (kg/s).
///
/// Zero unless `p_up > p_down`.
pub fn orifice_mass_flow(area: f64, p_up: f64, p_down: f64, t_up: f64, gas: &GasProperties) -> f64 {
    if p_up <= p_down || p_up <= 0.0 || area <= 0.0 {
        return 0.0;
    }
    let g = gas.gamma;
    let r = gas.gas_constant;
    let ratio = p_down.max(0.0) / p_up;

    if ratio <= gas.critical_pressure_ratio() {
        area * p_up * (g / (r * t_up)).sqrt() * (2.0 / (g + 1.0)).powf((g + 1.0) / (2.0 * (g - 1.0)))
    } else {
        let term = ratio.powf(2.0 / g) - ratio.powf((g + 1.0) / g);
        area * p_up * (2.0 * g / (r * t_up * (g - 1.0)) * term.max(0.0)).sqrt()
    }
}

/// Mass flow through `valve` from the `p_up` side to the `p_down` side (kg/s).
///
/// Check and relief valves never flow backwards and return zero whenever
/// they are shut. The isolation coupling is bidirectional: when
/// `p_up < p_down` the result is negative, evaluated with `t_up` as the
/// source temperature.
pub fn flow(valve: &Valve, p_up: f64, p_down: f64, t_up: f64, gas: &GasProperties) -> f64 {
    let area = valve.effective_area();
    match valve.kind {
        ValveKind::Check { .. } | ValveKind::Relief { .. } => {
            if valve.conducts(p_up, p_down) {
                orifice_mass_flow(area, p_up, p_down, t_up, gas)
            } else {
                0.0
            }
        }
        ValveKind::Isolation { .. } => {
            if !valve.conducts(p_up, p_down) {
                0.0
            } else if p_up >= p_down {
                orifice_mass_flow(area, p_up, p_down, t_up, gas)
            } else {
                -orifice_mass_flow(area, p_down, p_up, t_up, gas)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const T: f64 = 293.15;

    fn gas() -> GasProperties {
        GasProperties::default()
    }

    #[test]
    fn no_flow_without_pressure_difference() {
        assert_eq!(orifice_mass_flow(1e-5, 2e5, 2e5, T, &gas()), 0.0);
        assert_eq!(orifice_mass_flow(1e-5, 1e5, 2e5, T, &gas()), 0.0);
    }

    #[test]
    fn choked_flow_is_independent_of_downstream() {
        let a = orifice_mass_flow(1e-5, 5e5, 1e5, T, &gas());
        let b = orifice_mass_flow(1e-5, 5e5, 0.5e5, T, &gas());
        assert!(a > 0.0);
        assert!((a - b).abs() < 1e-15);
    }

    #[test]
    fn branches_meet_at_critical_ratio() {
        let g = gas();
        let p_up = 4e5;
        let p_crit = p_up * g.critical_pressure_ratio();
        let choked = orifice_mass_flow(1e-5, p_up, p_crit, T, &g);
        let subsonic = orifice_mass_flow(1e-5, p_up, p_crit * (1.0 + 1e-9), T, &g);
        assert!((choked - subsonic).abs() / choked < 1e-6);
    }

    #[test]
    fn check_valve_respects_threshold() {
        let valve = Valve::check(10_000.0, 0.005, 0.7);
        assert_eq!(flow(&valve, 205_000.0, 200_000.0, T, &gas()), 0.0);
        assert!(flow(&valve, 215_000.0, 200_000.0, T, &gas()) > 0.0);
        assert_eq!(flow(&valve, 200_000.0, 215_000.0, T, &gas()), 0.0);
    }

    #[test]
    fn relief_opens_above_setpoint_only() {
        let valve = Valve::relief(600_000.0, true, 0.004, 0.7);
        assert_eq!(flow(&valve, 590_000.0, 101_325.0, T, &gas()), 0.0);
        assert!(flow(&valve, 610_000.0, 101_325.0, T, &gas()) > 0.0);
    }

    #[test]
    fn unthrottled_relief_uses_ideal_area() {
        let throttled = Valve::relief(600_000.0, true, 0.004, 0.7);
        let ideal = Valve::relief(600_000.0, false, 0.004, 0.7);
        let q_throttled = flow(&throttled, 700_000.0, 101_325.0, T, &gas());
        let q_ideal = flow(&ideal, 700_000.0, 101_325.0, T, &gas());
        assert!((q_throttled / q_ideal - 0.7).abs() < 1e-12);
    }

    #[test]
    fn isolation_coupling_only_when_closed() {
        let closed = Valve::isolation(0.003, 0.7, false);
        let open = Valve::isolation(0.003, 0.7, true);
        assert!(flow(&closed, 3e5, 2e5, T, &gas()) > 0.0);
        assert!(flow(&closed, 2e5, 3e5, T, &gas()) < 0.0);
        assert_eq!(flow(&closed, 3e5, 3e5, T, &gas()), 0.0);
        assert_eq!(flow(&open, 3e5, 2e5, T, &gas()), 0.0);
    }

    #[test]
    fn isolation_is_antisymmetric() {
        let closed = Valve::isolation(0.003, 0.7, false);
        let fwd = flow(&closed, 3e5, 2e5, T, &gas());
        let rev = flow(&closed, 2e5, 3e5, T, &gas());
        assert!((fwd + rev).abs() < 1e-15);
    }

    proptest! {
        #[test]
        fn check_flow_sign_follows_gradient(
            p_up in 1.0e4..1.0e6f64,
            p_down in 1.0e4..1.0e6f64,
            threshold in 0.0..5.0e4f64,
        ) {
            let valve = Valve::check(threshold, 0.005, 0.7);
            let q = flow(&valve, p_up, p_down, T, &gas());
            prop_assert!(q >= 0.0);
            if q > 0.0 {
                prop_assert!(p_up > p_down);
            }
            if p_up <= p_down {
                prop_assert_eq!(q, 0.0);
            }
        }

        #[test]
        fn flow_grows_with_upstream_pressure(p_down in 1.0e5..3.0e5f64, dp in 1.0e3..1.0e5f64) {
            let valve = Valve::relief(0.0, true, 0.004, 0.7);
            let q1 = flow(&valve, p_down + dp, p_down, T, &gas());
            let q2 = flow(&valve, p_down + 2.0 * dp, p_down, T, &gas());
            prop_assert!(q2 > q1);
        }
    }
}
