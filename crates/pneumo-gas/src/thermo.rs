//! Control-volume thermodynamics.

use serde::{Deserialize, Serialize};

/// How a control volume responds to volume changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThermoMode {
    /// Temperature pinned to ambient: `p·V` constant at fixed mass.
    #[default]
    Isothermal,
    /// No heat exchange: `p·V^γ` constant at fixed mass.
    Adiabatic,
}

/// Ideal-gas properties shared by every control volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GasProperties {
    /// Specific gas constant (J/(kg·K))
    pub gas_constant: f64,
    /// Ratio of specific heats
    pub gamma: f64,
}

impl Default for GasProperties {
    fn default() -> Self {
        // Dry air
        Self {
            gas_constant: 287.05,
            gamma: 1.4,
        }
    }
}

impl GasProperties {
    /// Critical pressure ratio `(2/(γ+1))^(γ/(γ-1))`.
    pub fn critical_pressure_ratio(&self) -> f64 {
        (2.0 / (self.gamma + 1.0)).powf(self.gamma / (self.gamma - 1.0))
    }
}

/// State of one lumped gas volume (line chamber or tank).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GasVolumeState {
    /// Absolute pressure (Pa)
    pub pressure: f64,
    /// Temperature (K)
    pub temperature: f64,
    /// Gas mass (kg)
    pub mass: f64,
    /// Volume (m³)
    pub volume: f64,
    /// Specific gas constant (J/(kg·K))
    pub gas_constant: f64,
    /// Ratio of specific heats
    pub gamma: f64,
    /// Thermodynamic mode
    pub mode: ThermoMode,
}

impl GasVolumeState {
    /// Fill `volume` at the given pressure and temperature.
    pub fn new(
        pressure: f64,
        temperature: f64,
        volume: f64,
        gas: GasProperties,
        mode: ThermoMode,
    ) -> Self {
        let mass = pressure * volume / (gas.gas_constant * temperature);
        let mut state = Self {
            pressure,
            temperature,
            mass,
            volume,
            gas_constant: gas.gas_constant,
            gamma: gas.gamma,
            mode,
        };
        // Keep pressure consistent with later recomputation
        state.pressure = state.equation_of_state();
        state
    }

    /// Ideal-gas pressure from the current mass, temperature and volume.
    pub fn equation_of_state(&self) -> f64 {
        self.mass * self.gas_constant * self.temperature / self.volume
    }

    /// Pressure this volume would have at `volume` with no mass exchange.
    ///
    /// Used by the body dynamics between gas updates.
    pub fn pressure_at(&self, volume: f64) -> f64 {
        match self.mode {
            ThermoMode::Isothermal => self.mass * self.gas_constant * self.temperature / volume,
            ThermoMode::Adiabatic => self.pressure * (self.volume / volume).powf(self.gamma),
        }
    }

    /// Move to a new volume at fixed mass.
    ///
    /// Isothermal resets the temperature to `ambient`; adiabatic evolves it
    /// as `T₂ = T₁·(V₁/V₂)^(γ-1)`. Pressure is then recomputed.
    pub fn update_thermo(&mut self, volume_new: f64, mode: ThermoMode, ambient: f64) {
        self.mode = mode;
        match mode {
            ThermoMode::Isothermal => {
                self.temperature = ambient;
            }
            ThermoMode::Adiabatic => {
                self.temperature *= (self.volume / volume_new).powf(self.gamma - 1.0);
            }
        }
        self.volume = volume_new;
        self.pressure = self.equation_of_state();
    }

    /// Add gas at `temperature`, mixing by `T = (m₁T₁ + m₂T₂)/(m₁ + m₂)`.
    pub fn add_mass(&mut self, mass: f64, temperature: f64) {
        let total = self.mass + mass;
        if total > 0.0 {
            self.temperature = (self.mass * self.temperature + mass * temperature) / total;
        }
        self.mass = total;
        self.pressure = self.equation_of_state();
    }

    /// Remove gas; the remainder keeps its temperature.
    pub fn remove_mass(&mut self, mass: f64) {
        self.mass -= mass;
        self.pressure = self.equation_of_state();
    }

    /// Gas density (kg/m³).
    pub fn density(&self) -> f64 {
        self.mass / self.volume
    }

    /// First offending quantity if any state component is negative or
    /// non-finite.
    pub fn invalid_quantity(&self) -> Option<(&'static str, f64)> {
        [
            ("pressure", self.pressure),
            ("mass", self.mass),
            ("temperature", self.temperature),
            ("volume", self.volume),
        ]
        .into_iter()
        .find(|(_, v)| !v.is_finite() || *v < 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn state(mode: ThermoMode) -> GasVolumeState {
        GasVolumeState::new(300_000.0, 293.15, 5.0e-4, GasProperties::default(), mode)
    }

    #[test]
    fn construction_satisfies_ideal_gas() {
        let s = state(ThermoMode::Isothermal);
        assert!((s.equation_of_state() - s.pressure).abs() < 1e-6);
        assert!(s.mass > 0.0);
    }

    #[test]
    fn critical_ratio_for_air() {
        let ratio = GasProperties::default().critical_pressure_ratio();
        assert!((ratio - 0.528).abs() < 1e-3);
    }

    #[test]
    fn adiabatic_compression_heats() {
        let mut s = state(ThermoMode::Adiabatic);
        let t0 = s.temperature;
        s.update_thermo(2.5e-4, ThermoMode::Adiabatic, 293.15);
        assert!(s.temperature > t0);
        assert!(s.pressure > 600_000.0, "adiabatic beats isothermal doubling");
    }

    #[test]
    fn isothermal_returns_to_ambient() {
        let mut s = state(ThermoMode::Adiabatic);
        s.update_thermo(2.5e-4, ThermoMode::Adiabatic, 293.15);
        s.update_thermo(2.5e-4, ThermoMode::Isothermal, 293.15);
        assert_eq!(s.temperature, 293.15);
        assert_eq!(s.mode, ThermoMode::Isothermal);
    }

    #[test]
    fn mixing_is_mass_weighted() {
        let mut s = state(ThermoMode::Isothermal);
        let m = s.mass;
        s.add_mass(m, 393.15);
        assert!((s.temperature - 343.15).abs() < 1e-9);
        assert!((s.mass - 2.0 * m).abs() < 1e-15);
    }

    #[test]
    fn pressure_at_matches_update() {
        for mode in [ThermoMode::Isothermal, ThermoMode::Adiabatic] {
            let s = state(mode);
            let predicted = s.pressure_at(4.0e-4);
            let mut moved = s;
            moved.update_thermo(4.0e-4, mode, s.temperature);
            assert!((predicted - moved.pressure).abs() / predicted < 1e-12);
        }
    }

    #[test]
    fn over_removal_is_detected() {
        let mut s = state(ThermoMode::Isothermal);
        s.remove_mass(s.mass * 2.0);
        assert_eq!(s.invalid_quantity().map(|q| q.0), Some("pressure"));
    }

    proptest! {
        #[test]
        fn isothermal_keeps_pv(v1 in 1.0e-5..1.0e-2f64, v2 in 1.0e-5..1.0e-2f64) {
            let mut s = GasVolumeState::new(250_000.0, 293.15, v1, GasProperties::default(), ThermoMode::Isothermal);
            let pv0 = s.pressure * s.volume;
            s.update_thermo(v2, ThermoMode::Isothermal, 293.15);
            let pv1 = s.pressure * s.volume;
            prop_assert!(((pv1 - pv0) / pv0).abs() < 1e-6);
        }

        #[test]
        fn adiabatic_keeps_pv_gamma(v1 in 1.0e-5..1.0e-2f64, v2 in 1.0e-5..1.0e-2f64) {
            let mut s = GasVolumeState::new(250_000.0, 293.15, v1, GasProperties::default(), ThermoMode::Adiabatic);
            let k0 = s.pressure * s.volume.powf(s.gamma);
            s.update_thermo(v2, ThermoMode::Adiabatic, 293.15);
            let k1 = s.pressure * s.volume.powf(s.gamma);
            prop_assert!(((k1 - k0) / k0).abs() < 1e-2);
        }
    }
}
