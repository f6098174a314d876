//! ISO 8608 road roughness classes and harmonic synthesis.
//!
//! Displacement PSD: `Gd(n) = Gd(n₀)·(n/n₀)^-w` with `n₀ = 0.1 cycle/m`
//! and waviness `w = 2`. Class A starts at `16e-6 m³` and every class
//! step multiplies the reference by four.

use std::f64::consts::TAU;

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Reference spatial frequency (cycle/m).
pub const REFERENCE_FREQUENCY: f64 = 0.1;

/// Lowest synthesised spatial frequency (cycle/m).
pub const MIN_SPATIAL_FREQUENCY: f64 = 0.011;

/// Highest synthesised spatial frequency (cycle/m).
pub const MAX_SPATIAL_FREQUENCY: f64 = 2.83;

const WAVINESS: f64 = 2.0;

/// ISO 8608 roughness class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoadClass {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
}

impl RoadClass {
    /// Geometric-mean displacement PSD at `n₀` (m³).
    pub fn reference_psd(self) -> f64 {
        let step = match self {
            Self::A => 0,
            Self::B => 1,
            Self::C => 2,
            Self::D => 3,
            Self::E => 4,
            Self::F => 5,
            Self::G => 6,
            Self::H => 7,
        };
        16e-6 * 4f64.powi(step)
    }

    /// Displacement PSD at spatial frequency `n` (m³).
    pub fn psd(self, n: f64) -> f64 {
        self.reference_psd() * (n / REFERENCE_FREQUENCY).powf(-WAVINESS)
    }
}

/// One sinusoidal component of a synthesised track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Harmonic {
    /// Amplitude (m)
    pub amplitude: f64,
    /// Temporal angular frequency (rad/s)
    pub omega: f64,
    /// Phase (rad)
    pub phase: f64,
}

impl Harmonic {
    pub fn displacement(&self, t: f64) -> f64 {
        self.amplitude * (self.omega * t + self.phase).sin()
    }

    pub fn velocity(&self, t: f64) -> f64 {
        self.amplitude * self.omega * (self.omega * t + self.phase).cos()
    }
}

/// Synthesise one track as `components` log-spaced harmonics.
pub(crate) fn synthesize_track(
    class: RoadClass,
    speed: f64,
    components: usize,
    rng: &mut StdRng,
) -> Vec<Harmonic> {
    let ratio = MAX_SPATIAL_FREQUENCY / MIN_SPATIAL_FREQUENCY;
    let edge = |i: usize| MIN_SPATIAL_FREQUENCY * ratio.powf(i as f64 / components as f64);

    (0..components)
        .map(|i| {
            let lo = edge(i);
            let hi = edge(i + 1);
            let n = (lo * hi).sqrt();
            let dn = hi - lo;
            Harmonic {
                amplitude: (2.0 * class.psd(n) * dn).sqrt(),
                omega: TAU * n * speed,
                phase: rng.gen_range(0.0..TAU),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn class_psd_quadruples() {
        assert!((RoadClass::A.reference_psd() - 16e-6).abs() < 1e-18);
        assert!((RoadClass::B.reference_psd() - 64e-6).abs() < 1e-18);
        assert!((RoadClass::H.reference_psd() - 262_144e-6).abs() < 1e-12);
    }

    #[test]
    fn psd_falls_with_frequency() {
        let c = RoadClass::C;
        assert!((c.psd(REFERENCE_FREQUENCY) - c.reference_psd()).abs() < 1e-18);
        assert!(c.psd(1.0) < c.psd(0.1));
        // Waviness 2: a decade up is a hundred times smaller
        assert!((c.psd(0.1) / c.psd(1.0) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn synthesis_is_seed_deterministic() {
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);
        let ha = synthesize_track(RoadClass::C, 10.0, 32, &mut a);
        let hb = synthesize_track(RoadClass::C, 10.0, 32, &mut b);
        assert_eq!(ha, hb);
        assert_eq!(ha.len(), 32);
    }

    #[test]
    fn variance_matches_integrated_psd() {
        // Sum of A²/2 approximates ∫Gd(n)dn over the band
        let mut rng = StdRng::seed_from_u64(1);
        let track = synthesize_track(RoadClass::B, 10.0, 512, &mut rng);
        let variance: f64 = track.iter().map(|h| h.amplitude.powi(2) / 2.0).sum();
        let g0 = RoadClass::B.reference_psd();
        let n0 = REFERENCE_FREQUENCY;
        let exact = g0 * n0 * n0 * (1.0 / MIN_SPATIAL_FREQUENCY - 1.0 / MAX_SPATIAL_FREQUENCY);
        assert!(
            (variance - exact).abs() / exact < 0.05,
            "variance {variance} vs {exact}"
        );
    }
}
