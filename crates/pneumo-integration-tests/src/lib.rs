//! Shared helpers for the scenario tests in `tests/`.

use pneumo_sim::{Physics, StateSnapshot};

/// Tick `physics` until its clock reaches `until`, calling `observe` after
/// every accepted tick. Panics on a fault.
pub fn run_until(physics: &mut Physics, until: f64, mut observe: impl FnMut(&Physics)) {
    while physics.time() < until - 0.5 * physics.config().dt {
        if let Err(fault) = physics.tick() {
            panic!("tick failed: {fault}");
        }
        observe(physics);
    }
}

/// Peak-to-peak half amplitude of a sampled signal.
pub fn half_range(samples: &[f64]) -> f64 {
    let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
    (max - min) / 2.0
}

/// Relative difference of two values, against the larger magnitude.
pub fn relative_difference(a: f64, b: f64) -> f64 {
    let scale = a.abs().max(b.abs());
    if scale == 0.0 {
        0.0
    } else {
        (a - b).abs() / scale
    }
}

/// Head and rod pressures for every corner, in `CornerId::ALL` order.
pub fn chamber_pressures(snapshot: &StateSnapshot) -> [(f64, f64); 4] {
    let mut out = [(0.0, 0.0); 4];
    for (slot, line) in out.iter_mut().zip(&snapshot.lines) {
        *slot = (line.head.pressure, line.rod.pressure);
    }
    out
}
