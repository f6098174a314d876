//! Adaptive Dormand–Prince 5(4) integrator.
//!
//! The fifth-order solution is propagated; the embedded fourth-order one only
//! drives the step-size controller. The error norm is the RMS of
//! `e_i / (atol + rtol·max(|y_i|, |ŷ_i|))` and a step is accepted when it
//! does not exceed one.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{Error, Result};

/// A first-order system `ẏ = f(t, y)`.
pub trait OdeSystem<const N: usize> {
    /// Time derivative of `y` at `t`.
    fn rhs(&self, t: f64, y: &[f64; N]) -> Result<[f64; N]>;
}

/// Tolerances and limits for the adaptive solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Relative tolerance
    pub rtol: f64,
    /// Absolute tolerance
    pub atol: f64,
    /// Maximum internal steps per `integrate` call
    pub max_steps: usize,
    /// Smallest step before giving up (s)
    pub min_step: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            rtol: 1e-6,
            atol: 1e-9,
            max_steps: 1_000,
            min_step: 1e-12,
        }
    }
}

impl SolverConfig {
    /// Set both tolerances.
    #[must_use]
    pub fn with_tolerances(mut self, rtol: f64, atol: f64) -> Self {
        self.rtol = rtol;
        self.atol = atol;
        self
    }

    /// Set the internal step limit.
    #[must_use]
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }
}

const C: [f64; 7] = [0.0, 1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0, 1.0];

const A: [[f64; 6]; 7] = [
    [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [1.0 / 5.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [3.0 / 40.0, 9.0 / 40.0, 0.0, 0.0, 0.0, 0.0],
    [44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0, 0.0, 0.0, 0.0],
    [
        19372.0 / 6561.0,
        -25360.0 / 2187.0,
        64448.0 / 6561.0,
        -212.0 / 729.0,
        0.0,
        0.0,
    ],
    [
        9017.0 / 3168.0,
        -355.0 / 33.0,
        46732.0 / 5247.0,
        49.0 / 176.0,
        -5103.0 / 18656.0,
        0.0,
    ],
    [
        35.0 / 384.0,
        0.0,
        500.0 / 1113.0,
        125.0 / 192.0,
        -2187.0 / 6784.0,
        11.0 / 84.0,
    ],
];

/// Fifth-order weights.
const B: [f64; 7] = [
    35.0 / 384.0,
    0.0,
    500.0 / 1113.0,
    125.0 / 192.0,
    -2187.0 / 6784.0,
    11.0 / 84.0,
    0.0,
];

/// Fifth minus fourth-order weights.
const E: [f64; 7] = [
    71.0 / 57600.0,
    0.0,
    -71.0 / 16695.0,
    71.0 / 1920.0,
    -17253.0 / 339200.0,
    22.0 / 525.0,
    -1.0 / 40.0,
];

const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 5.0;

/// Dormand–Prince integrator carrying its step-size guess between calls.
#[derive(Debug, Clone, PartialEq)]
pub struct DormandPrince {
    config: SolverConfig,
    step_hint: Option<f64>,
}

impl DormandPrince {
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            step_hint: None,
        }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Replace the tolerances; the step guess is dropped.
    pub fn set_config(&mut self, config: SolverConfig) {
        self.config = config;
        self.step_hint = None;
    }

    /// Integrate `system` from `(t0, y0)` to `t1`.
    pub fn integrate<const N: usize, S: OdeSystem<N>>(
        &mut self,
        system: &S,
        t0: f64,
        y0: [f64; N],
        t1: f64,
    ) -> Result<[f64; N]> {
        let span = t1 - t0;
        if span <= 0.0 {
            return Ok(y0);
        }

        let mut t = t0;
        let mut y = y0;
        let mut h = self.step_hint.unwrap_or(span).min(span);
        let mut steps = 0usize;

        while t < t1 {
            if steps >= self.config.max_steps {
                return Err(Error::IntegrationDiverged {
                    time: t,
                    reason: format!("exceeded {} internal steps", self.config.max_steps),
                });
            }
            steps += 1;

            let last = t + h >= t1;
            let h_step = if last { t1 - t } else { h };
            let (y_new, err) = self.trial_step(system, t, &y, h_step)?;

            let factor = if err == 0.0 {
                MAX_FACTOR
            } else {
                (SAFETY * err.powf(-0.2)).clamp(MIN_FACTOR, MAX_FACTOR)
            };

            if err <= 1.0 {
                t = if last { t1 } else { t + h_step };
                y = y_new;
                // A last step truncated to hit t1 keeps the previous guess
                if !last || h_step >= h {
                    h = h_step * factor;
                }
            } else {
                h = h_step * factor;
                trace!(t, h, err, "step rejected");
                if h < self.config.min_step {
                    return Err(Error::StepSizeUnderflow { time: t, step: h });
                }
            }
        }

        self.step_hint = Some(h);
        Ok(y)
    }

    fn trial_step<const N: usize, S: OdeSystem<N>>(
        &self,
        system: &S,
        t: f64,
        y: &[f64; N],
        h: f64,
    ) -> Result<([f64; N], f64)> {
        let mut k = [[0.0; N]; 7];
        for stage in 0..7 {
            let mut y_stage = *y;
            for (j, a) in A[stage].iter().enumerate().take(stage) {
                for i in 0..N {
                    y_stage[i] += h * a * k[j][i];
                }
            }
            k[stage] = system.rhs(t + C[stage] * h, &y_stage)?;
            check_finite(t, &k[stage], "derivative")?;
        }

        let mut y_new = *y;
        let mut err_sq = 0.0;
        for i in 0..N {
            let mut increment = 0.0;
            let mut error = 0.0;
            for stage in 0..7 {
                increment += B[stage] * k[stage][i];
                error += E[stage] * k[stage][i];
            }
            y_new[i] += h * increment;
            let scale = self.config.atol + self.config.rtol * y[i].abs().max(y_new[i].abs());
            err_sq += (h * error / scale).powi(2);
        }
        check_finite(t + h, &y_new, "state")?;

        Ok((y_new, (err_sq / N as f64).sqrt()))
    }
}

fn check_finite<const N: usize>(time: f64, values: &[f64; N], what: &str) -> Result<()> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(Error::IntegrationDiverged {
            time,
            reason: format!("{what} component {index} is {}", values[index]),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Decay;

    impl OdeSystem<1> for Decay {
        fn rhs(&self, _t: f64, y: &[f64; 1]) -> Result<[f64; 1]> {
            Ok([-y[0]])
        }
    }

    struct Oscillator {
        omega: f64,
    }

    impl OdeSystem<2> for Oscillator {
        fn rhs(&self, _t: f64, y: &[f64; 2]) -> Result<[f64; 2]> {
            Ok([y[1], -self.omega * self.omega * y[0]])
        }
    }

    struct Blowup;

    impl OdeSystem<1> for Blowup {
        fn rhs(&self, t: f64, _y: &[f64; 1]) -> Result<[f64; 1]> {
            Ok([if t > 0.5 { f64::NAN } else { 1.0 }])
        }
    }

    #[test]
    fn exponential_decay_is_accurate() {
        let mut solver = DormandPrince::new(SolverConfig::default().with_tolerances(1e-10, 1e-12));
        let y = solver.integrate(&Decay, 0.0, [1.0], 2.0).unwrap();
        assert!((y[0] - (-2.0f64).exp()).abs() < 1e-8);
    }

    #[test]
    fn oscillator_tracks_cosine() {
        let system = Oscillator { omega: 6.0 };
        let mut solver = DormandPrince::new(SolverConfig::default().with_tolerances(1e-9, 1e-12));
        let mut y = [1.0, 0.0];
        let mut t = 0.0;
        for _ in 0..1000 {
            y = solver.integrate(&system, t, y, t + 1e-3).unwrap();
            t += 1e-3;
        }
        assert!((y[0] - (6.0f64).cos()).abs() < 1e-6, "{}", y[0]);
    }

    #[test]
    fn empty_span_is_identity() {
        let mut solver = DormandPrince::new(SolverConfig::default());
        assert_eq!(solver.integrate(&Decay, 1.0, [3.0], 1.0).unwrap(), [3.0]);
    }

    #[test]
    fn nan_derivative_diverges() {
        let mut solver = DormandPrince::new(SolverConfig::default());
        let err = solver.integrate(&Blowup, 0.0, [0.0], 1.0).unwrap_err();
        assert!(matches!(err, Error::IntegrationDiverged { .. }));
    }

    #[test]
    fn step_limit_is_enforced() {
        let config = SolverConfig::default()
            .with_tolerances(1e-14, 1e-16)
            .with_max_steps(3);
        let mut solver = DormandPrince::new(config);
        let system = Oscillator { omega: 50.0 };
        let err = solver.integrate(&system, 0.0, [1.0, 0.0], 10.0).unwrap_err();
        assert!(matches!(err, Error::IntegrationDiverged { .. }));
    }

    #[test]
    fn solver_is_deterministic() {
        let system = Oscillator { omega: 3.0 };
        let mut a = DormandPrince::new(SolverConfig::default());
        let mut b = DormandPrince::new(SolverConfig::default());
        let ya = a.integrate(&system, 0.0, [1.0, 0.0], 0.7).unwrap();
        let yb = b.integrate(&system, 0.0, [1.0, 0.0], 0.7).unwrap();
        assert_eq!(ya, yb);
        assert_eq!(a, b);
    }
}
