//! Road profile selection (configuration side).

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::iso8608::RoadClass;

/// Upper bound on harmonic components per ISO 8608 track.
pub const MAX_COMPONENTS: usize = 4096;

/// One tabulated road sample: time and per-corner heights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoadSample {
    /// Simulation time (s)
    pub time: f64,
    /// Road height under each corner, indexed by `CornerId::index()` (m)
    pub heights: [f64; 4],
}

/// Which road signal to generate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RoadProfile {
    /// Level road, zero displacement everywhere.
    Flat,

    /// Sinusoidal excitation.
    Sine {
        /// Amplitude (m)
        amplitude: f64,
        /// Frequency (Hz)
        frequency: f64,
        /// Global phase (rad)
        phase: f64,
        /// Additional phase per corner (rad)
        corner_phase: [f64; 4],
    },

    /// ISO 8608 class-based random road.
    Iso8608 {
        /// Roughness class
        class: RoadClass,
        /// Vehicle speed (m/s)
        speed: f64,
        /// Seed for the phase generator
        seed: u64,
        /// Number of harmonic components per track
        components: usize,
    },

    /// Externally supplied samples.
    Table {
        /// Samples, strictly increasing in time
        samples: Vec<RoadSample>,
    },
}

impl Default for RoadProfile {
    fn default() -> Self {
        Self::Flat
    }
}

impl RoadProfile {
    /// In-phase sinusoid on all four corners.
    pub fn sine(amplitude: f64, frequency: f64) -> Self {
        Self::Sine {
            amplitude,
            frequency,
            phase: 0.0,
            corner_phase: [0.0; 4],
        }
    }

    /// ISO 8608 road with a default component count.
    pub fn iso8608(class: RoadClass, speed: f64, seed: u64) -> Self {
        Self::Iso8608 {
            class,
            speed,
            seed,
            components: 128,
        }
    }

    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::Sine { .. } => "sine",
            Self::Iso8608 { .. } => "iso8608",
            Self::Table { .. } => "table",
        }
    }

    /// Check parameters without building the signal.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Flat => Ok(()),
            Self::Sine {
                amplitude,
                frequency,
                phase,
                corner_phase,
            } => {
                non_negative("amplitude", *amplitude)?;
                non_negative("frequency", *frequency)?;
                finite("phase", *phase)?;
                for p in corner_phase {
                    finite("corner_phase", *p)?;
                }
                Ok(())
            }
            Self::Iso8608 {
                speed, components, ..
            } => {
                if !speed.is_finite() || *speed <= 0.0 {
                    return Err(Error::InvalidParameter {
                        name: "speed",
                        value: *speed,
                    });
                }
                if *components == 0 || *components > MAX_COMPONENTS {
                    return Err(Error::InvalidParameter {
                        name: "components",
                        value: *components as f64,
                    });
                }
                Ok(())
            }
            Self::Table { samples } => {
                if samples.is_empty() {
                    return Err(Error::EmptyTable);
                }
                for (index, sample) in samples.iter().enumerate() {
                    finite("time", sample.time)?;
                    for h in sample.heights {
                        finite("height", h)?;
                    }
                    if index > 0 && sample.time <= samples[index - 1].time {
                        return Err(Error::UnsortedTable {
                            index,
                            time: sample.time,
                        });
                    }
                }
                Ok(())
            }
        }
    }
}

fn finite(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::InvalidParameter { name, value })
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidParameter { name, value })
    }
}
