//! Road signal generator.

use std::f64::consts::TAU;

use pneumo_kinematics::CornerId;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::Result;
use crate::iso8608::{synthesize_track, Harmonic};
use crate::profile::{RoadProfile, RoadSample};

#[derive(Debug, Clone)]
enum Source {
    Flat,
    Sine {
        amplitude: f64,
        omega: f64,
        phase: [f64; 4],
    },
    Harmonic {
        /// Left and right tracks
        tracks: [Vec<Harmonic>; 2],
        /// Time lag of the rear axle behind the front axle (s)
        rear_delay: f64,
    },
    Table {
        samples: Vec<RoadSample>,
    },
}

/// Deterministic per-corner road displacement generator.
#[derive(Debug, Clone)]
pub struct RoadExcitation {
    profile: RoadProfile,
    wheelbase: f64,
    source: Source,
}

impl RoadExcitation {
    /// Build the signal for a profile. `wheelbase` sets the rear-axle delay
    /// of travelling profiles.
    pub fn new(profile: &RoadProfile, wheelbase: f64) -> Result<Self> {
        profile.validate()?;
        let source = build_source(profile, wheelbase);
        Ok(Self {
            profile: profile.clone(),
            wheelbase,
            source,
        })
    }

    /// The profile this signal was built from.
    pub fn profile(&self) -> &RoadProfile {
        &self.profile
    }

    /// Rebuild the signal from its profile and seed.
    pub fn restart(&mut self) {
        self.source = build_source(&self.profile, self.wheelbase);
    }

    /// Road height under `corner` at time `t` (m).
    pub fn displacement(&self, corner: CornerId, t: f64) -> f64 {
        let i = corner.index();
        match &self.source {
            Source::Flat => 0.0,
            Source::Sine {
                amplitude,
                omega,
                phase,
            } => amplitude * (omega * t + phase[i]).sin(),
            Source::Harmonic { tracks, rear_delay } => {
                let (track, t) = track_time(tracks, *rear_delay, corner, t);
                track.iter().map(|h| h.displacement(t)).sum()
            }
            Source::Table { samples } => table_lookup(samples, i, t).0,
        }
    }

    /// Vertical road velocity under `corner` at time `t` (m/s).
    pub fn velocity(&self, corner: CornerId, t: f64) -> f64 {
        let i = corner.index();
        match &self.source {
            Source::Flat => 0.0,
            Source::Sine {
                amplitude,
                omega,
                phase,
            } => amplitude * omega * (omega * t + phase[i]).cos(),
            Source::Harmonic { tracks, rear_delay } => {
                let (track, t) = track_time(tracks, *rear_delay, corner, t);
                track.iter().map(|h| h.velocity(t)).sum()
            }
            Source::Table { samples } => table_lookup(samples, i, t).1,
        }
    }

    /// All four corners at once.
    pub fn displacements(&self, t: f64) -> [f64; 4] {
        CornerId::ALL.map(|c| self.displacement(c, t))
    }

    /// All four corner velocities at once.
    pub fn velocities(&self, t: f64) -> [f64; 4] {
        CornerId::ALL.map(|c| self.velocity(c, t))
    }

    /// Lazy `(time, displacement)` sequence for one corner.
    pub fn samples(&self, corner: CornerId, start: f64, dt: f64) -> RoadSamples<'_> {
        RoadSamples {
            road: self,
            corner,
            start,
            dt,
            index: 0,
        }
    }
}

/// Iterator over evenly spaced road samples for one corner.
#[derive(Debug, Clone)]
pub struct RoadSamples<'a> {
    road: &'a RoadExcitation,
    corner: CornerId,
    start: f64,
    dt: f64,
    index: u64,
}

impl Iterator for RoadSamples<'_> {
    type Item = (f64, f64);

    fn next(&mut self) -> Option<Self::Item> {
        // Multiply rather than accumulate so long runs don't drift
        let t = self.start + self.dt * self.index as f64;
        self.index += 1;
        Some((t, self.road.displacement(self.corner, t)))
    }
}

fn build_source(profile: &RoadProfile, wheelbase: f64) -> Source {
    match profile {
        RoadProfile::Flat => Source::Flat,
        RoadProfile::Sine {
            amplitude,
            frequency,
            phase,
            corner_phase,
        } => Source::Sine {
            amplitude: *amplitude,
            omega: TAU * frequency,
            phase: corner_phase.map(|p| phase + p),
        },
        RoadProfile::Iso8608 {
            class,
            speed,
            seed,
            components,
        } => {
            let mut rng = StdRng::seed_from_u64(*seed);
            let left = synthesize_track(*class, *speed, *components, &mut rng);
            let right = synthesize_track(*class, *speed, *components, &mut rng);
            Source::Harmonic {
                tracks: [left, right],
                rear_delay: wheelbase / speed,
            }
        }
        RoadProfile::Table { samples } => Source::Table {
            samples: samples.clone(),
        },
    }
}

fn track_time(
    tracks: &[Vec<Harmonic>; 2],
    rear_delay: f64,
    corner: CornerId,
    t: f64,
) -> (&[Harmonic], f64) {
    let track = if corner.side() > 0.0 { &tracks[0] } else { &tracks[1] };
    let t = if corner.is_front() { t } else { t - rear_delay };
    (track, t)
}

/// Linear interpolation with clamp-at-edges; returns `(height, slope)`.
fn table_lookup(samples: &[RoadSample], corner: usize, t: f64) -> (f64, f64) {
    let (first, last) = match (samples.first(), samples.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return (0.0, 0.0),
    };
    if t <= first.time {
        return (first.heights[corner], 0.0);
    }
    if t >= last.time {
        return (last.heights[corner], 0.0);
    }

    // First sample strictly after t; guaranteed in 1..len by the checks above
    let hi = samples.partition_point(|s| s.time <= t);
    let a = &samples[hi - 1];
    let b = &samples[hi];
    let span = b.time - a.time;
    let slope = (b.heights[corner] - a.heights[corner]) / span;
    (a.heights[corner] + slope * (t - a.time), slope)
}
