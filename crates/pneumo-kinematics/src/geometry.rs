//! Lever ↔ wheel position ↔ cylinder stroke and chamber volumes.
//!
//! Coordinates are in the corner plane with the lever pivot at the origin,
//! `x` pointing laterally outwards (towards the wheel) and `y` pointing up.
//! A positive lever angle lifts the wheel relative to the body.

use std::f64::consts::PI;

use glam::DVec2;

use crate::capsule::{interference, Segment};
use crate::error::{Chamber, Error, Result};
use crate::RESIDUAL_VOLUME_FRACTION;

/// Static geometry of one suspension corner.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CornerGeometry {
    /// Pivot-to-wheel lever length (m).
    pub lever_length: f64,
    /// Lateral distance from the body centreline to the lever pivot (m).
    pub pivot_offset: f64,
    /// Rod attachment point as a fraction of the lever length.
    pub rod_mount_ratio: f64,
    /// Frame-side cylinder hinge, relative to the lever pivot (m).
    pub cylinder_mount: DVec2,
    /// Cylinder bore diameter (m).
    pub bore: f64,
    /// Piston rod diameter (m).
    pub rod_diameter: f64,
    /// Full piston stroke (m); neutral sits at mid-stroke.
    pub stroke_max: f64,
    /// Unswept volume on the head side (m³).
    pub dead_volume_head: f64,
    /// Unswept volume on the rod side (m³).
    pub dead_volume_rod: f64,
    /// Barrel length measured from the frame hinge along the cylinder axis (m).
    pub barrel_length: f64,
    /// Lever capsule radius (m).
    pub lever_radius: f64,
    /// Barrel capsule radius (m).
    pub barrel_radius: f64,
}

impl Default for CornerGeometry {
    fn default() -> Self {
        Self {
            lever_length: 0.4,
            pivot_offset: 0.35,
            rod_mount_ratio: 0.6,
            cylinder_mount: DVec2::new(0.24, 0.45),
            bore: 0.08,
            rod_diameter: 0.032,
            stroke_max: 0.2,
            dead_volume_head: 5.0e-5,
            dead_volume_rod: 5.0e-5,
            barrel_length: 0.25,
            lever_radius: 0.02,
            barrel_radius: 0.045,
        }
    }
}

/// Lever orientation expressed both as an angle and as a wheel position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeverState {
    /// Lever angle from horizontal (rad).
    pub angle: f64,
    /// Wheel vertical position relative to the pivot (m).
    pub position: f64,
}

impl LeverState {
    /// Lever state for a given angle.
    pub fn from_angle(geometry: &CornerGeometry, angle: f64) -> Self {
        Self {
            angle,
            position: geometry.angle_to_position(angle),
        }
    }

    /// Lever state for a given wheel position.
    pub fn from_position(geometry: &CornerGeometry, position: f64) -> Result<Self> {
        Ok(Self {
            angle: geometry.position_to_angle(position)?,
            position,
        })
    }
}

/// Cylinder stroke and chamber volumes for one lever state.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CylinderState {
    /// Piston displacement from neutral (m); positive extends the cylinder.
    pub stroke: f64,
    /// Head-side chamber volume (m³).
    pub volume_head: f64,
    /// Rod-side chamber volume (m³).
    pub volume_rod: f64,
}

impl CylinderState {
    /// Volume of the given chamber.
    pub fn volume(&self, chamber: Chamber) -> f64 {
        match chamber {
            Chamber::Head => self.volume_head,
            Chamber::Rod => self.volume_rod,
        }
    }
}

impl CornerGeometry {
    /// Track width implied by this corner: `2·(lever_length + pivot_offset)`.
    pub fn track(&self) -> f64 {
        2.0 * (self.lever_length + self.pivot_offset)
    }

    /// Piston area on the head side: `π·(bore/2)²`.
    pub fn area_head(&self) -> f64 {
        PI * (self.bore / 2.0).powi(2)
    }

    /// Rod cross-section: `π·(rod/2)²`.
    pub fn area_rod_section(&self) -> f64 {
        PI * (self.rod_diameter / 2.0).powi(2)
    }

    /// Annular piston area on the rod side.
    pub fn area_rod(&self) -> f64 {
        self.area_head() - self.area_rod_section()
    }

    /// Head chamber volume at full extension.
    pub fn full_volume_head(&self) -> f64 {
        self.dead_volume_head + self.area_head() * self.stroke_max
    }

    /// Rod chamber volume at full retraction.
    pub fn full_volume_rod(&self) -> f64 {
        self.dead_volume_rod + self.area_rod() * self.stroke_max
    }

    /// Smallest admissible volume for a chamber.
    pub fn residual_volume(&self, chamber: Chamber) -> f64 {
        let full = match chamber {
            Chamber::Head => self.full_volume_head(),
            Chamber::Rod => self.full_volume_rod(),
        };
        RESIDUAL_VOLUME_FRACTION * full
    }

    /// Wheel position for a lever angle: `L·sin(angle)`.
    pub fn angle_to_position(&self, angle: f64) -> f64 {
        self.lever_length * angle.sin()
    }

    /// Lever angle for a wheel position.
    pub fn position_to_angle(&self, position: f64) -> Result<f64> {
        if !position.is_finite() || position.abs() > self.lever_length {
            return Err(Error::PositionOutOfRange {
                position,
                lever_length: self.lever_length,
            });
        }
        Ok((position / self.lever_length).asin())
    }

    /// Rod pin on the lever.
    pub fn rod_attachment(&self, angle: f64) -> DVec2 {
        let r = self.rod_mount_ratio * self.lever_length;
        DVec2::new(r * angle.cos(), r * angle.sin())
    }

    /// Wheel end of the lever.
    pub fn lever_tip(&self, angle: f64) -> DVec2 {
        DVec2::new(self.lever_length * angle.cos(), self.lever_length * angle.sin())
    }

    /// Distance between the frame hinge and the rod pin.
    pub fn hinge_distance(&self, angle: f64) -> f64 {
        (self.rod_attachment(angle) - self.cylinder_mount).length()
    }

    /// Stroke: current hinge distance minus neutral hinge distance.
    pub fn stroke(&self, angle: f64) -> f64 {
        self.hinge_distance(angle) - self.hinge_distance(0.0)
    }

    /// Stroke and chamber volumes for a lever state.
    ///
    /// Fails when either chamber would drop below its residual volume.
    pub fn cylinder_state(&self, lever: LeverState) -> Result<CylinderState> {
        let stroke = self.stroke(lever.angle);
        let half = self.stroke_max / 2.0;
        let volume_head = self.dead_volume_head + self.area_head() * (half + stroke);
        let volume_rod = self.dead_volume_rod + self.area_rod() * (half - stroke);

        for (chamber, volume) in [(Chamber::Head, volume_head), (Chamber::Rod, volume_rod)] {
            let minimum = self.residual_volume(chamber);
            if !volume.is_finite() || volume < minimum {
                return Err(Error::ResidualVolume {
                    chamber,
                    volume,
                    minimum,
                });
            }
        }

        Ok(CylinderState {
            stroke,
            volume_head,
            volume_rod,
        })
    }

    /// `d(stroke)/d(position)` at the given angle.
    ///
    /// Negative for the default layout: lifting the wheel shortens the
    /// cylinder.
    pub fn motion_ratio(&self, angle: f64) -> f64 {
        let r = self.rod_mount_ratio * self.lever_length;
        let axis = self.rod_attachment(angle) - self.cylinder_mount;
        let length = axis.length();
        let d_attach = DVec2::new(-r * angle.sin(), r * angle.cos());
        let d_hinge = axis.dot(d_attach) / length;
        let d_position = self.lever_length * angle.cos();
        d_hinge / d_position
    }

    /// Net axial force pushing the cylinder towards extension (N).
    ///
    /// Atmosphere acts on the exposed rod cross-section, so equal pressures
    /// everywhere produce zero force.
    pub fn piston_force(&self, p_head: f64, p_rod: f64, p_atm: f64) -> f64 {
        p_head * self.area_head() - p_rod * self.area_rod() - p_atm * self.area_rod_section()
    }

    /// Lever core segment (pivot → wheel).
    pub fn lever_segment(&self, angle: f64) -> Segment {
        Segment::new(DVec2::ZERO, self.lever_tip(angle))
    }

    /// Barrel core segment (frame hinge → barrel end along the cylinder axis).
    pub fn barrel_segment(&self, angle: f64) -> Segment {
        let axis = (self.rod_attachment(angle) - self.cylinder_mount).normalize_or_zero();
        Segment::new(
            self.cylinder_mount,
            self.cylinder_mount + axis * self.barrel_length,
        )
    }

    /// Lever/barrel clearance at the given angle; negative means interference.
    pub fn clearance(&self, angle: f64) -> f64 {
        interference(
            &self.lever_segment(angle),
            &self.barrel_segment(angle),
            (self.lever_radius, self.barrel_radius),
        )
    }

    /// Check parameters for physical consistency.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("lever_length", self.lever_length),
            ("rod_mount_ratio", self.rod_mount_ratio),
            ("bore", self.bore),
            ("rod_diameter", self.rod_diameter),
            ("stroke_max", self.stroke_max),
            ("dead_volume_head", self.dead_volume_head),
            ("dead_volume_rod", self.dead_volume_rod),
            ("barrel_length", self.barrel_length),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::InvalidGeometry(format!("{name} must be positive, got {value}")));
            }
        }
        let non_negative = [
            ("pivot_offset", self.pivot_offset),
            ("lever_radius", self.lever_radius),
            ("barrel_radius", self.barrel_radius),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidGeometry(format!("{name} must be non-negative, got {value}")));
            }
        }
        if !self.cylinder_mount.is_finite() {
            return Err(Error::InvalidGeometry("cylinder_mount must be finite".into()));
        }
        if self.rod_mount_ratio > 1.0 {
            return Err(Error::InvalidGeometry(format!(
                "rod_mount_ratio must be at most 1, got {}",
                self.rod_mount_ratio
            )));
        }
        if self.rod_diameter >= self.bore {
            return Err(Error::InvalidGeometry(format!(
                "rod diameter {} must be smaller than bore {}",
                self.rod_diameter, self.bore
            )));
        }
        let neutral = self.hinge_distance(0.0);
        if neutral <= self.barrel_length {
            return Err(Error::InvalidGeometry(format!(
                "barrel length {} reaches past the rod pin at {neutral}",
                self.barrel_length
            )));
        }
        // Neutral must itself be a valid state
        self.cylinder_state(LeverState::from_angle(self, 0.0))?;
        Ok(())
    }
}
