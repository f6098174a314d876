//! 2D capsule-capsule clearance.
//!
//! A capsule is a segment swept by a disc. Two capsules interfere when the
//! minimum distance between their core segments is smaller than the sum of
//! their radii.

use glam::DVec2;

/// Tolerance below which a segment is treated as a point.
const DEGENERATE_LENGTH_SQ: f64 = 1e-24;

/// A line segment in the corner plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    /// Start point
    pub a: DVec2,
    /// End point
    pub b: DVec2,
}

impl Segment {
    /// Create a segment between two points.
    pub const fn new(a: DVec2, b: DVec2) -> Self {
        Self { a, b }
    }

    /// Segment length.
    pub fn length(&self) -> f64 {
        (self.b - self.a).length()
    }

    /// Whether the segment has collapsed to a point.
    pub fn is_degenerate(&self) -> bool {
        (self.b - self.a).length_squared() <= DEGENERATE_LENGTH_SQ
    }

    /// Distance from a point to this segment (projection clamped to the ends).
    pub fn distance_to_point(&self, p: DVec2) -> f64 {
        let d = self.b - self.a;
        let len_sq = d.length_squared();
        if len_sq <= DEGENERATE_LENGTH_SQ {
            return (p - self.a).length();
        }
        let t = ((p - self.a).dot(d) / len_sq).clamp(0.0, 1.0);
        (p - (self.a + d * t)).length()
    }
}

/// Signed area orientation of the triangle (a, b, c).
fn orient(a: DVec2, b: DVec2, c: DVec2) -> f64 {
    (b - a).perp_dot(c - a)
}

/// Whether two non-degenerate segments cross or touch.
fn segments_intersect(s1: &Segment, s2: &Segment) -> bool {
    let d1 = orient(s2.a, s2.b, s1.a);
    let d2 = orient(s2.a, s2.b, s1.b);
    let d3 = orient(s1.a, s1.b, s2.a);
    let d4 = orient(s1.a, s1.b, s2.b);

    // Strict straddle; collinear overlap is caught by the endpoint distances
    (d1 > 0.0) != (d2 > 0.0) && (d3 > 0.0) != (d4 > 0.0) && d1 != 0.0 && d2 != 0.0 && d3 != 0.0 && d4 != 0.0
}

/// Minimum distance between two segments.
///
/// If the segments cross the distance is zero. Otherwise the minimum is
/// attained at an endpoint of one of them, so the four endpoint projections
/// cover parallel and degenerate (point-like) segments as well.
pub fn segment_distance(s1: &Segment, s2: &Segment) -> f64 {
    if !s1.is_degenerate() && !s2.is_degenerate() && segments_intersect(s1, s2) {
        return 0.0;
    }

    s2.distance_to_point(s1.a)
        .min(s2.distance_to_point(s1.b))
        .min(s1.distance_to_point(s2.a))
        .min(s1.distance_to_point(s2.b))
}

/// Clearance between a lever capsule and a cylinder capsule.
///
/// `radii` is `(lever_radius, cylinder_radius)`. Negative clearance signals
/// interference.
pub fn interference(lever: &Segment, cylinder: &Segment, radii: (f64, f64)) -> f64 {
    segment_distance(lever, cylinder) - (radii.0 + radii.1)
}
