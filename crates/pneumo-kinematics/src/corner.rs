//! Corner identifiers and their placement on the body.

use std::fmt;

/// One of the four suspension corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CornerId {
    /// Front left
    FrontLeft,
    /// Front right
    FrontRight,
    /// Rear left
    RearLeft,
    /// Rear right
    RearRight,
}

impl CornerId {
    /// All corners in index order.
    pub const ALL: [Self; 4] = [
        Self::FrontLeft,
        Self::FrontRight,
        Self::RearLeft,
        Self::RearRight,
    ];

    /// Stable array index (0..4).
    pub const fn index(self) -> usize {
        match self {
            Self::FrontLeft => 0,
            Self::FrontRight => 1,
            Self::RearLeft => 2,
            Self::RearRight => 3,
        }
    }

    /// Corner at the given index, if any.
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::FrontLeft),
            1 => Some(Self::FrontRight),
            2 => Some(Self::RearLeft),
            3 => Some(Self::RearRight),
            _ => None,
        }
    }

    /// The diagonally opposite corner (FL↔RR, FR↔RL).
    pub const fn diagonal(self) -> Self {
        match self {
            Self::FrontLeft => Self::RearRight,
            Self::FrontRight => Self::RearLeft,
            Self::RearLeft => Self::FrontRight,
            Self::RearRight => Self::FrontLeft,
        }
    }

    /// Lateral sign: +1 on the left, -1 on the right.
    pub const fn side(self) -> f64 {
        match self {
            Self::FrontLeft | Self::RearLeft => 1.0,
            Self::FrontRight | Self::RearRight => -1.0,
        }
    }

    /// Longitudinal sign: +1 at the front, -1 at the rear.
    pub const fn axle(self) -> f64 {
        match self {
            Self::FrontLeft | Self::FrontRight => 1.0,
            Self::RearLeft | Self::RearRight => -1.0,
        }
    }

    /// Whether this corner sits on the front axle.
    pub const fn is_front(self) -> bool {
        matches!(self, Self::FrontLeft | Self::FrontRight)
    }

    /// Short label used in logs.
    pub const fn label(self) -> &'static str {
        match self {
            Self::FrontLeft => "FL",
            Self::FrontRight => "FR",
            Self::RearLeft => "RL",
            Self::RearRight => "RR",
        }
    }
}

impl fmt::Display for CornerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
