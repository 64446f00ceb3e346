//! Planar robot pose.

use serde::{Deserialize, Serialize};

use super::cloud::Point3D;

/// Robot pose in 2D space.
///
/// Represents position (x, y) in meters and heading (theta) in radians.
/// Theta is normalized to [-π, π].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose2D {
    /// X position in meters
    pub x: f32,
    /// Y position in meters
    pub y: f32,
    /// Heading in radians, normalized to [-π, π]
    pub theta: f32,
}

impl Pose2D {
    /// Create a new pose with theta normalized to [-π, π].
    #[inline]
    pub fn new(x: f32, y: f32, theta: f32) -> Self {
        Self {
            x,
            y,
            theta: crate::core::math::normalize_angle(theta),
        }
    }

    /// Position on the ground plane (z = 0).
    #[inline]
    pub fn position(&self) -> Point3D {
        Point3D::planar(self.x, self.y)
    }

    /// Planar distance between the positions of two poses.
    #[inline]
    pub fn distance(&self, other: &Pose2D) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}
