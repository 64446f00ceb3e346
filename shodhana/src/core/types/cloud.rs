//! Point and point cloud types for lidar scans.

use serde::{Deserialize, Serialize};

/// A 3D point in meters.
///
/// Planar lidar returns carry `z = 0`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3D {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3D {
    /// Create a new point.
    #[inline]
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Point on the ground plane.
    #[inline]
    pub fn planar(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }

    #[inline]
    pub fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

/// One lidar scan as an ordered list of points.
///
/// Point order is preserved through loading and transformation so that
/// assembled clouds are reproducible.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PointCloud3D {
    pub points: Vec<Point3D>,
}

impl PointCloud3D {
    /// Create an empty point cloud.
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Create a point cloud with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
        }
    }

    pub fn from_points(points: Vec<Point3D>) -> Self {
        Self { points }
    }

    #[inline]
    pub fn push(&mut self, point: Point3D) {
        self.points.push(point);
    }

    /// Number of points.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Point3D> + '_ {
        self.points.iter()
    }
}

impl FromIterator<Point3D> for PointCloud3D {
    fn from_iter<I: IntoIterator<Item = Point3D>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}
