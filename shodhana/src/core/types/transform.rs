//! Rotations and rigid transforms applied to scan points.
//!
//! Stored poses are planar, but the interactive handle reports a full 6-DoF
//! pose, so transforms are kept in 3D with a quaternion rotation.

use serde::{Deserialize, Serialize};

use super::cloud::{Point3D, PointCloud3D};
use super::pose::Pose2D;

/// Quaternion representation [w, x, y, z].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

impl Quaternion {
    /// Create identity quaternion (no rotation).
    pub fn identity() -> Self {
        Self {
            w: 1.0,
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }

    /// Rotation of `yaw` radians about the Z axis.
    pub fn from_yaw(yaw: f32) -> Self {
        let (s, c) = (yaw * 0.5).sin_cos();
        Self {
            w: c,
            x: 0.0,
            y: 0.0,
            z: s,
        }
    }

    #[inline]
    pub fn norm(&self) -> f32 {
        (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Normalize the quaternion to unit length.
    pub fn normalize(&mut self) {
        let norm = self.norm();
        if norm > 1e-10 {
            self.w /= norm;
            self.x /= norm;
            self.y /= norm;
            self.z /= norm;
        }
    }

    /// Inverse rotation of a unit quaternion.
    #[inline]
    pub fn conjugate(&self) -> Self {
        Self {
            w: self.w,
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }

    /// Rotate a point by this (unit) quaternion.
    #[inline]
    pub fn rotate(&self, p: &Point3D) -> Point3D {
        // v' = v + 2w(q × v) + 2 q × (q × v)
        let (qx, qy, qz) = (self.x, self.y, self.z);
        let tx = 2.0 * (qy * p.z - qz * p.y);
        let ty = 2.0 * (qz * p.x - qx * p.z);
        let tz = 2.0 * (qx * p.y - qy * p.x);
        Point3D::new(
            p.x + self.w * tx + (qy * tz - qz * ty),
            p.y + self.w * ty + (qz * tx - qx * tz),
            p.z + self.w * tz + (qx * ty - qy * tx),
        )
    }

    /// Heading about the Z axis in radians.
    pub fn yaw(&self) -> f32 {
        let siny_cosp = 2.0 * (self.w * self.z + self.x * self.y);
        let cosy_cosp = 1.0 - 2.0 * (self.y * self.y + self.z * self.z);
        siny_cosp.atan2(cosy_cosp)
    }
}

/// Rigid transform `p' = R * p + t`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RigidTransform {
    /// Unit rotation.
    pub rotation: Quaternion,
    /// Translation in meters.
    pub translation: Point3D,
}

impl RigidTransform {
    /// Create a transform, normalizing the rotation.
    ///
    /// A degenerate (near-zero) quaternion is treated as no rotation.
    pub fn new(rotation: Quaternion, translation: Point3D) -> Self {
        let rotation = if rotation.norm() > 1e-6 {
            let mut r = rotation;
            r.normalize();
            r
        } else {
            Quaternion::identity()
        };
        Self {
            rotation,
            translation,
        }
    }

    pub fn identity() -> Self {
        Self {
            rotation: Quaternion::identity(),
            translation: Point3D::default(),
        }
    }

    /// Planar pose embedded in 3D: rotation by theta about Z, translation (x, y, 0).
    pub fn from_pose2d(pose: &Pose2D) -> Self {
        Self {
            rotation: Quaternion::from_yaw(pose.theta),
            translation: pose.position(),
        }
    }

    /// Apply to a single point.
    #[inline]
    pub fn apply(&self, p: &Point3D) -> Point3D {
        let r = self.rotation.rotate(p);
        Point3D::new(
            r.x + self.translation.x,
            r.y + self.translation.y,
            r.z + self.translation.z,
        )
    }

    /// Apply to every point of a cloud, preserving order.
    pub fn apply_cloud(&self, cloud: &PointCloud3D) -> PointCloud3D {
        cloud.iter().map(|p| self.apply(p)).collect()
    }

    /// Apply to every point of `cloud`, appending to `out`.
    pub fn apply_into(&self, cloud: &PointCloud3D, out: &mut PointCloud3D) {
        out.points.reserve(cloud.len());
        out.points.extend(cloud.iter().map(|p| self.apply(p)));
    }

    /// Transform that undoes this one.
    pub fn inverse(&self) -> Self {
        let inv_rot = self.rotation.conjugate();
        let t = inv_rot.rotate(&self.translation);
        Self {
            rotation: inv_rot,
            translation: Point3D::new(-t.x, -t.y, -t.z),
        }
    }
}
