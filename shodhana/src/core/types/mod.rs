//! Core data types.
//!
//! - [`Point3D`]: A single lidar return in meters
//! - [`PointCloud3D`]: Ordered collection of points (one scan)
//! - [`Pose2D`]: Planar robot pose (x, y, theta)
//! - [`Quaternion`]: Unit rotation [w, x, y, z]
//! - [`RigidTransform`]: Rotation + translation applied to scan points

mod cloud;
mod pose;
mod transform;

pub use cloud::{Point3D, PointCloud3D};
pub use pose::Pose2D;
pub use transform::{Quaternion, RigidTransform};
