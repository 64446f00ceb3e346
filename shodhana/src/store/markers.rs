//! Trajectory marker assembly.

use serde::Deserialize;

use super::trajectory::TrajectoryStore;
use crate::core::types::{Pose2D, Quaternion};
use crate::io::messages::{MarkerArray, MessageHeader, TrajectoryMarker};

/// Appearance of the trajectory arrows.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MarkerStyle {
    /// Marker namespace.
    pub namespace: String,
    /// Arrow length for the first (most recent) pose.
    pub default_length: f32,
    /// Arrow width and height.
    pub width: f32,
    /// RGBA in [0, 1].
    pub color: [f32; 4],
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            namespace: "map_optimizer".to_string(),
            default_length: 0.5,
            width: 0.5,
            color: [0.0, 1.0, 0.0, 0.5],
        }
    }
}

impl TrajectoryStore {
    /// One arrow per pose, from the most recent back to the first.
    ///
    /// Ids count down from `count - 1`. Each arrow's length is the distance
    /// to the previously emitted pose.
    pub fn trajectory_markers(&self, style: &MarkerStyle, header: MessageHeader) -> MarkerArray {
        let count = self.count();
        let mut markers = Vec::with_capacity(count);
        let mut last: Option<Pose2D> = None;

        for (index, node) in self.chain().enumerate() {
            let length = match last {
                Some(prev) => node.pose.distance(&prev),
                None => style.default_length,
            };
            last = Some(node.pose);

            markers.push(TrajectoryMarker {
                ns: style.namespace.clone(),
                id: marker_id(count.saturating_sub(index + 1)),
                position: node.pose.position(),
                orientation: Quaternion::from_yaw(node.pose.theta),
                scale: [length, style.width, style.width],
                color: style.color,
            });
        }

        log::info!("Trajectory marker array: {} markers", markers.len());
        MarkerArray { header, markers }
    }
}

/// Marker ids are `i32` on the wire; positions past `i32::MAX` saturate.
fn marker_id(position: usize) -> i32 {
    i32::try_from(position).unwrap_or(i32::MAX)
}
