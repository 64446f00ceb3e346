//! Message types exchanged with the viewer.
//!
//! Outgoing messages (trajectory markers, scan clouds) and incoming operator
//! events. Everything is plain serde data so any transport can carry it.

use std::fmt;
use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::core::types::{Point3D, PointCloud3D, Quaternion, RigidTransform};

// ============================================================================
// Outgoing
// ============================================================================

/// Frame label and capture time shared by every outgoing message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageHeader {
    /// Reference frame the coordinates are expressed in.
    pub frame_id: String,
    /// Capture time in microseconds since the Unix epoch.
    pub stamp_us: u64,
}

impl MessageHeader {
    pub fn new(frame_id: impl Into<String>, stamp_us: u64) -> Self {
        Self {
            frame_id: frame_id.into(),
            stamp_us,
        }
    }
}

/// One arrow of the trajectory display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrajectoryMarker {
    /// Marker namespace.
    pub ns: String,
    /// Marker id, decreasing from `count - 1` along the chain.
    pub id: i32,
    /// Arrow base on the ground plane.
    pub position: Point3D,
    /// Yaw-only orientation.
    pub orientation: Quaternion,
    /// [length, width, height]; length is the distance to the previous arrow.
    pub scale: [f32; 3],
    /// RGBA in [0, 1].
    pub color: [f32; 4],
}

/// Full trajectory, republished on every load.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerArray {
    pub header: MessageHeader,
    pub markers: Vec<TrajectoryMarker>,
}

impl MarkerArray {
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

/// Flattened scan points in the reference frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanCloudMessage {
    pub header: MessageHeader,
    /// Points as [[x, y, z], ...]
    pub points: Vec<[f32; 3]>,
}

impl ScanCloudMessage {
    pub fn from_cloud(header: MessageHeader, cloud: &PointCloud3D) -> Self {
        Self {
            header,
            points: cloud.iter().map(|p| p.to_array()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

// ============================================================================
// Shared
// ============================================================================

/// What an incoming id selection designates.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// Accumulate reference scans.
    #[serde(alias = "ref")]
    #[value(alias = "ref")]
    Reference,
    /// Pick the scan to move with the handle.
    #[default]
    Target,
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionMode::Reference => write!(f, "Reference"),
            SelectionMode::Target => write!(f, "Target"),
        }
    }
}

// ============================================================================
// Incoming
// ============================================================================

/// Event received from the operator's viewer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OperatorEvent {
    /// Set the selection mode directly.
    SetMode { mode: SelectionMode },

    /// A context-menu entry on the handle was chosen.
    Menu { entry: MenuEntry },

    /// Trajectory poses were picked; ids are decimal strings.
    OdomSelect { ids: Vec<String> },

    /// Interaction with the 3D handle.
    Feedback(HandleFeedback),

    /// Reload pose log and scans from the configured folder.
    Reload,
}

/// Entries of the handle's context menu.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuEntry {
    /// "SelectMode > Ref_Laser"
    RefLaser,
    /// "SelectMode > Target_Laser"
    TargetLaser,
    /// Write every scan, placed by its stored pose, to one PCD file.
    GenerateMap { path: PathBuf },
}

/// Feedback from the 3D handle.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HandleFeedback {
    pub marker_name: String,
    #[serde(default)]
    pub control_name: String,
    pub kind: FeedbackKind,
    /// Point under the cursor, when the viewer reports one.
    #[serde(default)]
    pub mouse_point: Option<[f32; 3]>,
}

/// What happened to the handle.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedbackKind {
    ButtonClick,
    MenuSelect { entry_id: u32 },
    PoseUpdate { pose: HandlePose },
    MouseDown,
    MouseUp,
}

impl FeedbackKind {
    pub fn label(&self) -> &'static str {
        match self {
            FeedbackKind::ButtonClick => "button click",
            FeedbackKind::MenuSelect { .. } => "menu select",
            FeedbackKind::PoseUpdate { .. } => "pose changed",
            FeedbackKind::MouseDown => "mouse down",
            FeedbackKind::MouseUp => "mouse up",
        }
    }
}

/// 6-DoF handle pose as reported by the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct HandlePose {
    /// [x, y, z] in meters.
    pub position: [f32; 3],
    /// Rotation; normalized on conversion.
    pub orientation: Quaternion,
}

impl HandlePose {
    pub fn to_transform(&self) -> RigidTransform {
        let [x, y, z] = self.position;
        RigidTransform::new(self.orientation, Point3D::new(x, y, z))
    }

    pub fn from_transform(t: &RigidTransform) -> Self {
        Self {
            position: t.translation.to_array(),
            orientation: t.rotation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_odom_select_parsing() {
        let json = r#"{"event": "odom_select", "ids": ["3", "17"]}"#;
        let event: OperatorEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            event,
            OperatorEvent::OdomSelect {
                ids: vec!["3".to_string(), "17".to_string()]
            }
        );
    }

    #[test]
    fn test_mode_serde_names() {
        let m: SelectionMode = serde_json::from_str("\"ref\"").unwrap();
        assert_eq!(m, SelectionMode::Reference);
        let m: SelectionMode = serde_json::from_str("\"target\"").unwrap();
        assert_eq!(m, SelectionMode::Target);
        assert_eq!(serde_json::to_string(&SelectionMode::Reference).unwrap(), "\"reference\"");
    }

    #[test]
    fn test_set_mode_parsing() {
        let json = r#"{"event": "set_mode", "mode": "reference"}"#;
        let event: OperatorEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            event,
            OperatorEvent::SetMode {
                mode: SelectionMode::Reference
            }
        );
    }

    #[test]
    fn test_menu_parsing() {
        let json = r#"{"event": "menu", "entry": "target_laser"}"#;
        let event: OperatorEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            event,
            OperatorEvent::Menu {
                entry: MenuEntry::TargetLaser
            }
        );

        let json = r#"{"event": "menu", "entry": {"generate_map": {"path": "/tmp/map.pcd"}}}"#;
        let event: OperatorEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            event,
            OperatorEvent::Menu {
                entry: MenuEntry::GenerateMap {
                    path: PathBuf::from("/tmp/map.pcd")
                }
            }
        );
    }

    #[test]
    fn test_pose_update_parsing() {
        let json = r#"{
            "event": "feedback",
            "marker_name": "se2_controller",
            "control_name": "move_x",
            "kind": {
                "type": "pose_update",
                "pose": {
                    "position": [1.0, 2.0, 0.0],
                    "orientation": {"w": 1.0, "x": 0.0, "y": 0.0, "z": 0.0}
                }
            }
        }"#;
        let event: OperatorEvent = serde_json::from_str(json).unwrap();
        let OperatorEvent::Feedback(feedback) = event else {
            panic!("Expected Feedback event");
        };
        assert_eq!(feedback.marker_name, "se2_controller");
        assert!(feedback.mouse_point.is_none());
        let FeedbackKind::PoseUpdate { pose } = feedback.kind else {
            panic!("Expected PoseUpdate");
        };
        let t = pose.to_transform();
        assert_relative_eq!(t.translation.x, 1.0);
        assert_relative_eq!(t.translation.y, 2.0);
    }

    #[test]
    fn test_reload_parsing() {
        let event: OperatorEvent = serde_json::from_str(r#"{"event": "reload"}"#).unwrap();
        assert_eq!(event, OperatorEvent::Reload);
    }

    #[test]
    fn test_scan_message_serialization() {
        let cloud = PointCloud3D::from_points(vec![Point3D::new(1.0, 3.0, 0.0)]);
        let msg = ScanCloudMessage::from_cloud(MessageHeader::new("map", 42), &cloud);
        let json = serde_json::to_string(&msg).unwrap();

        assert!(json.contains("\"frame_id\":\"map\""));
        assert!(json.contains("\"stamp_us\":42"));
        assert!(json.contains("\"points\":[[1.0,3.0,0.0]]"));
    }
}
