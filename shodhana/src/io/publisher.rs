//! Outgoing side of the viewer connection.
//!
//! [`Publisher`] carries trajectory and scan messages, [`HandleServer`]
//! drives the interactive handle and its menu. [`JsonLinesPublisher`] writes
//! both as one JSON object per line; [`RecordingPublisher`] keeps them in
//! memory.

use std::io::Write;

use serde::Serialize;

use super::messages::{HandlePose, MarkerArray, ScanCloudMessage, SelectionMode};
use crate::core::types::RigidTransform;

/// Sink for trajectory and scan messages.
pub trait Publisher {
    /// Full trajectory marker array (latched: the last one wins).
    fn publish_trajectory(&mut self, markers: &MarkerArray);

    /// Reference scans assembled from a selection.
    fn publish_reference_scans(&mut self, msg: &ScanCloudMessage);

    /// Target scan preview.
    fn publish_target_scan(&mut self, msg: &ScanCloudMessage);
}

/// The interactive 3D handle and its context menu.
pub trait HandleServer {
    /// Register a handle with its hover text and display scale.
    fn create_handle(&mut self, name: &str, description: &str, scale: f32);

    /// Move the named handle without emitting feedback.
    fn set_handle_pose(&mut self, name: &str, pose: &RigidTransform);

    /// Check the menu entry of `mode` and uncheck the other one.
    fn set_mode_checked(&mut self, mode: SelectionMode);
}

#[derive(Serialize)]
#[serde(tag = "topic", rename_all = "snake_case")]
enum Outgoing<'a> {
    Trajectory(&'a MarkerArray),
    SelectScans(&'a ScanCloudMessage),
    TargetScans(&'a ScanCloudMessage),
    CreateHandle {
        name: &'a str,
        description: &'a str,
        scale: f32,
    },
    HandlePose { name: &'a str, pose: HandlePose },
    MenuState { checked: SelectionMode },
}

/// Writes every message as a single line of JSON.
///
/// Write failures are logged and dropped; a broken viewer connection never
/// stops the session.
pub struct JsonLinesPublisher<W: Write> {
    writer: W,
    messages_written: u64,
}

impl<W: Write> JsonLinesPublisher<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            messages_written: 0,
        }
    }

    pub fn messages_written(&self) -> u64 {
        self.messages_written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn send(&mut self, msg: &Outgoing<'_>) {
        let result = serde_json::to_writer(&mut self.writer, msg)
            .map_err(std::io::Error::from)
            .and_then(|_| self.writer.write_all(b"\n"))
            .and_then(|_| self.writer.flush());

        match result {
            Ok(()) => self.messages_written += 1,
            Err(e) => log::error!("Failed to write message: {}", e),
        }
    }
}

impl<W: Write> Publisher for JsonLinesPublisher<W> {
    fn publish_trajectory(&mut self, markers: &MarkerArray) {
        self.send(&Outgoing::Trajectory(markers));
    }

    fn publish_reference_scans(&mut self, msg: &ScanCloudMessage) {
        self.send(&Outgoing::SelectScans(msg));
    }

    fn publish_target_scan(&mut self, msg: &ScanCloudMessage) {
        self.send(&Outgoing::TargetScans(msg));
    }
}

impl<W: Write> HandleServer for JsonLinesPublisher<W> {
    fn create_handle(&mut self, name: &str, description: &str, scale: f32) {
        self.send(&Outgoing::CreateHandle {
            name,
            description,
            scale,
        });
    }

    fn set_handle_pose(&mut self, name: &str, pose: &RigidTransform) {
        self.send(&Outgoing::HandlePose {
            name,
            pose: HandlePose::from_transform(pose),
        });
    }

    fn set_mode_checked(&mut self, mode: SelectionMode) {
        self.send(&Outgoing::MenuState { checked: mode });
    }
}

/// Keeps every message in memory, in publish order.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    pub trajectories: Vec<MarkerArray>,
    pub reference_scans: Vec<ScanCloudMessage>,
    pub target_scans: Vec<ScanCloudMessage>,
    /// (name, description, scale) per created handle.
    pub handles: Vec<(String, String, f32)>,
    pub handle_poses: Vec<(String, RigidTransform)>,
    pub menu_states: Vec<SelectionMode>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything recorded so far.
    pub fn clear(&mut self) {
        self.trajectories.clear();
        self.reference_scans.clear();
        self.target_scans.clear();
        self.handles.clear();
        self.handle_poses.clear();
        self.menu_states.clear();
    }
}

impl Publisher for RecordingPublisher {
    fn publish_trajectory(&mut self, markers: &MarkerArray) {
        self.trajectories.push(markers.clone());
    }

    fn publish_reference_scans(&mut self, msg: &ScanCloudMessage) {
        self.reference_scans.push(msg.clone());
    }

    fn publish_target_scan(&mut self, msg: &ScanCloudMessage) {
        self.target_scans.push(msg.clone());
    }
}

impl HandleServer for RecordingPublisher {
    fn create_handle(&mut self, name: &str, description: &str, scale: f32) {
        self.handles
            .push((name.to_string(), description.to_string(), scale));
    }

    fn set_handle_pose(&mut self, name: &str, pose: &RigidTransform) {
        self.handle_poses.push((name.to_string(), *pose));
    }

    fn set_mode_checked(&mut self, mode: SelectionMode) {
        self.menu_states.push(mode);
    }
}
