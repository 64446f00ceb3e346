//! Operator session: the store, the selection state and the viewer.
//!
//! A [`Session`] owns everything and handles one [`OperatorEvent`] at a time
//! on the caller's thread:
//!
//! ```text
//!   OperatorEvent ──▶ Session::dispatch ──┬─▶ SelectionState (mode, target)
//!                                         ├─▶ TrajectoryStore queries
//!                                         └─▶ Publisher / HandleServer
//! ```

pub mod mode;

pub use crate::io::messages::SelectionMode;
pub use mode::SelectionState;

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::Config;
use crate::core::types::{PointCloud3D, RigidTransform};
use crate::io::messages::{
    FeedbackKind, HandleFeedback, MenuEntry, MessageHeader, OperatorEvent, ScanCloudMessage,
};
use crate::io::pcd::{PcdEncoding, write_pcd};
use crate::io::publisher::{HandleServer, Publisher};
use crate::store::{LoadError, LoadOutcome, TrajectoryStore};

/// Event-driven session over one trajectory store.
pub struct Session<V: Publisher + HandleServer> {
    config: Config,
    store: TrajectoryStore,
    state: SelectionState,
    viewer: V,
}

impl<V: Publisher + HandleServer> Session<V> {
    /// Create a session with an empty store. Call [`Session::start`] to load.
    pub fn new(config: Config, viewer: V) -> Self {
        let state = SelectionState::new(config.selection.initial_mode);
        Self {
            config,
            store: TrajectoryStore::new(),
            state,
            viewer,
        }
    }

    /// Load the configured data, then publish the trajectory, create the
    /// handle at the origin and sync the menu check marks.
    ///
    /// The viewer is initialised even when the load fails; the store is
    /// empty in that case.
    pub fn start(&mut self) -> Result<LoadOutcome, LoadError> {
        let outcome = self.store.load(&self.config.data);

        self.publish_trajectory();
        let handle = &self.config.handle;
        self.viewer
            .create_handle(&handle.name, &handle.description, handle.scale);
        self.viewer
            .set_handle_pose(&handle.name, &RigidTransform::identity());
        self.viewer.set_mode_checked(self.state.mode());
        log::info!("Session started in {} mode", self.state.mode());

        outcome
    }

    /// Handle one operator event.
    pub fn dispatch(&mut self, event: OperatorEvent) {
        match event {
            OperatorEvent::SetMode { mode } => self.set_mode(mode),
            OperatorEvent::Menu { entry } => match entry {
                MenuEntry::RefLaser => self.set_mode(SelectionMode::Reference),
                MenuEntry::TargetLaser => self.set_mode(SelectionMode::Target),
                MenuEntry::GenerateMap { path } => self.generate_map(&path),
            },
            OperatorEvent::OdomSelect { ids } => self.handle_selection(&ids),
            OperatorEvent::Feedback(feedback) => self.handle_feedback(&feedback),
            OperatorEvent::Reload => {
                if let Err(e) = self.reload() {
                    log::error!("Reload failed: {}", e);
                }
            }
        }
    }

    /// Switch selection mode and update the menu check marks.
    pub fn set_mode(&mut self, mode: SelectionMode) {
        if self.state.set_mode(mode) {
            log::info!("Selection mode: {}", mode);
        }
        self.viewer.set_mode_checked(mode);
    }

    /// An id selection from the viewer, interpreted by the current mode.
    pub fn handle_selection(&mut self, ids: &[String]) {
        let parsed = parse_ids(ids);

        match self.state.mode() {
            SelectionMode::Reference => {
                let cloud = self.store.transformed_scans(&parsed);
                log::info!(
                    "Reference selection: {} ids, {} points",
                    parsed.len(),
                    cloud.len()
                );
                let msg = ScanCloudMessage::from_cloud(self.header(), &cloud);
                self.viewer.publish_reference_scans(&msg);
            }
            SelectionMode::Target => {
                let Some(&id) = parsed.first() else {
                    log::debug!("Empty target selection");
                    return;
                };
                self.select_target(id);
            }
        }
    }

    fn select_target(&mut self, id: i64) {
        self.preview_target(id);

        let Some(node) = self.store.pose(id) else {
            log::warn!("Target id {} has no pose, keeping previous target", id);
            return;
        };

        let transform = RigidTransform::from_pose2d(&node.pose);
        self.viewer
            .set_handle_pose(&self.config.handle.name, &transform);
        self.state.select_target(id);
        log::info!("Target scan: {}", id);
    }

    /// Publish the scan of `id` placed by its stored pose.
    fn preview_target(&mut self, id: i64) {
        let cloud = self.store.transformed_scans(&[id]);
        let msg = ScanCloudMessage::from_cloud(self.header(), &cloud);
        self.viewer.publish_target_scan(&msg);
    }

    /// Feedback from the interactive handle.
    pub fn handle_feedback(&mut self, feedback: &HandleFeedback) {
        if feedback.marker_name != self.config.handle.name {
            log::debug!("Feedback for unknown marker '{}'", feedback.marker_name);
            return;
        }

        match &feedback.kind {
            FeedbackKind::PoseUpdate { pose } => {
                let Some(id) = self.state.active_target() else {
                    log::warn!("Handle moved with no active target");
                    return;
                };
                let transform = pose.to_transform();
                let cloud = self.store.reproject_scan(&transform, id);
                log::debug!(
                    "Preview of {} at ({:.3}, {:.3}, {:.3} rad): {} points",
                    id,
                    transform.translation.x,
                    transform.translation.y,
                    transform.rotation.yaw(),
                    cloud.len()
                );
                let msg = ScanCloudMessage::from_cloud(self.header(), &cloud);
                self.viewer.publish_target_scan(&msg);
            }
            FeedbackKind::MenuSelect { entry_id } => {
                log::debug!(
                    "{}: {} {} (entry {})",
                    feedback.marker_name,
                    feedback.control_name,
                    feedback.kind.label(),
                    entry_id
                );
            }
            other => match feedback.mouse_point {
                Some([x, y, z]) => log::debug!(
                    "{}: {} {} at ({:.3}, {:.3}, {:.3})",
                    feedback.marker_name,
                    feedback.control_name,
                    other.label(),
                    x,
                    y,
                    z
                ),
                None => log::debug!(
                    "{}: {} {}",
                    feedback.marker_name,
                    feedback.control_name,
                    other.label()
                ),
            },
        }
    }

    /// Write every scan, placed by its stored pose, to an ASCII PCD file.
    pub fn generate_map(&self, path: &Path) {
        let cloud: PointCloud3D = self.store.merged_cloud();
        match write_pcd(path, &cloud, PcdEncoding::Ascii) {
            Ok(()) => log::info!("Map written to {} ({} points)", path.display(), cloud.len()),
            Err(e) => log::error!("Failed to write map {}: {}", path.display(), e),
        }
    }

    /// Re-run the load and republish the trajectory.
    pub fn reload(&mut self) -> Result<LoadOutcome, LoadError> {
        let outcome = self.store.load(&self.config.data);
        if let Some(id) = self.state.active_target()
            && self.store.pose(id).is_none()
        {
            log::info!("Active target {} no longer loaded", id);
            self.state.clear_target();
        }
        self.publish_trajectory();
        outcome
    }

    fn publish_trajectory(&mut self) {
        let markers = self
            .store
            .trajectory_markers(&self.config.markers, self.header());
        self.viewer.publish_trajectory(&markers);
    }

    fn header(&self) -> MessageHeader {
        MessageHeader::new(self.config.frame.base_frame.clone(), now_us())
    }

    pub fn store(&self) -> &TrajectoryStore {
        &self.store
    }

    pub fn mode(&self) -> SelectionMode {
        self.state.mode()
    }

    pub fn active_target(&self) -> Option<i64> {
        self.state.active_target()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn viewer(&self) -> &V {
        &self.viewer
    }

    pub fn viewer_mut(&mut self) -> &mut V {
        &mut self.viewer
    }

    /// Consume the session, returning the viewer.
    pub fn into_viewer(self) -> V {
        self.viewer
    }
}

/// Parse decimal id strings, skipping anything unparseable.
fn parse_ids(ids: &[String]) -> Vec<i64> {
    ids.iter()
        .filter_map(|s| match s.trim().parse::<i64>() {
            Ok(id) => Some(id),
            Err(_) => {
                log::warn!("Ignoring unparseable id '{}'", s);
                None
            }
        })
        .collect()
}

fn now_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Point3D, Pose2D, Quaternion};
    use crate::io::messages::HandlePose;
    use crate::io::publisher::RecordingPublisher;
    use crate::io::pose_log::PoseRecord;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    fn record(id: i64, x: f32, y: f32, theta: f32) -> PoseRecord {
        PoseRecord {
            id,
            timestamp: 0.0,
            weight: 1.0,
            gweight: 1.0,
            pose: Pose2D::new(x, y, theta),
        }
    }

    fn session(mode: SelectionMode) -> Session<RecordingPublisher> {
        let mut config = Config::default();
        config.selection.initial_mode = mode;
        let mut session = Session::new(config, RecordingPublisher::new());
        let scan = PointCloud3D::from_points(vec![Point3D::planar(1.0, 0.0)]);
        session.store = TrajectoryStore::from_parts(
            &[record(1, 0.0, 0.0, 0.0), record(5, 1.0, 2.0, FRAC_PI_2)],
            [(1, scan.clone()), (5, scan)],
        );
        session
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn drag_to(x: f32, y: f32) -> HandleFeedback {
        HandleFeedback {
            marker_name: "se2_controller".to_string(),
            control_name: "move_xy".to_string(),
            kind: FeedbackKind::PoseUpdate {
                pose: HandlePose {
                    position: [x, y, 0.0],
                    orientation: Quaternion::identity(),
                },
            },
            mouse_point: None,
        }
    }

    #[test]
    fn test_start_without_folder_initialises_viewer() {
        let mut session = Session::new(Config::default(), RecordingPublisher::new());
        let outcome = session.start().unwrap();

        assert_eq!(outcome, LoadOutcome::Skipped);
        let viewer = session.viewer();
        assert_eq!(viewer.trajectories.len(), 1);
        assert!(viewer.trajectories[0].is_empty());
        let handle = &session.config().handle;
        assert_eq!(
            viewer.handles,
            vec![(handle.name.clone(), handle.description.clone(), handle.scale)]
        );
        assert_eq!(viewer.handle_poses.len(), 1);
        assert_eq!(viewer.handle_poses[0].1, RigidTransform::identity());
        assert_eq!(viewer.menu_states, vec![SelectionMode::Target]);
    }

    #[test]
    fn test_reference_selection_publishes_assembly() {
        let mut session = session(SelectionMode::Reference);
        session.handle_selection(&ids(&["5", "1", "x", "99"]));

        let viewer = session.viewer();
        assert_eq!(viewer.reference_scans.len(), 1);
        let points = &viewer.reference_scans[0].points;
        assert_eq!(points.len(), 2);
        assert_relative_eq!(points[0][0], 1.0, epsilon = 1e-6);
        assert_relative_eq!(points[0][1], 3.0, epsilon = 1e-6);
        assert_eq!(viewer.reference_scans[0].header.frame_id, "map");
        assert!(viewer.target_scans.is_empty());
        assert_eq!(session.active_target(), None);
    }

    #[test]
    fn test_target_selection_moves_handle() {
        let mut session = session(SelectionMode::Target);
        session.handle_selection(&ids(&["5", "1"]));

        assert_eq!(session.active_target(), Some(5));
        let viewer = session.viewer();
        assert_eq!(viewer.target_scans.len(), 1);
        assert_eq!(viewer.target_scans[0].len(), 1);
        let (name, pose) = &viewer.handle_poses[0];
        assert_eq!(name, "se2_controller");
        assert_relative_eq!(pose.translation.x, 1.0);
        assert_relative_eq!(pose.translation.y, 2.0);
        assert_relative_eq!(pose.rotation.yaw(), FRAC_PI_2, epsilon = 1e-6);
    }

    #[test]
    fn test_unknown_target_keeps_previous() {
        let mut session = session(SelectionMode::Target);
        session.handle_selection(&ids(&["1"]));
        session.viewer_mut().clear();

        session.handle_selection(&ids(&["42"]));

        assert_eq!(session.active_target(), Some(1));
        let viewer = session.viewer();
        assert_eq!(viewer.target_scans.len(), 1);
        assert!(viewer.target_scans[0].is_empty());
        assert!(viewer.handle_poses.is_empty());
    }

    #[test]
    fn test_empty_target_selection_is_ignored() {
        let mut session = session(SelectionMode::Target);
        session.handle_selection(&[]);
        session.handle_selection(&ids(&["nope"]));
        assert!(session.viewer().target_scans.is_empty());
        assert_eq!(session.active_target(), None);
    }

    #[test]
    fn test_drag_reprojects_without_touching_store() {
        let mut session = session(SelectionMode::Target);
        session.handle_selection(&ids(&["5"]));
        session.viewer_mut().clear();

        session.handle_feedback(&drag_to(10.0, 0.0));

        let viewer = session.viewer();
        assert_eq!(viewer.target_scans.len(), 1);
        assert_eq!(viewer.target_scans[0].points, vec![[11.0, 0.0, 0.0]]);
        assert_relative_eq!(session.store().pose(5).unwrap().pose.x, 1.0);
    }

    #[test]
    fn test_drag_without_target_publishes_nothing() {
        let mut session = session(SelectionMode::Target);
        session.handle_feedback(&drag_to(1.0, 1.0));
        assert!(session.viewer().target_scans.is_empty());
    }

    #[test]
    fn test_feedback_for_other_marker_ignored() {
        let mut session = session(SelectionMode::Target);
        session.handle_selection(&ids(&["5"]));
        session.viewer_mut().clear();

        let mut feedback = drag_to(1.0, 1.0);
        feedback.marker_name = "something_else".to_string();
        session.handle_feedback(&feedback);
        assert!(session.viewer().target_scans.is_empty());
    }

    #[test]
    fn test_menu_entries_switch_mode_and_check_marks() {
        let mut session = session(SelectionMode::Target);
        session.dispatch(OperatorEvent::Menu {
            entry: MenuEntry::RefLaser,
        });
        assert_eq!(session.mode(), SelectionMode::Reference);

        session.dispatch(OperatorEvent::SetMode {
            mode: SelectionMode::Target,
        });
        assert_eq!(session.mode(), SelectionMode::Target);
        assert_eq!(
            session.viewer().menu_states,
            vec![SelectionMode::Reference, SelectionMode::Target]
        );
    }

    #[test]
    fn test_generate_map_writes_pcd() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("map.pcd");
        let session = session(SelectionMode::Target);

        session.generate_map(&path);

        let cloud = crate::io::pcd::read_pcd(&path).unwrap();
        assert_eq!(cloud.len(), 2);
    }

    #[test]
    fn test_generate_map_bad_path_does_not_panic() {
        let session = session(SelectionMode::Target);
        session.generate_map(Path::new("/nonexistent/dir/map.pcd"));
    }

    #[test]
    fn test_parse_ids_trims_and_skips() {
        assert_eq!(parse_ids(&ids(&[" 3", "-2", "abc", "", "7 "])), vec![3, -2, 7]);
    }
}
