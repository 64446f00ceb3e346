//! Bulk load of the pose log and per-pose scans.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use super::node::PoseNode;
use super::trajectory::TrajectoryStore;
use crate::io::pcd::read_pcd;
use crate::io::pose_log::{PoseLogError, read_pose_log};

/// Where map data lives on disk.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Map data folder. Empty means "nothing to load".
    pub folder: PathBuf,
    /// Pose log file name inside `folder`.
    pub pose_file: String,
    /// Scan files are `<id>.<scan_extension>` inside `folder`.
    pub scan_extension: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            folder: PathBuf::new(),
            pose_file: "pose.csv".to_string(),
            scan_extension: "pcd".to_string(),
        }
    }
}

impl LoaderConfig {
    pub fn with_folder(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
            ..Default::default()
        }
    }

    pub fn pose_path(&self) -> PathBuf {
        self.folder.join(&self.pose_file)
    }

    pub fn scan_path(&self, id: i64) -> PathBuf {
        self.folder.join(format!("{}.{}", id, self.scan_extension))
    }
}

/// A load pass that could not complete. The store is left empty.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    PoseLog(#[from] PoseLogError),
}

/// Counts from a completed load pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoadSummary {
    /// Lines parsed from the pose log.
    pub poses: usize,
    /// Scans read successfully.
    pub scans_loaded: usize,
    /// Ids whose scan file was missing or unreadable, in file order.
    pub missing_scans: Vec<i64>,
    /// Ids that appeared more than once in the pose log.
    pub duplicate_ids: Vec<i64>,
}

/// Result of a load request that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// No data folder configured; the store was not touched.
    Skipped,
    Loaded(LoadSummary),
}

impl TrajectoryStore {
    /// Replace the store contents from `config.folder`.
    ///
    /// A missing or malformed pose log fails the whole pass and empties the
    /// store. A missing or unreadable scan only leaves that id without a
    /// cloud.
    pub fn load(&mut self, config: &LoaderConfig) -> Result<LoadOutcome, LoadError> {
        if config.folder.as_os_str().is_empty() {
            log::info!("Empty map data folder, nothing to load");
            return Ok(LoadOutcome::Skipped);
        }

        let pose_path = config.pose_path();
        log::info!("Loading map data: {}", pose_path.display());

        let records = match read_pose_log(&pose_path) {
            Ok(records) => records,
            Err(e) => {
                log::error!("Failed to load pose file: {}", e);
                self.clear();
                return Err(e.into());
            }
        };

        let mut nodes = Vec::with_capacity(records.len());
        let mut index = HashMap::with_capacity(records.len());
        let mut clouds = HashMap::with_capacity(records.len());
        let mut summary = LoadSummary::default();

        for record in &records {
            let parent = nodes.len().checked_sub(1);
            nodes.push(PoseNode::from_record(record, parent));
            if index.insert(record.id, nodes.len() - 1).is_some() {
                log::warn!("Duplicate pose id {} in pose log, newest entry wins", record.id);
                summary.duplicate_ids.push(record.id);
            }

            let scan = load_scan(&config.scan_path(record.id));
            if scan.is_some() {
                summary.scans_loaded += 1;
            } else {
                summary.missing_scans.push(record.id);
            }
            clouds.insert(record.id, scan);
        }
        summary.poses = nodes.len();

        self.replace(nodes, index, clouds);

        log::info!(
            "Loaded {} poses ({} scans, {} missing)",
            summary.poses,
            summary.scans_loaded,
            summary.missing_scans.len()
        );
        Ok(LoadOutcome::Loaded(summary))
    }
}

fn load_scan(path: &Path) -> Option<crate::core::types::PointCloud3D> {
    match read_pcd(path) {
        Ok(cloud) => {
            log::debug!("Loaded scan {} ({} points)", path.display(), cloud.len());
            Some(cloud)
        }
        Err(e) => {
            log::error!("Failed to load laser scan file {}: {}", path.display(), e);
            None
        }
    }
}
