//! Store contents and assembly queries.

use std::collections::HashMap;

use super::node::{ChainIter, PoseNode};
use crate::core::types::{PointCloud3D, RigidTransform};
use crate::io::pose_log::PoseRecord;

/// Poses and scans of one recorded trajectory.
///
/// Owns all nodes; callers only get shared references or freshly built
/// clouds back.
#[derive(Debug, Default)]
pub struct TrajectoryStore {
    /// All nodes in load order.
    nodes: Vec<PoseNode>,
    /// Pose id -> index into `nodes`.
    index: HashMap<i64, usize>,
    /// Pose id -> scan; `None` when the scan failed to load.
    clouds: HashMap<i64, Option<PointCloud3D>>,
}

impl TrajectoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from parsed records and scans, as a load pass would.
    ///
    /// Records without a matching scan get an absent cloud.
    pub fn from_parts(
        records: &[PoseRecord],
        scans: impl IntoIterator<Item = (i64, PointCloud3D)>,
    ) -> Self {
        let mut scans: HashMap<i64, PointCloud3D> = scans.into_iter().collect();
        let mut nodes = Vec::with_capacity(records.len());
        let mut index = HashMap::with_capacity(records.len());
        let mut clouds = HashMap::with_capacity(records.len());

        for record in records {
            let parent = nodes.len().checked_sub(1);
            nodes.push(PoseNode::from_record(record, parent));
            index.insert(record.id, nodes.len() - 1);
            match scans.remove(&record.id) {
                Some(cloud) => {
                    clouds.insert(record.id, Some(cloud));
                }
                None => {
                    clouds.entry(record.id).or_insert(None);
                }
            }
        }

        Self {
            nodes,
            index,
            clouds,
        }
    }

    pub(super) fn replace(
        &mut self,
        nodes: Vec<PoseNode>,
        index: HashMap<i64, usize>,
        clouds: HashMap<i64, Option<PointCloud3D>>,
    ) {
        self.nodes = nodes;
        self.index = index;
        self.clouds = clouds;
    }

    /// Drop all nodes and scans.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.index.clear();
        self.clouds.clear();
    }

    /// Number of poses loaded (one per parsed line).
    #[inline]
    pub fn count(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Head of the parent chain: the last line read.
    pub fn most_recent(&self) -> Option<&PoseNode> {
        self.nodes.last()
    }

    /// Nodes from the most recent back to the first loaded.
    pub fn chain(&self) -> ChainIter<'_> {
        ChainIter::new(&self.nodes, self.nodes.len().checked_sub(1))
    }

    /// Pose node for `id`.
    pub fn pose(&self, id: i64) -> Option<&PoseNode> {
        self.index.get(&id).map(|&i| &self.nodes[i])
    }

    /// Scan for `id`, if it loaded.
    pub fn cloud(&self, id: i64) -> Option<&PointCloud3D> {
        self.clouds.get(&id).and_then(Option::as_ref)
    }

    /// Scans of `ids`, each placed by its stored pose, flattened in
    /// per-id then per-point order.
    ///
    /// Ids without a pose are skipped; ids without a scan add no points.
    pub fn transformed_scans(&self, ids: &[i64]) -> PointCloud3D {
        let mut out = PointCloud3D::new();
        for &id in ids {
            let Some(node) = self.pose(id) else {
                log::debug!("No pose for id {}, skipping", id);
                continue;
            };
            let Some(cloud) = self.cloud(id) else {
                log::debug!("No scan for id {}", id);
                continue;
            };

            log::debug!("Scan {}: {} points", id, cloud.len());
            RigidTransform::from_pose2d(&node.pose).apply_into(cloud, &mut out);
        }
        log::debug!("Assembled {} points from {} ids", out.len(), ids.len());
        out
    }

    /// Scan of `id` placed by `transform`, ignoring the stored pose.
    ///
    /// Empty when `id` has no scan.
    pub fn reproject_scan(&self, transform: &RigidTransform, id: i64) -> PointCloud3D {
        match self.cloud(id) {
            Some(cloud) => transform.apply_cloud(cloud),
            None => PointCloud3D::new(),
        }
    }

    /// Every scan placed by its stored pose, walking the chain newest first.
    pub fn merged_cloud(&self) -> PointCloud3D {
        let mut out = PointCloud3D::new();
        for node in self.chain() {
            if let Some(cloud) = self.cloud(node.id) {
                RigidTransform::from_pose2d(&node.pose).apply_into(cloud, &mut out);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Point3D, Pose2D};
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    fn record(id: i64, x: f32, y: f32, theta: f32) -> PoseRecord {
        PoseRecord {
            id,
            timestamp: id as f64,
            weight: 1.0,
            gweight: 1.0,
            pose: Pose2D::new(x, y, theta),
        }
    }

    fn unit_scan() -> PointCloud3D {
        PointCloud3D::from_points(vec![Point3D::planar(1.0, 0.0)])
    }

    #[test]
    fn test_chain_is_reverse_load_order() {
        let records = [record(4, 0.0, 0.0, 0.0), record(9, 1.0, 0.0, 0.0), record(2, 2.0, 0.0, 0.0)];
        let store = TrajectoryStore::from_parts(&records, []);

        assert_eq!(store.count(), 3);
        assert_eq!(store.most_recent().unwrap().id, 2);
        let ids: Vec<i64> = store.chain().map(|n| n.id).collect();
        assert_eq!(ids, vec![2, 9, 4]);
    }

    #[test]
    fn test_empty_store_chain() {
        let store = TrajectoryStore::new();
        assert!(store.most_recent().is_none());
        assert_eq!(store.chain().count(), 0);
        assert!(store.transformed_scans(&[1, 2]).is_empty());
    }

    #[test]
    fn test_transformed_scan_uses_stored_pose() {
        let records = [record(5, 1.0, 2.0, FRAC_PI_2)];
        let store = TrajectoryStore::from_parts(&records, [(5, unit_scan())]);

        let cloud = store.transformed_scans(&[5]);
        assert_eq!(cloud.len(), 1);
        assert_relative_eq!(cloud.points[0].x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(cloud.points[0].y, 3.0, epsilon = 1e-6);
        assert_relative_eq!(cloud.points[0].z, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_non_contiguous_ids_all_contribute() {
        // Ids far from their position in the request must still resolve.
        let records = [record(100, 0.0, 0.0, 0.0), record(250, 10.0, 0.0, 0.0)];
        let store = TrajectoryStore::from_parts(&records, [(100, unit_scan()), (250, unit_scan())]);

        let cloud = store.transformed_scans(&[250, 100]);
        assert_eq!(cloud.len(), 2);
        assert_relative_eq!(cloud.points[0].x, 11.0);
        assert_relative_eq!(cloud.points[1].x, 1.0);
    }

    #[test]
    fn test_unknown_and_scanless_ids_are_omitted() {
        let records = [record(1, 0.0, 0.0, 0.0), record(2, 0.0, 0.0, 0.0)];
        let store = TrajectoryStore::from_parts(&records, [(1, unit_scan())]);

        assert!(store.cloud(2).is_none());
        let with_noise = store.transformed_scans(&[42, 1, 2, -7]);
        assert_eq!(with_noise, store.transformed_scans(&[1]));
    }

    #[test]
    fn test_reproject_ignores_stored_pose() {
        let records = [record(3, 50.0, 50.0, 1.0)];
        let store = TrajectoryStore::from_parts(&records, [(3, unit_scan())]);

        let t = RigidTransform::from_pose2d(&Pose2D::new(0.0, 1.0, 0.0));
        let cloud = store.reproject_scan(&t, 3);
        assert_eq!(cloud.points, vec![Point3D::planar(1.0, 1.0)]);

        assert!(store.reproject_scan(&t, 99).is_empty());
    }

    #[test]
    fn test_merged_cloud_walks_chain() {
        let records = [record(0, 0.0, 0.0, 0.0), record(1, 5.0, 0.0, 0.0)];
        let store = TrajectoryStore::from_parts(&records, [(0, unit_scan()), (1, unit_scan())]);

        let merged = store.merged_cloud();
        let xs: Vec<f32> = merged.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![6.0, 1.0]);
    }
}
