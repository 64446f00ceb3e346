//! Pose nodes and the parent chain.

use crate::core::types::Pose2D;
use crate::io::pose_log::PoseRecord;

/// One recorded robot pose.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseNode {
    /// Scan id from the pose log.
    pub id: i64,
    /// Recording time in seconds.
    pub timestamp: f64,
    /// Particle weight (carried through, unused).
    pub weight: f64,
    /// Accumulated trajectory weight (carried through, unused).
    pub gweight: f64,
    pub pose: Pose2D,
    /// Index of the previously loaded node, `None` for the first one.
    pub parent: Option<usize>,
}

impl PoseNode {
    pub fn from_record(record: &PoseRecord, parent: Option<usize>) -> Self {
        Self {
            id: record.id,
            timestamp: record.timestamp,
            weight: record.weight,
            gweight: record.gweight,
            pose: record.pose,
            parent,
        }
    }
}

/// Walks parent links from a starting node back to the root.
pub struct ChainIter<'a> {
    nodes: &'a [PoseNode],
    next: Option<usize>,
}

impl<'a> ChainIter<'a> {
    pub(super) fn new(nodes: &'a [PoseNode], start: Option<usize>) -> Self {
        Self { nodes, next: start }
    }
}

impl<'a> Iterator for ChainIter<'a> {
    type Item = &'a PoseNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.nodes.get(self.next?)?;
        self.next = node.parent;
        Some(node)
    }
}
