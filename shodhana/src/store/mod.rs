//! Trajectory and scan store.
//!
//! Holds one [`PoseNode`] per line of the pose log and one scan per pose id,
//! and answers the assembly queries the viewer needs:
//!
//! - [`TrajectoryStore::transformed_scans`]: selected scans placed by their stored poses
//! - [`TrajectoryStore::reproject_scan`]: one scan placed by an arbitrary transform
//! - [`TrajectoryStore::trajectory_markers`]: one arrow per pose, newest first
//!
//! Nodes live in a single `Vec` in load order. Each node's `parent` is the
//! index of the node loaded before it, so walking parents from the most
//! recent node visits the trajectory in reverse file order.

mod loader;
mod markers;
mod node;
mod trajectory;

pub use loader::{LoadError, LoadOutcome, LoadSummary, LoaderConfig};
pub use markers::MarkerStyle;
pub use node::{ChainIter, PoseNode};
pub use trajectory::TrajectoryStore;
