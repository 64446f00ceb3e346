//! I/O and infrastructure layer.
//!
//! # Contents
//!
//! - [`pose_log`]: `pose.csv` reader
//! - [`pcd`]: PCD point cloud reader/writer
//! - [`messages`]: Outgoing viewer messages and incoming operator events
//! - [`publisher`]: Viewer sinks (JSON lines, in-memory)

pub mod messages;
pub mod pcd;
pub mod pose_log;
pub mod publisher;

pub use messages::{
    FeedbackKind, HandleFeedback, HandlePose, MarkerArray, MenuEntry, MessageHeader,
    OperatorEvent, ScanCloudMessage, SelectionMode, TrajectoryMarker,
};
pub use pcd::{PcdEncoding, PcdError, read_pcd, write_pcd};
pub use pose_log::{PoseLogError, PoseRecord, read_pose_log};
pub use publisher::{HandleServer, JsonLinesPublisher, Publisher, RecordingPublisher};
