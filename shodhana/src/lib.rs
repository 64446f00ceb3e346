//! Shodhana - Pose-graph map data viewer backend
//!
//! Loads a recorded trajectory (a `pose.csv` log plus one PCD scan per pose)
//! and answers the queries an operator's viewer needs while correcting a map:
//! selected scans assembled by their stored poses, one scan re-projected by a
//! dragged handle, and the trajectory as a chain of arrows.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                      main                           │  ← Entry point
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                    session/                         │  ← Orchestration
//! │          (selection mode, event dispatch)           │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                     store/                          │  ← Trajectory store
//! │         (loader, assembly queries, markers)         │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                      io/                            │  ← Infrastructure
//! │        (pose log, PCD, messages, publisher)         │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                     core/                           │  ← Foundation
//! │                (types, math)                        │
//! └─────────────────────────────────────────────────────┘
//! ```

// ============================================================================
// Layer 1: Core foundation (no internal deps)
// ============================================================================
pub mod core;

// ============================================================================
// Layer 2: I/O infrastructure (depends on core)
// ============================================================================
pub mod io;

// ============================================================================
// Layer 3: Trajectory store (depends on core, io)
// ============================================================================
pub mod store;

// ============================================================================
// Layer 4: Session (depends on all layers)
// ============================================================================
pub mod config;
pub mod session;

// ============================================================================
// Convenience re-exports
// ============================================================================

pub use config::{Config, ConfigError};
pub use crate::core::math;
pub use crate::core::types::{Point3D, PointCloud3D, Pose2D, Quaternion, RigidTransform};
pub use io::{
    HandleServer, JsonLinesPublisher, OperatorEvent, PcdError, PoseLogError, Publisher,
    RecordingPublisher,
};
pub use session::{SelectionMode, SelectionState, Session};
pub use store::{LoadError, LoadOutcome, LoadSummary, LoaderConfig, MarkerStyle, TrajectoryStore};
