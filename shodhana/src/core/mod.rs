//! Core foundation layer.
//!
//! Bottom of the stack with no internal dependencies.
//!
//! # Contents
//!
//! - [`types`]: Points, clouds, planar poses and rigid transforms
//! - [`math`]: Angle helpers

pub mod math;
pub mod types;
