//! Core geometric primitives shared by every layer.
//!
//! Contents:
//! - [`pose`]: rigid camera poses, incremental motions and window
//!   re-expression
//! - [`math`]: small rotation helpers for the solvers
//! - [`types`]: camera intrinsics and NaN-coded dense point maps
//!
//! Nothing in this module allocates per frame or knows about volumes,
//! sensors or estimators.

pub mod math;
pub mod pose;
pub mod types;

pub use pose::{Pose, PoseDelta};
pub use types::{CameraIntrinsics, PointMap};
