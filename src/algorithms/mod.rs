//! Pose estimation algorithms.
//!
//! Contents:
//! - [`icp`]: dense projective point-to-plane alignment over pyramids
//! - [`arbitration`]: per-frame selection between alignment and odometry
//!
//! Everything here is stateless between frames: estimators read maps and
//! poses and return values, while the engine layer owns the history.

pub mod arbitration;
pub mod icp;

pub use arbitration::{ArbitratorConfig, PoseArbitrator, PoseSource};
pub use icp::{IcpConfig, IcpEstimate, IcpEstimator};
