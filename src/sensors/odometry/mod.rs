//! Visual-odometry front end used by the hybrid tracking strategy.
//!
//! Contents:
//! - [`VisualOdometer`]: the trait an external intensity-plus-depth
//!   odometry estimator implements
//! - [`adapter`]: frame conversion and estimate screening between the
//!   tracker and an odometer
//!
//! The tracker feeds the odometer every frame in lockstep, even on frames
//! where its estimate ends up unused, so the odometer's own history never
//! skips a beat.

pub mod adapter;

use crate::core::pose::{Pose, PoseDelta};
use crate::sensors::frame::{DepthMeters, GrayFrame};

pub use adapter::VoAdapter;

/// An external odometry estimator fed with luminance and metric depth.
pub trait VisualOdometer {
    /// Processes one frame pair. Called once per tracked frame.
    fn track(&mut self, gray: &GrayFrame, depth: &DepthMeters);

    /// Absolute pose of the most recently processed frame.
    fn pose(&self) -> Pose;

    /// Incremental motion between the two most recent frames.
    fn delta(&self) -> PoseDelta;
}
