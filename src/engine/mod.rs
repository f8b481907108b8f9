//! Tracker assembly: the layer that owns state across frames.
//!
//! Contents:
//! - [`tracker`]: the public frame-to-model tracker and its lifecycle
//! - [`integration`]: gated fusion, window shifts and prediction refresh
//! - [`workspace`]: preallocated per-frame pyramid buffers
//!
//! Lower layers compute; this layer sequences them and carries pose
//! history, volumes and buffers from one frame to the next.

pub mod integration;
pub mod tracker;
pub mod workspace;

pub use integration::{IntegrationConfig, IntegrationController, IntegrationOutcome};
pub use tracker::{GhanaTracker, PoseStrategy, TrackerConfig, TrackerState};
pub use workspace::TrackerWorkspace;
