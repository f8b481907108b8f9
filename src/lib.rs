//! GhanaSLAM - Dense depth tracking and fusion over a moving volumetric window
//!
//! Aligns every depth frame against a surface prediction raycast from a
//! truncated signed distance volume, fuses tracked frames back into it,
//! and slides the volume along with the camera, sweeping surface that
//! falls off the back edge into an unbounded world model.
//!
//! # Architecture
//!
//! The crate is organized into 6 logical layers:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                      io/                            │  ← Persistence
//! │                 (cloud export)                      │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                    engine/                          │  ← Orchestration
//! │          (tracker, integration, workspace)          │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                    volume/                          │  ← Fused model
//! │        (tsdf, color, cyclical, raycast, world)      │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                  algorithms/                        │  ← Pose estimation
//! │                (icp, arbitration)                   │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                   sensors/                          │  ← Frame processing
//! │         (frames, preprocessing, odometry)           │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                     core/                           │  ← Foundation
//! │                (pose, math, types)                  │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick start
//!
//! ```no_run
//! use ghana_slam::{DepthFrame, GhanaTracker, TrackerConfig};
//!
//! let mut tracker = GhanaTracker::new(TrackerConfig::default());
//!
//! let depth = DepthFrame::empty(480, 640);
//! if tracker.process_frame(&depth)? {
//!     let pose = tracker.last_camera_pose();
//!     println!("camera at {:?}", pose.translation);
//! }
//! # Ok::<(), ghana_slam::TrackerError>(())
//! ```
//!
//! Color-equipped setups pair each depth frame with a registered color
//! frame through [`GhanaTracker::process_frame_with_color`], which also
//! unlocks the hybrid pose strategy
//! ([`GhanaTracker::with_visual_odometry`]) and per-voxel color fusion
//! ([`TrackerConfig::color_max_weight`]).

// ============================================================================
// Layer 1: Core foundation (no internal deps)
// ============================================================================
pub mod core;

// ============================================================================
// Layer 2: Sensor frame processing (depends on core)
// ============================================================================
pub mod sensors;

// ============================================================================
// Layer 3: Pose estimation algorithms (depends on core, sensors)
// ============================================================================
pub mod algorithms;

// ============================================================================
// Layer 4: Volumetric model (depends on core, sensors)
// ============================================================================
pub mod volume;

// ============================================================================
// Layer 5: Tracking engine (depends on all layers below)
// ============================================================================
pub mod engine;

// ============================================================================
// Layer 6: Persistence (depends on volume)
// ============================================================================
pub mod io;

// Cross-cutting: errors and file configuration
pub mod config;
pub mod error;

// ============================================================================
// Convenience re-exports (flat namespace for common use)
// ============================================================================

// Core types. The `crate::` prefix keeps the module distinct from the
// `core` crate in the extern prelude.
pub use crate::core::math;
pub use crate::core::pose::{Pose, PoseDelta};
pub use crate::core::types::{CameraIntrinsics, PointMap};

// Sensors
pub use sensors::frame::{ColorFrame, DepthFrame, DepthMeters, GrayFrame};
pub use sensors::odometry::{VisualOdometer, VoAdapter};
pub use sensors::preprocessing::bilateral::{BilateralConfig, BilateralFilter};
pub use sensors::preprocessing::pyramid::{FramePreprocessor, PreprocessorConfig};
pub use sensors::preprocessing::{FramePyramid, PredictionPyramid};

// Algorithms
pub use algorithms::arbitration::{ArbitratorConfig, PoseArbitrator, PoseSource};
pub use algorithms::icp::{IcpConfig, IcpEstimate, IcpEstimator};

// Volume
pub use volume::color::ColorVolume;
pub use volume::cyclical::CyclicalBuffer;
pub use volume::raycast::Raycaster;
pub use volume::tsdf::{TsdfVolume, VolumeConfig};
pub use volume::world::{IntensityPoint, WorldModel};

// Engine
pub use engine::integration::{IntegrationConfig, IntegrationController, IntegrationOutcome};
pub use engine::tracker::{GhanaTracker, PoseStrategy, TrackerConfig, TrackerState};

// I/O, configuration, errors
pub use config::GhanaConfig;
pub use error::{Result, TrackerError};
pub use io::cloud::{write_world, WORLD_FILE_NAME};
