//! Sensor data ingestion and per-frame preparation.
//!
//! Contents:
//! - [`frame`]: raw depth/color frame containers and float working formats
//! - [`preprocessing`]: bilateral filtering, measurement pyramids, normals
//! - [`odometry`]: the visual-odometer seam and its conversion adapter
//!
//! This layer turns device data into the dense maps the algorithms layer
//! aligns; it knows nothing about volumes or pose history.

pub mod frame;
pub mod odometry;
pub mod preprocessing;

pub use frame::{ColorFrame, DepthFrame, DepthMeters, GrayFrame};
pub use odometry::{VisualOdometer, VoAdapter};
pub use preprocessing::{FramePreprocessor, FramePyramid, PredictionPyramid};
