//! Depth preprocessing: filtering, pyramids and dense map operations.
//!
//! Contents:
//! - [`bilateral`]: edge-preserving depth smoothing
//! - [`pyramid`]: frame/prediction pyramids, back-projection, normals and
//!   the resampling helpers used to maintain them

pub mod bilateral;
pub mod pyramid;

pub use bilateral::{BilateralConfig, BilateralFilter};
pub use pyramid::{FramePreprocessor, FramePyramid, PredictionPyramid, PreprocessorConfig};
