//! Preallocated per-frame working memory.
//!
//! Pyramid allocation is front-loaded so the per-frame path never touches
//! the allocator: the measurement pyramid is overwritten by each frame,
//! the prediction pyramid by each raycast.

use crate::sensors::preprocessing::pyramid::{FramePyramid, PredictionPyramid};

/// Reusable buffers owned by the tracker.
#[derive(Debug, Clone)]
pub struct TrackerWorkspace {
    /// Measurement pyramid of the frame being processed.
    pub current: FramePyramid,
    /// Model prediction the next frame aligns against, world frame.
    pub prediction: PredictionPyramid,
}

impl TrackerWorkspace {
    pub fn allocate(rows: usize, cols: usize, levels: usize) -> Self {
        Self {
            current: FramePyramid::allocate(rows, cols, levels),
            prediction: PredictionPyramid::allocate(rows, cols, levels),
        }
    }
}
