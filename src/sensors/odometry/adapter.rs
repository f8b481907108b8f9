//! Conversion and screening layer between the tracker and an odometer.
//!
//! The odometer consumes float luminance and metric depth, so the adapter
//! owns reusable conversion buffers and rejects estimates that contain
//! non-finite translation or Euler components before they can reach pose
//! arbitration.

use nalgebra::Rotation3;

use crate::core::pose::PoseDelta;
use crate::error::{Result, TrackerError};
use crate::sensors::frame::{ColorFrame, DepthFrame, DepthMeters, GrayFrame};
use crate::sensors::odometry::VisualOdometer;

/// Rec. 709 luma weights, floored to match 8-bit camera pipelines.
#[inline]
fn luminance(rgb: [u8; 3]) -> f32 {
    (0.2125 * rgb[0] as f32 + 0.7154 * rgb[1] as f32 + 0.0721 * rgb[2] as f32).floor()
}

/// Owns the conversion buffers for one odometer stream.
pub struct VoAdapter {
    gray: GrayFrame,
    depth: DepthMeters,
}

impl VoAdapter {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            gray: GrayFrame::empty(rows, cols),
            depth: DepthMeters::empty(rows, cols),
        }
    }

    /// Feeds one frame pair to the odometer and screens its increment.
    ///
    /// Returns the incremental motion, or [`TrackerError::EstimatorInvalid`]
    /// when the odometer produced non-finite translation or rotation
    /// components. The odometer is fed either way.
    pub fn estimate(
        &mut self,
        odometer: &mut dyn VisualOdometer,
        depth: &DepthFrame,
        color: &ColorFrame,
    ) -> Result<PoseDelta> {
        debug_assert_eq!(depth.rows(), self.depth.rows());
        debug_assert_eq!(color.rows(), self.gray.rows());

        for row in 0..color.rows() {
            for col in 0..color.cols() {
                self.gray.set(row, col, luminance(color.get(row, col)));
            }
        }
        for row in 0..depth.rows() {
            for col in 0..depth.cols() {
                let millimeters = depth.get(row, col);
                let meters = if millimeters == 0 {
                    f32::NAN
                } else {
                    millimeters as f32 * 0.001
                };
                self.depth.set(row, col, meters);
            }
        }

        odometer.track(&self.gray, &self.depth);

        let delta = odometer.delta();
        let absolute = odometer.pose();
        log::debug!(
            "odometer frame: |dt| = {:.4} m, position = [{:.3}, {:.3}, {:.3}]",
            delta.translation_norm(),
            absolute.translation.x,
            absolute.translation.y,
            absolute.translation.z
        );

        if !delta.translation.iter().all(|v| v.is_finite()) {
            return Err(TrackerError::EstimatorInvalid(
                "odometer translation is not finite".to_string(),
            ));
        }
        let (roll, pitch, yaw) = Rotation3::from_matrix_unchecked(delta.rotation).euler_angles();
        if !(roll.is_finite() && pitch.is_finite() && yaw.is_finite()) {
            return Err(TrackerError::EstimatorInvalid(
                "odometer rotation is not finite".to_string(),
            ));
        }
        Ok(delta)
    }
}
