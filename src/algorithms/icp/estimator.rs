//! Coarse-to-fine point-to-plane pose solver.
//!
//! Walks the pyramid from the coarsest level to the finest, re-linearizing
//! the 6x6 system around the latest estimate at every iteration. Each
//! solve yields a small increment `(alpha, beta, gamma, tx, ty, tz)` that
//! is applied on the left of the running pose, so increments accumulate in
//! the fixed frame the prediction maps live in.
//!
//! A vanishing or non-finite determinant means the correspondences no
//! longer constrain all six degrees of freedom; the solver reports
//! tracking lost instead of emitting a garbage pose.

use nalgebra::Vector3;

use crate::algorithms::icp::reduction::{accumulate_system, CorrespondenceGates};
use crate::core::math::increment_rotation;
use crate::core::pose::{Pose, PoseDelta};
use crate::core::types::CameraIntrinsics;
use crate::error::{Result, TrackerError};
use crate::sensors::preprocessing::pyramid::{FramePyramid, PredictionPyramid};

const DETERMINANT_EPSILON: f64 = 1e-15;

/// Solver parameters.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct IcpConfig {
    /// Iterations per pyramid level, finest level first.
    /// Default: [10, 5, 4]
    pub iterations: Vec<usize>,
    /// Correspondence distance gate in meters. Default: 0.10
    pub dist_threshold: f32,
    /// Correspondence normal gate as the sine of the maximum deviation.
    /// Default: sin(20 degrees)
    pub angle_threshold: f32,
}

impl Default for IcpConfig {
    fn default() -> Self {
        Self {
            iterations: vec![10, 5, 4],
            dist_threshold: 0.10,
            angle_threshold: (20.0f32.to_radians()).sin(),
        }
    }
}

/// Result of one frame alignment.
#[derive(Debug, Clone, Copy)]
pub struct IcpEstimate {
    /// Absolute camera pose in the world frame.
    pub pose: Pose,
    /// Net increment relative to the previous pose, so that
    /// `previous.compose_increment(&delta)` reproduces `pose`.
    pub delta: PoseDelta,
    /// Correspondences surviving the gates in the final iteration.
    pub correspondences: usize,
}

/// Multi-resolution point-to-plane estimator.
#[derive(Debug, Clone)]
pub struct IcpEstimator {
    config: IcpConfig,
    intrinsics: CameraIntrinsics,
}

impl IcpEstimator {
    pub fn new(config: IcpConfig, intrinsics: CameraIntrinsics) -> Self {
        Self { config, intrinsics }
    }

    #[inline]
    pub fn levels(&self) -> usize {
        self.config.iterations.len()
    }

    /// Aligns the measurement pyramid against the prediction.
    ///
    /// `previous_pose` seeds the solve and anchors the projective
    /// association. Poses and prediction maps share the world frame, so
    /// every solved increment composes directly onto the running pose.
    pub fn estimate(
        &self,
        current: &FramePyramid,
        prediction: &PredictionPyramid,
        previous_pose: &Pose,
    ) -> Result<IcpEstimate> {
        debug_assert_eq!(current.levels(), self.levels());
        debug_assert_eq!(prediction.levels(), self.levels());

        let gates = CorrespondenceGates {
            max_distance: self.config.dist_threshold,
            max_normal_sine: self.config.angle_threshold,
        };

        let mut pose = *previous_pose;
        let mut delta = PoseDelta::identity();
        let mut correspondences = 0usize;

        for level in (0..self.levels()).rev() {
            let intr = self.intrinsics.level(level);
            for _ in 0..self.config.iterations[level] {
                let (a, b, count) = accumulate_system(
                    &current.vertices[level],
                    &current.normals[level],
                    &prediction.vertices[level],
                    &prediction.normals[level],
                    &pose,
                    previous_pose,
                    &intr,
                    &gates,
                );

                let det = a.determinant();
                if det.abs() < DETERMINANT_EPSILON || det.is_nan() {
                    log::warn!(
                        "alignment degenerate at level {level}: det = {det:.3e}, {count} correspondences"
                    );
                    return Err(TrackerError::TrackingLost(format!(
                        "degenerate normal equations at level {level}"
                    )));
                }
                let solution = match a.cholesky() {
                    Some(factor) => factor.solve(&b),
                    None => {
                        log::warn!("alignment not positive definite at level {level}");
                        return Err(TrackerError::TrackingLost(format!(
                            "indefinite normal equations at level {level}"
                        )));
                    }
                };

                let increment = PoseDelta::new(
                    increment_rotation(solution[0] as f32, solution[1] as f32, solution[2] as f32),
                    Vector3::new(solution[3] as f32, solution[4] as f32, solution[5] as f32),
                );
                pose = pose.compose_increment(&increment);
                delta = increment.compose(&delta);
                correspondences = count;
            }
        }

        Ok(IcpEstimate {
            pose,
            delta,
            correspondences,
        })
    }
}
