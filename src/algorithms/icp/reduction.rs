//! Point-to-plane correspondence search and normal-equation accumulation.
//!
//! For every valid measurement the current pose estimate carries the point
//! into the world frame, projective association finds the prediction
//! pixel it lands on, and gated correspondences contribute one linearized
//! row to the 6x6 system
//! ```text
//!   row = [ p x n | n ],   rhs = n . (q - p)
//! ```
//! with `p` the measured point in the world frame, `q` the predicted
//! point and `n` the predicted normal. Accumulation runs in f64 so the
//! determinant test downstream sees the true conditioning, not f32
//! round-off.

use nalgebra::{Matrix6, Vector6};

use crate::core::pose::Pose;
use crate::core::types::{CameraIntrinsics, PointMap};

/// Gates applied to candidate correspondences.
#[derive(Debug, Clone, Copy)]
pub struct CorrespondenceGates {
    /// Maximum Euclidean distance between measured and predicted point,
    /// meters.
    pub max_distance: f32,
    /// Maximum sine of the angle between measured and predicted normal.
    pub max_normal_sine: f32,
}

/// Accumulated normal equations plus the surviving correspondence count.
pub type ReducedSystem = (Matrix6<f64>, Vector6<f64>, usize);

/// Builds the normal equations for one pyramid level.
///
/// `current_pose` and `previous_pose` are world-frame camera poses,
/// matching the frame the prediction maps are stored in, so the solved
/// increment composes directly onto the world pose.
#[allow(clippy::too_many_arguments)]
pub fn accumulate_system(
    current_vertices: &PointMap,
    current_normals: &PointMap,
    predicted_vertices: &PointMap,
    predicted_normals: &PointMap,
    current_pose: &Pose,
    previous_pose: &Pose,
    intrinsics: &CameraIntrinsics,
    gates: &CorrespondenceGates,
) -> ReducedSystem {
    debug_assert_eq!(current_vertices.rows(), predicted_vertices.rows());
    debug_assert_eq!(current_vertices.cols(), predicted_vertices.cols());

    let rows = current_vertices.rows();
    let cols = current_vertices.cols();
    let prev_rot_inv = previous_pose.rotation.transpose();

    let mut a = Matrix6::<f64>::zeros();
    let mut b = Vector6::<f64>::zeros();
    let mut count = 0usize;

    for row in 0..rows {
        for col in 0..cols {
            if !current_vertices.is_valid(row, col) || !current_normals.is_valid(row, col) {
                continue;
            }

            let measured = current_pose.transform_point(&current_vertices.get(row, col));

            // Project into the previous camera to find the candidate.
            let in_prev = prev_rot_inv * (measured - previous_pose.translation);
            if in_prev.z <= 0.0 {
                continue;
            }
            let (u, v) = intrinsics.project(&in_prev);
            let (u, v) = (u.round() as i32, v.round() as i32);
            if u < 0 || v < 0 || u >= cols as i32 || v >= rows as i32 {
                continue;
            }
            let (pr, pc) = (v as usize, u as usize);

            if !predicted_vertices.is_valid(pr, pc) || !predicted_normals.is_valid(pr, pc) {
                continue;
            }
            let predicted = predicted_vertices.get(pr, pc);
            let normal = predicted_normals.get(pr, pc);

            if (predicted - measured).norm() > gates.max_distance {
                continue;
            }
            let measured_normal = current_pose.rotate(&current_normals.get(row, col));
            if measured_normal.cross(&normal).norm() >= gates.max_normal_sine {
                continue;
            }

            let cross = measured.cross(&normal);
            let jacobian = Vector6::new(
                cross.x as f64,
                cross.y as f64,
                cross.z as f64,
                normal.x as f64,
                normal.y as f64,
                normal.z as f64,
            );
            let residual = normal.dot(&(predicted - measured)) as f64;

            a += jacobian * jacobian.transpose();
            b += jacobian * residual;
            count += 1;
        }
    }

    (a, b, count)
}
