//! Small rotation helpers shared across the alignment pipeline.

use nalgebra::{Matrix3, Rotation3, Vector3};

/// Builds the incremental rotation for solved Euler angles
/// `(alpha, beta, gamma)` about the X, Y and Z axes.
///
/// The composition order is Z * Y * X, matching the linearization used by
/// the point-to-plane solver: for small angles the product reduces to
/// `I + [w]x` with `w = (alpha, beta, gamma)`.
#[inline]
pub fn increment_rotation(alpha: f32, beta: f32, gamma: f32) -> Matrix3<f32> {
    let rx = Rotation3::from_axis_angle(&Vector3::x_axis(), alpha);
    let ry = Rotation3::from_axis_angle(&Vector3::y_axis(), beta);
    let rz = Rotation3::from_axis_angle(&Vector3::z_axis(), gamma);
    (rz * ry * rx).into_inner()
}

/// Rotation angle of a near-orthonormal matrix, in radians.
///
/// The matrix is first projected onto the closest true rotation through an
/// SVD so that accumulated drift in a composed chain cannot push the trace
/// outside the valid arc-cosine domain.
pub fn rotation_angle(m: &Matrix3<f32>) -> f32 {
    let svd = m.svd(true, true);
    let projected = match (svd.u, svd.v_t) {
        (Some(u), Some(v_t)) => u * v_t,
        _ => *m,
    };
    let cos = ((projected.trace() - 1.0) * 0.5).clamp(-1.0, 1.0);
    cos.acos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_increment_rotation_identity() {
        let r = increment_rotation(0.0, 0.0, 0.0);
        assert_relative_eq!(r, Matrix3::identity(), epsilon = 1e-6);
    }

    #[test]
    fn test_increment_rotation_single_axis() {
        let angle = 0.3;
        let r = increment_rotation(angle, 0.0, 0.0);
        let expected = Rotation3::from_axis_angle(&Vector3::x_axis(), angle).into_inner();
        assert_relative_eq!(r, expected, epsilon = 1e-6);
    }

    #[test]
    fn test_increment_rotation_composition_order() {
        // Z * Y * X applied to a probe vector, checked against nalgebra's
        // own euler constructor (roll = X, pitch = Y, yaw = Z).
        let (a, b, g) = (0.1, -0.2, 0.15);
        let r = increment_rotation(a, b, g);
        let expected = Rotation3::from_euler_angles(a, b, g).into_inner();
        assert_relative_eq!(r, expected, epsilon = 1e-6);
    }

    #[test]
    fn test_increment_rotation_small_angle_linearization() {
        let (a, b, g) = (1e-4, -2e-4, 3e-4);
        let r = increment_rotation(a, b, g);
        // I + [w]x for w = (a, b, g).
        assert_relative_eq!(r[(2, 1)], a, epsilon = 1e-7);
        assert_relative_eq!(r[(0, 2)], b, epsilon = 1e-7);
        assert_relative_eq!(r[(1, 0)], g, epsilon = 1e-7);
    }

    #[test]
    fn test_rotation_angle_identity() {
        assert_relative_eq!(rotation_angle(&Matrix3::identity()), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_rotation_angle_known() {
        let angle = 0.7;
        let r = Rotation3::from_axis_angle(&Vector3::y_axis(), angle).into_inner();
        assert_relative_eq!(rotation_angle(&r), angle, epsilon = 1e-5);
    }

    #[test]
    fn test_rotation_angle_half_turn() {
        let r = Rotation3::from_axis_angle(&Vector3::x_axis(), std::f32::consts::PI).into_inner();
        assert_relative_eq!(rotation_angle(&r), std::f32::consts::PI, epsilon = 1e-4);
    }

    #[test]
    fn test_rotation_angle_projects_drifted_matrix() {
        // A mildly scaled rotation would push the raw trace outside the
        // arc-cosine domain; the SVD projection keeps the result finite.
        let r = Rotation3::from_axis_angle(&Vector3::z_axis(), 0.2).into_inner() * 1.001;
        let angle = rotation_angle(&r);
        assert!(angle.is_finite());
        assert_relative_eq!(angle, 0.2, epsilon = 1e-3);
    }
}
