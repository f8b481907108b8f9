//! Rigid-body camera poses and incremental motions.
//!
//! A [`Pose`] maps camera-frame points into the world frame. Poses are
//! stored in a fixed world frame; the shifting volume window is handled by
//! translating poses with [`Pose::to_local`] and [`Pose::to_world`] at the
//! few places that touch volume memory, so window bookkeeping never leaks
//! into the solvers.
//!
//! A [`PoseDelta`] is the left-increment produced by one solver step:
//! applying `delta` to a pose rotates the whole frame and then offsets it,
//! `R' = dR * R`, `t' = dR * t + dt`.

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::core::math;

/// Camera-to-world rigid transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Rotation part, assumed orthonormal.
    pub rotation: Matrix3<f32>,
    /// Camera position in the world frame, meters.
    pub translation: Vector3<f32>,
}

impl Pose {
    pub fn new(rotation: Matrix3<f32>, translation: Vector3<f32>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    pub fn identity() -> Self {
        Self {
            rotation: Matrix3::identity(),
            translation: Vector3::zeros(),
        }
    }

    /// Maps a camera-frame point into the world frame.
    #[inline]
    pub fn transform_point(&self, point: &Vector3<f32>) -> Vector3<f32> {
        self.rotation * point + self.translation
    }

    /// Rotates a camera-frame direction into the world frame.
    #[inline]
    pub fn rotate(&self, direction: &Vector3<f32>) -> Vector3<f32> {
        self.rotation * direction
    }

    /// World-to-camera inverse. The rotation is inverted by transpose.
    pub fn inverse(&self) -> Self {
        let rot_inv = self.rotation.transpose();
        Self {
            rotation: rot_inv,
            translation: -(rot_inv * self.translation),
        }
    }

    /// Re-expresses this pose relative to a volume window origin.
    ///
    /// Only the translation moves; rotations are unaffected by a pure
    /// window shift.
    #[inline]
    pub fn to_local(&self, origin: Vector3<f32>) -> Self {
        Self {
            rotation: self.rotation,
            translation: self.translation - origin,
        }
    }

    /// Inverse of [`Pose::to_local`].
    #[inline]
    pub fn to_world(&self, origin: Vector3<f32>) -> Self {
        Self {
            rotation: self.rotation,
            translation: self.translation + origin,
        }
    }

    /// Applies a solved increment on the left of this pose.
    #[inline]
    pub fn compose_increment(&self, delta: &PoseDelta) -> Self {
        Self {
            rotation: delta.rotation * self.rotation,
            translation: delta.rotation * self.translation + delta.translation,
        }
    }

    /// The increment that carries `previous` onto this pose, so that
    /// `previous.compose_increment(&delta) == *self`.
    pub fn delta_from(&self, previous: &Pose) -> PoseDelta {
        let rotation = self.rotation * previous.rotation.transpose();
        PoseDelta {
            rotation,
            translation: self.translation - rotation * previous.translation,
        }
    }

    /// True when every component is finite.
    pub fn is_finite(&self) -> bool {
        self.rotation.iter().all(|v| v.is_finite())
            && self.translation.iter().all(|v| v.is_finite())
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

/// One incremental rigid motion, as solved by an estimator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseDelta {
    pub rotation: Matrix3<f32>,
    pub translation: Vector3<f32>,
}

impl PoseDelta {
    pub fn new(rotation: Matrix3<f32>, translation: Vector3<f32>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    pub fn identity() -> Self {
        Self {
            rotation: Matrix3::identity(),
            translation: Vector3::zeros(),
        }
    }

    /// Chains two increments: `earlier` is applied first, then `self`.
    #[inline]
    pub fn compose(&self, earlier: &PoseDelta) -> Self {
        Self {
            rotation: self.rotation * earlier.rotation,
            translation: self.rotation * earlier.translation + self.translation,
        }
    }

    /// Euclidean length of the translational part, meters.
    #[inline]
    pub fn translation_norm(&self) -> f32 {
        self.translation.norm()
    }

    /// Rotation angle of the rotational part, radians.
    #[inline]
    pub fn rotation_angle(&self) -> f32 {
        math::rotation_angle(&self.rotation)
    }

    /// True when every component is finite.
    pub fn is_finite(&self) -> bool {
        self.rotation.iter().all(|v| v.is_finite())
            && self.translation.iter().all(|v| v.is_finite())
    }
}

impl Default for PoseDelta {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::math::increment_rotation;
    use approx::assert_relative_eq;

    fn sample_pose() -> Pose {
        Pose::new(
            increment_rotation(0.1, -0.2, 0.3),
            Vector3::new(1.5, -0.4, 2.0),
        )
    }

    #[test]
    fn test_identity_transform() {
        let p = Vector3::new(0.3, -0.2, 1.4);
        assert_relative_eq!(Pose::identity().transform_point(&p), p);
    }

    #[test]
    fn test_inverse_roundtrip() {
        let pose = sample_pose();
        let p = Vector3::new(-0.7, 0.2, 3.1);
        let back = pose.inverse().transform_point(&pose.transform_point(&p));
        assert_relative_eq!(back, p, epsilon = 1e-5);
    }

    #[test]
    fn test_local_world_roundtrip() {
        let pose = sample_pose();
        let origin = Vector3::new(2.0, -1.0, 0.5);
        let roundtrip = pose.to_local(origin).to_world(origin);
        assert_relative_eq!(roundtrip.translation, pose.translation, epsilon = 1e-6);
        assert_relative_eq!(roundtrip.rotation, pose.rotation, epsilon = 1e-6);
    }

    #[test]
    fn test_local_keeps_rotation() {
        let pose = sample_pose();
        let local = pose.to_local(Vector3::new(5.0, 5.0, 5.0));
        assert_relative_eq!(local.rotation, pose.rotation);
    }

    #[test]
    fn test_compose_increment_matches_manual() {
        let pose = sample_pose();
        let delta = PoseDelta::new(
            increment_rotation(0.02, 0.01, -0.03),
            Vector3::new(0.05, 0.0, -0.02),
        );
        let next = pose.compose_increment(&delta);
        assert_relative_eq!(next.rotation, delta.rotation * pose.rotation, epsilon = 1e-6);
        assert_relative_eq!(
            next.translation,
            delta.rotation * pose.translation + delta.translation,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_delta_from_roundtrip() {
        let prev = sample_pose();
        let next = Pose::new(
            increment_rotation(0.15, -0.1, 0.25),
            Vector3::new(1.6, -0.3, 2.1),
        );
        let delta = next.delta_from(&prev);
        let recomposed = prev.compose_increment(&delta);
        assert_relative_eq!(recomposed.rotation, next.rotation, epsilon = 1e-5);
        assert_relative_eq!(recomposed.translation, next.translation, epsilon = 1e-5);
    }

    #[test]
    fn test_delta_chain_associativity() {
        // Composing two increments one by one equals composing their chain.
        let pose = sample_pose();
        let d1 = PoseDelta::new(increment_rotation(0.01, 0.0, 0.0), Vector3::new(0.1, 0.0, 0.0));
        let d2 = PoseDelta::new(increment_rotation(0.0, 0.02, 0.0), Vector3::new(0.0, -0.1, 0.0));

        let stepwise = pose.compose_increment(&d1).compose_increment(&d2);
        let chained = pose.compose_increment(&d2.compose(&d1));
        assert_relative_eq!(stepwise.rotation, chained.rotation, epsilon = 1e-5);
        assert_relative_eq!(stepwise.translation, chained.translation, epsilon = 1e-5);
    }

    #[test]
    fn test_delta_norms() {
        let delta = PoseDelta::new(increment_rotation(0.0, 0.0, 0.4), Vector3::new(3.0, 4.0, 0.0));
        assert_relative_eq!(delta.translation_norm(), 5.0, epsilon = 1e-6);
        assert_relative_eq!(delta.rotation_angle(), 0.4, epsilon = 1e-5);
    }

    #[test]
    fn test_is_finite_rejects_nan() {
        let mut delta = PoseDelta::identity();
        assert!(delta.is_finite());
        delta.translation.x = f32::NAN;
        assert!(!delta.is_finite());
    }
}
