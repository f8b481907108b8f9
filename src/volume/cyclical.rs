//! Shifting-window management for the fused volumes.
//!
//! The camera is kept near the window center by watching a target point a
//! fixed distance along the optical axis. When that point strays too far
//! from the box center the window slides after it, in whole voxels:
//! ```text
//!   1. extract the observed surface band leaving the box into the world
//!   2. clear the exiting slab
//!   3. advance the cyclic wrap offsets, O(1), no data copies
//!   4. move the metric origin by the same whole-voxel amount
//! ```
//! Snapping shifts to whole voxels keeps every surviving voxel's world
//! position bit-exact across shifts.

use nalgebra::Vector3;

use crate::core::pose::Pose;
use crate::volume::color::ColorVolume;
use crate::volume::tsdf::TsdfVolume;
use crate::volume::world::WorldModel;

/// Distance values at the extremes of the band carry no surface detail.
const EXTRACTION_BAND: f32 = 0.99;

/// Tracks the window origin and performs shifts.
#[derive(Debug, Clone)]
pub struct CyclicalBuffer {
    /// Shift triggers when the target point is farther than this from the
    /// window center, meters.
    distance_threshold: f32,
    /// Window origin in the world frame, always a whole number of voxels.
    origin: Vector3<f32>,
    /// Cumulative shift in voxels, for diagnostics.
    origin_voxels: [i32; 3],
}

impl CyclicalBuffer {
    pub fn new(distance_threshold: f32) -> Self {
        Self {
            distance_threshold,
            origin: Vector3::zeros(),
            origin_voxels: [0; 3],
        }
    }

    /// World-frame origin of the current window.
    #[inline]
    pub fn origin(&self) -> Vector3<f32> {
        self.origin
    }

    /// Cumulative shift in voxels since the last reset.
    #[inline]
    pub fn origin_voxels(&self) -> [i32; 3] {
        self.origin_voxels
    }

    pub fn reset(&mut self) {
        self.origin = Vector3::zeros();
        self.origin_voxels = [0; 3];
    }

    /// Checks the camera against the window and shifts when needed.
    ///
    /// `camera_target_distance` places the watched point ahead of the
    /// camera; `last_shift` additionally extracts the surface band still
    /// inside the box, for a final world export. Returns whether a shift
    /// occurred.
    pub fn check_for_shift(
        &mut self,
        tsdf: &mut TsdfVolume,
        mut color: Option<&mut ColorVolume>,
        world: &mut WorldModel,
        pose: &Pose,
        camera_target_distance: f32,
        last_shift: bool,
    ) -> bool {
        let target =
            pose.translation + pose.rotate(&Vector3::new(0.0, 0.0, camera_target_distance));
        let center = self.origin + tsdf.size() * 0.5;
        if (target - center).norm() <= self.distance_threshold {
            return false;
        }

        let voxel_size = tsdf.voxel_size();
        let desired = target - tsdf.size() * 0.5;
        let offset = [
            ((desired.x - self.origin.x) / voxel_size.x).round() as i32,
            ((desired.y - self.origin.y) / voxel_size.y).round() as i32,
            ((desired.z - self.origin.z) / voxel_size.z).round() as i32,
        ];
        if offset == [0; 3] {
            return false;
        }

        let dims = tsdf.dims();
        let exits = |g: usize, off: i32, dim: usize| -> bool {
            if off > 0 {
                (g as i32) < off
            } else if off < 0 {
                (g as i32) >= dim as i32 + off
            } else {
                false
            }
        };

        let before = world.len();
        for z in 0..dims[2] {
            for y in 0..dims[1] {
                for x in 0..dims[0] {
                    let exiting = exits(x, offset[0], dims[0])
                        || exits(y, offset[1], dims[1])
                        || exits(z, offset[2], dims[2]);
                    if !exiting && !last_shift {
                        continue;
                    }

                    let voxel = tsdf.voxel(x, y, z);
                    let in_band = voxel.weight > 0.0 && voxel.tsdf.abs() < EXTRACTION_BAND;
                    if in_band {
                        world.push(self.origin + tsdf.voxel_center(x, y, z), voxel.tsdf);
                    }
                    if exiting {
                        tsdf.clear_voxel(x, y, z);
                        if let Some(cv) = color.as_deref_mut() {
                            cv.clear_voxel(x, y, z);
                        }
                    }
                }
            }
        }

        tsdf.shift_wrap(offset);
        if let Some(cv) = color.as_deref_mut() {
            cv.shift_wrap(offset);
        }

        let shift_metric = Vector3::new(
            offset[0] as f32 * voxel_size.x,
            offset[1] as f32 * voxel_size.y,
            offset[2] as f32 * voxel_size.z,
        );
        self.origin += shift_metric;
        for axis in 0..3 {
            self.origin_voxels[axis] += offset[axis];
        }

        log::info!(
            "window shifted by [{}, {}, {}] voxels, new origin [{:.3}, {:.3}, {:.3}], extracted {} points",
            offset[0],
            offset[1],
            offset[2],
            self.origin.x,
            self.origin.y,
            self.origin.z,
            world.len() - before
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::tsdf::VolumeConfig;
    use approx::assert_relative_eq;
    use nalgebra::Matrix3;

    fn small_volume() -> TsdfVolume {
        TsdfVolume::new(&VolumeConfig {
            size: [1.5, 1.5, 1.5],
            resolution: [48, 48, 48],
            trunc_dist: 0.06,
        })
    }

    fn camera_at(z: f32) -> Pose {
        Pose::new(Matrix3::identity(), Vector3::new(0.75, 0.75, z))
    }

    #[test]
    fn test_no_shift_near_center() {
        let mut buffer = CyclicalBuffer::new(0.3);
        let mut tsdf = small_volume();
        let mut world = WorldModel::new();

        // Target lands 0.15 m from the center, inside the threshold.
        let shifted = buffer.check_for_shift(
            &mut tsdf,
            None,
            &mut world,
            &camera_at(0.15),
            0.75,
            false,
        );
        assert!(!shifted);
        assert_relative_eq!(buffer.origin().norm(), 0.0);
        assert!(world.is_empty());
    }

    #[test]
    fn test_shift_snaps_to_voxels() {
        let mut buffer = CyclicalBuffer::new(0.3);
        let mut tsdf = small_volume();
        let mut world = WorldModel::new();

        // Target (0.75, 0.75, 1.1) is 0.35 m past the center.
        let shifted = buffer.check_for_shift(
            &mut tsdf,
            None,
            &mut world,
            &camera_at(0.2),
            0.9,
            false,
        );
        assert!(shifted);

        let vs = tsdf.voxel_size().z;
        let expected_voxels = (0.35f32 / vs).round();
        assert_relative_eq!(buffer.origin().z, expected_voxels * vs, epsilon = 1e-6);
        assert_eq!(buffer.origin_voxels()[2], expected_voxels as i32);
        assert_relative_eq!(buffer.origin().x, 0.0);
    }

    #[test]
    fn test_exiting_band_extracted_and_cleared() {
        let mut buffer = CyclicalBuffer::new(0.3);
        let mut tsdf = small_volume();
        let mut world = WorldModel::new();

        // Surface-band voxel in the slab that will exit (low z), plus a
        // free-space voxel that must be dropped silently.
        tsdf.set_voxel(10, 10, 5, -0.5, 1.0);
        tsdf.set_voxel(11, 10, 5, 1.0, 3.0);
        // Deep voxel that survives the shift.
        tsdf.set_voxel(10, 10, 30, 0.25, 2.0);
        let expected_survivor_world_z = tsdf.voxel_center(10, 10, 30).z;

        let shifted = buffer.check_for_shift(
            &mut tsdf,
            None,
            &mut world,
            &camera_at(0.2),
            0.9,
            false,
        );
        assert!(shifted);
        let shift_voxels = buffer.origin_voxels()[2] as usize;
        assert!(shift_voxels > 5);

        // Band voxel extracted at its old world position.
        assert_eq!(world.len(), 1);
        let point = world.points()[0];
        assert_relative_eq!(point.intensity, -0.5);
        assert_relative_eq!(point.position.z, tsdf.voxel_center(10, 10, 5).z, epsilon = 1e-6);

        // The exiting slab is cleared; recycled storage is unobserved.
        let recycled = tsdf.voxel(10, 10, 48 - shift_voxels + 5);
        assert_relative_eq!(recycled.weight, 0.0);

        // The survivor is readable at the same world position.
        let new_logical_z = 30 - shift_voxels;
        let survivor = tsdf.voxel(10, 10, new_logical_z);
        assert_relative_eq!(survivor.tsdf, 0.25);
        assert_relative_eq!(
            buffer.origin().z + tsdf.voxel_center(10, 10, new_logical_z).z,
            expected_survivor_world_z,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_last_shift_extracts_remainder() {
        let mut buffer = CyclicalBuffer::new(0.3);
        let mut tsdf = small_volume();
        let mut world = WorldModel::new();

        tsdf.set_voxel(10, 10, 5, -0.5, 1.0);
        tsdf.set_voxel(10, 10, 30, 0.25, 2.0);

        let shifted = buffer.check_for_shift(
            &mut tsdf,
            None,
            &mut world,
            &camera_at(0.2),
            0.9,
            true,
        );
        assert!(shifted);
        // Both the exiting voxel and the remaining band voxel land in the
        // world model.
        assert_eq!(world.len(), 2);

        // The remaining voxel kept its data.
        let shift_voxels = buffer.origin_voxels()[2] as usize;
        let survivor = tsdf.voxel(10, 10, 30 - shift_voxels);
        assert_relative_eq!(survivor.tsdf, 0.25);
    }

    #[test]
    fn test_color_slab_cleared_with_tsdf() {
        let mut buffer = CyclicalBuffer::new(0.3);
        let mut tsdf = small_volume();
        let config = VolumeConfig {
            size: [1.5, 1.5, 1.5],
            resolution: [48, 48, 48],
            trunc_dist: 0.06,
        };
        let mut color = ColorVolume::new(&config, 2.0);
        let mut world = WorldModel::new();

        // Paint a color voxel in the exiting slab through its surface.
        let mut frame = crate::sensors::frame::ColorFrame::empty(1, 1);
        frame.set(0, 0, [10, 20, 30]);
        let mut vertices = crate::core::types::PointMap::invalid(1, 1);
        vertices.set(0, 0, tsdf.voxel_center(10, 10, 5));
        color.integrate(&frame, &vertices, Vector3::zeros());
        assert!(color.voxel(10, 10, 5).weight > 0.0);

        buffer.check_for_shift(
            &mut tsdf,
            Some(&mut color),
            &mut world,
            &camera_at(0.2),
            0.9,
            false,
        );

        let shift_voxels = buffer.origin_voxels()[2] as usize;
        let recycled = color.voxel(10, 10, 48 - shift_voxels + 5);
        assert_relative_eq!(recycled.weight, 0.0);
    }

    #[test]
    fn test_reset_restores_origin() {
        let mut buffer = CyclicalBuffer::new(0.3);
        let mut tsdf = small_volume();
        let mut world = WorldModel::new();
        buffer.check_for_shift(&mut tsdf, None, &mut world, &camera_at(0.2), 0.9, false);
        assert!(buffer.origin().norm() > 0.0);

        buffer.reset();
        assert_relative_eq!(buffer.origin().norm(), 0.0);
        assert_eq!(buffer.origin_voxels(), [0; 3]);
    }
}
