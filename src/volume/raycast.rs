//! Surface prediction by ray marching the distance field.
//!
//! For every pixel a ray leaves the camera, is clipped against the volume
//! box and marched in steps a fraction of the truncation distance. A
//! positive-to-negative sign change brackets the surface; one linear
//! interpolation between the two samples lands on the zero crossing and
//! the field gradient there gives the normal. Unobserved voxels read as
//! zero, which can never fake a sign change, so holes in the data simply
//! produce invalid pixels.

use nalgebra::Vector3;

use crate::core::pose::Pose;
use crate::core::types::{CameraIntrinsics, PointMap};
use crate::volume::tsdf::TsdfVolume;

/// March step as a fraction of the truncation distance.
const STEP_SCALE: f32 = 0.8;

/// Renders prediction maps from the fused volume.
#[derive(Debug, Clone)]
pub struct Raycaster {
    rows: usize,
    cols: usize,
    intrinsics: CameraIntrinsics,
}

impl Raycaster {
    pub fn new(rows: usize, cols: usize, intrinsics: CameraIntrinsics) -> Self {
        Self {
            rows,
            cols,
            intrinsics,
        }
    }

    /// Entry and exit distances of a ray against the box `[0, size]`.
    fn clip_to_box(
        origin: &Vector3<f32>,
        direction: &Vector3<f32>,
        size: &Vector3<f32>,
    ) -> Option<(f32, f32)> {
        let mut t_near = f32::NEG_INFINITY;
        let mut t_far = f32::INFINITY;
        for axis in 0..3 {
            let o = origin[axis];
            let d = direction[axis];
            let hi = size[axis];
            if d.abs() < 1e-9 {
                if o < 0.0 || o > hi {
                    return None;
                }
                continue;
            }
            let (mut t0, mut t1) = (-o / d, (hi - o) / d);
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_near = t_near.max(t0);
            t_far = t_far.min(t1);
            if t_near > t_far {
                return None;
            }
        }
        Some((t_near, t_far))
    }

    /// Fills world-agnostic (window-frame) vertex and normal maps for the
    /// camera at `camera_local`.
    pub fn raycast(
        &self,
        tsdf: &TsdfVolume,
        camera_local: &Pose,
        vertices: &mut PointMap,
        normals: &mut PointMap,
    ) {
        debug_assert_eq!(vertices.rows(), self.rows);
        debug_assert_eq!(vertices.cols(), self.cols);

        let step = tsdf.trunc_dist() * STEP_SCALE;
        let size = tsdf.size();
        let ray_origin = camera_local.translation;

        for row in 0..self.rows {
            for col in 0..self.cols {
                vertices.set_invalid(row, col);
                normals.set_invalid(row, col);

                let dir_camera = Vector3::new(
                    (col as f32 - self.intrinsics.cx) / self.intrinsics.fx,
                    (row as f32 - self.intrinsics.cy) / self.intrinsics.fy,
                    1.0,
                )
                .normalize();
                let direction = camera_local.rotate(&dir_camera);

                let Some((t_near, t_far)) = Self::clip_to_box(&ray_origin, &direction, &size)
                else {
                    continue;
                };
                if t_far <= 0.0 {
                    continue;
                }

                let mut t = t_near.max(0.0);
                let mut previous: Option<(f32, f32)> = None;
                while t <= t_far {
                    let point = ray_origin + direction * t;
                    let Some(value) = tsdf.sample(point) else {
                        previous = None;
                        t += step;
                        continue;
                    };

                    if let Some((t_prev, prev)) = previous {
                        if prev < 0.0 && value > 0.0 {
                            // Exiting through a back face: nothing visible.
                            break;
                        }
                        if prev > 0.0 && value < 0.0 {
                            let t_star = t_prev + (t - t_prev) * prev / (prev - value);
                            let surface = ray_origin + direction * t_star;
                            if let Some(normal) =
                                tsdf.gradient(surface).and_then(|g| g.try_normalize(1e-9))
                            {
                                vertices.set(row, col, surface);
                                normals.set(row, col, normal);
                            }
                            break;
                        }
                    }
                    previous = Some((t, value));
                    t += step;
                }
            }
        }
    }
}
