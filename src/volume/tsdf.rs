//! Truncated signed distance volume with cyclic addressing.
//!
//! The volume covers an axis-aligned box in the window frame. Each voxel
//! stores a signed distance clamped to the truncation band, normalized to
//! `[-1, 1]`, plus an update weight:
//! ```text
//!   tsdf > 0   observed free space in front of a surface
//!   tsdf ~ 0   on the surface
//!   tsdf < 0   within the truncation band behind a surface
//!   weight 0   never observed
//! ```
//! Addressing is cyclic: a wrap offset per axis maps logical grid
//! coordinates onto storage, so shifting the window is an O(1) offset
//! update plus clearing the slab that left the box, never a copy of the
//! whole volume.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::core::pose::Pose;
use crate::core::types::CameraIntrinsics;
use crate::sensors::frame::DepthFrame;

/// Maximum accumulated update weight per voxel.
const MAX_WEIGHT: f32 = 128.0;

/// Volume geometry parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeConfig {
    /// Physical box edge lengths in meters. Default: [3.0, 3.0, 3.0]
    pub size: [f32; 3],
    /// Voxel grid resolution per axis. Default: [128, 128, 128]
    pub resolution: [usize; 3],
    /// Truncation distance in meters. Default: 0.03
    pub trunc_dist: f32,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            size: [3.0, 3.0, 3.0],
            resolution: [128, 128, 128],
            trunc_dist: 0.03,
        }
    }
}

/// One voxel: normalized truncated signed distance plus update weight.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TsdfVoxel {
    pub tsdf: f32,
    pub weight: f32,
}

/// The fused distance field.
#[derive(Debug, Clone)]
pub struct TsdfVolume {
    size: Vector3<f32>,
    dims: [usize; 3],
    voxel_size: Vector3<f32>,
    trunc_dist: f32,
    wrap: [usize; 3],
    voxels: Vec<TsdfVoxel>,
}

impl TsdfVolume {
    pub fn new(config: &VolumeConfig) -> Self {
        let size = Vector3::new(config.size[0], config.size[1], config.size[2]);
        let dims = config.resolution;
        let voxel_size = Vector3::new(
            size.x / dims[0] as f32,
            size.y / dims[1] as f32,
            size.z / dims[2] as f32,
        );
        Self {
            size,
            dims,
            voxel_size,
            trunc_dist: config.trunc_dist,
            wrap: [0; 3],
            voxels: vec![TsdfVoxel::default(); dims[0] * dims[1] * dims[2]],
        }
    }

    #[inline]
    pub fn size(&self) -> Vector3<f32> {
        self.size
    }

    #[inline]
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    #[inline]
    pub fn voxel_size(&self) -> Vector3<f32> {
        self.voxel_size
    }

    #[inline]
    pub fn trunc_dist(&self) -> f32 {
        self.trunc_dist
    }

    /// Storage index of logical grid coordinates, wrap applied per axis.
    #[inline]
    fn index(&self, x: usize, y: usize, z: usize) -> usize {
        let xs = (x + self.wrap[0]) % self.dims[0];
        let ys = (y + self.wrap[1]) % self.dims[1];
        let zs = (z + self.wrap[2]) % self.dims[2];
        (zs * self.dims[1] + ys) * self.dims[0] + xs
    }

    #[inline]
    pub fn voxel(&self, x: usize, y: usize, z: usize) -> TsdfVoxel {
        self.voxels[self.index(x, y, z)]
    }

    #[inline]
    pub fn set_voxel(&mut self, x: usize, y: usize, z: usize, tsdf: f32, weight: f32) {
        let idx = self.index(x, y, z);
        self.voxels[idx] = TsdfVoxel { tsdf, weight };
    }

    #[inline]
    pub fn clear_voxel(&mut self, x: usize, y: usize, z: usize) {
        let idx = self.index(x, y, z);
        self.voxels[idx] = TsdfVoxel::default();
    }

    /// Center of logical voxel `(x, y, z)` in window coordinates.
    #[inline]
    pub fn voxel_center(&self, x: usize, y: usize, z: usize) -> Vector3<f32> {
        Vector3::new(
            (x as f32 + 0.5) * self.voxel_size.x,
            (y as f32 + 0.5) * self.voxel_size.y,
            (z as f32 + 0.5) * self.voxel_size.z,
        )
    }

    /// Clears all data and the wrap offsets.
    pub fn reset(&mut self) {
        self.voxels.fill(TsdfVoxel::default());
        self.wrap = [0; 3];
    }

    /// Advances the cyclic wrap after a window shift. The caller clears
    /// the exiting slab first; the recycled storage then reappears as
    /// unobserved space at the far side of the box.
    pub fn shift_wrap(&mut self, offset: [i32; 3]) {
        for axis in 0..3 {
            let dim = self.dims[axis] as i32;
            self.wrap[axis] = ((self.wrap[axis] as i32 + offset[axis]).rem_euclid(dim)) as usize;
        }
    }

    /// Fuses one depth frame taken from `camera_local` (window frame).
    ///
    /// Each voxel is projected into the frame; along the ray the scaled
    /// measurement gives the signed distance, truncated and averaged into
    /// the voxel with weight clamping.
    pub fn integrate(
        &mut self,
        depth: &DepthFrame,
        intrinsics: &CameraIntrinsics,
        camera_local: &Pose,
    ) {
        let rot_inv = camera_local.rotation.transpose();
        let translation = camera_local.translation;
        let rows = depth.rows();
        let cols = depth.cols();

        for z in 0..self.dims[2] {
            for y in 0..self.dims[1] {
                for x in 0..self.dims[0] {
                    let center = self.voxel_center(x, y, z);
                    let in_camera = rot_inv * (center - translation);
                    if in_camera.z <= 0.0 {
                        continue;
                    }

                    let (u, v) = intrinsics.project(&in_camera);
                    let (u, v) = (u.round() as i32, v.round() as i32);
                    if u < 0 || v < 0 || u >= cols as i32 || v >= rows as i32 {
                        continue;
                    }
                    let millimeters = depth.get(v as usize, u as usize);
                    if millimeters == 0 {
                        continue;
                    }

                    // Ray-scaled measurement: the pixel measures depth
                    // along z, the voxel sits along the ray.
                    let xl = (u as f32 - intrinsics.cx) / intrinsics.fx;
                    let yl = (v as f32 - intrinsics.cy) / intrinsics.fy;
                    let lambda = (xl * xl + yl * yl + 1.0).sqrt();
                    let sdf = millimeters as f32 * 0.001 * lambda - in_camera.norm();

                    if sdf >= -self.trunc_dist {
                        let value = (sdf / self.trunc_dist).min(1.0);
                        let idx = self.index(x, y, z);
                        let voxel = &mut self.voxels[idx];
                        let weight = voxel.weight;
                        voxel.tsdf = (voxel.tsdf * weight + value) / (weight + 1.0);
                        voxel.weight = (weight + 1.0).min(MAX_WEIGHT);
                    }
                }
            }
        }
    }

    /// Trilinear sample of the raw distance field at a window-frame point.
    ///
    /// Unobserved voxels contribute their neutral zero, which cannot fake
    /// a sign change; `None` only near the box boundary.
    pub fn sample(&self, point: Vector3<f32>) -> Option<f32> {
        let gx = point.x / self.voxel_size.x - 0.5;
        let gy = point.y / self.voxel_size.y - 0.5;
        let gz = point.z / self.voxel_size.z - 0.5;

        let x0 = gx.floor();
        let y0 = gy.floor();
        let z0 = gz.floor();
        let (xi, yi, zi) = (x0 as i32, y0 as i32, z0 as i32);
        if xi < 0
            || yi < 0
            || zi < 0
            || xi + 1 >= self.dims[0] as i32
            || yi + 1 >= self.dims[1] as i32
            || zi + 1 >= self.dims[2] as i32
        {
            return None;
        }
        let (x, y, z) = (xi as usize, yi as usize, zi as usize);
        let (fx, fy, fz) = (gx - x0, gy - y0, gz - z0);

        let c000 = self.voxel(x, y, z).tsdf;
        let c100 = self.voxel(x + 1, y, z).tsdf;
        let c010 = self.voxel(x, y + 1, z).tsdf;
        let c110 = self.voxel(x + 1, y + 1, z).tsdf;
        let c001 = self.voxel(x, y, z + 1).tsdf;
        let c101 = self.voxel(x + 1, y, z + 1).tsdf;
        let c011 = self.voxel(x, y + 1, z + 1).tsdf;
        let c111 = self.voxel(x + 1, y + 1, z + 1).tsdf;

        let c00 = c000 * (1.0 - fx) + c100 * fx;
        let c10 = c010 * (1.0 - fx) + c110 * fx;
        let c01 = c001 * (1.0 - fx) + c101 * fx;
        let c11 = c011 * (1.0 - fx) + c111 * fx;
        let c0 = c00 * (1.0 - fy) + c10 * fy;
        let c1 = c01 * (1.0 - fy) + c11 * fy;
        Some(c0 * (1.0 - fz) + c1 * fz)
    }

    /// Central-difference gradient of the field at a window-frame point.
    pub fn gradient(&self, point: Vector3<f32>) -> Option<Vector3<f32>> {
        let dx = Vector3::new(self.voxel_size.x, 0.0, 0.0);
        let dy = Vector3::new(0.0, self.voxel_size.y, 0.0);
        let dz = Vector3::new(0.0, 0.0, self.voxel_size.z);

        let gx = (self.sample(point + dx)? - self.sample(point - dx)?) / (2.0 * self.voxel_size.x);
        let gy = (self.sample(point + dy)? - self.sample(point - dy)?) / (2.0 * self.voxel_size.y);
        let gz = (self.sample(point + dz)? - self.sample(point - dz)?) / (2.0 * self.voxel_size.z);
        Some(Vector3::new(gx, gy, gz))
    }

    /// Sum of all update weights; zero means a freshly reset volume.
    pub fn total_weight(&self) -> f64 {
        self.voxels.iter().map(|v| v.weight as f64).sum()
    }
}
