//! Optional per-voxel color averaging alongside the distance field.
//!
//! Color is fused surface-first: after each raycast the predicted vertex
//! under every pixel names the voxel that pixel's color belongs to, so
//! only voxels on the currently visible surface are touched. The running
//! average saturates at a configurable weight to keep recent frames
//! contributing.

use nalgebra::Vector3;

use crate::core::types::PointMap;
use crate::sensors::frame::ColorFrame;
use crate::volume::tsdf::VolumeConfig;

/// One color voxel: running RGB average in `[0, 255]` plus its weight.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ColorVoxel {
    pub rgb: [f32; 3],
    pub weight: f32,
}

/// Color companion volume, sharing geometry and cyclic addressing with
/// the distance field it annotates.
#[derive(Debug, Clone)]
pub struct ColorVolume {
    dims: [usize; 3],
    voxel_size: Vector3<f32>,
    max_weight: f32,
    wrap: [usize; 3],
    voxels: Vec<ColorVoxel>,
}

impl ColorVolume {
    pub fn new(config: &VolumeConfig, max_weight: f32) -> Self {
        let dims = config.resolution;
        Self {
            dims,
            voxel_size: Vector3::new(
                config.size[0] / dims[0] as f32,
                config.size[1] / dims[1] as f32,
                config.size[2] / dims[2] as f32,
            ),
            max_weight,
            wrap: [0; 3],
            voxels: vec![ColorVoxel::default(); dims[0] * dims[1] * dims[2]],
        }
    }

    #[inline]
    pub fn max_weight(&self) -> f32 {
        self.max_weight
    }

    #[inline]
    fn index(&self, x: usize, y: usize, z: usize) -> usize {
        let xs = (x + self.wrap[0]) % self.dims[0];
        let ys = (y + self.wrap[1]) % self.dims[1];
        let zs = (z + self.wrap[2]) % self.dims[2];
        (zs * self.dims[1] + ys) * self.dims[0] + xs
    }

    #[inline]
    pub fn voxel(&self, x: usize, y: usize, z: usize) -> ColorVoxel {
        self.voxels[self.index(x, y, z)]
    }

    #[inline]
    pub fn clear_voxel(&mut self, x: usize, y: usize, z: usize) {
        let idx = self.index(x, y, z);
        self.voxels[idx] = ColorVoxel::default();
    }

    pub fn reset(&mut self) {
        self.voxels.fill(ColorVoxel::default());
        self.wrap = [0; 3];
    }

    /// Advances the cyclic wrap after a window shift, mirroring the
    /// distance field's offsets.
    pub fn shift_wrap(&mut self, offset: [i32; 3]) {
        for axis in 0..3 {
            let dim = self.dims[axis] as i32;
            self.wrap[axis] = ((self.wrap[axis] as i32 + offset[axis]).rem_euclid(dim)) as usize;
        }
    }

    /// Blends one color frame into the voxels under the predicted surface.
    ///
    /// `predicted_vertices` are world-frame prediction points; `origin`
    /// re-expresses them into the window before voxel lookup. Pixels whose
    /// prediction is invalid or falls outside the box are skipped.
    pub fn integrate(
        &mut self,
        colors: &ColorFrame,
        predicted_vertices: &PointMap,
        origin: Vector3<f32>,
    ) {
        debug_assert_eq!(colors.rows(), predicted_vertices.rows());
        debug_assert_eq!(colors.cols(), predicted_vertices.cols());

        for row in 0..colors.rows() {
            for col in 0..colors.cols() {
                if !predicted_vertices.is_valid(row, col) {
                    continue;
                }
                let local = predicted_vertices.get(row, col) - origin;
                let x = (local.x / self.voxel_size.x).floor();
                let y = (local.y / self.voxel_size.y).floor();
                let z = (local.z / self.voxel_size.z).floor();
                if x < 0.0
                    || y < 0.0
                    || z < 0.0
                    || x >= self.dims[0] as f32
                    || y >= self.dims[1] as f32
                    || z >= self.dims[2] as f32
                {
                    continue;
                }

                let rgb = colors.get(row, col);
                let idx = self.index(x as usize, y as usize, z as usize);
                let voxel = &mut self.voxels[idx];
                let weight = voxel.weight;
                for channel in 0..3 {
                    voxel.rgb[channel] =
                        (voxel.rgb[channel] * weight + rgb[channel] as f32) / (weight + 1.0);
                }
                voxel.weight = (weight + 1.0).min(self.max_weight);
            }
        }
    }
}
