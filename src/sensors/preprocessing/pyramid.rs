//! Multi-resolution frame pyramids and dense map operations.
//!
//! Every incoming depth frame becomes a [`FramePyramid`]: filtered depth,
//! back-projected vertices and covariance-based normals at each level.
//! ```text
//!   raw depth -> bilateral -> depth L0 -> vertices L0 -> normals L0
//!                               | pyrdown
//!                             depth L1 -> vertices L1 -> normals L1
//!                               | pyrdown
//!                             depth L2 -> vertices L2 -> normals L2
//! ```
//! The [`PredictionPyramid`] holds the model-side maps raycast from the
//! fused volume; only its finest level is rendered, the coarser levels are
//! box-downsampled from it.
//!
//! Depth downsampling and the normal windows are discontinuity-aware so
//! that surfaces never bleed across depth edges.

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::core::pose::Pose;
use crate::core::types::{CameraIntrinsics, PointMap};
use crate::sensors::frame::DepthFrame;
use crate::sensors::preprocessing::bilateral::{BilateralConfig, BilateralFilter};

/// Per-frame measurement pyramid: depth, vertices and normals per level.
#[derive(Debug, Clone)]
pub struct FramePyramid {
    pub depths: Vec<DepthFrame>,
    pub vertices: Vec<PointMap>,
    pub normals: Vec<PointMap>,
}

impl FramePyramid {
    /// Allocates `levels` levels, halving dimensions at each step.
    pub fn allocate(rows: usize, cols: usize, levels: usize) -> Self {
        let mut depths = Vec::with_capacity(levels);
        let mut vertices = Vec::with_capacity(levels);
        let mut normals = Vec::with_capacity(levels);
        for level in 0..levels {
            let (r, c) = (rows >> level, cols >> level);
            depths.push(DepthFrame::empty(r, c));
            vertices.push(PointMap::invalid(r, c));
            normals.push(PointMap::invalid(r, c));
        }
        Self {
            depths,
            vertices,
            normals,
        }
    }

    #[inline]
    pub fn levels(&self) -> usize {
        self.depths.len()
    }
}

/// Model-side prediction pyramid raycast from the fused volume.
#[derive(Debug, Clone)]
pub struct PredictionPyramid {
    pub vertices: Vec<PointMap>,
    pub normals: Vec<PointMap>,
}

impl PredictionPyramid {
    pub fn allocate(rows: usize, cols: usize, levels: usize) -> Self {
        let mut vertices = Vec::with_capacity(levels);
        let mut normals = Vec::with_capacity(levels);
        for level in 0..levels {
            let (r, c) = (rows >> level, cols >> level);
            vertices.push(PointMap::invalid(r, c));
            normals.push(PointMap::invalid(r, c));
        }
        Self { vertices, normals }
    }

    #[inline]
    pub fn levels(&self) -> usize {
        self.vertices.len()
    }

    pub fn fill_invalid(&mut self) {
        for map in self.vertices.iter_mut().chain(self.normals.iter_mut()) {
            map.fill_invalid();
        }
    }
}

/// Downsamples depth by 2x, averaging only measurements close to the
/// block center so depth edges stay sharp.
pub fn pyr_down(src: &DepthFrame, dst: &mut DepthFrame, sigma_color: f32) {
    debug_assert_eq!(src.rows() >> 1, dst.rows());
    debug_assert_eq!(src.cols() >> 1, dst.cols());

    let gate = 3.0 * sigma_color;
    let src_rows = src.rows() as i32;
    let src_cols = src.cols() as i32;

    for row in 0..dst.rows() {
        for col in 0..dst.cols() {
            let center = src.get(row * 2, col * 2) as i32;

            let y0 = (row as i32 * 2 - 2).max(0);
            let y1 = (row as i32 * 2 + 2).min(src_rows - 1);
            let x0 = (col as i32 * 2 - 2).max(0);
            let x1 = (col as i32 * 2 + 2).min(src_cols - 1);

            let mut sum = 0i32;
            let mut count = 0i32;
            for y in y0..=y1 {
                for x in x0..=x1 {
                    let value = src.get(y as usize, x as usize) as i32;
                    if (value - center).abs() < gate as i32 {
                        sum += value;
                        count += 1;
                    }
                }
            }
            // A non-positive sigma rejects every neighbor, including the
            // center; the block then degrades to a missing measurement.
            dst.set(row, col, if count > 0 { (sum / count) as u16 } else { 0 });
        }
    }
}

/// Back-projects a depth frame into a camera-frame vertex map.
pub fn create_vertex_map(depth: &DepthFrame, intrinsics: &CameraIntrinsics, out: &mut PointMap) {
    debug_assert_eq!(depth.rows(), out.rows());
    debug_assert_eq!(depth.cols(), out.cols());

    for row in 0..depth.rows() {
        for col in 0..depth.cols() {
            let millimeters = depth.get(row, col);
            if millimeters == 0 {
                out.set_invalid(row, col);
            } else {
                let z = millimeters as f32 * 0.001;
                out.set(row, col, intrinsics.backproject(row, col, z));
            }
        }
    }
}

/// Estimates surface normals from a vertex map.
///
/// Each normal is the smallest eigenvector of the covariance of a 5x5
/// vertex neighborhood, oriented toward the camera. A single invalid
/// vertex in the window invalidates the normal, which erodes normals
/// around depth edges where the neighborhood spans two surfaces.
pub fn compute_normals(vertices: &PointMap, out: &mut PointMap) {
    debug_assert_eq!(vertices.rows(), out.rows());
    debug_assert_eq!(vertices.cols(), out.cols());

    let rows = vertices.rows();
    let cols = vertices.cols();

    for row in 0..rows {
        for col in 0..cols {
            if row < 2 || row + 2 >= rows || col < 2 || col + 2 >= cols {
                out.set_invalid(row, col);
                continue;
            }
            if !vertices.is_valid(row, col) {
                out.set_invalid(row, col);
                continue;
            }

            let mut centroid = Vector3::zeros();
            let mut window_valid = true;
            'gather: for dy in 0..5 {
                for dx in 0..5 {
                    let (r, c) = (row + dy - 2, col + dx - 2);
                    if !vertices.is_valid(r, c) {
                        window_valid = false;
                        break 'gather;
                    }
                    centroid += vertices.get(r, c);
                }
            }
            if !window_valid {
                out.set_invalid(row, col);
                continue;
            }
            centroid /= 25.0;

            let mut cov = Matrix3::zeros();
            for dy in 0..5 {
                for dx in 0..5 {
                    let d = vertices.get(row + dy - 2, col + dx - 2) - centroid;
                    cov += d * d.transpose();
                }
            }
            if cov.norm() < 1e-12 {
                out.set_invalid(row, col);
                continue;
            }

            let eigen = cov.symmetric_eigen();
            let mut smallest = 0;
            for i in 1..3 {
                if eigen.eigenvalues[i] < eigen.eigenvalues[smallest] {
                    smallest = i;
                }
            }
            let mut normal = eigen.eigenvectors.column(smallest).into_owned();
            match normal.try_normalize(1e-12) {
                Some(n) => normal = n,
                None => {
                    out.set_invalid(row, col);
                    continue;
                }
            }

            // Orient toward the camera at the frame origin.
            if normal.dot(&vertices.get(row, col)) > 0.0 {
                normal = -normal;
            }
            out.set(row, col, normal);
        }
    }
}

/// Box-downsamples a vertex map by 2x. A block with any invalid corner
/// produces an invalid output.
pub fn resize_vertex_map(src: &PointMap, dst: &mut PointMap) {
    debug_assert_eq!(src.rows() >> 1, dst.rows());
    debug_assert_eq!(src.cols() >> 1, dst.cols());

    for row in 0..dst.rows() {
        for col in 0..dst.cols() {
            let (r, c) = (row * 2, col * 2);
            if src.is_valid(r, c)
                && src.is_valid(r, c + 1)
                && src.is_valid(r + 1, c)
                && src.is_valid(r + 1, c + 1)
            {
                let sum =
                    src.get(r, c) + src.get(r, c + 1) + src.get(r + 1, c) + src.get(r + 1, c + 1);
                dst.set(row, col, sum / 4.0);
            } else {
                dst.set_invalid(row, col);
            }
        }
    }
}

/// Box-downsamples a normal map by 2x and renormalizes.
pub fn resize_normal_map(src: &PointMap, dst: &mut PointMap) {
    debug_assert_eq!(src.rows() >> 1, dst.rows());
    debug_assert_eq!(src.cols() >> 1, dst.cols());

    for row in 0..dst.rows() {
        for col in 0..dst.cols() {
            let (r, c) = (row * 2, col * 2);
            if src.is_valid(r, c)
                && src.is_valid(r, c + 1)
                && src.is_valid(r + 1, c)
                && src.is_valid(r + 1, c + 1)
            {
                let sum =
                    src.get(r, c) + src.get(r, c + 1) + src.get(r + 1, c) + src.get(r + 1, c + 1);
                match sum.try_normalize(1e-12) {
                    Some(n) => dst.set(row, col, n),
                    None => dst.set_invalid(row, col),
                }
            } else {
                dst.set_invalid(row, col);
            }
        }
    }
}

/// Rigidly transforms a vertex/normal map pair into another frame.
/// Vertices get the full transform, normals only the rotation.
pub fn transform_maps(
    src_vertices: &PointMap,
    src_normals: &PointMap,
    pose: &Pose,
    dst_vertices: &mut PointMap,
    dst_normals: &mut PointMap,
) {
    debug_assert_eq!(src_vertices.rows(), dst_vertices.rows());
    debug_assert_eq!(src_vertices.cols(), dst_vertices.cols());

    for row in 0..src_vertices.rows() {
        for col in 0..src_vertices.cols() {
            if src_vertices.is_valid(row, col) {
                dst_vertices.set(row, col, pose.transform_point(&src_vertices.get(row, col)));
            } else {
                dst_vertices.set_invalid(row, col);
            }
            if src_normals.is_valid(row, col) {
                dst_normals.set(row, col, pose.rotate(&src_normals.get(row, col)));
            } else {
                dst_normals.set_invalid(row, col);
            }
        }
    }
}

/// Adds `offset` to every valid vertex in place. Used to re-express maps
/// when the volume window origin moves.
pub fn translate_map(map: &mut PointMap, offset: Vector3<f32>) {
    for row in 0..map.rows() {
        for col in 0..map.cols() {
            if map.is_valid(row, col) {
                let p = map.get(row, col);
                map.set(row, col, p + offset);
            }
        }
    }
}

/// Preprocessing parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessorConfig {
    /// Pyramid depth. Default: 3
    pub levels: usize,
    /// Bilateral filter applied to the finest level.
    pub bilateral: BilateralConfig,
    /// Measurements beyond this range (meters) are dropped before
    /// alignment. Zero disables the cut. Default: 0.0
    pub max_depth_range: f32,
}

impl Default for PreprocessorConfig {
    fn default() -> Self {
        Self {
            levels: 3,
            bilateral: BilateralConfig::default(),
            max_depth_range: 0.0,
        }
    }
}

/// Turns raw depth frames into measurement pyramids.
#[derive(Debug, Clone)]
pub struct FramePreprocessor {
    config: PreprocessorConfig,
    intrinsics: CameraIntrinsics,
    filter: BilateralFilter,
}

impl FramePreprocessor {
    pub fn new(config: PreprocessorConfig, intrinsics: CameraIntrinsics) -> Self {
        let filter = BilateralFilter::new(config.bilateral);
        Self {
            config,
            intrinsics,
            filter,
        }
    }

    #[inline]
    pub fn levels(&self) -> usize {
        self.config.levels
    }

    /// Fills `out` from a raw depth frame.
    pub fn process(&self, raw: &DepthFrame, out: &mut FramePyramid) {
        debug_assert_eq!(out.levels(), self.config.levels);
        debug_assert_eq!(raw.rows(), out.depths[0].rows());
        debug_assert_eq!(raw.cols(), out.depths[0].cols());

        self.filter.apply(raw, &mut out.depths[0]);
        if self.config.max_depth_range > 0.0 {
            out.depths[0].truncate_beyond(self.config.max_depth_range);
        }

        for level in 1..self.config.levels {
            let (finer, coarser) = out.depths.split_at_mut(level);
            pyr_down(
                &finer[level - 1],
                &mut coarser[0],
                self.config.bilateral.sigma_color,
            );
        }

        for level in 0..self.config.levels {
            let intr = self.intrinsics.level(level);
            create_vertex_map(&out.depths[level], &intr, &mut out.vertices[level]);
            compute_normals(&out.vertices[level], &mut out.normals[level]);
        }
    }
}
