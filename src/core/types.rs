//! Shared geometric types: camera intrinsics and dense point maps.
//!
//! A [`PointMap`] is an image-shaped grid of 3-D points (vertices or
//! normals). Invalid entries carry NaN components so validity travels with
//! the data itself and survives resampling and rigid transforms without a
//! side-channel mask.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Pinhole camera intrinsics in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    /// Horizontal focal length in pixels.
    pub fx: f32,
    /// Vertical focal length in pixels.
    pub fy: f32,
    /// Principal point column.
    pub cx: f32,
    /// Principal point row.
    pub cy: f32,
}

impl CameraIntrinsics {
    pub fn new(fx: f32, fy: f32, cx: f32, cy: f32) -> Self {
        Self { fx, fy, cx, cy }
    }

    /// Intrinsics with the principal point at the image center.
    ///
    /// The half-pixel offset places the point between the two central
    /// pixels, matching the convention of the depth sensors this pipeline
    /// was built for.
    pub fn centered(fx: f32, fy: f32, rows: usize, cols: usize) -> Self {
        Self {
            fx,
            fy,
            cx: cols as f32 / 2.0 - 0.5,
            cy: rows as f32 / 2.0 - 0.5,
        }
    }

    /// Intrinsics rescaled for pyramid `level` (level 0 is full resolution).
    #[inline]
    pub fn level(&self, level: usize) -> Self {
        let div = (1usize << level) as f32;
        Self {
            fx: self.fx / div,
            fy: self.fy / div,
            cx: self.cx / div,
            cy: self.cy / div,
        }
    }

    /// Projects a camera-frame point onto the image plane.
    ///
    /// Returns `(col, row)` in pixels. The caller checks bounds and the
    /// sign of `point.z`.
    #[inline]
    pub fn project(&self, point: &Vector3<f32>) -> (f32, f32) {
        (
            point.x * self.fx / point.z + self.cx,
            point.y * self.fy / point.z + self.cy,
        )
    }

    /// Back-projects pixel `(row, col)` at depth `z` (meters) into the
    /// camera frame.
    #[inline]
    pub fn backproject(&self, row: usize, col: usize, z: f32) -> Vector3<f32> {
        Vector3::new(
            (col as f32 - self.cx) * z / self.fx,
            (row as f32 - self.cy) * z / self.fy,
            z,
        )
    }
}

/// Image-shaped grid of 3-D points with NaN-coded invalid entries.
#[derive(Debug, Clone)]
pub struct PointMap {
    rows: usize,
    cols: usize,
    data: Vec<Vector3<f32>>,
}

impl PointMap {
    /// Allocates a map with every entry invalid.
    pub fn invalid(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![Vector3::repeat(f32::NAN); rows * cols],
        }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Vector3<f32> {
        self.data[row * self.cols + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, point: Vector3<f32>) {
        self.data[row * self.cols + col] = point;
    }

    #[inline]
    pub fn set_invalid(&mut self, row: usize, col: usize) {
        self.data[row * self.cols + col] = Vector3::repeat(f32::NAN);
    }

    /// An entry is valid when all of its components are finite.
    #[inline]
    pub fn is_valid(&self, row: usize, col: usize) -> bool {
        let p = self.data[row * self.cols + col];
        p.x.is_finite() && p.y.is_finite() && p.z.is_finite()
    }

    /// Marks every entry invalid, keeping the allocation.
    pub fn fill_invalid(&mut self) {
        self.data.fill(Vector3::repeat(f32::NAN));
    }

    /// Number of valid entries.
    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|p| p.x.is_finite()).count()
    }

    /// Iterator over all entries, valid or not, in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = &Vector3<f32>> {
        self.data.iter()
    }
}
