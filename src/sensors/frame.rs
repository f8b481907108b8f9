//! Raw sensor frame containers.
//!
//! Depth arrives as row-major `u16` millimeters with `0` marking a missing
//! measurement; color as packed 8-bit RGB. The float variants are the
//! working formats handed to the visual-odometry front end.

/// Row-major depth image, `u16` millimeters, `0` = no measurement.
#[derive(Debug, Clone)]
pub struct DepthFrame {
    rows: usize,
    cols: usize,
    data: Vec<u16>,
}

impl DepthFrame {
    /// Allocates a frame filled with missing measurements.
    pub fn empty(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0; rows * cols],
        }
    }

    /// Wraps existing row-major data. Panics in debug builds when the
    /// buffer length does not match the dimensions.
    pub fn from_data(rows: usize, cols: usize, data: Vec<u16>) -> Self {
        debug_assert_eq!(data.len(), rows * cols);
        Self { rows, cols, data }
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
    pub fn get(&self, row: usize, col: usize) -> u16 {
        self.data[row * self.cols + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, millimeters: u16) {
        self.data[row * self.cols + col] = millimeters;
    }

    /// Zeroes every measurement beyond `max_range` meters.
    ///
    /// Used to keep far returns out of the alignment when the sensor's
    /// long-range readings are too noisy to trust.
    pub fn truncate_beyond(&mut self, max_range: f32) {
        let limit_mm = (max_range * 1000.0) as u16;
        for value in &mut self.data {
            if *value > limit_mm {
                *value = 0;
            }
        }
    }

    pub fn data(&self) -> &[u16] {
        &self.data
    }
}

/// Packed 8-bit RGB image, row-major.
#[derive(Debug, Clone)]
pub struct ColorFrame {
    rows: usize,
    cols: usize,
    data: Vec<[u8; 3]>,
}

impl ColorFrame {
    pub fn empty(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![[0; 3]; rows * cols],
        }
    }

    pub fn from_data(rows: usize, cols: usize, data: Vec<[u8; 3]>) -> Self {
        debug_assert_eq!(data.len(), rows * cols);
        Self { rows, cols, data }
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
    pub fn get(&self, row: usize, col: usize) -> [u8; 3] {
        self.data[row * self.cols + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, rgb: [u8; 3]) {
        self.data[row * self.cols + col] = rgb;
    }
}

/// Single-channel float luminance image, values in `[0, 255]`.
#[derive(Debug, Clone)]
pub struct GrayFrame {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl GrayFrame {
    pub fn empty(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
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
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.cols + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        self.data[row * self.cols + col] = value;
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }
}

/// Float depth image in meters with NaN marking missing measurements.
#[derive(Debug, Clone)]
pub struct DepthMeters {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl DepthMeters {
    pub fn empty(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![f32::NAN; rows * cols],
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
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.cols + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, meters: f32) {
        self.data[row * self.cols + col] = meters;
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_frame_access() {
        let mut frame = DepthFrame::empty(4, 5);
        assert_eq!(frame.get(2, 3), 0);
        frame.set(2, 3, 1500);
        assert_eq!(frame.get(2, 3), 1500);
    }

    #[test]
    fn test_truncate_beyond() {
        let mut frame = DepthFrame::empty(1, 3);
        frame.set(0, 0, 900);
        frame.set(0, 1, 2000);
        frame.set(0, 2, 2001);
        frame.truncate_beyond(2.0);
        assert_eq!(frame.get(0, 0), 900);
        assert_eq!(frame.get(0, 1), 2000);
        assert_eq!(frame.get(0, 2), 0);
    }

    #[test]
    fn test_color_frame_access() {
        let mut frame = ColorFrame::empty(2, 2);
        frame.set(1, 0, [10, 20, 30]);
        assert_eq!(frame.get(1, 0), [10, 20, 30]);
        assert_eq!(frame.get(0, 0), [0, 0, 0]);
    }

    #[test]
    fn test_depth_meters_starts_invalid() {
        let frame = DepthMeters::empty(2, 2);
        assert!(frame.get(0, 0).is_nan());
    }
}
