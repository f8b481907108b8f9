//! Edge-preserving bilateral filter for raw depth.
//!
//! Smooths sensor noise inside surfaces while leaving depth
//! discontinuities intact: each output is a window average weighted by
//! both pixel distance and depth difference, so measurements across an
//! edge contribute almost nothing. Missing measurements stay missing.

use serde::{Deserialize, Serialize};

use crate::sensors::frame::DepthFrame;

/// Bilateral filter parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BilateralConfig {
    /// Window radius in pixels. Default: 6 (a 13x13 window).
    pub radius: usize,
    /// Spatial Gaussian sigma in pixels. Default: 4.5
    pub sigma_space: f32,
    /// Depth Gaussian sigma in millimeters. Default: 30.0
    pub sigma_color: f32,
}

impl Default for BilateralConfig {
    fn default() -> Self {
        Self {
            radius: 6,
            sigma_space: 4.5,
            sigma_color: 30.0,
        }
    }
}

/// Applies [`BilateralConfig`] to whole depth frames.
#[derive(Debug, Clone)]
pub struct BilateralFilter {
    config: BilateralConfig,
}

impl BilateralFilter {
    pub fn new(config: BilateralConfig) -> Self {
        Self { config }
    }

    /// Filters `src` into `dst`. Both frames must share dimensions.
    pub fn apply(&self, src: &DepthFrame, dst: &mut DepthFrame) {
        debug_assert_eq!(src.rows(), dst.rows());
        debug_assert_eq!(src.cols(), dst.cols());

        let radius = self.config.radius as i32;
        let space_coeff = 0.5 / (self.config.sigma_space * self.config.sigma_space);
        let color_coeff = 0.5 / (self.config.sigma_color * self.config.sigma_color);

        let rows = src.rows() as i32;
        let cols = src.cols() as i32;

        for row in 0..rows {
            for col in 0..cols {
                let center = src.get(row as usize, col as usize);
                if center == 0 {
                    dst.set(row as usize, col as usize, 0);
                    continue;
                }
                let center_f = center as f32;

                let mut weighted_sum = 0.0f32;
                let mut weight_sum = 0.0f32;
                for dy in -radius..=radius {
                    let y = row + dy;
                    if y < 0 || y >= rows {
                        continue;
                    }
                    for dx in -radius..=radius {
                        let x = col + dx;
                        if x < 0 || x >= cols {
                            continue;
                        }
                        let value = src.get(y as usize, x as usize) as f32;
                        let space2 = (dy * dy + dx * dx) as f32;
                        let color = value - center_f;
                        let weight = (-(space2 * space_coeff + color * color * color_coeff)).exp();
                        weighted_sum += value * weight;
                        weight_sum += weight;
                    }
                }

                let filtered = (weighted_sum / weight_sum).round().max(0.0) as u32;
                dst.set(
                    row as usize,
                    col as usize,
                    filtered.min(u16::MAX as u32) as u16,
                );
            }
        }
    }
}
