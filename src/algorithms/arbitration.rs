//! Per-frame selection between the dense alignment and visual odometry.
//!
//! Dense alignment degrades exactly where intensity-based odometry
//! shines (texture-rich but geometrically flat views) and vice versa. The
//! rule is deliberately blunt: compare the translation magnitude of the
//! two candidate increments and defer to odometry only when they disagree
//! by more than the agreement band, on the grounds that a diverging dense
//! solve overshoots its increment long before its pose goes fully wrong.

use serde::{Deserialize, Serialize};

use crate::core::pose::PoseDelta;

/// Arbitration parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ArbitratorConfig {
    /// Agreement band between candidate translation magnitudes, meters.
    /// Default: 0.03
    pub mu: f32,
}

impl Default for ArbitratorConfig {
    fn default() -> Self {
        Self { mu: 0.03 }
    }
}

/// Which estimator produced the increment applied this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoseSource {
    Icp,
    VisualOdometry,
}

/// Stateless increment selector.
#[derive(Debug, Clone, Copy)]
pub struct PoseArbitrator {
    config: ArbitratorConfig,
}

impl PoseArbitrator {
    pub fn new(config: ArbitratorConfig) -> Self {
        Self { config }
    }

    /// Picks the increment to compose onto the previous pose.
    ///
    /// Odometry wins only when the two translation magnitudes differ by
    /// strictly more than the band; ties and small disagreements keep the
    /// dense estimate.
    pub fn select(&self, icp: &PoseDelta, odometry: &PoseDelta) -> PoseSource {
        let icp_norm = icp.translation_norm();
        let odometry_norm = odometry.translation_norm();
        if (odometry_norm - icp_norm).abs() > self.config.mu {
            PoseSource::VisualOdometry
        } else {
            PoseSource::Icp
        }
    }
}
