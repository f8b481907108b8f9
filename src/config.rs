//! File configuration for the tracker.
//!
//! Mirrors [`TrackerConfig`] in a TOML-friendly shape. Every field has a
//! default, so a config file only needs the values it changes:
//!
//! ```toml
//! [camera]
//! fx = 525.0
//! fy = 525.0
//!
//! [volume]
//! size = [4.0, 4.0, 4.0]
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::algorithms::arbitration::ArbitratorConfig;
use crate::algorithms::icp::IcpConfig;
use crate::core::types::CameraIntrinsics;
use crate::engine::tracker::TrackerConfig;
use crate::error::Result;
use crate::sensors::preprocessing::bilateral::BilateralConfig;
use crate::volume::tsdf::VolumeConfig;

/// Top-level tracker configuration as stored on disk.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GhanaConfig {
    #[serde(default)]
    pub camera: CameraSection,
    #[serde(default)]
    pub preprocessing: PreprocessingSection,
    #[serde(default)]
    pub volume: VolumeSection,
    #[serde(default)]
    pub icp: IcpSection,
    #[serde(default)]
    pub tracker: TrackerSection,
    #[serde(default)]
    pub persistence: PersistenceSection,
}

/// Depth camera geometry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CameraSection {
    /// Frame height in pixels (default: 480)
    #[serde(default = "default_rows")]
    pub rows: usize,

    /// Frame width in pixels (default: 640)
    #[serde(default = "default_cols")]
    pub cols: usize,

    /// Horizontal focal length in pixels (default: 575.816)
    #[serde(default = "default_focal")]
    pub fx: f32,

    /// Vertical focal length in pixels (default: 575.816)
    #[serde(default = "default_focal")]
    pub fy: f32,

    /// Principal point column. Negative means frame center (default: -1.0)
    #[serde(default = "default_center")]
    pub cx: f32,

    /// Principal point row. Negative means frame center (default: -1.0)
    #[serde(default = "default_center")]
    pub cy: f32,
}

/// Depth frame cleanup before alignment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PreprocessingSection {
    /// Bilateral filter window radius in pixels (default: 6)
    #[serde(default = "default_bilateral_radius")]
    pub bilateral_radius: usize,

    /// Bilateral spatial sigma in pixels (default: 4.5)
    #[serde(default = "default_bilateral_sigma_space")]
    pub bilateral_sigma_space: f32,

    /// Bilateral depth sigma in millimeters (default: 30.0)
    #[serde(default = "default_bilateral_sigma_color")]
    pub bilateral_sigma_color: f32,

    /// Measurements beyond this range in meters are dropped.
    /// Zero keeps everything (default: 0.0)
    #[serde(default)]
    pub max_depth_range: f32,
}

/// Volumetric window shape.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VolumeSection {
    /// Box edge lengths in meters (default: [3.0, 3.0, 3.0])
    #[serde(default = "default_volume_size")]
    pub size: [f32; 3],

    /// Voxels per axis (default: [128, 128, 128])
    #[serde(default = "default_volume_resolution")]
    pub resolution: [usize; 3],

    /// Truncation distance in meters (default: 0.03)
    #[serde(default = "default_trunc_dist")]
    pub trunc_dist: f32,

    /// Enables the color volume with this fusion weight cap.
    /// Absent means depth only.
    #[serde(default)]
    pub color_max_weight: Option<f32>,
}

/// Alignment parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IcpSection {
    /// Iterations per pyramid level, finest first (default: [10, 5, 4])
    #[serde(default = "default_iterations")]
    pub iterations: Vec<usize>,

    /// Correspondence distance gate in meters (default: 0.10)
    #[serde(default = "default_dist_threshold")]
    pub dist_threshold: f32,

    /// Correspondence normal gate, sine of the maximum deviation
    /// (default: sin 20 degrees)
    #[serde(default = "default_angle_threshold")]
    pub angle_threshold: f32,
}

/// Tracker lifecycle parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackerSection {
    /// Minimum movement score for a frame to be fused (default: 0.0)
    #[serde(default)]
    pub movement_threshold: f32,

    /// Shift target distance as a fraction of the box edge (default: 0.6)
    #[serde(default = "default_shift_trigger_fraction")]
    pub shift_trigger_fraction: f32,

    /// Target distance from window center that triggers a shift, meters
    /// (default: 1.5)
    #[serde(default = "default_shift_distance_threshold")]
    pub shift_distance_threshold: f32,

    /// Agreement band between alignment and odometry translation
    /// magnitudes, meters (default: 0.03)
    #[serde(default = "default_arbitration_band")]
    pub arbitration_band: f32,

    /// Pose history allocation hint (default: 30000)
    #[serde(default = "default_pose_capacity")]
    pub pose_capacity: usize,
}

/// Output locations.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PersistenceSection {
    /// Directory world exports are written to (default: "./output")
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

// Default value functions
fn default_rows() -> usize {
    480
}
fn default_cols() -> usize {
    640
}
fn default_focal() -> f32 {
    575.816
}
fn default_center() -> f32 {
    -1.0
}
fn default_bilateral_radius() -> usize {
    6
}
fn default_bilateral_sigma_space() -> f32 {
    4.5
}
fn default_bilateral_sigma_color() -> f32 {
    30.0
}
fn default_volume_size() -> [f32; 3] {
    [3.0, 3.0, 3.0]
}
fn default_volume_resolution() -> [usize; 3] {
    [128, 128, 128]
}
fn default_trunc_dist() -> f32 {
    0.03
}
fn default_iterations() -> Vec<usize> {
    vec![10, 5, 4]
}
fn default_dist_threshold() -> f32 {
    0.10
}
fn default_angle_threshold() -> f32 {
    (20.0f32.to_radians()).sin()
}
fn default_shift_trigger_fraction() -> f32 {
    0.6
}
fn default_shift_distance_threshold() -> f32 {
    1.5
}
fn default_arbitration_band() -> f32 {
    0.03
}
fn default_pose_capacity() -> usize {
    30000
}
fn default_output_dir() -> String {
    "./output".to_string()
}

impl Default for CameraSection {
    fn default() -> Self {
        Self {
            rows: default_rows(),
            cols: default_cols(),
            fx: default_focal(),
            fy: default_focal(),
            cx: default_center(),
            cy: default_center(),
        }
    }
}

impl Default for PreprocessingSection {
    fn default() -> Self {
        Self {
            bilateral_radius: default_bilateral_radius(),
            bilateral_sigma_space: default_bilateral_sigma_space(),
            bilateral_sigma_color: default_bilateral_sigma_color(),
            max_depth_range: 0.0,
        }
    }
}

impl Default for VolumeSection {
    fn default() -> Self {
        Self {
            size: default_volume_size(),
            resolution: default_volume_resolution(),
            trunc_dist: default_trunc_dist(),
            color_max_weight: None,
        }
    }
}

impl Default for IcpSection {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            dist_threshold: default_dist_threshold(),
            angle_threshold: default_angle_threshold(),
        }
    }
}

impl Default for TrackerSection {
    fn default() -> Self {
        Self {
            movement_threshold: 0.0,
            shift_trigger_fraction: default_shift_trigger_fraction(),
            shift_distance_threshold: default_shift_distance_threshold(),
            arbitration_band: default_arbitration_band(),
            pose_capacity: default_pose_capacity(),
        }
    }
}

impl Default for PersistenceSection {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

impl GhanaConfig {
    /// Loads configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Renders the configuration as TOML text.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Writes the configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Resolves the file shape into a runtime [`TrackerConfig`].
    pub fn to_tracker_config(&self) -> TrackerConfig {
        let intrinsics = if self.camera.cx < 0.0 || self.camera.cy < 0.0 {
            CameraIntrinsics::centered(
                self.camera.fx,
                self.camera.fy,
                self.camera.rows,
                self.camera.cols,
            )
        } else {
            CameraIntrinsics::new(self.camera.fx, self.camera.fy, self.camera.cx, self.camera.cy)
        };
        TrackerConfig {
            rows: self.camera.rows,
            cols: self.camera.cols,
            intrinsics,
            volume: VolumeConfig {
                size: self.volume.size,
                resolution: self.volume.resolution,
                trunc_dist: self.volume.trunc_dist,
            },
            icp: IcpConfig {
                iterations: self.icp.iterations.clone(),
                dist_threshold: self.icp.dist_threshold,
                angle_threshold: self.icp.angle_threshold,
            },
            bilateral: BilateralConfig {
                radius: self.preprocessing.bilateral_radius,
                sigma_space: self.preprocessing.bilateral_sigma_space,
                sigma_color: self.preprocessing.bilateral_sigma_color,
            },
            max_depth_range: self.preprocessing.max_depth_range,
            movement_threshold: self.tracker.movement_threshold,
            shift_trigger_fraction: self.tracker.shift_trigger_fraction,
            shift_distance_threshold: self.tracker.shift_distance_threshold,
            arbitration: ArbitratorConfig {
                mu: self.tracker.arbitration_band,
            },
            initial_pose: None,
            color_max_weight: self.volume.color_max_weight,
            pose_capacity: self.tracker.pose_capacity,
            output_dir: PathBuf::from(&self.persistence.output_dir),
        }
    }
}
