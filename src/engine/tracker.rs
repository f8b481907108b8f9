//! The frame-to-model tracker tying every stage together.
//!
//! One [`GhanaTracker`] call moves a depth frame through the whole
//! pipeline:
//! ```text
//!   preprocess -> align (icp, optionally arbitrated against visual
//!   odometry) -> gate -> fuse -> shift window -> raycast prediction
//! ```
//! The first frame bootstraps instead of aligning: it is fused at the
//! starting pose and its own measurements become the first prediction.
//!
//! Tracking failures never escape as errors. A frame whose alignment
//! cannot be settled resets the tracker and reports `Ok(false)`; the
//! caller decides whether to keep feeding frames. Errors are reserved
//! for misuse, such as mismatched frame dimensions.

use std::path::PathBuf;
use std::time::Instant;

use nalgebra::{Matrix3, Vector3};

use crate::algorithms::arbitration::{ArbitratorConfig, PoseArbitrator, PoseSource};
use crate::algorithms::icp::{IcpConfig, IcpEstimator};
use crate::core::pose::Pose;
use crate::core::types::{CameraIntrinsics, PointMap};
use crate::engine::integration::{IntegrationConfig, IntegrationController};
use crate::engine::workspace::TrackerWorkspace;
use crate::error::{Result, TrackerError};
use crate::sensors::frame::{ColorFrame, DepthFrame};
use crate::sensors::odometry::{VisualOdometer, VoAdapter};
use crate::sensors::preprocessing::bilateral::BilateralConfig;
use crate::sensors::preprocessing::pyramid::{
    transform_maps, FramePreprocessor, PreprocessorConfig,
};
use crate::volume::color::ColorVolume;
use crate::volume::tsdf::{TsdfVolume, VolumeConfig};
use crate::volume::world::WorldModel;

/// How the tracker settles each frame's pose.
pub enum PoseStrategy {
    /// Depth alignment alone.
    IcpOnly,
    /// Depth alignment arbitrated against an external visual odometer.
    Hybrid(Box<dyn VisualOdometer>),
}

/// Where the tracker is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    /// No frame processed yet; the next frame seeds the model.
    Bootstrap,
    /// Frames are aligned against the fused model.
    Tracking,
}

/// Full tracker configuration.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Depth frame height in pixels. Default: 480
    pub rows: usize,
    /// Depth frame width in pixels. Default: 640
    pub cols: usize,
    /// Depth camera intrinsics at the finest level.
    pub intrinsics: CameraIntrinsics,
    pub volume: VolumeConfig,
    pub icp: IcpConfig,
    pub bilateral: BilateralConfig,
    /// Depth measurements beyond this range (meters) are dropped before
    /// alignment. Zero keeps everything. Default: 0.0
    pub max_depth_range: f32,
    /// Minimum movement score between consecutive poses for a frame to
    /// be fused. Default: 0.0
    pub movement_threshold: f32,
    /// The shift target sits this fraction of the box edge ahead of the
    /// camera. Default: 0.6
    pub shift_trigger_fraction: f32,
    /// Target distance from the window center that triggers a shift,
    /// meters. Default: 1.5
    pub shift_distance_threshold: f32,
    pub arbitration: ArbitratorConfig,
    /// Starting camera pose. `None` centers the camera on the box front
    /// face, pulled back along -z.
    pub initial_pose: Option<Pose>,
    /// Enables the color volume with this fusion weight cap. Default:
    /// `None` (depth only)
    pub color_max_weight: Option<f32>,
    /// Pose history allocation hint. Default: 30000
    pub pose_capacity: usize,
    /// Directory world exports are written to. Default: "./output"
    pub output_dir: PathBuf,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            rows: 480,
            cols: 640,
            intrinsics: CameraIntrinsics::centered(575.816, 575.816, 480, 640),
            volume: VolumeConfig::default(),
            icp: IcpConfig::default(),
            bilateral: BilateralConfig::default(),
            max_depth_range: 0.0,
            movement_threshold: 0.0,
            shift_trigger_fraction: 0.6,
            shift_distance_threshold: 1.5,
            arbitration: ArbitratorConfig::default(),
            initial_pose: None,
            color_max_weight: None,
            pose_capacity: 30000,
            output_dir: PathBuf::from("./output"),
        }
    }
}

/// Camera centered on the box front face, pulled back so the box fills
/// the view.
fn default_initial_pose(volume: &VolumeConfig) -> Pose {
    let translation = Vector3::new(
        volume.size[0] * 0.5,
        volume.size[1] * 0.5,
        volume.size[2] * 0.5 - volume.size[2] * 0.6,
    );
    Pose::new(Matrix3::identity(), translation)
}

/// Dense frame-to-model tracker over a moving volumetric window.
pub struct GhanaTracker {
    rows: usize,
    cols: usize,
    initial_pose: Pose,
    preprocessor: FramePreprocessor,
    estimator: IcpEstimator,
    arbitrator: PoseArbitrator,
    strategy: PoseStrategy,
    adapter: VoAdapter,
    volumes: IntegrationController,
    workspace: TrackerWorkspace,
    poses: Vec<Pose>,
    frame_index: usize,
    last_scan: bool,
    finished: bool,
}

impl GhanaTracker {
    /// Depth-only tracker.
    pub fn new(config: TrackerConfig) -> Self {
        Self::build(config, PoseStrategy::IcpOnly)
    }

    /// Tracker that arbitrates depth alignment against `odometer` every
    /// frame. Requires [`process_frame_with_color`].
    ///
    /// [`process_frame_with_color`]: GhanaTracker::process_frame_with_color
    pub fn with_visual_odometry(config: TrackerConfig, odometer: Box<dyn VisualOdometer>) -> Self {
        Self::build(config, PoseStrategy::Hybrid(odometer))
    }

    fn build(config: TrackerConfig, strategy: PoseStrategy) -> Self {
        let levels = config.icp.iterations.len();
        let initial_pose = config
            .initial_pose
            .unwrap_or_else(|| default_initial_pose(&config.volume));
        let preprocessor = FramePreprocessor::new(
            PreprocessorConfig {
                levels,
                bilateral: config.bilateral,
                max_depth_range: config.max_depth_range,
            },
            config.intrinsics,
        );
        let volumes = IntegrationController::new(
            IntegrationConfig {
                movement_threshold: config.movement_threshold,
                shift_trigger_fraction: config.shift_trigger_fraction,
                shift_distance_threshold: config.shift_distance_threshold,
                output_dir: config.output_dir,
            },
            &config.volume,
            config.intrinsics,
            config.rows,
            config.cols,
            config.color_max_weight,
        );
        let mut poses = Vec::with_capacity(config.pose_capacity);
        poses.push(initial_pose);
        Self {
            rows: config.rows,
            cols: config.cols,
            initial_pose,
            preprocessor,
            estimator: IcpEstimator::new(config.icp, config.intrinsics),
            arbitrator: PoseArbitrator::new(config.arbitration),
            strategy,
            adapter: VoAdapter::new(config.rows, config.cols),
            volumes,
            workspace: TrackerWorkspace::allocate(config.rows, config.cols, levels),
            poses,
            frame_index: 0,
            last_scan: false,
            finished: false,
        }
    }

    /// Tracks one depth frame. Returns whether the frame was tracked;
    /// `Ok(false)` means tracking was lost and the model restarted.
    pub fn process_frame(&mut self, depth: &DepthFrame) -> Result<bool> {
        if matches!(self.strategy, PoseStrategy::Hybrid(_)) {
            return Err(TrackerError::Config(
                "hybrid tracking needs color frames, use process_frame_with_color".into(),
            ));
        }
        self.track(depth, None)
    }

    /// Tracks one depth frame with its registered color frame. Color
    /// drives visual odometry under the hybrid strategy and color
    /// fusion when a color volume is configured.
    pub fn process_frame_with_color(
        &mut self,
        depth: &DepthFrame,
        color: &ColorFrame,
    ) -> Result<bool> {
        self.track(depth, Some(color))
    }

    fn track(&mut self, depth: &DepthFrame, color: Option<&ColorFrame>) -> Result<bool> {
        if depth.rows() != self.rows || depth.cols() != self.cols {
            return Err(TrackerError::Config(format!(
                "depth frame is {}x{}, tracker expects {}x{}",
                depth.rows(),
                depth.cols(),
                self.rows,
                self.cols
            )));
        }
        if let Some(frame) = color {
            if frame.rows() != self.rows || frame.cols() != self.cols {
                return Err(TrackerError::Config(format!(
                    "color frame is {}x{}, tracker expects {}x{}",
                    frame.rows(),
                    frame.cols(),
                    self.rows,
                    self.cols
                )));
            }
        }

        let started = Instant::now();
        let frame = self.frame_index;
        self.preprocessor.process(depth, &mut self.workspace.current);
        let tracked = if frame == 0 {
            self.bootstrap(depth, color)?
        } else {
            self.track_frame(depth, color)?
        };
        log::debug!("frame {} handled in {:?}", frame, started.elapsed());
        Ok(tracked)
    }

    /// First frame: fuse at the starting pose and promote the measured
    /// maps to the first prediction. No alignment happens.
    fn bootstrap(&mut self, depth: &DepthFrame, color: Option<&ColorFrame>) -> Result<bool> {
        let pose = self.initial_pose;
        self.volumes.integrate_if_moved(depth, &pose, &pose);
        for level in 0..self.workspace.current.levels() {
            transform_maps(
                &self.workspace.current.vertices[level],
                &self.workspace.current.normals[level],
                &pose,
                &mut self.workspace.prediction.vertices[level],
                &mut self.workspace.prediction.normals[level],
            );
        }

        // The odometer sees every frame, including this one, so its own
        // history starts where ours does.
        if let (PoseStrategy::Hybrid(odometer), Some(frame)) = (&mut self.strategy, color) {
            if let Err(err) = self.adapter.estimate(odometer.as_mut(), depth, frame) {
                log::warn!("visual odometry screened out on the first frame: {err}");
            }
        }

        self.poses.push(pose);
        self.frame_index = 1;
        Ok(true)
    }

    fn track_frame(&mut self, depth: &DepthFrame, color: Option<&ColorFrame>) -> Result<bool> {
        let previous = self.poses.last().copied().unwrap_or(self.initial_pose);

        let icp = self.estimator.estimate(
            &self.workspace.current,
            &self.workspace.prediction,
            &previous,
        );
        let odometry = match (&mut self.strategy, color) {
            (PoseStrategy::Hybrid(odometer), Some(frame)) => {
                Some(self.adapter.estimate(odometer.as_mut(), depth, frame))
            }
            _ => None,
        };

        let pose = match (icp, odometry) {
            (Ok(estimate), None) => estimate.pose,
            (Ok(estimate), Some(Ok(delta))) => {
                match self.arbitrator.select(&estimate.delta, &delta) {
                    PoseSource::Icp => estimate.pose,
                    PoseSource::VisualOdometry => {
                        log::debug!(
                            "frame {}: visual odometry wins arbitration (icp {:.4} m, odometry {:.4} m)",
                            self.frame_index,
                            estimate.delta.translation_norm(),
                            delta.translation_norm()
                        );
                        previous.compose_increment(&delta)
                    }
                }
            }
            (Ok(estimate), Some(Err(err))) => {
                log::warn!(
                    "frame {}: visual odometry screened out: {err}",
                    self.frame_index
                );
                estimate.pose
            }
            (Err(err), Some(Ok(delta))) => {
                log::warn!(
                    "frame {}: alignment lost ({err}), falling back to visual odometry",
                    self.frame_index
                );
                previous.compose_increment(&delta)
            }
            (Err(icp_err), Some(Err(odo_err))) => {
                log::error!(
                    "frame {}: alignment lost ({icp_err}) and visual odometry invalid ({odo_err}), restarting",
                    self.frame_index
                );
                self.reset();
                return Ok(false);
            }
            (Err(err), None) => {
                log::warn!(
                    "frame {}: alignment lost ({err}), restarting",
                    self.frame_index
                );
                self.reset();
                return Ok(false);
            }
        };

        self.poses.push(pose);
        let outcome = self.volumes.run(
            depth,
            color,
            &mut self.workspace.prediction,
            &previous,
            &pose,
            self.last_scan,
        )?;
        if outcome.shifted && self.last_scan {
            self.finished = true;
            if let Some(path) = &outcome.exported {
                log::info!("final scan complete, world written to {}", path.display());
            }
        }
        self.frame_index += 1;
        Ok(true)
    }

    /// Restarts tracking from the initial pose with empty volumes. A
    /// completed last scan stays completed across restarts.
    pub fn reset(&mut self) {
        if self.frame_index > 0 {
            log::warn!("tracker reset after {} frames", self.frame_index);
        }
        self.frame_index = 0;
        self.poses.clear();
        self.poses.push(self.initial_pose);
        self.volumes.reset();
        self.workspace.prediction.fill_invalid();
    }

    /// Replaces the starting pose and restarts tracking from it.
    pub fn set_initial_pose(&mut self, pose: Pose) {
        self.initial_pose = pose;
        self.reset();
    }

    /// Arms last-scan mode: the next window shift sweeps the whole
    /// window into the world model and exports it.
    pub fn perform_last_scan(&mut self) {
        log::info!("last scan requested, next window shift exports the world");
        self.last_scan = true;
    }

    /// Whether a last scan has completed. Stays set once reached.
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    #[inline]
    pub fn state(&self) -> TrackerState {
        if self.frame_index == 0 {
            TrackerState::Bootstrap
        } else {
            TrackerState::Tracking
        }
    }

    /// Frames processed since the last restart.
    #[inline]
    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    /// Length of the pose history, including the seeded starting pose.
    #[inline]
    pub fn pose_count(&self) -> usize {
        self.poses.len()
    }

    /// Pose at `index` in the history, oldest first.
    pub fn camera_pose(&self, index: usize) -> Option<Pose> {
        self.poses.get(index).copied()
    }

    /// Most recent camera pose.
    pub fn last_camera_pose(&self) -> Pose {
        self.poses.last().copied().unwrap_or(self.initial_pose)
    }

    /// World position of the volumetric window's minimum corner.
    #[inline]
    pub fn window_origin(&self) -> Vector3<f32> {
        self.volumes.origin()
    }

    #[inline]
    pub fn tsdf(&self) -> &TsdfVolume {
        self.volumes.tsdf()
    }

    #[inline]
    pub fn color_volume(&self) -> Option<&ColorVolume> {
        self.volumes.color()
    }

    #[inline]
    pub fn world_model(&self) -> &WorldModel {
        self.volumes.world()
    }

    /// Finest-level predicted vertex and normal maps from the last
    /// tracked frame, in world coordinates.
    pub fn last_prediction(&self) -> (&PointMap, &PointMap) {
        (
            &self.workspace.prediction.vertices[0],
            &self.workspace.prediction.normals[0],
        )
    }

    /// Writes the accumulated world model to the configured directory.
    /// Returns the written path, or `None` when the model is empty.
    pub fn extract_world(&self) -> Result<Option<PathBuf>> {
        self.volumes.export_world()
    }
}
