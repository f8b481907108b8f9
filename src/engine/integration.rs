//! Volume-side frame handling: gated fusion, window shifts, prediction.
//!
//! After the tracker settles a pose, the controller runs the fixed
//! per-frame sequence:
//! ```text
//!   1. movement gate: fuse the depth frame only if the camera moved
//!   2. shift check: slide the window when the camera outruns it
//!   3. raycast the finest prediction level at the (possibly new) origin
//!   4. re-express the prediction in the world frame, downsample coarser
//!      levels
//!   5. fuse color through the fresh prediction, when configured
//!   6. in last-scan mode, a shift also exports the world model
//! ```
//! The movement gate keeps a stationary camera from endlessly re-fusing
//! the same measurement noise into the distance field.

use std::path::PathBuf;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::core::math::rotation_angle;
use crate::core::pose::Pose;
use crate::core::types::CameraIntrinsics;
use crate::error::Result;
use crate::io::cloud;
use crate::sensors::frame::{ColorFrame, DepthFrame};
use crate::sensors::preprocessing::pyramid::{
    resize_normal_map, resize_vertex_map, translate_map, PredictionPyramid,
};
use crate::volume::color::ColorVolume;
use crate::volume::cyclical::CyclicalBuffer;
use crate::volume::raycast::Raycaster;
use crate::volume::tsdf::{TsdfVolume, VolumeConfig};
use crate::volume::world::WorldModel;

/// Controller parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationConfig {
    /// Minimum movement score for a frame to be fused. Zero fuses every
    /// frame. Default: 0.0
    pub movement_threshold: f32,
    /// The watched shift target sits this fraction of the box edge ahead
    /// of the camera. Default: 0.6
    pub shift_trigger_fraction: f32,
    /// Distance between target and window center that triggers a shift,
    /// meters. Default: 1.5
    pub shift_distance_threshold: f32,
    /// Directory world exports are written to. Default: "./output"
    pub output_dir: PathBuf,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            movement_threshold: 0.0,
            shift_trigger_fraction: 0.6,
            shift_distance_threshold: 1.5,
            output_dir: PathBuf::from("./output"),
        }
    }
}

/// What the controller did with one frame.
#[derive(Debug, Clone)]
pub struct IntegrationOutcome {
    /// The depth frame was fused into the distance field.
    pub integrated: bool,
    /// The window shifted this frame.
    pub shifted: bool,
    /// A world export was written (last-scan shift only).
    pub exported: Option<PathBuf>,
}

/// Owns the fused volumes and the per-frame volume pipeline.
pub struct IntegrationController {
    config: IntegrationConfig,
    intrinsics: CameraIntrinsics,
    tsdf: TsdfVolume,
    color: Option<ColorVolume>,
    cyclical: CyclicalBuffer,
    world: WorldModel,
    raycaster: Raycaster,
}

impl IntegrationController {
    pub fn new(
        config: IntegrationConfig,
        volume: &VolumeConfig,
        intrinsics: CameraIntrinsics,
        rows: usize,
        cols: usize,
        color_max_weight: Option<f32>,
    ) -> Self {
        let cyclical = CyclicalBuffer::new(config.shift_distance_threshold);
        Self {
            config,
            intrinsics,
            tsdf: TsdfVolume::new(volume),
            color: color_max_weight.map(|w| ColorVolume::new(volume, w)),
            cyclical,
            world: WorldModel::new(),
            raycaster: Raycaster::new(rows, cols, intrinsics),
        }
    }

    /// Combined camera movement between two poses: the mean of the
    /// relative rotation angle (radians) and the translation distance
    /// (meters).
    pub fn movement_score(previous: &Pose, current: &Pose) -> f32 {
        let relative = current.rotation * previous.rotation.transpose();
        let rotation = rotation_angle(&relative);
        let translation = (current.translation - previous.translation).norm();
        (rotation + translation) * 0.5
    }

    #[inline]
    pub fn origin(&self) -> Vector3<f32> {
        self.cyclical.origin()
    }

    #[inline]
    pub fn tsdf(&self) -> &TsdfVolume {
        &self.tsdf
    }

    #[inline]
    pub fn world(&self) -> &WorldModel {
        &self.world
    }

    #[inline]
    pub fn color(&self) -> Option<&ColorVolume> {
        self.color.as_ref()
    }

    /// Fuses the frame when the camera moved at least the configured
    /// score since the previous pose. Returns whether fusion happened.
    pub fn integrate_if_moved(
        &mut self,
        depth: &DepthFrame,
        previous: &Pose,
        current: &Pose,
    ) -> bool {
        let score = Self::movement_score(previous, current);
        let integrate = score >= self.config.movement_threshold;
        log::debug!(
            "movement score {:.5} (threshold {:.5}): {}",
            score,
            self.config.movement_threshold,
            if integrate { "fusing" } else { "skipping fusion" }
        );
        if integrate {
            let local = current.to_local(self.cyclical.origin());
            self.tsdf.integrate(depth, &self.intrinsics, &local);
        }
        integrate
    }

    /// Runs the full volume-side sequence for one settled pose.
    pub fn run(
        &mut self,
        depth: &DepthFrame,
        color_frame: Option<&ColorFrame>,
        prediction: &mut PredictionPyramid,
        previous: &Pose,
        current: &Pose,
        last_scan: bool,
    ) -> Result<IntegrationOutcome> {
        let integrated = self.integrate_if_moved(depth, previous, current);

        let target_distance = self.config.shift_trigger_fraction * self.tsdf.size().x;
        let shifted = self.cyclical.check_for_shift(
            &mut self.tsdf,
            self.color.as_mut(),
            &mut self.world,
            current,
            target_distance,
            last_scan,
        );

        // Origin may have moved; everything below works against the new
        // window.
        let origin = self.cyclical.origin();
        let local = current.to_local(origin);
        self.raycaster.raycast(
            &self.tsdf,
            &local,
            &mut prediction.vertices[0],
            &mut prediction.normals[0],
        );
        translate_map(&mut prediction.vertices[0], origin);
        for level in 1..prediction.levels() {
            let (finer, coarser) = prediction.vertices.split_at_mut(level);
            resize_vertex_map(&finer[level - 1], &mut coarser[0]);
            let (finer, coarser) = prediction.normals.split_at_mut(level);
            resize_normal_map(&finer[level - 1], &mut coarser[0]);
        }

        if let (Some(volume), Some(frame)) = (self.color.as_mut(), color_frame) {
            volume.integrate(frame, &prediction.vertices[0], origin);
        }

        let exported = if shifted && last_scan {
            self.export_world()?
        } else {
            None
        };

        Ok(IntegrationOutcome {
            integrated,
            shifted,
            exported,
        })
    }

    /// Writes the accumulated world model to the configured directory.
    ///
    /// An empty model is not an error; it logs a warning and writes
    /// nothing, since exporting zero points helps nobody downstream.
    pub fn export_world(&self) -> Result<Option<PathBuf>> {
        if self.world.is_empty() {
            log::warn!("world model is empty, skipping export");
            return Ok(None);
        }
        cloud::write_world(&self.world, &self.config.output_dir).map(Some)
    }

    /// Clears volumes, window origin and the world model.
    pub fn reset(&mut self) {
        self.tsdf.reset();
        if let Some(color) = self.color.as_mut() {
            color.reset();
        }
        self.cyclical.reset();
        self.world.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Matrix3;

    const ROWS: usize = 60;
    const COLS: usize = 80;

    fn test_intrinsics() -> CameraIntrinsics {
        CameraIntrinsics::centered(70.0, 70.0, ROWS, COLS)
    }

    fn small_volume() -> VolumeConfig {
        VolumeConfig {
            size: [1.5, 1.5, 1.5],
            resolution: [48, 48, 48],
            trunc_dist: 0.06,
        }
    }

    fn controller(threshold: f32) -> IntegrationController {
        let config = IntegrationConfig {
            movement_threshold: threshold,
            ..IntegrationConfig::default()
        };
        IntegrationController::new(config, &small_volume(), test_intrinsics(), ROWS, COLS, None)
    }

    fn test_camera() -> Pose {
        Pose::new(Matrix3::identity(), Vector3::new(0.75, 0.75, -0.3))
    }

    fn wall_depth() -> DepthFrame {
        let mut frame = DepthFrame::empty(ROWS, COLS);
        for r in 0..ROWS {
            for c in 0..COLS {
                frame.set(r, c, 1300);
            }
        }
        frame
    }

    #[test]
    fn test_movement_score_stationary() {
        let pose = test_camera();
        assert_relative_eq!(IntegrationController::movement_score(&pose, &pose), 0.0);
    }

    #[test]
    fn test_movement_score_translation() {
        let a = Pose::identity();
        let b = Pose::new(Matrix3::identity(), Vector3::new(0.06, 0.0, 0.0));
        assert_relative_eq!(
            IntegrationController::movement_score(&a, &b),
            0.03,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_movement_score_rotation() {
        let a = Pose::identity();
        let b = Pose::new(
            crate::core::math::increment_rotation(0.0, 0.0, 0.1),
            Vector3::zeros(),
        );
        assert_relative_eq!(
            IntegrationController::movement_score(&a, &b),
            0.05,
            epsilon = 1e-5
        );
    }

    #[test]
    fn test_gate_blocks_fusion() {
        let mut blocked = controller(10.0);
        let pose = test_camera();
        assert!(!blocked.integrate_if_moved(&wall_depth(), &pose, &pose));
        assert_relative_eq!(blocked.tsdf().total_weight(), 0.0);

        let mut open = controller(0.0);
        assert!(open.integrate_if_moved(&wall_depth(), &pose, &pose));
        assert!(open.tsdf().total_weight() > 0.0);
    }

    #[test]
    fn test_run_produces_world_frame_prediction() {
        let mut ctl = controller(0.0);
        let pose = test_camera();
        let mut prediction = PredictionPyramid::allocate(ROWS, COLS, 3);

        let outcome = ctl
            .run(&wall_depth(), None, &mut prediction, &pose, &pose, false)
            .expect("run succeeds");

        assert!(outcome.integrated);
        assert!(!outcome.shifted);
        assert!(outcome.exported.is_none());

        // Finest level sees the wall near world z = 1.0.
        assert!(prediction.vertices[0].valid_count() > 0);
        let center = prediction.vertices[0].get(ROWS / 2, COLS / 2);
        assert_relative_eq!(center.z, 1.0, epsilon = 0.05);

        // Coarser levels are populated from the finest.
        assert!(prediction.vertices[1].valid_count() > 0);
        assert!(prediction.vertices[2].valid_count() > 0);
        assert!(prediction.normals[2].valid_count() > 0);
    }

    #[test]
    fn test_reset_clears_all_state() {
        let mut ctl = controller(0.0);
        let pose = test_camera();
        let mut prediction = PredictionPyramid::allocate(ROWS, COLS, 3);
        ctl.run(&wall_depth(), None, &mut prediction, &pose, &pose, false)
            .expect("run succeeds");
        assert!(ctl.tsdf().total_weight() > 0.0);

        ctl.reset();
        assert_relative_eq!(ctl.tsdf().total_weight(), 0.0);
        assert_relative_eq!(ctl.origin().norm(), 0.0);
        assert!(ctl.world().is_empty());
    }

    #[test]
    fn test_empty_world_export_skipped() {
        let ctl = controller(0.0);
        let exported = ctl.export_world().expect("no I/O failure");
        assert!(exported.is_none());
    }
}
