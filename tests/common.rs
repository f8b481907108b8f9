//! Shared scenes, trajectories and doubles for the tracker suites.

#![allow(dead_code)]

use std::path::PathBuf;

use ghana_slam::{
    CameraIntrinsics, ColorFrame, DepthFrame, DepthMeters, GrayFrame, Pose, PoseDelta,
    TrackerConfig, VisualOdometer, VolumeConfig,
};
use nalgebra::{Matrix3, Vector3};

pub const ROWS: usize = 60;
pub const COLS: usize = 80;

pub fn test_intrinsics() -> CameraIntrinsics {
    CameraIntrinsics::centered(70.0, 70.0, ROWS, COLS)
}

/// Tracker over a 1.5 m window, sized for the synthetic scenes below.
/// The starting pose is pinned to [`initial_pose`] so tests can reason
/// about exact camera placement.
pub fn small_tracker_config() -> TrackerConfig {
    TrackerConfig {
        rows: ROWS,
        cols: COLS,
        intrinsics: test_intrinsics(),
        volume: VolumeConfig {
            size: [1.5, 1.5, 1.5],
            resolution: [48, 48, 48],
            trunc_dist: 0.06,
        },
        initial_pose: Some(initial_pose()),
        ..TrackerConfig::default()
    }
}

/// Starting pose for the small window: centered, pulled back 0.15 m
/// behind the front face.
pub fn initial_pose() -> Pose {
    Pose::new(Matrix3::identity(), Vector3::new(0.75, 0.75, -0.15))
}

/// A plane as unit normal and offset: points p with n . p = d.
pub type Plane = (Vector3<f32>, f32);

/// Three tilted planes forming a concave corner around `center`. The
/// scene constrains all six motion directions.
pub fn corner_planes(center: Vector3<f32>) -> Vec<Plane> {
    [
        (Vector3::new(0.4, 0.1, 1.0), 0.00),
        (Vector3::new(-0.4, -0.1, 1.0), 0.05),
        (Vector3::new(0.1, -0.4, 1.0), -0.05),
    ]
    .iter()
    .map(|(normal, offset)| {
        let n = normal.normalize();
        (n, n.dot(&center) + offset)
    })
    .collect()
}

/// Axis-aligned corridor along +z around x = y = 0.75, with a far cap.
/// Stays visible however far the camera walks forward.
pub fn corridor_planes() -> Vec<Plane> {
    vec![
        (Vector3::new(1.0, 0.0, 0.0), 0.3),
        (Vector3::new(-1.0, 0.0, 0.0), -1.2),
        (Vector3::new(0.0, 1.0, 0.0), 0.3),
        (Vector3::new(0.0, -1.0, 0.0), -1.2),
        (Vector3::new(0.0, 0.0, 1.0), 6.0),
    ]
}

/// Renders the plane set from a camera pose, nearest positive hit wins.
pub fn render_depth(planes: &[Plane], pose: &Pose, intr: &CameraIntrinsics) -> DepthFrame {
    let mut frame = DepthFrame::empty(ROWS, COLS);
    for r in 0..ROWS {
        for c in 0..COLS {
            let dir = Vector3::new(
                (c as f32 - intr.cx) / intr.fx,
                (r as f32 - intr.cy) / intr.fy,
                1.0,
            );
            let dir_world = pose.rotate(&dir);
            let mut best = f32::INFINITY;
            for (n, d) in planes {
                let denom = n.dot(&dir_world);
                if denom.abs() < 1e-6 {
                    continue;
                }
                let depth = (d - n.dot(&pose.translation)) / denom;
                if depth > 0.1 && depth < best {
                    best = depth;
                }
            }
            let millimeters = best * 1000.0;
            if millimeters.is_finite() && millimeters < 65000.0 {
                frame.set(r, c, millimeters.round() as u16);
            }
        }
    }
    frame
}

/// Constant-depth frame: a flat wall facing the camera. Degenerate for
/// alignment, handy for fusion tests.
pub fn wall_depth(millimeters: u16) -> DepthFrame {
    let mut frame = DepthFrame::empty(ROWS, COLS);
    for r in 0..ROWS {
        for c in 0..COLS {
            frame.set(r, c, millimeters);
        }
    }
    frame
}

pub fn uniform_color(rgb: [u8; 3]) -> ColorFrame {
    let mut frame = ColorFrame::empty(ROWS, COLS);
    for r in 0..ROWS {
        for c in 0..COLS {
            frame.set(r, c, rgb);
        }
    }
    frame
}

/// Odometer double replaying a scripted list of per-frame increments.
/// Increments past the end of the script are identity.
pub struct ScriptedOdometer {
    deltas: Vec<PoseDelta>,
    pose: Pose,
    current: PoseDelta,
    calls: usize,
}

impl ScriptedOdometer {
    pub fn new(deltas: Vec<PoseDelta>) -> Self {
        Self {
            deltas,
            pose: Pose::identity(),
            current: PoseDelta::identity(),
            calls: 0,
        }
    }

    /// Identity on the first call, then `step` on each of the next
    /// `frames` calls.
    pub fn walking(step: Vector3<f32>, frames: usize) -> Self {
        let mut deltas = vec![PoseDelta::identity()];
        for _ in 0..frames {
            deltas.push(PoseDelta::new(Matrix3::identity(), step));
        }
        Self::new(deltas)
    }
}

impl VisualOdometer for ScriptedOdometer {
    fn track(&mut self, _gray: &GrayFrame, _depth: &DepthMeters) {
        self.current = self
            .deltas
            .get(self.calls)
            .copied()
            .unwrap_or_else(PoseDelta::identity);
        self.pose = self.pose.compose_increment(&self.current);
        self.calls += 1;
    }

    fn pose(&self) -> Pose {
        self.pose
    }

    fn delta(&self) -> PoseDelta {
        self.current
    }
}

/// Fresh per-process scratch directory for export tests.
pub fn temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("ghana-slam-it-{tag}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}
