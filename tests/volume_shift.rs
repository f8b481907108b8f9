//! Window shifts, world sweeping and last-scan export.

mod common;

use std::fs;

use ghana_slam::{GhanaTracker, Pose, WORLD_FILE_NAME};
use nalgebra::Vector3;

use common::*;

const STEP: f32 = 0.5;

fn camera_at(frame: usize) -> Pose {
    let mut pose = initial_pose();
    pose.translation.z += STEP * frame as f32;
    pose
}

/// Walks the camera down the corridor, one tracked frame per step. The
/// scripted odometer mirrors the true motion, so each 0.5 m jump lands
/// on the odometry estimate regardless of what alignment makes of it.
fn walking_tracker(tag: &str) -> (GhanaTracker, std::path::PathBuf) {
    let mut config = small_tracker_config();
    config.shift_distance_threshold = 0.6;
    config.output_dir = temp_dir(tag);
    let output_dir = config.output_dir.clone();
    let odometer = ScriptedOdometer::walking(Vector3::new(0.0, 0.0, STEP), 8);
    (
        GhanaTracker::with_visual_odometry(config, Box::new(odometer)),
        output_dir,
    )
}

#[test]
fn test_walking_camera_shifts_window_and_sweeps_world() {
    let planes = corridor_planes();
    let color = uniform_color([90, 90, 90]);
    let (mut tracker, output_dir) = walking_tracker("sweep");

    let depth = render_depth(&planes, &camera_at(0), &test_intrinsics());
    assert!(tracker.process_frame_with_color(&depth, &color).expect("no misuse"));
    assert_eq!(tracker.window_origin(), Vector3::zeros());

    // Step 1 keeps the shift target within reach; step 2 puts it 1.0 m
    // from the window center and drags the window forward.
    let depth = render_depth(&planes, &camera_at(1), &test_intrinsics());
    assert!(tracker.process_frame_with_color(&depth, &color).expect("no misuse"));
    assert_eq!(tracker.window_origin(), Vector3::zeros());
    assert!(tracker.world_model().is_empty());

    let depth = render_depth(&planes, &camera_at(2), &test_intrinsics());
    assert!(tracker.process_frame_with_color(&depth, &color).expect("no misuse"));
    let origin = tracker.window_origin();
    assert_eq!(origin.x, 0.0);
    assert_eq!(origin.y, 0.0);
    assert!(origin.z > 0.9 && origin.z < 1.1, "origin z = {}", origin.z);

    // Surface behind the new window now lives in the world model.
    assert!(!tracker.world_model().is_empty());
    let behind = tracker
        .world_model()
        .points()
        .iter()
        .filter(|p| p.position.z < origin.z)
        .count();
    assert!(behind > 0, "swept surface should sit behind the window");

    let _ = fs::remove_dir_all(&output_dir);
}

#[test]
fn test_last_scan_exports_world_and_finishes() {
    let planes = corridor_planes();
    let color = uniform_color([90, 90, 90]);
    let (mut tracker, output_dir) = walking_tracker("export");

    for frame in 0..=2 {
        let depth = render_depth(&planes, &camera_at(frame), &test_intrinsics());
        assert!(tracker.process_frame_with_color(&depth, &color).expect("no misuse"));
    }
    assert!(!tracker.is_finished());

    // Arm the last scan; the next shift (two steps later) sweeps the
    // whole window out and writes the cloud.
    tracker.perform_last_scan();
    for frame in 3..=4 {
        let depth = render_depth(&planes, &camera_at(frame), &test_intrinsics());
        assert!(tracker.process_frame_with_color(&depth, &color).expect("no misuse"));
    }

    assert!(tracker.is_finished());
    let path = output_dir.join(WORLD_FILE_NAME);
    let contents = fs::read_to_string(&path).expect("world cloud written");
    assert!(contents.contains("DATA ascii"));
    assert!(contents.lines().count() > 11, "export should carry points");

    // A finished tracker keeps accepting frames.
    let depth = render_depth(&planes, &camera_at(5), &test_intrinsics());
    assert!(tracker.process_frame_with_color(&depth, &color).expect("no misuse"));
    assert!(tracker.is_finished());
    assert_eq!(tracker.frame_index(), 6);

    // Finished survives an explicit restart.
    tracker.reset();
    assert!(tracker.is_finished());

    let _ = fs::remove_dir_all(&output_dir);
}
