//! Volumetric fusion: the distance field, its companions and the
//! shifting window that carries them through space.
//!
//! Contents:
//! - [`tsdf`]: truncated signed distance volume with cyclic addressing
//! - [`color`]: optional per-voxel color averaging
//! - [`cyclical`]: window-shift detection, extraction and origin tracking
//! - [`raycast`]: surface prediction by ray marching
//! - [`world`]: the append-only store for extracted out-of-window surface
//!
//! All volume memory works in the window frame; poses are re-expressed at
//! the boundary and never stored here.

pub mod color;
pub mod cyclical;
pub mod raycast;
pub mod tsdf;
pub mod world;

pub use color::ColorVolume;
pub use cyclical::CyclicalBuffer;
pub use raycast::Raycaster;
pub use tsdf::{TsdfVolume, VolumeConfig};
pub use world::{IntensityPoint, WorldModel};
