//! Persistence for extracted map data.

pub mod cloud;

pub use cloud::{write_world, WORLD_FILE_NAME};
