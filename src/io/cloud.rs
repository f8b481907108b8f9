//! Point-cloud export for the accumulated world model.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::volume::world::WorldModel;

/// File name used for the exported world cloud.
pub const WORLD_FILE_NAME: &str = "world.pcd";

/// Writes the world model as an ASCII PCD cloud of `x y z intensity`
/// points into `dir`, creating the directory when needed. Returns the
/// path of the written file.
pub fn write_world(world: &WorldModel, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(WORLD_FILE_NAME);
    let mut out = BufWriter::new(fs::File::create(&path)?);

    let count = world.len();
    writeln!(out, "# .PCD v0.7 - Point Cloud Data file format")?;
    writeln!(out, "VERSION 0.7")?;
    writeln!(out, "FIELDS x y z intensity")?;
    writeln!(out, "SIZE 4 4 4 4")?;
    writeln!(out, "TYPE F F F F")?;
    writeln!(out, "COUNT 1 1 1 1")?;
    writeln!(out, "WIDTH {count}")?;
    writeln!(out, "HEIGHT 1")?;
    writeln!(out, "VIEWPOINT 0 0 0 1 0 0 0")?;
    writeln!(out, "POINTS {count}")?;
    writeln!(out, "DATA ascii")?;
    for point in world.points() {
        writeln!(
            out,
            "{} {} {} {}",
            point.position.x, point.position.y, point.position.z, point.intensity
        )?;
    }
    out.flush()?;

    log::info!("wrote {} world points to {}", count, path.display());
    Ok(path)
}
