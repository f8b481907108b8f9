//! Accumulated out-of-window surface data.
//!
//! When the window shifts, the slab of observed surface band leaving the
//! box is appended here as world-frame points carrying their normalized
//! signed distance as intensity. The model only grows; downstream meshing
//! consumes it after the run.

use nalgebra::Vector3;

/// One extracted voxel sample: world position plus its distance value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntensityPoint {
    pub position: Vector3<f32>,
    pub intensity: f32,
}

/// Append-only world-frame point store.
#[derive(Debug, Clone, Default)]
pub struct WorldModel {
    points: Vec<IntensityPoint>,
}

impl WorldModel {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn push(&mut self, position: Vector3<f32>, intensity: f32) {
        self.points.push(IntensityPoint {
            position,
            intensity,
        });
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[IntensityPoint] {
        &self.points
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_query() {
        let mut world = WorldModel::new();
        assert!(world.is_empty());

        world.push(Vector3::new(1.0, 2.0, 3.0), -0.25);
        world.push(Vector3::new(4.0, 5.0, 6.0), 0.5);

        assert_eq!(world.len(), 2);
        assert_eq!(world.points()[0].intensity, -0.25);
        assert_eq!(world.points()[1].position.x, 4.0);

        world.clear();
        assert!(world.is_empty());
    }
}
