use nalgebra::Vector2;

use crate::boundary::Boundary;

/// A stable copy of the simulation state for the presenter.
///
/// Positions and velocities are in the order the bodies were given in.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub boundary: Boundary,
    pub positions: Vec<Vector2<f64>>,
    pub velocities: Vec<Vector2<f64>>,
    pub cells: Vec<Boundary>,
    pub time: f64,
}

impl Snapshot {
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Positions as `f32` pairs, the layout vertex buffers expect.
    #[must_use]
    pub fn vertices(&self) -> Vec<[f32; 2]> {
        self.positions
            .iter()
            .map(|p| [p.x as f32, p.y as f32])
            .collect()
    }
}
