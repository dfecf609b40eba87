use nalgebra::Vector2;

/// Marks a body that is not held by any tree leaf: not inserted yet, or
/// dropped after its position stopped being finite.
pub(crate) const NO_LEAF: usize = usize::MAX;

/// A point mass.
///
/// `force` accumulates the attraction of all other bodies during one sub-step
/// and is cleared again by [`integrate`](crate::integrator::integrate).
#[derive(Clone, Debug, PartialEq)]
pub struct Body {
    pub position: Vector2<f64>,
    pub velocity: Vector2<f64>,
    pub force: Vector2<f64>,
    mass: f64,
    pub(crate) leaf: usize,
}

impl Body {
    #[must_use]
    pub fn new(mass: f64, position: Vector2<f64>, velocity: Vector2<f64>) -> Self {
        Self {
            position,
            velocity,
            force: Vector2::zeros(),
            mass,
            leaf: NO_LEAF,
        }
    }

    #[must_use]
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Index of the tree leaf currently holding this body.
    #[must_use]
    pub fn leaf(&self) -> usize {
        self.leaf
    }

    /// Whether a tree leaf currently holds this body.
    #[must_use]
    pub fn in_tree(&self) -> bool {
        self.leaf != NO_LEAF
    }

    #[must_use]
    pub fn momentum(&self) -> Vector2<f64> {
        self.velocity * self.mass
    }
}

impl From<(Vector2<f64>, Vector2<f64>, f64)> for Body {
    fn from((position, velocity, mass): (Vector2<f64>, Vector2<f64>, f64)) -> Self {
        Self::new(mass, position, velocity)
    }
}
