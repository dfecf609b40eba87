use nalgebra::Vector2;

/// Attraction exerted on a mass at `position1` by a mass at `position2`.
///
/// Newton's law with the gravitational constant folded to 1 and no softening,
/// so the result blows up as the separation goes to zero.
#[must_use]
pub fn force(
    position1: &Vector2<f64>,
    mass1: f64,
    position2: &Vector2<f64>,
    mass2: f64,
) -> Vector2<f64> {
    let r = position2 - position1;
    r / r.norm() * mass2 * mass1 / r.norm_squared()
}
