use nalgebra::Vector2;

use crate::body::Body;

/// Explicit Euler step from the accumulated force, which is reset afterwards.
pub fn integrate(body: &mut Body, time_step: f64) {
    body.velocity += body.force / body.mass() * time_step;
    body.position += body.velocity * time_step;
    body.force = Vector2::zeros();
}
