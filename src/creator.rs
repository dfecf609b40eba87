use nalgebra::Vector2;

use crate::body::Body;

pub trait BodyCreator {
    fn create_body(&mut self) -> Body;

    fn create_bodies(&mut self, n: usize) -> Vec<Body> {
        (0..n).map(|_| self.create_body()).collect()
    }
}

/// Resting bodies on a regular grid, filled row by row.
#[derive(Clone, Debug)]
pub struct GridBodyCreator {
    mass: f64,
    origin: Vector2<f64>,
    spacing: f64,
    columns: usize,
    next: usize,
}

impl GridBodyCreator {
    /// Lays resting bodies of equal `mass` on a grid starting at `origin`,
    /// `columns` per row.
    pub fn new(mass: f64, origin: Vector2<f64>, spacing: f64, columns: usize) -> Self {
        Self {
            mass,
            origin,
            spacing,
            columns: columns.max(1),
            next: 0,
        }
    }
}

impl BodyCreator for GridBodyCreator {
    fn create_body(&mut self) -> Body {
        let (row, column) = (self.next / self.columns, self.next % self.columns);
        self.next += 1;

        let offset = Vector2::new(column as f64, row as f64) * self.spacing;
        Body::new(self.mass, self.origin + offset, Vector2::zeros())
    }
}

#[cfg(feature = "randomization")]
pub use random::*;

#[cfg(feature = "randomization")]
mod random {
    use std::f64::consts::TAU;

    use rand::{rngs::ThreadRng, Rng};
    use rand_distr::{Distribution, Uniform};

    use super::*;

    /// Samples mass, both position coordinates and both velocity components
    /// independently from the given distributions.
    #[derive(Clone)]
    pub struct DistrBodyCreator<R, MD, PD, VD>
    where
        R: Rng,
        MD: Distribution<f64>,
        PD: Distribution<f64>,
        VD: Distribution<f64>,
    {
        rng: R,
        mass_distr: MD,
        position_distr: PD,
        velocity_distr: VD,
    }

    impl<MD, PD, VD> DistrBodyCreator<ThreadRng, MD, PD, VD>
    where
        MD: Distribution<f64>,
        PD: Distribution<f64>,
        VD: Distribution<f64>,
    {
        pub fn new(mass_distr: MD, position_distr: PD, velocity_distr: VD) -> Self {
            Self::rng(mass_distr, position_distr, velocity_distr, rand::thread_rng())
        }
    }

    impl<R, MD, PD, VD> DistrBodyCreator<R, MD, PD, VD>
    where
        R: Rng,
        MD: Distribution<f64>,
        PD: Distribution<f64>,
        VD: Distribution<f64>,
    {
        pub fn rng(mass_distr: MD, position_distr: PD, velocity_distr: VD, rng: R) -> Self {
            Self {
                rng,
                mass_distr,
                position_distr,
                velocity_distr,
            }
        }
    }

    impl<R, MD, PD, VD> BodyCreator for DistrBodyCreator<R, MD, PD, VD>
    where
        R: Rng,
        MD: Distribution<f64>,
        PD: Distribution<f64>,
        VD: Distribution<f64>,
    {
        fn create_body(&mut self) -> Body {
            let rng = &mut self.rng;

            let mass = self.mass_distr.sample(rng);
            let position = Vector2::new(
                self.position_distr.sample(rng),
                self.position_distr.sample(rng),
            );
            let velocity = Vector2::new(
                self.velocity_distr.sample(rng),
                self.velocity_distr.sample(rng),
            );

            Body::new(mass, position, velocity)
        }
    }

    /// A heavy body at `center` followed by light bodies on circular orbits
    /// around it.
    #[derive(Clone)]
    pub struct CentralBodyCreator<R, MD, RD>
    where
        R: Rng,
        MD: Distribution<f64>,
        RD: Distribution<f64>,
    {
        rng: R,
        center: Vector2<f64>,
        central_mass: f64,
        mass_distr: MD,
        radial_distr: RD,
        first_body: bool,
    }

    impl<MD, RD> CentralBodyCreator<ThreadRng, MD, RD>
    where
        MD: Distribution<f64>,
        RD: Distribution<f64>,
    {
        pub fn new(center: Vector2<f64>, central_mass: f64, mass_distr: MD, radial_distr: RD) -> Self {
            Self::rng(center, central_mass, mass_distr, radial_distr, rand::thread_rng())
        }
    }

    impl<R, MD, RD> CentralBodyCreator<R, MD, RD>
    where
        R: Rng,
        MD: Distribution<f64>,
        RD: Distribution<f64>,
    {
        pub fn rng(
            center: Vector2<f64>,
            central_mass: f64,
            mass_distr: MD,
            radial_distr: RD,
            rng: R,
        ) -> Self {
            Self {
                rng,
                center,
                central_mass,
                mass_distr,
                radial_distr,
                first_body: true,
            }
        }
    }

    impl<R, MD, RD> BodyCreator for CentralBodyCreator<R, MD, RD>
    where
        R: Rng,
        MD: Distribution<f64>,
        RD: Distribution<f64>,
    {
        fn create_body(&mut self) -> Body {
            if self.first_body {
                self.first_body = false;
                return Body::new(self.central_mass, self.center, Vector2::zeros());
            }

            let rng = &mut self.rng;

            let r = self.radial_distr.sample(rng);
            let phi = Uniform::new(0., TAU).sample(rng);
            let position = self.center + Vector2::new(phi.cos(), phi.sin()) * r;

            // G = 1
            let velocity = Vector2::new(-phi.sin(), phi.cos()) * (self.central_mass / r).sqrt();

            Body::new(self.mass_distr.sample(rng), position, velocity)
        }
    }

}
