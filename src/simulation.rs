use std::cmp::Ordering;

use log::trace;
use nalgebra::Vector2;
#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::{
    body::Body, boundary::Boundary, error::SimulationError, integrator::integrate,
    quadtree::SpatialTree, snapshot::Snapshot, Execution, DEFAULT_THETA, SUB_STEP,
};

/// A fixed set of bodies together with the tree partitioning them.
#[derive(Clone, Debug)]
pub struct Simulation {
    bodies: Vec<Body>,
    tree: SpatialTree,
    root: usize,
    theta: f64,
    execution: Execution,
    time: f64,
}

impl Simulation {
    /// Builds the tree over `bodies` inside `boundary`.
    ///
    /// Bodies outside `boundary` are accepted, the root grows until it
    /// covers them.
    pub fn new(
        bodies: impl IntoIterator<Item = Body>,
        boundary: Boundary,
    ) -> Result<Self, SimulationError> {
        let mut bodies: Vec<Body> = bodies.into_iter().collect();
        validate(&bodies, &boundary)?;

        let tree = SpatialTree::build(&mut bodies, boundary);
        let root = tree.root();

        Ok(Self {
            bodies,
            tree,
            root,
            theta: DEFAULT_THETA,
            execution: Execution::SingleThreaded,
            time: 0.,
        })
    }

    /// A heavy central mass with four orbiting bodies in a 200 x 200 box.
    pub fn demo() -> Result<Self, SimulationError> {
        let bodies = [
            ((100., 100.), (0., 0.), 100_000.),
            ((150., 100.), (0., 50.), 100.),
            ((50., 100.), (0., -50.), 100.),
            ((100., 50.), (30., 0.), 200.),
            ((100., 150.), (-30., 0.), 200.),
        ]
        .map(|((x, y), (vx, vy), mass)| {
            Body::new(mass, Vector2::new(x, y), Vector2::new(vx, vy))
        });

        Self::new(bodies, Boundary::from_corner(0., 0., 200., 200.))
    }

    #[must_use]
    pub fn theta(mut self, theta: f64) -> Self {
        self.theta = theta;
        self
    }

    #[cfg(feature = "rayon")]
    #[must_use]
    pub fn rayon_iter(mut self) -> Self {
        self.execution = Execution::RayonIter;
        self
    }

    /// One pass of force, integration and relocation over all bodies.
    ///
    /// A body whose position overflows or turns NaN is dropped from the
    /// tree and no longer attracts or feels anything; the step itself always
    /// completes.
    ///
    /// # Panics
    ///
    /// If a body lands exactly on the position of another, since no cell of
    /// the tree can hold both.
    pub fn sub_step(&mut self) {
        self.accumulate_forces();

        for body in 0..self.bodies.len() {
            integrate(&mut self.bodies[body], SUB_STEP);
            self.tree.relocate(&mut self.bodies, body);
        }

        self.root = self.tree.topmost(self.root);
        self.time += SUB_STEP;
        trace!("sub-step done at t = {}", self.time);

        debug_assert_eq!(self.root, self.tree.root());
        debug_assert_eq!(self.tree.check_invariants(&self.bodies), Ok(()));
    }

    fn accumulate_forces(&mut self) {
        let (tree, root, theta) = (&self.tree, self.root, self.theta);

        match self.execution {
            Execution::SingleThreaded => {
                for body in 0..self.bodies.len() {
                    let force = tree.compute_force(root, &self.bodies, body, theta);
                    self.bodies[body].force += force;
                }
            }
            #[cfg(feature = "rayon")]
            Execution::RayonIter => {
                let bodies = &self.bodies;
                let forces: Vec<_> = (0..bodies.len())
                    .into_par_iter()
                    .map(|body| tree.compute_force(root, bodies, body, theta))
                    .collect();

                for (body, force) in self.bodies.iter_mut().zip(forces) {
                    body.force += force;
                }
            }
        }
    }

    #[must_use]
    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    #[must_use]
    pub fn tree(&self) -> &SpatialTree {
        &self.tree
    }

    /// Current root node, refreshed after every sub-step.
    #[must_use]
    pub fn root(&self) -> usize {
        self.root
    }

    #[must_use]
    pub fn boundary(&self) -> Boundary {
        self.tree.node(self.root).boundary
    }

    /// Total simulated time.
    #[must_use]
    pub fn time(&self) -> f64 {
        self.time
    }

    #[must_use]
    pub fn total_mass(&self) -> f64 {
        self.bodies.iter().map(Body::mass).sum()
    }

    #[must_use]
    pub fn momentum(&self) -> Vector2<f64> {
        self.bodies.iter().map(Body::momentum).sum()
    }

    #[must_use]
    pub fn center_of_mass(&self) -> Vector2<f64> {
        let weighted: Vector2<f64> = self.bodies.iter().map(|b| b.position * b.mass()).sum();
        weighted / self.total_mass()
    }

    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            boundary: self.boundary(),
            positions: self.bodies.iter().map(|b| b.position).collect(),
            velocities: self.bodies.iter().map(|b| b.velocity).collect(),
            cells: self.tree.cells(),
            time: self.time,
        }
    }
}

fn validate(bodies: &[Body], boundary: &Boundary) -> Result<(), SimulationError> {
    if !boundary.is_valid() {
        return Err(SimulationError::InvalidBoundary);
    }

    for (index, body) in bodies.iter().enumerate() {
        let mass = body.mass();
        if !mass.is_finite() || mass <= 0. {
            return Err(SimulationError::InvalidMass { index, mass });
        }
        if !body
            .position
            .iter()
            .chain(body.velocity.iter())
            .all(|c| c.is_finite())
        {
            return Err(SimulationError::NonFinite { index });
        }
    }

    let mut order: Vec<usize> = (0..bodies.len()).collect();
    order.sort_by(|&a, &b| {
        let (a, b) = (&bodies[a].position, &bodies[b].position);
        a.x.partial_cmp(&b.x)
            .unwrap_or(Ordering::Equal)
            .then(a.y.partial_cmp(&b.y).unwrap_or(Ordering::Equal))
    });
    for pair in order.windows(2) {
        if bodies[pair[0]].position == bodies[pair[1]].position {
            return Err(SimulationError::CoincidentBodies {
                first: pair[0].min(pair[1]),
                second: pair[0].max(pair[1]),
            });
        }
    }

    Ok(())
}
