pub mod body;
pub mod boundary;
pub mod creator;
pub mod csv;
pub mod error;
pub mod gravity;
pub mod integrator;
pub mod quadtree;
pub mod simulation;
pub mod snapshot;
pub mod stepper;

pub use body::Body;
pub use boundary::{Boundary, Quadrant};
pub use error::{InvariantViolation, SimulationError, StepperError};
pub use quadtree::{Node, NodeKind, SpatialTree};
pub use simulation::Simulation;
pub use snapshot::Snapshot;
pub use stepper::{FrameClock, FrameReport, Stepper, StepperState};

/// Simulated time advanced by one force/integrate/relocate pass.
pub const SUB_STEP: f64 = 0.006;

/// Simulated time covered by one frame of the stepper.
pub const FRAME_LENGTH: f64 = 1.0;

/// Opening angle used unless configured otherwise.
pub const DEFAULT_THETA: f64 = 0.5;

/// How the force pass of a sub-step is executed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Execution {
    #[default]
    SingleThreaded,
    #[cfg(feature = "rayon")]
    RayonIter,
}
