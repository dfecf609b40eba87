use std::{error::Error, fmt, io};

/// Rejected initial configurations.
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// A mass that is zero, negative or not finite.
    InvalidMass { index: usize, mass: f64 },
    /// A position or velocity with a NaN or infinite component.
    NonFinite { index: usize },
    /// Two bodies share a position, no subdivision can separate them.
    CoincidentBodies { first: usize, second: usize },
    /// The initial boundary has no area or is not finite.
    InvalidBoundary,
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SimulationError::InvalidMass { index, mass } => {
                write!(f, "body {index} has invalid mass {mass}")
            }
            SimulationError::NonFinite { index } => {
                write!(f, "body {index} has a non-finite position or velocity")
            }
            SimulationError::CoincidentBodies { first, second } => {
                write!(f, "bodies {first} and {second} share a position")
            }
            SimulationError::InvalidBoundary => write!(f, "boundary must be finite with positive size"),
        }
    }
}

impl Error for SimulationError {}

/// Misuse of the start/wait alternation, or a lost worker thread.
#[derive(Debug)]
pub enum StepperError {
    AlreadyRunning,
    NotRunning,
    Disconnected,
    Spawn(io::Error),
}

impl fmt::Display for StepperError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StepperError::AlreadyRunning => write!(f, "a frame is already running"),
            StepperError::NotRunning => write!(f, "no frame is running"),
            StepperError::Disconnected => write!(f, "stepper thread is gone"),
            StepperError::Spawn(err) => write!(f, "failed to spawn stepper thread: {err}"),
        }
    }
}

impl Error for StepperError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StepperError::Spawn(err) => Some(err),
            _ => None,
        }
    }
}

/// A broken structural invariant of the tree. Always a bug.
#[derive(Debug, Clone, PartialEq)]
pub enum InvariantViolation {
    Aggregate { node: usize },
    EmptyLeaf { node: usize },
    Parent { node: usize },
    StaleLeaf { body: usize },
    Containment { body: usize },
    BodyCount { expected: usize, found: usize },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InvariantViolation::Aggregate { node } => {
                write!(f, "node {node} does not aggregate its children")
            }
            InvariantViolation::EmptyLeaf { node } => {
                write!(f, "empty leaf {node} carries mass or an off-center center of mass")
            }
            InvariantViolation::Parent { node } => write!(f, "node {node} has a wrong parent link"),
            InvariantViolation::StaleLeaf { body } => {
                write!(f, "body {body} points to a leaf that does not hold it")
            }
            InvariantViolation::Containment { body } => {
                write!(f, "body {body} lies outside its leaf")
            }
            InvariantViolation::BodyCount { expected, found } => {
                write!(f, "tree holds {found} bodies, expected {expected}")
            }
        }
    }
}

impl Error for InvariantViolation {}
