use crate::simulation_engine::intersections::{Coord, Position};
use thiserror::Error;

/// Failures raised by the simulation engine.
///
/// Route and spawn failures are invariant violations: once one is returned the
/// lattice must be considered corrupted and the run abandoned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("route from {origin} ends at node {reached} instead of destination {destination}")]
    RouteConstruction {
        origin: Position,
        destination: Position,
        reached: Coord,
    },
    #[error("car entered node {arrived} but its route expects {expected:?}")]
    RouteDesync {
        arrived: Coord,
        expected: Option<Coord>,
    },
    #[error("site {at} refers to a car that is not registered")]
    UnknownCar { at: Position },
    #[error("no free site found for a new car after {trials} trials")]
    SpawnSaturation { trials: usize },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type SimResult<T> = Result<T, SimError>;
