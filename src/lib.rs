pub mod config;
pub mod global_variables;
pub mod monitoring;
pub mod shared_data;
pub mod simulation_engine;

pub use config::{DensityPolicy, RingLayout, SimulationConfig};
pub use simulation_engine::error::{SimError, SimResult};
pub use simulation_engine::grid::{LatticeBuilder, Topology};
pub use simulation_engine::intersections::{Coord, Direction, Intersection, Position};
pub use simulation_engine::roundabout::Roundabout;
pub use simulation_engine::simulation::Field;
