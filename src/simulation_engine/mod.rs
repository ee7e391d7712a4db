// simulation_engine/mod.rs
pub mod error;
pub mod grid;
pub mod intersections;
pub mod lanes;
pub mod roundabout;
pub mod route_generation;
pub mod simulation;
pub mod vehicles;
