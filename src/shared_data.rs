// src/shared_data.rs

use crate::simulation_engine::intersections::Direction;
use serde::{Deserialize, Serialize};

/// RGB display color handed to renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Empty road site.
    pub const ROAD: Color = Color::rgb(200, 200, 200);
    /// Occupied site whose car has no exit left (heading for a mid-segment destination).
    pub const ARRIVING: Color = Color::rgb(0, 0, 0);

    /// Color of a car by the port it will leave its next intersection through.
    pub fn for_exit(dir: Direction) -> Self {
        match dir {
            Direction::Backward => Color::rgb(220, 40, 40),
            Direction::Inbound => Color::rgb(40, 160, 40),
            Direction::Forward => Color::rgb(40, 80, 220),
            Direction::Outbound => Color::rgb(230, 160, 20),
        }
    }
}

/// Summary of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    pub tick: u64,
    pub moved: usize,
    pub despawned: usize,
    pub spawned: usize,
    pub live_cars: usize,
    pub density: f64,
}

/// One point of the density/flow (fundamental) diagram.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlowRecord {
    /// Density the lattice was seeded with.
    pub initial_density: f64,
    /// Mean live-car density over the measurement window.
    pub density: f64,
    /// Mean cars moved per tick.
    pub moved_per_tick: f64,
    /// Cars moved per site per tick.
    pub flow: f64,
    pub despawned: u64,
    pub spawned: u64,
}
