use crate::shared_data::Color;
use crate::simulation_engine::error::SimResult;
use crate::simulation_engine::vehicles::{CarId, Fleet};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lattice coordinate of an intersection: radial index `x`, ring index `y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    pub x: usize,
    pub y: usize,
}

impl Coord {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// One of the four ports of an intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Along the ring, towards radial index - 1.
    Backward,
    /// Along the spoke, towards the center.
    Inbound,
    /// Along the ring, towards radial index + 1.
    Forward,
    /// Along the spoke, away from the center.
    Outbound,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Backward,
        Direction::Inbound,
        Direction::Forward,
        Direction::Outbound,
    ];

    pub fn index(self) -> usize {
        match self {
            Direction::Backward => 0,
            Direction::Inbound => 1,
            Direction::Forward => 2,
            Direction::Outbound => 3,
        }
    }

    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % 4]
    }

    /// The port through which a car travelling in `self` arrives at the next node.
    pub fn opposite(self) -> Self {
        Self::from_index(self.index() + 2)
    }

    /// Next port in circulation order.
    pub fn next_in_circulation(self) -> Self {
        Self::from_index(self.index() + 1)
    }

    pub fn is_circumferential(self) -> bool {
        matches!(self, Direction::Backward | Direction::Forward)
    }
}

/// Where a car is: node, port and step along that port's segment.
///
/// `step == 0` is the node's circulation slot for `dir`; `1..=L` are road sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
    pub dir: Direction,
    pub step: usize,
}

impl Position {
    pub fn new(x: usize, y: usize, dir: Direction, step: usize) -> Self {
        Self { x, y, dir, step }
    }

    pub fn coord(&self) -> Coord {
        Coord::new(self.x, self.y)
    }

    pub fn in_intersection(&self) -> bool {
        self.step == 0
    }

    pub fn same_segment(&self, other: &Position) -> bool {
        self.x == other.x && self.y == other.y && self.dir == other.dir
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({},{},{},{})",
            self.x,
            self.y,
            self.dir.index(),
            self.step
        )
    }
}

/// Per-node construction parameters handed out by the lattice builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeGeometry {
    pub coord: Coord,
    /// Segment length per port, indexed by `Direction::index`.
    pub lengths: [usize; 4],
    /// Lane count per port, indexed by `Direction::index`.
    pub lanes: [usize; 4],
}

impl NodeGeometry {
    /// Road sites plus the four circulation slots.
    pub fn site_count(&self) -> usize {
        self.lengths
            .iter()
            .zip(self.lanes.iter())
            .map(|(length, lanes)| length * lanes)
            .sum::<usize>()
            + 4
    }
}

/// Capability of a lattice node: four ports, the outward road segment attached
/// to each, and the per-tick phase operations.
///
/// Each phase operation returns the number of cars it moved. Entering from the
/// road is split between the upstream node (`release_head`) and the receiving
/// node (`can_admit`/`admit`) so the caller performs the capacity check and the
/// assignment together.
pub trait Intersection {
    fn build(geometry: NodeGeometry) -> Self
    where
        Self: Sized;

    fn coord(&self) -> Coord;
    fn length_at(&self, dir: Direction) -> usize;
    fn lanes_at(&self, dir: Direction) -> usize;

    /// Registers the neighbor reached through each port. Called once.
    fn connect(&mut self, neighbors: [Option<Coord>; 4]);
    fn neighbor(&self, dir: Direction) -> Option<Coord>;

    fn num_cars_at(&self, dir: Direction, step: usize) -> usize;
    fn color_at(&self, dir: Direction, step: usize, fleet: &Fleet) -> Color;
    fn car_out_at(&self, dir: Direction, step: usize, fleet: &Fleet) -> Option<Direction>;
    fn occupied_sites(&self) -> usize;
    fn car_ids(&self) -> Vec<CarId>;

    /// Places `car` at `(dir, step)`; false if every site there is taken.
    fn try_spawn(&mut self, dir: Direction, step: usize, car: CarId) -> bool;

    fn try_despawn(&mut self, fleet: &mut Fleet) -> usize;
    fn update_road_sites(&mut self, fleet: &mut Fleet) -> SimResult<usize>;
    fn update_exit(&mut self, fleet: &mut Fleet) -> SimResult<usize>;
    fn update_intersection(&mut self, fleet: &mut Fleet) -> SimResult<usize>;

    fn can_admit(&self, port: Direction) -> bool;
    /// Removes a car waiting at the far end of the `dir` segment, if one may leave this tick.
    fn release_head(&mut self, dir: Direction) -> Option<CarId>;
    fn admit(&mut self, port: Direction, car: CarId, fleet: &mut Fleet) -> SimResult<()>;
}
