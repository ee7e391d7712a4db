use crate::simulation_engine::error::{SimError, SimResult};
use crate::simulation_engine::intersections::{Coord, Direction, NodeGeometry, Position};
use std::f64::consts::PI;

/// Immutable geometry of a radial-ring lattice.
///
/// `num_x` spokes cross `num_y` rings. Ring `y` has radius
/// `center_radius + radial_length * y` sites and carries `ring_lanes[y]` lanes.
#[derive(Debug, Clone, PartialEq)]
pub struct Topology {
    center_radius: usize,
    num_x: usize,
    radial_length: usize,
    ring_lanes: Vec<usize>,
    ring_lengths: Vec<usize>,
    site_count: usize,
}

impl Topology {
    pub fn num_x(&self) -> usize {
        self.num_x
    }

    pub fn num_y(&self) -> usize {
        self.ring_lanes.len()
    }

    pub fn center_radius(&self) -> usize {
        self.center_radius
    }

    pub fn radial_length(&self) -> usize {
        self.radial_length
    }

    pub fn ring_lanes(&self) -> &[usize] {
        &self.ring_lanes
    }

    /// Circumferential segment length of each ring, innermost first.
    pub fn ring_segment_lengths(&self) -> &[usize] {
        &self.ring_lengths
    }

    /// Total number of sites, circulation slots included.
    pub fn site_count(&self) -> usize {
        self.site_count
    }

    /// Road sites of the segment leaving `(x, y)` through `dir`, excluding the circulation slot.
    pub fn length_at(&self, x: usize, y: usize, dir: Direction) -> usize {
        debug_assert!(x < self.num_x && y < self.num_y());
        match dir {
            Direction::Backward | Direction::Forward => self.ring_lengths[y],
            Direction::Inbound if y == 0 => 0,
            Direction::Outbound if y + 1 == self.num_y() => 0,
            Direction::Inbound | Direction::Outbound => self.radial_length,
        }
    }

    pub fn lanes_at(&self, y: usize, dir: Direction) -> usize {
        match dir {
            Direction::Inbound if y == 0 => 1,
            Direction::Inbound => self.ring_lanes[y - 1],
            _ => self.ring_lanes[y],
        }
    }

    /// Node reached by leaving `coord` through `dir`. Radial index wraps, ring index does not.
    pub fn neighbor(&self, coord: Coord, dir: Direction) -> Option<Coord> {
        let Coord { x, y } = coord;
        match dir {
            Direction::Backward => Some(Coord::new((x + self.num_x - 1) % self.num_x, y)),
            Direction::Forward => Some(Coord::new((x + 1) % self.num_x, y)),
            Direction::Inbound => y.checked_sub(1).map(|y| Coord::new(x, y)),
            Direction::Outbound => (y + 1 < self.num_y()).then(|| Coord::new(x, y + 1)),
        }
    }

    pub fn contains(&self, position: &Position) -> bool {
        position.x < self.num_x
            && position.y < self.num_y()
            && position.step <= self.length_at(position.x, position.y, position.dir)
    }

    /// Row-major index of a node in the lattice's node vector.
    pub fn index(&self, coord: Coord) -> usize {
        coord.x * self.num_y() + coord.y
    }

    pub fn coords(&self) -> impl Iterator<Item = Coord> + '_ {
        (0..self.num_x).flat_map(move |x| (0..self.num_y()).map(move |y| Coord::new(x, y)))
    }

    pub fn node_geometry(&self, coord: Coord) -> NodeGeometry {
        let mut lengths = [0; 4];
        let mut lanes = [0; 4];
        for dir in Direction::ALL {
            lengths[dir.index()] = self.length_at(coord.x, coord.y, dir);
            lanes[dir.index()] = self.lanes_at(coord.y, dir);
        }
        NodeGeometry {
            coord,
            lengths,
            lanes,
        }
    }
}

/// Builds a [`Topology`] from the ring geometry and a per-ring lane count.
///
/// A uniform lattice is the constant lane function; the gradual-width lattice
/// supplies one lane count per ring, innermost first.
#[derive(Debug, Clone)]
pub struct LatticeBuilder {
    center_radius: usize,
    num_x: usize,
    radial_length: usize,
    ring_lanes: Vec<usize>,
}

impl LatticeBuilder {
    pub fn new(center_radius: usize, radial_roads: usize, radial_length: usize) -> Self {
        Self {
            center_radius,
            num_x: radial_roads,
            radial_length,
            ring_lanes: Vec::new(),
        }
    }

    /// `rings` single-lane rings.
    pub fn uniform(self, rings: usize) -> Self {
        self.lanes_by(rings, |_| 1)
    }

    /// One ring per entry of `lanes`, innermost first.
    pub fn gradual(mut self, lanes: &[usize]) -> Self {
        self.ring_lanes = lanes.to_vec();
        self
    }

    pub fn lanes_by(mut self, rings: usize, lanes: impl Fn(usize) -> usize) -> Self {
        self.ring_lanes = (0..rings).map(lanes).collect();
        self
    }

    pub fn build(self) -> SimResult<Topology> {
        if self.num_x < 3 {
            return Err(SimError::InvalidConfig(format!(
                "need at least 3 radial roads, got {}",
                self.num_x
            )));
        }
        if self.ring_lanes.is_empty() {
            return Err(SimError::InvalidConfig("need at least one ring road".into()));
        }
        if let Some(ring) = self.ring_lanes.iter().position(|&lanes| lanes == 0) {
            return Err(SimError::InvalidConfig(format!("ring {ring} has no lanes")));
        }
        if self.radial_length == 0 && self.ring_lanes.len() > 1 {
            return Err(SimError::InvalidConfig(
                "radial segment length must be positive".into(),
            ));
        }

        let ring_lengths: Vec<usize> = (0..self.ring_lanes.len())
            .map(|y| {
                let radius = (self.center_radius + self.radial_length * y) as f64;
                (radius * 2.0 * PI / self.num_x as f64).round() as usize
            })
            .collect();
        if let Some(ring) = ring_lengths.iter().position(|&length| length == 0) {
            return Err(SimError::InvalidConfig(format!(
                "ring {ring} is too small for {} radial roads",
                self.num_x
            )));
        }

        let mut topology = Topology {
            center_radius: self.center_radius,
            num_x: self.num_x,
            radial_length: self.radial_length,
            ring_lanes: self.ring_lanes,
            ring_lengths,
            site_count: 0,
        };
        topology.site_count = topology
            .coords()
            .map(|coord| topology.node_geometry(coord).site_count())
            .sum();

        log::info!(
            "built lattice: {} radial roads x {} rings, {} sites",
            topology.num_x,
            topology.num_y(),
            topology.site_count
        );
        Ok(topology)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_lattice() -> Topology {
        LatticeBuilder::new(10, 8, 5).uniform(3).build().unwrap()
    }

    #[test]
    fn ring_segments_scale_with_radius() {
        let topology = reference_lattice();
        // round(10 * 2pi / 8), round(15 * 2pi / 8), round(20 * 2pi / 8)
        assert_eq!(topology.ring_segment_lengths(), &[8, 12, 16]);
        assert_eq!(topology.length_at(3, 1, Direction::Backward), 12);
        assert_eq!(topology.length_at(3, 1, Direction::Forward), 12);
    }

    #[test]
    fn boundary_rings_lack_one_spoke_segment() {
        let topology = reference_lattice();
        assert_eq!(topology.length_at(0, 0, Direction::Inbound), 0);
        assert_eq!(topology.length_at(0, 0, Direction::Outbound), 5);
        assert_eq!(topology.length_at(0, 2, Direction::Inbound), 5);
        assert_eq!(topology.length_at(0, 2, Direction::Outbound), 0);
    }

    #[test]
    fn uniform_site_count_matches_geometry() {
        let topology = reference_lattice();
        // per spoke: ring 0: 8*2+0+5+4, ring 1: 12*2+5+5+4, ring 2: 16*2+5+0+4
        let per_spoke = (16 + 5 + 4) + (24 + 10 + 4) + (32 + 5 + 4);
        assert_eq!(topology.site_count(), per_spoke * 8);
    }

    #[test]
    fn gradual_lanes_widen_ring_and_outbound_segments() {
        let topology = LatticeBuilder::new(10, 8, 5)
            .gradual(&[3, 2, 1])
            .build()
            .unwrap();
        assert_eq!(topology.lanes_at(0, Direction::Forward), 3);
        assert_eq!(topology.lanes_at(0, Direction::Outbound), 3);
        assert_eq!(topology.lanes_at(1, Direction::Inbound), 3);
        assert_eq!(topology.lanes_at(1, Direction::Backward), 2);
        // per spoke: ring 0: 8*3*2+5*3+4, ring 1: 12*2*2+5*3+5*2+4, ring 2: 16*2+5*2+4
        let per_spoke = (48 + 15 + 4) + (48 + 15 + 10 + 4) + (32 + 10 + 4);
        assert_eq!(topology.site_count(), per_spoke * 8);
    }

    #[test]
    fn constant_lane_function_equals_uniform() {
        let uniform = reference_lattice();
        let by_function = LatticeBuilder::new(10, 8, 5)
            .lanes_by(3, |_| 1)
            .build()
            .unwrap();
        assert_eq!(uniform, by_function);
    }

    #[test]
    fn radial_index_wraps_ring_index_does_not() {
        let topology = reference_lattice();
        assert_eq!(
            topology.neighbor(Coord::new(0, 1), Direction::Backward),
            Some(Coord::new(7, 1))
        );
        assert_eq!(
            topology.neighbor(Coord::new(7, 1), Direction::Forward),
            Some(Coord::new(0, 1))
        );
        assert_eq!(topology.neighbor(Coord::new(4, 0), Direction::Inbound), None);
        assert_eq!(topology.neighbor(Coord::new(4, 2), Direction::Outbound), None);
        assert_eq!(
            topology.neighbor(Coord::new(4, 1), Direction::Outbound),
            Some(Coord::new(4, 2))
        );
    }

    #[test]
    fn rejects_degenerate_lattices() {
        assert!(matches!(
            LatticeBuilder::new(10, 2, 5).uniform(3).build(),
            Err(SimError::InvalidConfig(_))
        ));
        assert!(matches!(
            LatticeBuilder::new(10, 8, 5).uniform(0).build(),
            Err(SimError::InvalidConfig(_))
        ));
        assert!(matches!(
            LatticeBuilder::new(10, 8, 5).gradual(&[2, 0]).build(),
            Err(SimError::InvalidConfig(_))
        ));
        assert!(matches!(
            LatticeBuilder::new(0, 8, 5).uniform(2).build(),
            Err(SimError::InvalidConfig(_))
        ));
    }
}
