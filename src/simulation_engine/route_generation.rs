// route_generation.rs
//
// Routes on the radial-ring lattice are planned geometrically rather than by
// graph search. Every car that crosses at least one intersection travels in
// three legs: inbound along its spoke, around a ring, and outbound along the
// destination spoke. Whether the ring leg runs on the outer ring or on the
// innermost ring depends on the angle between origin and destination.

use crate::global_variables::DETOUR_THRESHOLD_RAD;
use crate::simulation_engine::error::{SimError, SimResult};
use crate::simulation_engine::grid::Topology;
use crate::simulation_engine::intersections::{Coord, Direction, Position};
use std::f64::consts::PI;
use std::fmt;

/// A node on the planned path and the port the car leaves it through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Waypoint {
    pub coord: Coord,
    pub exit: Direction,
}

/// Ordered waypoints from the first intersection to the destination node.
///
/// An empty route means origin and destination lie on the same segment and the
/// car never enters an intersection. Looking past the last waypoint yields `None`,
/// which marks the end of the route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Route {
    waypoints: Vec<Waypoint>,
}

impl Route {
    pub fn direct() -> Self {
        Self::default()
    }

    pub fn get(&self, step: usize) -> Option<&Waypoint> {
        self.waypoints.get(step)
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// True when the car reaches its destination without crossing an intersection.
    pub fn is_direct(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_direct() {
            return write!(f, "direct");
        }
        for waypoint in &self.waypoints {
            write!(f, "{}", waypoint.coord)?;
        }
        Ok(())
    }
}

/// Which ring carries the circumferential leg of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingMode {
    /// Stay as far out as origin and destination allow.
    Outer,
    /// Descend to ring 0, go around, and climb back out.
    Inner,
}

/// Signed shortest cyclic distance from radial index `from` to `to`, in `(-n/2, n/2]`.
/// Positive values travel forward (direction 2).
pub fn ring_distance(num_x: usize, from: usize, to: usize) -> isize {
    let n = num_x as isize;
    let delta = (to as isize - from as isize).rem_euclid(n);
    if delta > n / 2 {
        delta - n
    } else {
        delta
    }
}

/// Picks inner routing once the subtended angle reaches the detour threshold.
pub fn routing_mode(num_x: usize, ring: isize) -> RoutingMode {
    let angle = 2.0 * PI * ring.unsigned_abs() as f64 / num_x as f64;
    if angle < DETOUR_THRESHOLD_RAD {
        RoutingMode::Outer
    } else {
        RoutingMode::Inner
    }
}

/// First intersection a car starting at `origin` passes through.
fn first_intersection(topology: &Topology, origin: &Position) -> Option<Coord> {
    if origin.in_intersection() {
        Some(origin.coord())
    } else {
        topology.neighbor(origin.coord(), origin.dir)
    }
}

/// Plans the route from `origin` to `destination`.
///
/// Fails with [`SimError::RouteConstruction`] if the assembled legs do not end
/// on the destination node.
pub fn plan_route(topology: &Topology, origin: &Position, destination: &Position) -> SimResult<Route> {
    if origin.same_segment(destination) && origin.step > 0 && origin.step < destination.step {
        return Ok(Route::direct());
    }

    let construction_error = |reached: Coord| SimError::RouteConstruction {
        origin: *origin,
        destination: *destination,
        reached,
    };

    let start = first_intersection(topology, origin).ok_or_else(|| construction_error(origin.coord()))?;
    let target = destination.coord();

    let ring = ring_distance(topology.num_x(), start.x, target.x);
    let (inbound, outbound) = match routing_mode(topology.num_x(), ring) {
        RoutingMode::Outer => (
            start.y.saturating_sub(target.y),
            target.y.saturating_sub(start.y),
        ),
        RoutingMode::Inner => (start.y, target.y),
    };
    let around = if ring > 0 {
        Direction::Forward
    } else {
        Direction::Backward
    };

    let legs = std::iter::repeat(Direction::Inbound)
        .take(inbound)
        .chain(std::iter::repeat(around).take(ring.unsigned_abs()))
        .chain(std::iter::repeat(Direction::Outbound).take(outbound));

    let mut waypoints = Vec::with_capacity(inbound + ring.unsigned_abs() + outbound + 1);
    let mut at = start;
    for dir in legs {
        waypoints.push(Waypoint { coord: at, exit: dir });
        at = topology
            .neighbor(at, dir)
            .ok_or_else(|| construction_error(at))?;
    }

    if at != target {
        log::warn!("route construction failed: {} -> {} reached {}", origin, destination, at);
        return Err(construction_error(at));
    }
    waypoints.push(Waypoint {
        coord: at,
        exit: destination.dir,
    });

    Ok(Route { waypoints })
}
