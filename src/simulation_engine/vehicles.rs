use crate::simulation_engine::error::{SimError, SimResult};
use crate::simulation_engine::grid::Topology;
use crate::simulation_engine::intersections::{Direction, Position};
use crate::simulation_engine::route_generation::{plan_route, Route};
use rand::Rng;
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Unique ID of a [Car] in its lattice's [Fleet].
    pub struct CarId;
}

/// A car travelling from a random origin to a random destination.
#[derive(Debug, Clone)]
pub struct Car {
    origin: Position,
    destination: Position,
    current: Position,
    route: Route,
    route_step: usize,
}

impl Car {
    /// Creates a car at `origin` heading to a uniformly drawn destination.
    pub fn spawn<R: Rng>(topology: &Topology, origin: Position, rng: &mut R) -> SimResult<Self> {
        let destination = draw_destination(topology, &origin, rng);
        Self::with_destination(topology, origin, destination)
    }

    pub fn with_destination(topology: &Topology, origin: Position, destination: Position) -> SimResult<Self> {
        let route = plan_route(topology, &origin, &destination)?;
        Ok(Self {
            origin,
            destination,
            current: origin,
            route,
            route_step: 0,
        })
    }

    pub fn origin(&self) -> Position {
        self.origin
    }

    pub fn destination(&self) -> Position {
        self.destination
    }

    pub fn current(&self) -> Position {
        self.current
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn route_step(&self) -> usize {
        self.route_step
    }

    /// Moves the car one site.
    ///
    /// Leaving an intersection advances the route cursor. Entering one checks the
    /// node against the waypoint under the cursor.
    pub fn move_to(&mut self, next: Position) -> SimResult<()> {
        if self.current.in_intersection() && !next.in_intersection() {
            self.route_step += 1;
        } else if !self.current.in_intersection() && next.in_intersection() {
            let expected = self.route.get(self.route_step).map(|waypoint| waypoint.coord);
            if expected != Some(next.coord()) {
                log::warn!(
                    "car left its route: entered {} at route step {} of {}",
                    next.coord(),
                    self.route_step,
                    self.route
                );
                return Err(SimError::RouteDesync {
                    arrived: next.coord(),
                    expected,
                });
            }
        }
        self.current = next;
        Ok(())
    }

    /// Port through which the car leaves the intersection it is at or heading to.
    pub fn out_dir(&self) -> Option<Direction> {
        self.route.get(self.route_step).map(|waypoint| waypoint.exit)
    }

    pub fn is_despawn(&self) -> bool {
        self.current == self.destination
    }
}

/// Draws a destination uniformly over lattice positions, re-drawing the origin.
fn draw_destination<R: Rng>(topology: &Topology, origin: &Position, rng: &mut R) -> Position {
    loop {
        let x = rng.random_range(0..topology.num_x());
        let y = rng.random_range(0..topology.num_y());
        let dir = Direction::from_index(rng.random_range(0..4));
        let step = rng.random_range(0..=topology.length_at(x, y, dir));
        let candidate = Position::new(x, y, dir, step);
        if candidate != *origin {
            return candidate;
        }
    }
}

/// Registry of live cars. Its length is the lattice's live-car count.
#[derive(Debug, Default)]
pub struct Fleet {
    cars: SlotMap<CarId, Car>,
    spawned: u64,
    despawned: u64,
}

impl Fleet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, car: Car) -> CarId {
        self.spawned += 1;
        let id = self.cars.insert(car);
        log::trace!("spawned car {:?}", id);
        id
    }

    /// Removes a car that reached its destination.
    pub fn despawning(&mut self, id: CarId) -> Option<Car> {
        let car = self.cars.remove(id)?;
        self.despawned += 1;
        log::trace!("car {:?} arrived at {}", id, car.current());
        Some(car)
    }

    pub fn get(&self, id: CarId) -> Option<&Car> {
        self.cars.get(id)
    }

    pub fn get_mut(&mut self, id: CarId) -> Option<&mut Car> {
        self.cars.get_mut(id)
    }

    /// Moves a registered car, see [`Car::move_to`].
    pub fn move_car(&mut self, id: CarId, next: Position) -> SimResult<()> {
        self.cars
            .get_mut(id)
            .ok_or(SimError::UnknownCar { at: next })?
            .move_to(next)
    }

    /// Takes back a car that never reached a site. Unlike [`Fleet::despawning`]
    /// it is not counted as an arrival.
    pub fn withdraw(&mut self, id: CarId) -> Option<Car> {
        let car = self.cars.remove(id)?;
        self.spawned -= 1;
        Some(car)
    }

    pub fn len(&self) -> usize {
        self.cars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CarId, &Car)> {
        self.cars.iter()
    }

    /// Cars created since the lattice was built.
    pub fn spawned_total(&self) -> u64 {
        self.spawned
    }

    /// Cars removed on arrival since the lattice was built.
    pub fn despawned_total(&self) -> u64 {
        self.despawned
    }
}
