use crate::shared_data::Color;
use crate::simulation_engine::error::{SimError, SimResult};
use crate::simulation_engine::intersections::{Coord, Direction, Intersection, NodeGeometry, Position};
use crate::simulation_engine::lanes::Road;
use crate::simulation_engine::vehicles::{Car, CarId, Fleet};

/// Intersection with a one-lane circulating ring: one slot per port.
///
/// Conflicts are resolved by phase order and by fixed rules inside each phase:
///
/// * a car whose exit port is its current slot leaves onto the lowest free lane
///   of that road, or stays parked there while the road is full;
/// * every other car moves to the next slot in port order (0 -> 1 -> 2 -> 3 -> 0).
///   All circulating cars move at once: a car advances if its next slot was
///   empty, or if the car in that slot advances too. A ring full of circulating
///   cars rotates as a whole; a parked car blocks the cars queued behind it;
/// * a car arriving from the road takes the slot of the port it arrives through,
///   only if that slot is still empty after circulation. Lanes of one road take
///   turns when several have a car waiting at the far end.
#[derive(Debug, Clone)]
pub struct Roundabout {
    coord: Coord,
    roads: [Road; 4],
    slots: [Option<CarId>; 4],
    neighbors: [Option<Coord>; 4],
}

impl Roundabout {
    fn position(&self, dir: Direction, step: usize) -> Position {
        Position::new(self.coord.x, self.coord.y, dir, step)
    }

    fn road(&self, dir: Direction) -> &Road {
        &self.roads[dir.index()]
    }

    fn road_mut(&mut self, dir: Direction) -> &mut Road {
        &mut self.roads[dir.index()]
    }

    fn slot(&self, dir: Direction) -> Option<CarId> {
        self.slots[dir.index()]
    }

    fn first_car_at(&self, dir: Direction, step: usize) -> Option<CarId> {
        if step == 0 {
            self.slot(dir)
        } else {
            self.road(dir).cars_at(step).next()
        }
    }

    fn exit_of(&self, car: CarId, fleet: &Fleet) -> SimResult<Direction> {
        fleet
            .get(car)
            .and_then(Car::out_dir)
            .ok_or(SimError::RouteDesync {
                arrived: self.coord,
                expected: None,
            })
    }
}

impl Intersection for Roundabout {
    fn build(geometry: NodeGeometry) -> Self {
        Self {
            coord: geometry.coord,
            roads: std::array::from_fn(|i| Road::new(geometry.lengths[i], geometry.lanes[i])),
            slots: [None; 4],
            neighbors: [None; 4],
        }
    }

    fn coord(&self) -> Coord {
        self.coord
    }

    fn length_at(&self, dir: Direction) -> usize {
        self.road(dir).length()
    }

    fn lanes_at(&self, dir: Direction) -> usize {
        self.road(dir).lane_count()
    }

    fn connect(&mut self, neighbors: [Option<Coord>; 4]) {
        self.neighbors = neighbors;
    }

    fn neighbor(&self, dir: Direction) -> Option<Coord> {
        self.neighbors[dir.index()]
    }

    fn num_cars_at(&self, dir: Direction, step: usize) -> usize {
        if step == 0 {
            usize::from(self.slot(dir).is_some())
        } else {
            self.road(dir).cars_at(step).count()
        }
    }

    fn color_at(&self, dir: Direction, step: usize, fleet: &Fleet) -> Color {
        match self.first_car_at(dir, step).and_then(|car| fleet.get(car)) {
            Some(car) => car.out_dir().map_or(Color::ARRIVING, Color::for_exit),
            None => Color::ROAD,
        }
    }

    fn car_out_at(&self, dir: Direction, step: usize, fleet: &Fleet) -> Option<Direction> {
        self.first_car_at(dir, step)
            .and_then(|car| fleet.get(car))
            .and_then(Car::out_dir)
    }

    fn occupied_sites(&self) -> usize {
        self.slots.iter().flatten().count() + self.roads.iter().map(Road::occupied).sum::<usize>()
    }

    fn car_ids(&self) -> Vec<CarId> {
        self.slots
            .iter()
            .flatten()
            .copied()
            .chain(
                self.roads
                    .iter()
                    .flat_map(|road| road.lanes().iter().flat_map(|lane| lane.cars())),
            )
            .collect()
    }

    fn try_spawn(&mut self, dir: Direction, step: usize, car: CarId) -> bool {
        if step == 0 {
            match self.slots[dir.index()] {
                Some(_) => false,
                None => {
                    self.slots[dir.index()] = Some(car);
                    true
                }
            }
        } else {
            self.road_mut(dir).place(step, car)
        }
    }

    fn try_despawn(&mut self, fleet: &mut Fleet) -> usize {
        let arrived = |car: &CarId| fleet.get(*car).is_some_and(Car::is_despawn);

        let mut removed = Vec::new();
        for dir in Direction::ALL {
            if self.slot(dir).is_some_and(|car| arrived(&car)) {
                removed.extend(self.slots[dir.index()].take());
            }
            let road = &self.roads[dir.index()];
            let mut hits = Vec::new();
            for (lane, cars) in road.lanes().iter().enumerate() {
                for step in 1..=road.length() {
                    if cars.at(step).is_some_and(|car| arrived(&car)) {
                        hits.push((lane, step));
                    }
                }
            }
            for (lane, step) in hits {
                removed.extend(self.roads[dir.index()].take(lane, step));
            }
        }

        for car in &removed {
            fleet.despawning(*car);
        }
        removed.len()
    }

    fn update_road_sites(&mut self, fleet: &mut Fleet) -> SimResult<usize> {
        let mut moved = 0;
        for dir in Direction::ALL {
            for (car, step) in self.road_mut(dir).advance() {
                fleet.move_car(car, self.position(dir, step))?;
                moved += 1;
            }
        }
        Ok(moved)
    }

    fn update_exit(&mut self, fleet: &mut Fleet) -> SimResult<usize> {
        let mut moved = 0;
        for dir in Direction::ALL {
            let Some(car) = self.slot(dir) else { continue };
            if self.exit_of(car, fleet)? != dir || !self.road_mut(dir).place(1, car) {
                continue;
            }
            self.slots[dir.index()] = None;
            fleet.move_car(car, self.position(dir, 1))?;
            moved += 1;
        }
        Ok(moved)
    }

    fn update_intersection(&mut self, fleet: &mut Fleet) -> SimResult<usize> {
        let occupied = self.slots.map(|slot| slot.is_some());
        let mut advancing = [false; 4];
        for dir in Direction::ALL {
            if let Some(car) = self.slot(dir) {
                advancing[dir.index()] = self.exit_of(car, fleet)? != dir;
            }
        }

        // Drop cars whose next slot stays occupied until nothing changes.
        loop {
            let mut changed = false;
            for i in 0..4 {
                let next = (i + 1) % 4;
                if advancing[i] && occupied[next] && !advancing[next] {
                    advancing[i] = false;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        let previous = self.slots;
        let mut moved = 0;
        self.slots = [None; 4];
        for dir in Direction::ALL {
            let Some(car) = previous[dir.index()] else { continue };
            if advancing[dir.index()] {
                let next = dir.next_in_circulation();
                self.slots[next.index()] = Some(car);
                fleet.move_car(car, self.position(next, 0))?;
                moved += 1;
            } else {
                self.slots[dir.index()] = Some(car);
            }
        }
        Ok(moved)
    }

    fn can_admit(&self, port: Direction) -> bool {
        self.slot(port).is_none() && self.neighbor(port).is_some()
    }

    fn release_head(&mut self, dir: Direction) -> Option<CarId> {
        self.road_mut(dir).release_head()
    }

    fn admit(&mut self, port: Direction, car: CarId, fleet: &mut Fleet) -> SimResult<()> {
        self.slots[port.index()] = Some(car);
        fleet.move_car(car, self.position(port, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation_engine::grid::{LatticeBuilder, Topology};

    fn reference_lattice() -> Topology {
        LatticeBuilder::new(10, 8, 5).uniform(3).build().unwrap()
    }

    fn node(topology: &Topology, coord: Coord) -> Roundabout {
        let mut node = Roundabout::build(topology.node_geometry(coord));
        node.connect(Direction::ALL.map(|dir| topology.neighbor(coord, dir)));
        node
    }

    fn spawn(
        topology: &Topology,
        node: &mut Roundabout,
        fleet: &mut Fleet,
        origin: Position,
        destination: Position,
    ) -> CarId {
        let car = Car::with_destination(topology, origin, destination).unwrap();
        let id = fleet.insert(car);
        assert!(node.try_spawn(origin.dir, origin.step, id));
        id
    }

    #[test]
    fn spawn_refuses_occupied_site() {
        let topology = reference_lattice();
        let mut node = node(&topology, Coord::new(1, 1));
        let mut fleet = Fleet::new();
        let origin = Position::new(1, 1, Direction::Forward, 3);
        spawn(&topology, &mut node, &mut fleet, origin, Position::new(1, 1, Direction::Forward, 5));
        let other = fleet.insert(
            Car::with_destination(&topology, origin, Position::new(1, 1, Direction::Forward, 6)).unwrap(),
        );
        assert!(!node.try_spawn(Direction::Forward, 3, other));
        assert_eq!(node.num_cars_at(Direction::Forward, 3), 1);
        assert_eq!(node.occupied_sites(), 1);
    }

    #[test]
    fn circulating_car_walks_to_its_exit_and_leaves() {
        let topology = reference_lattice();
        let coord = Coord::new(2, 1);
        let mut node = node(&topology, coord);
        let mut fleet = Fleet::new();
        let id = spawn(
            &topology,
            &mut node,
            &mut fleet,
            Position::new(2, 1, Direction::Inbound, 0),
            Position::new(2, 1, Direction::Outbound, 2),
        );
        assert_eq!(node.car_out_at(Direction::Inbound, 0, &fleet), Some(Direction::Outbound));

        assert_eq!(node.update_exit(&mut fleet).unwrap(), 0);
        assert_eq!(node.update_intersection(&mut fleet).unwrap(), 1);
        assert_eq!(node.num_cars_at(Direction::Forward, 0), 1);
        assert_eq!(node.update_intersection(&mut fleet).unwrap(), 1);
        assert_eq!(node.num_cars_at(Direction::Outbound, 0), 1);
        // parked at its exit: no longer circulates
        assert_eq!(node.update_intersection(&mut fleet).unwrap(), 0);

        assert_eq!(node.update_exit(&mut fleet).unwrap(), 1);
        assert_eq!(fleet.get(id).unwrap().current(), Position::new(2, 1, Direction::Outbound, 1));
        assert_eq!(node.update_road_sites(&mut fleet).unwrap(), 1);
        assert_eq!(node.try_despawn(&mut fleet), 1);
        assert!(fleet.is_empty());
        assert_eq!(node.occupied_sites(), 0);
    }

    #[test]
    fn full_ring_of_circulating_cars_rotates() {
        let topology = reference_lattice();
        let coord = Coord::new(4, 1);
        let mut node = node(&topology, coord);
        let mut fleet = Fleet::new();
        // every car wants the port two slots ahead of where it starts
        let ids: Vec<CarId> = Direction::ALL
            .into_iter()
            .map(|dir| {
                let exit = dir.opposite();
                spawn(
                    &topology,
                    &mut node,
                    &mut fleet,
                    Position::new(4, 1, dir, 0),
                    Position::new(4, 1, exit, 1),
                )
            })
            .collect();

        assert_eq!(node.update_intersection(&mut fleet).unwrap(), 4);
        for (i, id) in ids.iter().enumerate() {
            let expected = Direction::from_index(i + 1);
            assert_eq!(fleet.get(*id).unwrap().current().dir, expected);
        }
    }

    #[test]
    fn parked_car_blocks_the_queue_behind_it() {
        let topology = reference_lattice();
        let coord = Coord::new(4, 1);
        let mut node = node(&topology, coord);
        let mut fleet = Fleet::new();
        let parked = spawn(
            &topology,
            &mut node,
            &mut fleet,
            Position::new(4, 1, Direction::Forward, 0),
            Position::new(4, 1, Direction::Forward, 2),
        );
        let queued = spawn(
            &topology,
            &mut node,
            &mut fleet,
            Position::new(4, 1, Direction::Inbound, 0),
            Position::new(4, 1, Direction::Outbound, 2),
        );
        let free = spawn(
            &topology,
            &mut node,
            &mut fleet,
            Position::new(4, 1, Direction::Backward, 0),
            Position::new(4, 1, Direction::Forward, 2),
        );
        // fill the forward road's first site so the parked car cannot leave
        let blocker = fleet.insert(
            Car::with_destination(
                &topology,
                Position::new(4, 1, Direction::Forward, 1),
                Position::new(4, 1, Direction::Forward, 9),
            )
            .unwrap(),
        );
        assert!(node.try_spawn(Direction::Forward, 1, blocker));

        assert_eq!(node.update_exit(&mut fleet).unwrap(), 0);
        assert_eq!(node.update_intersection(&mut fleet).unwrap(), 0);
        assert_eq!(fleet.get(parked).unwrap().current().dir, Direction::Forward);
        assert_eq!(fleet.get(queued).unwrap().current().dir, Direction::Inbound);
        assert_eq!(fleet.get(free).unwrap().current().dir, Direction::Backward);
        assert_eq!(node.num_cars_at(Direction::Forward, 0), 1);
        assert_eq!(node.num_cars_at(Direction::Forward, 1), 1);
        assert_eq!(node.occupied_sites(), 4);

        // once the road clears, the parked car leaves and frees its slot
        assert_eq!(node.update_road_sites(&mut fleet).unwrap(), 1);
        assert_eq!(node.update_exit(&mut fleet).unwrap(), 1);
        assert_eq!(fleet.get(parked).unwrap().current(), Position::new(4, 1, Direction::Forward, 1));
        assert_eq!(node.num_cars_at(Direction::Forward, 0), 0);
        assert_eq!(node.occupied_sites(), 4);
    }

    #[test]
    fn arriving_car_takes_the_slot_of_its_port() {
        let topology = reference_lattice();
        let upstream = Coord::new(2, 1);
        let downstream = Coord::new(3, 1);
        let mut from = node(&topology, upstream);
        let mut to = node(&topology, downstream);
        let mut fleet = Fleet::new();
        let id = spawn(
            &topology,
            &mut from,
            &mut fleet,
            Position::new(2, 1, Direction::Forward, 11),
            Position::new(3, 1, Direction::Outbound, 3),
        );

        from.update_road_sites(&mut fleet).unwrap();
        // reached the far end this tick: held until the next one
        assert_eq!(from.release_head(Direction::Forward), None);
        from.update_road_sites(&mut fleet).unwrap();

        assert!(to.can_admit(Direction::Backward));
        let car = from.release_head(Direction::Forward).unwrap();
        assert_eq!(car, id);
        to.admit(Direction::Backward, car, &mut fleet).unwrap();
        assert!(!to.can_admit(Direction::Backward));
        assert_eq!(fleet.get(id).unwrap().current(), Position::new(3, 1, Direction::Backward, 0));
        assert_eq!(to.color_at(Direction::Backward, 0, &fleet), Color::for_exit(Direction::Outbound));
        assert_eq!(from.color_at(Direction::Forward, 12, &fleet), Color::ROAD);
    }

    #[test]
    fn boundary_ports_admit_nothing() {
        let topology = reference_lattice();
        let inner = node(&topology, Coord::new(0, 0));
        let outer = node(&topology, Coord::new(0, 2));
        assert!(!inner.can_admit(Direction::Inbound));
        assert!(!outer.can_admit(Direction::Outbound));
        assert!(inner.can_admit(Direction::Outbound));
    }
}
