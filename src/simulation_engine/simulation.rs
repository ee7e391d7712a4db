// simulation.rs
use crate::config::{DensityPolicy, SimulationConfig};
use crate::global_variables::MAX_SPAWN_TRIALS;
use crate::shared_data::{Color, TickReport};
use crate::simulation_engine::error::{SimError, SimResult};
use crate::simulation_engine::grid::Topology;
use crate::simulation_engine::intersections::{Coord, Direction, Intersection, Position};
use crate::simulation_engine::roundabout::Roundabout;
use crate::simulation_engine::vehicles::{Car, Fleet};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A radial-ring road network and the cars on it.
///
/// Every tick runs five phases, each over every node before the next begins:
/// despawn arrived cars, advance cars along roads, release cars from the
/// circulation onto roads, circulate, and admit cars from roads into the
/// circulation. New cars are spawned after the last phase.
pub struct Field<I: Intersection = Roundabout> {
    topology: Topology,
    nodes: Vec<I>,
    fleet: Fleet,
    spawn_probability: f64,
    density_policy: DensityPolicy,
    rng: StdRng,
    tick: u64,
}

impl<I: Intersection> Field<I> {
    pub fn new(topology: Topology) -> Self {
        Self::with_rng(topology, StdRng::from_os_rng())
    }

    pub fn with_seed(topology: Topology, seed: u64) -> Self {
        Self::with_rng(topology, StdRng::seed_from_u64(seed))
    }

    fn with_rng(topology: Topology, rng: StdRng) -> Self {
        let mut nodes: Vec<I> = topology
            .coords()
            .map(|coord| I::build(topology.node_geometry(coord)))
            .collect();
        for node in &mut nodes {
            let coord = node.coord();
            node.connect(Direction::ALL.map(|dir| topology.neighbor(coord, dir)));
        }

        Self {
            topology,
            nodes,
            fleet: Fleet::new(),
            spawn_probability: 0.0,
            density_policy: DensityPolicy::Off,
            rng,
            tick: 0,
        }
    }

    /// Builds the lattice described by `config` and seeds it with cars at the
    /// configured initial density.
    pub fn from_config(config: &SimulationConfig) -> SimResult<Self> {
        config.validate()?;
        let topology = config.topology()?;
        let mut field = match config.seed {
            Some(seed) => Self::with_seed(topology, seed),
            None => Self::new(topology),
        };
        field.set_spawn_probability(config.spawn_probability)?;
        field.set_density_policy(config.density_policy);
        field.initialize_density(config.initial_density)?;
        Ok(field)
    }

    /// Expected number of cars spawned per tick. Must be finite and non-negative.
    pub fn set_spawn_probability(&mut self, probability: f64) -> SimResult<()> {
        if !probability.is_finite() || probability < 0.0 {
            return Err(SimError::InvalidConfig(format!(
                "spawn probability must be finite and non-negative, got {probability}"
            )));
        }
        self.spawn_probability = probability;
        Ok(())
    }

    pub fn set_density_policy(&mut self, policy: DensityPolicy) {
        self.density_policy = policy;
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn fleet(&self) -> &Fleet {
        &self.fleet
    }

    pub fn car_count(&self) -> usize {
        self.fleet.len()
    }

    pub fn site_count(&self) -> usize {
        self.topology.site_count()
    }

    pub fn density(&self) -> f64 {
        self.car_count() as f64 / self.site_count() as f64
    }

    /// Ticks completed so far.
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn intersection(&self, coord: Coord) -> Option<&I> {
        (coord.x < self.topology.num_x() && coord.y < self.topology.num_y())
            .then(|| &self.nodes[self.topology.index(coord)])
    }

    pub fn length_at(&self, x: usize, y: usize, dir: Direction) -> usize {
        self.topology.length_at(x, y, dir)
    }

    /// Places `count` cars at random free sites.
    pub fn initialize(&mut self, count: usize) -> SimResult<()> {
        let placed = self.create_cars(count)?;
        log::info!(
            "initialized {} cars on {} sites (density {:.3})",
            placed,
            self.site_count(),
            self.density()
        );
        Ok(())
    }

    /// Places `density * site_count` cars at random free sites.
    pub fn initialize_density(&mut self, density: f64) -> SimResult<()> {
        let count = (density.clamp(0.0, 1.0) * self.site_count() as f64) as usize;
        self.initialize(count)
    }

    /// Spawns `count` cars, each at a site found by rejection sampling.
    pub fn create_cars(&mut self, count: usize) -> SimResult<usize> {
        for _ in 0..count {
            self.spawn_one()?;
        }
        Ok(count)
    }

    fn spawn_one(&mut self) -> SimResult<()> {
        for _ in 0..MAX_SPAWN_TRIALS {
            let x = self.rng.random_range(0..self.topology.num_x());
            let y = self.rng.random_range(0..self.topology.num_y());
            let dir = Direction::from_index(self.rng.random_range(0..4));
            let length = self.topology.length_at(x, y, dir);
            if length == 0 {
                continue;
            }
            let step = self.rng.random_range(0..length);
            let index = self.topology.index(Coord::new(x, y));
            let origin = Position::new(x, y, dir, step);
            let car = Car::spawn(&self.topology, origin, &mut self.rng)?;
            let destination = car.destination();
            let id = self.fleet.insert(car);
            if !self.nodes[index].try_spawn(dir, step, id) {
                self.fleet.withdraw(id);
                continue;
            }
            log::trace!("spawned car at {} heading to {}", origin, destination);
            return Ok(());
        }

        log::warn!(
            "spawn saturated: {} cars on {} sites",
            self.car_count(),
            self.site_count()
        );
        Err(SimError::SpawnSaturation {
            trials: MAX_SPAWN_TRIALS,
        })
    }

    /// Number of cars to spawn this tick: the whole part of the spawn
    /// probability plus one more with probability equal to its fraction.
    fn draw_spawn_count(&mut self) -> usize {
        let whole = self.spawn_probability.trunc() as usize;
        let extra = self.rng.random_bool(self.spawn_probability.fract());
        whole + usize::from(extra)
    }

    /// Advances the system one tick and returns the number of cars moved.
    pub fn update(&mut self) -> SimResult<usize> {
        self.tick().map(|report| report.moved)
    }

    /// Advances the system one tick.
    pub fn tick(&mut self) -> SimResult<TickReport> {
        let live_before = self.fleet.len();

        let despawned: usize = self
            .nodes
            .iter_mut()
            .map(|node| node.try_despawn(&mut self.fleet))
            .sum();
        let mut spawned = 0;
        if self.density_policy == DensityPolicy::ImmediateRespawn {
            spawned += self.create_cars(despawned)?;
        }

        let mut moved = 0;
        for node in &mut self.nodes {
            moved += node.update_road_sites(&mut self.fleet)?;
        }
        for node in &mut self.nodes {
            moved += node.update_exit(&mut self.fleet)?;
        }
        for node in &mut self.nodes {
            moved += node.update_intersection(&mut self.fleet)?;
        }
        moved += self.update_enter()?;

        let count = self.draw_spawn_count();
        spawned += self.create_cars(count)?;

        self.tick += 1;
        debug_assert_eq!(self.fleet.len() + despawned, live_before + spawned);

        let report = TickReport {
            tick: self.tick,
            moved,
            despawned,
            spawned,
            live_cars: self.car_count(),
            density: self.density(),
        };
        log::trace!("{:?}", report);
        Ok(report)
    }

    /// Admits cars waiting at the far end of each road into the next node.
    fn update_enter(&mut self) -> SimResult<usize> {
        let mut moved = 0;
        for index in 0..self.nodes.len() {
            for port in Direction::ALL {
                if !self.nodes[index].can_admit(port) {
                    continue;
                }
                let Some(upstream) = self.nodes[index].neighbor(port) else {
                    continue;
                };
                let upstream = self.topology.index(upstream);
                let Some(car) = self.nodes[upstream].release_head(port.opposite()) else {
                    continue;
                };
                self.nodes[index].admit(port, car, &mut self.fleet)?;
                moved += 1;
            }
        }
        Ok(moved)
    }

    fn node_at(&self, position: &Position) -> Option<&I> {
        self.topology
            .contains(position)
            .then(|| &self.nodes[self.topology.index(position.coord())])
    }

    /// Number of cars at a position (one per lane at most).
    pub fn num_cars_by_position(&self, position: &Position) -> usize {
        self.node_at(position)
            .map_or(0, |node| node.num_cars_at(position.dir, position.step))
    }

    pub fn color_at(&self, position: &Position) -> Color {
        self.node_at(position).map_or(Color::ROAD, |node| {
            node.color_at(position.dir, position.step, &self.fleet)
        })
    }

    /// Exit port of the car at a position, for diagnostics.
    pub fn car_out_at(&self, position: &Position) -> Option<Direction> {
        self.node_at(position)
            .and_then(|node| node.car_out_at(position.dir, position.step, &self.fleet))
    }

    /// Sites currently holding a car, counted from the nodes' own storage.
    pub fn occupied_sites(&self) -> usize {
        self.nodes.iter().map(|node| node.occupied_sites()).sum()
    }
}
