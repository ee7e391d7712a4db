use crate::simulation_engine::vehicles::CarId;

/// One lane of a road segment: sites for steps `1..=length`.
#[derive(Debug, Clone)]
pub struct Lane {
    sites: Vec<Option<CarId>>,
    /// The car at the far end got there this tick and must wait before entering the next node.
    fresh_head: bool,
}

impl Lane {
    pub fn new(length: usize) -> Self {
        Self {
            sites: vec![None; length],
            fresh_head: false,
        }
    }

    pub fn at(&self, step: usize) -> Option<CarId> {
        step.checked_sub(1)
            .and_then(|i| self.sites.get(i))
            .copied()
            .flatten()
    }

    pub fn is_free(&self, step: usize) -> bool {
        step >= 1 && step <= self.sites.len() && self.sites[step - 1].is_none()
    }

    /// Places a car at a free step. Returns false if the site is taken or out of range.
    pub fn place(&mut self, step: usize, car: CarId) -> bool {
        if !self.is_free(step) {
            return false;
        }
        self.sites[step - 1] = Some(car);
        if step == self.sites.len() {
            self.fresh_head = true;
        }
        true
    }

    pub fn take(&mut self, step: usize) -> Option<CarId> {
        step.checked_sub(1)
            .and_then(|i| self.sites.get_mut(i))
            .and_then(Option::take)
    }

    pub fn occupied(&self) -> usize {
        self.sites.iter().filter(|site| site.is_some()).count()
    }

    pub fn cars(&self) -> impl Iterator<Item = CarId> + '_ {
        self.sites.iter().flatten().copied()
    }

    /// Moves every car whose next site was free at the start of the call one step forward.
    /// Returns `(car, new step)` for each car that moved.
    pub fn advance(&mut self) -> Vec<(CarId, usize)> {
        self.fresh_head = false;
        let mut moved = Vec::new();
        let Some(mut ahead_taken) = self.sites.last().map(Option::is_some) else {
            return moved;
        };
        for i in (0..self.sites.len() - 1).rev() {
            let taken = self.sites[i].is_some();
            if taken && !ahead_taken {
                self.sites[i + 1] = self.sites[i].take();
                if let Some(car) = self.sites[i + 1] {
                    moved.push((car, i + 2));
                }
            }
            ahead_taken = taken;
        }
        if moved.iter().any(|&(_, step)| step == self.sites.len()) {
            self.fresh_head = true;
        }
        moved
    }

    /// Takes the car at the far end unless it arrived there this tick.
    pub fn release_head(&mut self) -> Option<CarId> {
        if self.fresh_head {
            return None;
        }
        self.sites.last_mut().and_then(Option::take)
    }

    pub fn has_waiting_head(&self) -> bool {
        !self.fresh_head && matches!(self.sites.last(), Some(Some(_)))
    }
}

/// Road segment leaving a node through one port.
#[derive(Debug, Clone)]
pub struct Road {
    length: usize,
    lanes: Vec<Lane>,
    /// Round-robin cursor over lanes competing for the downstream slot.
    next_release: usize,
}

impl Road {
    pub fn new(length: usize, lanes: usize) -> Self {
        Self {
            length,
            lanes: (0..lanes).map(|_| Lane::new(length)).collect(),
            next_release: 0,
        }
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    pub fn lanes(&self) -> &[Lane] {
        &self.lanes
    }

    pub fn cars_at(&self, step: usize) -> impl Iterator<Item = CarId> + '_ {
        self.lanes.iter().filter_map(move |lane| lane.at(step))
    }

    /// Places `car` in the lowest free lane at `step`.
    pub fn place(&mut self, step: usize, car: CarId) -> bool {
        self.lanes.iter_mut().any(|lane| lane.place(step, car))
    }

    pub fn take(&mut self, lane: usize, step: usize) -> Option<CarId> {
        self.lanes.get_mut(lane).and_then(|lane| lane.take(step))
    }

    pub fn occupied(&self) -> usize {
        self.lanes.iter().map(Lane::occupied).sum()
    }

    pub fn advance(&mut self) -> Vec<(CarId, usize)> {
        self.lanes.iter_mut().flat_map(Lane::advance).collect()
    }

    /// Releases one waiting car from the far end, rotating fairly between lanes.
    pub fn release_head(&mut self) -> Option<CarId> {
        let count = self.lanes.len();
        for offset in 0..count {
            let lane = (self.next_release + offset) % count;
            if let Some(car) = self.lanes[lane].release_head() {
                self.next_release = (lane + 1) % count;
                return Some(car);
            }
        }
        None
    }
}
