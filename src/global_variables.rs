// Routing
/// Subtended angle (radians) at or above which a car detours through the innermost ring.
pub const DETOUR_THRESHOLD_RAD: f64 = 2.0;

// Spawning
/// Rejection-sampling budget for finding a free site for one new car.
pub const MAX_SPAWN_TRIALS: usize = 50;

// Default lattice geometry
pub const DEFAULT_CENTER_RADIUS: usize = 10;
pub const DEFAULT_RADIAL_ROADS: usize = 8;
pub const DEFAULT_RING_ROADS: usize = 3;
pub const DEFAULT_RADIAL_LENGTH: usize = 5;

// Default run parameters
pub const DEFAULT_SPAWN_PROBABILITY: f64 = 0.0;
pub const DEFAULT_INITIAL_DENSITY: f64 = 0.1;
pub const DEFAULT_TICKS: u64 = 1_000;
pub const DEFAULT_REPORT_EVERY: u64 = 100;

// Output files
pub const TICK_REPORT_CSV: &str = "tick_reports.csv";
pub const FLOW_RECORD_CSV: &str = "fundamental_diagram.csv";
pub const FLOW_PLOT_PNG: &str = "fundamental_diagram.png";
