// fundamental_diagram_main.rs
use ringroad_sim::global_variables::{FLOW_PLOT_PNG, FLOW_RECORD_CSV};
use ringroad_sim::monitoring::density_sweep::run_density_sweep;
use ringroad_sim::monitoring::traffic_monitoring_system::{plot_fundamental_diagram, write_flow_records};
use ringroad_sim::SimulationConfig;
use std::error::Error;

const WARMUP_TICKS: u64 = 200;
const MEASURE_TICKS: u64 = 500;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => SimulationConfig::load(&path).map_err(|e| e.to_string())?,
        None => SimulationConfig::default(),
    };

    let densities: Vec<f64> = (1..=18).map(|i| i as f64 * 0.025).collect();
    let records = run_density_sweep(&config, &densities, WARMUP_TICKS, MEASURE_TICKS).await?;

    write_flow_records(FLOW_RECORD_CSV, &records).map_err(|e| e.to_string())?;
    plot_fundamental_diagram(FLOW_PLOT_PNG, &records).map_err(|e| e.to_string())?;
    for record in &records {
        log::info!(
            "density {:.3}: flow {:.4} ({:.1} moves/tick)",
            record.density,
            record.flow,
            record.moved_per_tick
        );
    }
    Ok(())
}
