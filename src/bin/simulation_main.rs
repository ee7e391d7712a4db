// simulation_main.rs
use ringroad_sim::global_variables::TICK_REPORT_CSV;
use ringroad_sim::monitoring::traffic_monitoring_system::write_tick_reports;
use ringroad_sim::{Field, SimulationConfig};
use std::error::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => SimulationConfig::load(&path)?,
        None => SimulationConfig::default(),
    };
    log::info!("Starting simulation with {:?}", config);

    let mut field: Field = Field::from_config(&config)?;
    let mut reports = Vec::with_capacity(config.ticks as usize);
    for _ in 0..config.ticks {
        let report = field.tick()?;
        if report.tick % config.report_every == 0 {
            log::info!(
                "tick {}: moved {}, arrived {}, spawned {}, {} cars (density {:.3})",
                report.tick,
                report.moved,
                report.despawned,
                report.spawned,
                report.live_cars,
                report.density
            );
        }
        reports.push(report);
    }

    write_tick_reports(TICK_REPORT_CSV, &reports)?;
    log::info!(
        "Finished {} ticks: {} cars spawned, {} arrived",
        field.tick_count(),
        field.fleet().spawned_total(),
        field.fleet().despawned_total()
    );
    Ok(())
}
