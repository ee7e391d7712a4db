use crate::shared_data::{FlowRecord, TickReport};
use plotters::prelude::*;
use serde::Serialize;
use std::error::Error;
use std::fs::OpenOptions;
use std::path::Path;

/// Generic helper to append records to a CSV file, writing the header only when
/// the file is new.
pub fn log_to_csv<T: Serialize>(filename: impl AsRef<Path>, records: &[T]) -> Result<(), Box<dyn Error>> {
    let path = filename.as_ref();
    let file_exists = path.exists();
    let file = OpenOptions::new().append(true).create(true).open(path)?;
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_tick_reports(filename: impl AsRef<Path>, reports: &[TickReport]) -> Result<(), Box<dyn Error>> {
    log_to_csv(filename, reports)
}

pub fn write_flow_records(filename: impl AsRef<Path>, records: &[FlowRecord]) -> Result<(), Box<dyn Error>> {
    log_to_csv(filename, records)
}

pub fn read_flow_records(filename: impl AsRef<Path>) -> Result<Vec<FlowRecord>, Box<dyn Error>> {
    let mut rdr = csv::Reader::from_path(filename)?;
    let mut records = Vec::new();
    for result in rdr.deserialize() {
        records.push(result?);
    }
    Ok(records)
}

/// Draws flow against measured density as a PNG.
pub fn plot_fundamental_diagram(filename: impl AsRef<Path>, records: &[FlowRecord]) -> Result<(), Box<dyn Error>> {
    if records.is_empty() {
        log::info!("No flow records to plot.");
        return Ok(());
    }

    let max_density = records.iter().map(|r| r.density).fold(0.0, f64::max).max(0.01);
    let max_flow = records.iter().map(|r| r.flow).fold(0.0, f64::max).max(0.01);

    let backend = BitMapBackend::new(filename.as_ref(), (800, 600));
    let root = backend.into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Fundamental diagram", ("sans-serif", 20))
        .margin(40)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0.0..max_density * 1.05, 0.0..max_flow * 1.1)?;

    chart
        .configure_mesh()
        .x_desc("density (cars / site)")
        .y_desc("flow (moves / site / tick)")
        .draw()?;
    chart.draw_series(LineSeries::new(records.iter().map(|r| (r.density, r.flow)), &BLUE))?;
    chart.draw_series(
        records
            .iter()
            .map(|r| Circle::new((r.density, r.flow), 4, RED.filled())),
    )?;

    root.present()?;
    log::info!("Fundamental diagram saved to {}", filename.as_ref().display());
    Ok(())
}
