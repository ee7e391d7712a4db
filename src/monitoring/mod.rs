pub mod density_sweep;
pub mod traffic_monitoring_system;
