//! Stream RPLIDAR measurements to an OSC server.
//!
//! Usage: lidar-osc --com_port /dev/ttyUSB0 [--osc_serverip 127.0.0.1] [--osc_serverport 8000]
//! Press Ctrl+C to stop.

use clap::Parser;
use lidar_osc::cli::{Args, Config};
use lidar_osc::{signal, LidarController, SerialConnector, StopReason};

fn main() {
    let config = Config::from(Args::parse());
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let shutdown = match signal::install() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to install signal handler: {}", e);
            std::process::exit(1);
        }
    };

    let connector = SerialConnector::new(config.baud_rate, shutdown.clone());
    let mut controller = match LidarController::new(
        &config.com_port,
        &config.osc_host,
        config.osc_port,
        connector,
        shutdown,
    ) {
        Ok(c) => c,
        Err(e) => {
            log::error!("Error setting up OSC client: {}", e);
            std::process::exit(1);
        }
    };

    match controller.start() {
        Ok(StopReason::Interrupted) => log::info!("Interrupted, exiting"),
        Ok(_) => {}
        Err(_) => std::process::exit(1),
    }
}
