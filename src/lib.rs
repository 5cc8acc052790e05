//! # lidar-osc - RPLIDAR scans to OSC
//!
//! Reads standard-mode scans from an RPLIDAR A-series rangefinder over a
//! serial port and republishes every measurement as an OSC message:
//!
//! ```text
//! /lidar/data  ,Tiff  [true, quality, angle_deg, distance_mm]
//! ```
//!
//! ## Quick Start
//! ```no_run
//! use lidar_osc::{LidarController, SerialConnector, Shutdown};
//!
//! let shutdown = Shutdown::new();
//! let connector = SerialConnector::new(115_200, shutdown.clone());
//! let mut controller =
//!     LidarController::new("/dev/ttyUSB0", "127.0.0.1", 8000, connector, shutdown).unwrap();
//! controller.start().unwrap();
//! ```

pub mod error;
pub mod types;
pub mod protocol;
pub mod transport;
pub mod scan;
pub mod device;
pub mod driver;
pub mod osc;
pub mod signal;
pub mod controller;
pub mod cli;

pub use error::LidarError;
pub use types::*;
pub use device::RpLidar;
pub use driver::{Connector, ScanSource, SerialConnector};
pub use osc::{MessageSink, OscClient, OutboundMessage};
pub use signal::Shutdown;
pub use controller::{LidarController, StopReason};

/// Result type alias for lidar-osc operations.
pub type Result<T> = std::result::Result<T, LidarError>;
