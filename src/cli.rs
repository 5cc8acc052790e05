use crate::osc::{DEFAULT_HOST, DEFAULT_PORT};
use crate::protocol::DEFAULT_BAUD_RATE;
use clap::Parser;

/// LIDAR data acquisition with OSC output.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "lidar-osc", version, about, long_about = None)]
pub struct Args {
    /// Serial port the LIDAR is attached to (e.g. COM5, /dev/ttyUSB0)
    #[arg(long = "com_port")]
    pub com_port: String,

    /// OSC server IP address
    #[arg(long = "osc_serverip", default_value = DEFAULT_HOST)]
    pub osc_serverip: String,

    /// OSC server port
    #[arg(long = "osc_serverport", default_value_t = DEFAULT_PORT)]
    pub osc_serverport: u16,

    /// Serial baud rate
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    pub baudrate: u32,
}

/// Runtime settings resolved from the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub com_port: String,
    pub osc_host: String,
    pub osc_port: u16,
    pub baud_rate: u32,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            com_port: args.com_port,
            osc_host: args.osc_serverip,
            osc_port: args.osc_serverport,
            baud_rate: args.baudrate,
        }
    }
}
