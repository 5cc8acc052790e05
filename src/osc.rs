//! Outbound OSC messages over UDP.

use crate::types::Measurement;
use crate::{LidarError, Result};
use rosc::{OscMessage, OscPacket, OscType};
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

/// OSC address every measurement is published under.
pub const ADDRESS: &str = "/lidar/data";

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;

/// One measurement as published downstream: `[new_scan, quality, angle, distance]`.
///
/// `new_scan` is always true; scan boundaries are not signalled on the wire.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutboundMessage {
    pub new_scan: bool,
    pub quality: i32,
    pub angle: f32,
    pub distance: f32,
}

impl OutboundMessage {
    pub fn from_measurement(m: &Measurement) -> Self {
        Self {
            new_scan: true,
            quality: m.quality as i32,
            angle: m.angle as f32,
            distance: m.distance as f32,
        }
    }

    pub fn to_osc(&self) -> OscMessage {
        OscMessage {
            addr: ADDRESS.to_string(),
            args: vec![
                OscType::Bool(self.new_scan),
                OscType::Int(self.quality),
                OscType::Float(self.angle),
                OscType::Float(self.distance),
            ],
        }
    }

    /// Encode as a single OSC datagram.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(rosc::encoder::encode(&OscPacket::Message(self.to_osc()))?)
    }
}

/// Anything that can forward outbound messages.
pub trait MessageSink {
    fn send(&mut self, msg: &OutboundMessage) -> Result<()>;
}

/// Fire-and-forget OSC client bound to one destination.
#[derive(Debug)]
pub struct OscClient {
    socket: UdpSocket,
    target: SocketAddr,
}

impl OscClient {
    /// Resolve the destination and bind an ephemeral local socket.
    ///
    /// Fails on an empty host, a name that does not resolve, or a bind error.
    pub fn new(host: &str, port: u16) -> Result<Self> {
        if host.trim().is_empty() {
            return Err(LidarError::InvalidHost(host.to_string()));
        }
        let target = (host, port)
            .to_socket_addrs()
            .map_err(|e| LidarError::AddressResolution {
                host: host.to_string(),
                port,
                reason: e.to_string(),
            })?
            .next()
            .ok_or_else(|| LidarError::AddressResolution {
                host: host.to_string(),
                port,
                reason: "no addresses found".into(),
            })?;

        let bind_addr = if target.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(bind_addr)?;
        log::info!("OSC client initialized - sending to {}:{}", host, port);
        Ok(Self { socket, target })
    }

    /// Resolved destination of every message.
    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

impl MessageSink for OscClient {
    fn send(&mut self, msg: &OutboundMessage) -> Result<()> {
        let buf = msg.encode()?;
        self.socket.send_to(&buf, self.target)?;
        Ok(())
    }
}
