use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};

use rosc::{OscMessage, OscPacket, OscType};

use super::{EngineTransport, Route, TransportError, TransportResult};
use crate::codec::WirePayload;

/// OSC addresses the engine listens on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OscAddresses {
    pub melody: String,
    pub chord: String,
    pub stop: String,
}

impl Default for OscAddresses {
    fn default() -> Self {
        Self {
            melody: "/melody".to_string(),
            chord: "/chord".to_string(),
            stop: "/stop".to_string(),
        }
    }
}

impl OscAddresses {
    pub fn for_route(&self, route: Route) -> &str {
        match route {
            Route::SequentialNotes => &self.melody,
            Route::SimultaneousChord => &self.chord,
        }
    }
}

/// Transport that talks to the engine with OSC over UDP.
///
/// A melody goes out as one message on `/melody` or `/chord` whose single
/// string argument is the JSON payload. `/stop` with no arguments stops
/// everything; `/stop <int>` stops one target.
pub struct OscTransport {
    socket: UdpSocket,
    engine_addr: SocketAddr,
    addresses: OscAddresses,
}

impl OscTransport {
    /// Bind an ephemeral local socket for sending to `engine_addr`.
    pub fn connect(engine_addr: SocketAddr, addresses: OscAddresses) -> std::io::Result<Self> {
        let local: SocketAddr = if engine_addr.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local)?;
        log::info!(target: "transport::osc", "sending to engine at {}", engine_addr);
        Ok(Self {
            socket,
            engine_addr,
            addresses,
        })
    }

    pub fn engine_addr(&self) -> SocketAddr {
        self.engine_addr
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn send_message(&self, addr: &str, args: Vec<OscType>) -> TransportResult {
        let msg = OscPacket::Message(OscMessage {
            addr: addr.to_string(),
            args,
        });
        let buf = rosc::encoder::encode(&msg).map_err(|e| TransportError::Encode(e.to_string()))?;
        self.socket.send_to(&buf, self.engine_addr)?;
        Ok(())
    }
}

impl EngineTransport for OscTransport {
    fn send_melody(&self, payload: &WirePayload) -> TransportResult {
        let route = Route::for_payload(payload);
        let addr = self.addresses.for_route(route);
        let json = serde_json::to_string(payload)?;
        log::debug!(
            target: "transport::osc",
            "{} -> target {} ({} notes, loop={})",
            addr,
            payload.metadata.target_index,
            payload.metadata.note_count,
            payload.metadata.looping
        );
        self.send_message(addr, vec![OscType::String(json)])
    }

    fn stop_all(&self) -> TransportResult {
        log::debug!(target: "transport::osc", "{} (all targets)", self.addresses.stop);
        self.send_message(&self.addresses.stop, Vec::new())
    }

    fn stop_target(&self, target_index: u32) -> TransportResult {
        let target = i32::try_from(target_index)
            .map_err(|_| TransportError::Rejected(format!("target {} exceeds OSC int range", target_index)))?;
        log::debug!(target: "transport::osc", "{} target {}", self.addresses.stop, target_index);
        self.send_message(&self.addresses.stop, vec![OscType::Int(target)])
    }
}
