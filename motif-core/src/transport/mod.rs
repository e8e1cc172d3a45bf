//! Engine transport trait: a semantic-level abstraction over the synthesis engine.
//!
//! `EngineTransport` captures what the players *mean* to do (play this payload,
//! stop everything, stop one target) independently of how it's done (OSC
//! messages over UDP). This enables unit testing of the players without a
//! running engine.

mod osc;
mod test_transport;

pub use osc::{OscAddresses, OscTransport};
pub use test_transport::{TestTransport, TransportOp};

use thiserror::Error;

use crate::codec::WirePayload;

/// Result type for transport operations.
pub type TransportResult<T = ()> = Result<T, TransportError>;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("engine i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("osc encode failed: {0}")]
    Encode(String),
    #[error("payload serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("engine rejected request: {0}")]
    Rejected(String),
    #[error("{0} is not supported by this transport")]
    Unsupported(&'static str),
}

/// Delivery semantics the engine applies to a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    SequentialNotes,
    SimultaneousChord,
}

impl Route {
    pub fn for_payload(payload: &WirePayload) -> Self {
        if payload.is_chord() {
            Route::SimultaneousChord
        } else {
            Route::SequentialNotes
        }
    }
}

/// Semantic-level engine transport.
///
/// Each method is one request to the engine; `Ok` means the request was
/// handed off successfully, not that audio has started or stopped.
pub trait EngineTransport: Send + Sync {
    /// Start playback of a payload on its `targetIndex`.
    fn send_melody(&self, payload: &WirePayload) -> TransportResult;

    /// Stop every target.
    fn stop_all(&self) -> TransportResult;

    /// Stop a single target.
    fn stop_target(&self, target_index: u32) -> TransportResult;

    /// Targets the engine reports as currently playing.
    fn active_targets(&self) -> TransportResult<Vec<u32>> {
        Err(TransportError::Unsupported("active target query"))
    }
}
