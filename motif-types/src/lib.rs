//! # motif-types
//!
//! Shared type definitions for the Motif melody engine.
//! This crate holds the note/melody model and the playback-facing records
//! used by motif-core and motif-cli.

mod channel;
mod event;
mod melody;
pub mod music;
mod note;

pub use channel::{Channel, OutputMode, PlaylistItem};
pub use event::{CompletionEvent, RawInputEvent, DEFAULT_EVENT_DURATION_MS};
pub use melody::{Melody, MelodyMetadata};
pub use music::{Key, Scale};
pub use note::{Note, ValidationError, MAX_PITCH, MIN_NOTE_DURATION};

/// Unique identifier for a melody.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct MelodyId(u32);

impl MelodyId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
    pub fn get(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for MelodyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a channel (a track routed to one engine target).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct ChannelId(u32);

impl ChannelId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
    pub fn get(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&ChannelId::new(7)).unwrap();
        assert_eq!(json, "7");
        let id: MelodyId = serde_json::from_str("42").unwrap();
        assert_eq!(id.get(), 42);
        assert_eq!(id.to_string(), "42");
    }
}
