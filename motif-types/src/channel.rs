use serde::{Deserialize, Serialize};

use crate::{ChannelId, Melody, MelodyId};

/// How the engine should voice a channel's payloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutputMode {
    #[default]
    SequentialNotes,
    SimultaneousChord,
}

impl OutputMode {
    pub fn is_chord(self) -> bool {
        matches!(self, OutputMode::SimultaneousChord)
    }
}

/// A track of melodies routed to one engine target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: ChannelId,
    pub name: String,
    /// Engine routing key. `None` lets the playlist builder derive one from
    /// the channel's position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_index: Option<u32>,
    #[serde(default)]
    pub output_mode: OutputMode,
    #[serde(default)]
    pub melodies: Vec<Melody>,
}

impl Channel {
    pub fn new(id: ChannelId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            target_index: None,
            output_mode: OutputMode::default(),
            melodies: Vec::new(),
        }
    }

    pub fn melody(&self, id: MelodyId) -> Option<&Melody> {
        self.melodies.iter().find(|m| m.id == id)
    }

    pub fn add_melody(&mut self, melody: Melody) {
        self.melodies.push(melody);
    }
}

/// One scheduled playback: a melody copy, where it goes, and whether it loops.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistItem {
    pub melody: Melody,
    pub channel_id: ChannelId,
    pub output_mode: OutputMode,
    /// Target index resolved when the playlist was built.
    pub resolved_layer: u32,
    pub looping: bool,
}
