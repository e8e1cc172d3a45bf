//! Melody ⇄ engine wire payload.
//!
//! The payload is what the synthesis engine consumes: per-note pitch, velocity
//! and duration plus a metadata block. Start times are not part of it; the
//! engine plays notes back to back (or together, in chord mode). Absolute start
//! times are reconstructed on the way back from a separate offset array.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use motif_types::{Melody, Note, OutputMode, MAX_PITCH};

/// Name sent for melodies that don't have one.
pub const UNNAMED_MELODY: &str = "Unnamed";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    #[error("melody {0:?} has no notes")]
    InvalidMelody(String),
    #[error("timing has {offsets} offsets for {notes} notes")]
    OffsetMismatch { offsets: usize, notes: usize },
    #[error("wire pitch {0} is outside 0..=127")]
    PitchOutOfRange(u32),
    #[error("total duration {0} must be finite and non-negative")]
    InvalidTotalDuration(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireNote {
    pub pitch: u32,
    pub velocity: f64,
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMetadata {
    pub total_duration: f64,
    pub note_count: usize,
    pub name: String,
    #[serde(rename = "loop")]
    pub looping: bool,
    pub target_index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chord_mode: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WirePayload {
    pub notes: Vec<WireNote>,
    pub metadata: WireMetadata,
}

impl WirePayload {
    /// Whether the engine should voice this payload as a chord.
    pub fn is_chord(&self) -> bool {
        self.metadata.chord_mode.unwrap_or(false)
    }

    pub fn target_index(&self) -> u32 {
        self.metadata.target_index
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodeOptions {
    pub looping: bool,
    pub target_index: u32,
    /// Overrides the melody's own chord flag when set.
    pub output_mode: Option<OutputMode>,
}

pub fn encode(melody: &Melody, options: EncodeOptions) -> Result<WirePayload, CodecError> {
    let notes = melody.notes();
    let Some(last) = notes.last() else {
        return Err(CodecError::InvalidMelody(melody.name.clone()));
    };

    let metadata = melody.metadata();
    let name = if melody.name.trim().is_empty() {
        UNNAMED_MELODY.to_string()
    } else {
        melody.name.clone()
    };
    let chord_mode = options
        .output_mode
        .map(OutputMode::is_chord)
        .unwrap_or(metadata.chord_mode);

    Ok(WirePayload {
        notes: notes
            .iter()
            .map(|n| WireNote {
                pitch: n.pitch as u32,
                velocity: n.velocity,
                duration: n.duration,
            })
            .collect(),
        metadata: WireMetadata {
            total_duration: last.end_time(),
            note_count: notes.len(),
            name,
            looping: options.looping,
            target_index: options.target_index,
            key: metadata.key.clone(),
            scale: metadata.scale.clone(),
            chord_mode: Some(chord_mode),
        },
    })
}

/// How wire durations are read back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DurationMode {
    /// Wire duration is seconds.
    #[default]
    Absolute,
    /// Wire duration is a fraction of the gap to the next note's offset.
    Fractional,
}

/// Start-time information carried alongside a payload.
///
/// `offsets[i] * total_duration` is the gap between note `i - 1` and note `i`
/// (for `i == 0`, the gap from time zero).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingMetadata {
    pub offsets: Vec<f64>,
    pub total_duration: f64,
    #[serde(default)]
    pub duration_mode: DurationMode,
}

/// Absolute-mode timing for a melody, matching what [`encode`] produces.
pub fn timing_for(melody: &Melody) -> TimingMetadata {
    let notes = melody.notes();
    let total = notes.last().map(Note::end_time).unwrap_or(0.0);
    let mut previous = 0.0;
    let offsets = notes
        .iter()
        .map(|n| {
            let offset = if total > 0.0 { (n.start_time - previous) / total } else { 0.0 };
            previous = n.start_time;
            offset
        })
        .collect();
    TimingMetadata {
        offsets,
        total_duration: total,
        duration_mode: DurationMode::Absolute,
    }
}

pub fn decode(payload: &WirePayload, timing: &TimingMetadata) -> Result<Vec<Note>, CodecError> {
    if timing.offsets.len() != payload.notes.len() {
        return Err(CodecError::OffsetMismatch {
            offsets: timing.offsets.len(),
            notes: payload.notes.len(),
        });
    }
    let total = timing.total_duration;
    if !total.is_finite() || total < 0.0 {
        return Err(CodecError::InvalidTotalDuration(total));
    }

    let mut current_time = 0.0;
    let mut notes = Vec::with_capacity(payload.notes.len());
    for (i, wire) in payload.notes.iter().enumerate() {
        if wire.pitch > MAX_PITCH as u32 {
            return Err(CodecError::PitchOutOfRange(wire.pitch));
        }
        current_time += timing.offsets[i] * total;
        let duration = match (timing.duration_mode, timing.offsets.get(i + 1)) {
            (DurationMode::Fractional, Some(next)) => wire.duration * (next * total),
            _ => wire.duration,
        };
        notes.push(Note::new(wire.pitch as u8, current_time, duration, wire.velocity));
    }
    Ok(notes)
}
