use serde::{Deserialize, Serialize};

use crate::{MelodyId, Note};

/// Derived and descriptive information about a melody.
///
/// `total_duration` and `note_count` are recomputed from the notes on every
/// replacement and cannot be set directly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MelodyMetadata {
    total_duration: f64,
    note_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<String>,
    #[serde(default)]
    pub chord_mode: bool,
}

impl MelodyMetadata {
    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    pub fn note_count(&self) -> usize {
        self.note_count
    }
}

/// An ordered phrase of notes.
///
/// Notes are kept sorted by start time (stable, so ties keep input order).
/// The note list is only ever replaced as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "MelodyRecord")]
pub struct Melody {
    pub id: MelodyId,
    pub name: String,
    notes: Vec<Note>,
    metadata: MelodyMetadata,
}

/// Serialized shape of a melody; derived metadata is recomputed on load.
#[derive(Deserialize)]
struct MelodyRecord {
    id: MelodyId,
    #[serde(default)]
    name: String,
    #[serde(default)]
    notes: Vec<Note>,
    #[serde(default)]
    metadata: MelodyMetadata,
}

impl From<MelodyRecord> for Melody {
    fn from(record: MelodyRecord) -> Self {
        let mut melody = Melody {
            id: record.id,
            name: record.name,
            notes: Vec::new(),
            metadata: record.metadata,
        };
        melody.set_notes(record.notes);
        melody
    }
}

impl Melody {
    pub fn new(id: MelodyId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            notes: Vec::new(),
            metadata: MelodyMetadata::default(),
        }
    }

    pub fn with_notes(id: MelodyId, name: impl Into<String>, notes: Vec<Note>) -> Self {
        let mut melody = Self::new(id, name);
        melody.set_notes(notes);
        melody
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn metadata(&self) -> &MelodyMetadata {
        &self.metadata
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Replace the whole note sequence and recompute the derived metadata.
    pub fn set_notes(&mut self, mut notes: Vec<Note>) {
        notes.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        self.metadata.total_duration = notes
            .iter()
            .map(Note::end_time)
            .fold(0.0, f64::max);
        self.metadata.note_count = notes.len();
        self.notes = notes;
    }

    /// Take the notes out, leaving the melody empty.
    pub fn take_notes(&mut self) -> Vec<Note> {
        let notes = std::mem::take(&mut self.notes);
        self.set_notes(Vec::new());
        notes
    }

    pub fn set_key(&mut self, key: Option<String>) {
        self.metadata.key = key;
    }

    pub fn set_scale(&mut self, scale: Option<String>) {
        self.metadata.scale = scale;
    }

    pub fn set_chord_mode(&mut self, chord_mode: bool) {
        self.metadata.chord_mode = chord_mode;
    }
}
