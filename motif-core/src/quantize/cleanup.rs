use motif_types::{Note, MIN_NOTE_DURATION};

/// Notes sharing one playback instant.
#[derive(Debug, Clone, PartialEq)]
pub struct Chord {
    pub time: f64,
    pub duration: f64,
    pub notes: Vec<Note>,
}

impl Chord {
    /// The member notes, each moved onto the chord's shared time and duration.
    pub fn into_notes(self) -> Vec<Note> {
        let (time, duration) = (self.time, self.duration);
        self.notes
            .into_iter()
            .map(|mut note| {
                note.start_time = time;
                note.duration = duration;
                note
            })
            .collect()
    }
}

/// Stretch every note to at least `min_duration`. Start times are untouched,
/// so this can create overlaps.
pub fn merge_short_notes(notes: &[Note], min_duration: f64) -> Vec<Note> {
    notes
        .iter()
        .map(|note| {
            if note.duration < min_duration {
                note.with_duration(min_duration)
            } else {
                *note
            }
        })
        .collect()
}

/// Truncate each note so it ends no later than the next one starts.
///
/// A note whose truncated length falls below [`MIN_NOTE_DURATION`] (two notes
/// starting together) is dropped: the later note of the pair wins.
pub fn remove_overlaps(notes: &[Note]) -> Vec<Note> {
    let mut sorted = notes.to_vec();
    sorted.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

    let mut out: Vec<Note> = Vec::with_capacity(sorted.len());
    for note in sorted {
        if let Some(prev) = out.last_mut() {
            if note.start_time < prev.end_time() {
                prev.duration = note.start_time - prev.start_time;
                if prev.duration < MIN_NOTE_DURATION {
                    log::debug!(
                        target: "quantize",
                        "dropping pitch {} at {:.3}s: fully covered by pitch {}",
                        prev.pitch,
                        prev.start_time,
                        note.pitch
                    );
                    out.pop();
                }
            }
        }
        out.push(note);
    }
    out
}

/// Cluster notes whose start lies within `time_threshold` seconds of the first
/// note of the current cluster. Clusters don't chain: a note close to the
/// previous note but too far from the anchor starts a new cluster.
pub fn group_notes_into_chords(notes: &[Note], time_threshold: f64) -> Vec<Chord> {
    let mut sorted = notes.to_vec();
    sorted.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

    let mut chords: Vec<Chord> = Vec::new();
    for note in sorted {
        match chords.last_mut() {
            Some(chord) if note.start_time - chord.time <= time_threshold => {
                chord.duration = chord.duration.max(note.duration);
                chord.notes.push(note);
            }
            _ => chords.push(Chord {
                time: note.start_time,
                duration: note.duration,
                notes: vec![note],
            }),
        }
    }
    chords
}
