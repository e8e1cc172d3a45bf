//! Recording cleanup: raw input events in, clean notes out.
//!
//! Every stage is a pure function over owned copies, and every stage maps an
//! empty input to an empty output.

mod cleanup;
mod timing;
mod velocity;

pub use cleanup::{group_notes_into_chords, merge_short_notes, remove_overlaps, Chord};
pub use timing::{
    equal_space_notes, events_to_notes, grid_size, quantize_to_grid, GridSettings,
    EQUAL_SPACING_SOUNDING_FRACTION,
};
pub use velocity::{normalize_velocities, VelocityMode, VelocitySettings};

use motif_types::{Note, RawInputEvent};

/// How note start times are derived from the recording.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimingMode {
    /// Keep the recorded timing.
    Raw,
    /// Snap starts and durations to a tempo grid.
    Grid(GridSettings),
    /// Ignore recorded timing and spread notes evenly over `total_duration` seconds.
    EqualSpacing { total_duration: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantizeSettings {
    pub timing: TimingMode,
    /// Shortest allowed note, in seconds.
    pub min_duration: Option<f64>,
    /// Group near-simultaneous notes into chords instead of removing overlaps.
    pub chord_mode: bool,
    /// Chord window in seconds, measured from the first note of each chord.
    pub chord_threshold: f64,
    pub velocity: Option<VelocitySettings>,
}

impl Default for QuantizeSettings {
    fn default() -> Self {
        Self {
            timing: TimingMode::Grid(GridSettings::default()),
            min_duration: Some(0.05),
            chord_mode: false,
            chord_threshold: 0.05,
            velocity: None,
        }
    }
}

/// Run the full pipeline over a finished recording.
///
/// Order matters: short-note merging can reintroduce overlap, so overlap
/// removal (or chord grouping) runs after it, and velocities are normalized
/// once the note timing is final.
pub fn process_recording(events: &[RawInputEvent], settings: &QuantizeSettings) -> Vec<Note> {
    if events.is_empty() {
        return Vec::new();
    }

    let mut notes = match settings.timing {
        TimingMode::Raw => {
            let mut notes = events_to_notes(events);
            notes.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
            notes
        }
        TimingMode::Grid(grid) => quantize_to_grid(events, grid),
        TimingMode::EqualSpacing { total_duration } => equal_space_notes(events, total_duration),
    };

    if let Some(min_duration) = settings.min_duration {
        notes = merge_short_notes(&notes, min_duration);
    }

    notes = if settings.chord_mode {
        group_notes_into_chords(&notes, settings.chord_threshold)
            .into_iter()
            .flat_map(Chord::into_notes)
            .collect()
    } else {
        remove_overlaps(&notes)
    };

    if let Some(velocity) = settings.velocity {
        notes = normalize_velocities(&notes, &velocity);
    }

    log::debug!(
        target: "quantize",
        "processed {} events into {} notes ({:?}, chord_mode={})",
        events.len(),
        notes.len(),
        settings.timing,
        settings.chord_mode
    );
    notes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(pitch: u8, on: f64, off: f64) -> RawInputEvent {
        RawInputEvent::new(pitch, 0.8, on, Some(off))
    }

    #[test]
    fn empty_recording_yields_no_notes() {
        assert!(process_recording(&[], &QuantizeSettings::default()).is_empty());
    }

    #[test]
    fn melody_mode_output_has_no_overlaps() {
        // 120 bpm sixteenths: grid = 0.125 s
        let events = [
            event(60, 0.0, 400.0),
            event(62, 260.0, 500.0),
            event(64, 490.0, 900.0),
        ];
        let notes = process_recording(&events, &QuantizeSettings::default());
        assert!(!notes.is_empty());
        for pair in notes.windows(2) {
            assert!(pair[1].start_time >= pair[0].end_time() - 1e-9);
        }
    }

    #[test]
    fn short_note_merge_then_overlap_removal() {
        // The 10 ms blip is stretched to 0.3 s, which now overlaps the next note.
        let events = [event(60, 0.0, 10.0), event(62, 100.0, 600.0)];
        let settings = QuantizeSettings {
            timing: TimingMode::Raw,
            min_duration: Some(0.3),
            ..QuantizeSettings::default()
        };
        let notes = process_recording(&events, &settings);
        assert_eq!(notes.len(), 2);
        assert!((notes[0].duration - 0.1).abs() < 1e-9);
        assert!((notes[1].duration - 0.5).abs() < 1e-9);
    }

    #[test]
    fn chord_mode_groups_instead_of_truncating() {
        let events = [event(60, 0.0, 480.0), event(64, 10.0, 490.0), event(67, 20.0, 300.0)];
        let settings = QuantizeSettings {
            timing: TimingMode::Raw,
            min_duration: None,
            chord_mode: true,
            chord_threshold: 0.05,
            velocity: None,
        };
        let notes = process_recording(&events, &settings);
        assert_eq!(notes.len(), 3);
        for note in &notes {
            assert_eq!(note.start_time, 0.0);
            assert!((note.duration - 0.48).abs() < 1e-9);
        }
    }

    #[test]
    fn velocity_normalization_runs_last() {
        let events = [
            RawInputEvent::new(60, 0.2, 0.0, Some(200.0)),
            RawInputEvent::new(62, 1.0, 500.0, Some(700.0)),
        ];
        let settings = QuantizeSettings {
            timing: TimingMode::EqualSpacing { total_duration: 2.0 },
            min_duration: None,
            chord_mode: false,
            chord_threshold: 0.05,
            velocity: Some(VelocitySettings { min: 0.4, max: 0.6, mode: VelocityMode::Scale }),
        };
        let notes = process_recording(&events, &settings);
        assert!((notes[0].velocity - 0.4).abs() < 1e-9);
        assert!((notes[1].velocity - 0.6).abs() < 1e-9);
        assert_eq!(notes[1].start_time, 1.0);
    }
}
