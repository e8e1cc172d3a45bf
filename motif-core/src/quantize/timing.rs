use motif_types::{Note, RawInputEvent};

/// Share of each equal-spacing slot that sounds; the rest is silence.
pub const EQUAL_SPACING_SOUNDING_FRACTION: f64 = 0.75;

/// Tempo grid: `division` subdivisions per whole note at `bpm` quarter notes per minute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSettings {
    pub bpm: f64,
    pub division: u32,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self { bpm: 120.0, division: 16 }
    }
}

/// Grid step in seconds, or `None` for a tempo/division that can't form a grid.
pub fn grid_size(grid: GridSettings) -> Option<f64> {
    if !grid.bpm.is_finite() || grid.bpm <= 0.0 || grid.division == 0 {
        return None;
    }
    Some((60.0 / grid.bpm) / (grid.division as f64 / 4.0))
}

/// Convert millisecond-timed events into notes, keeping their order.
pub fn events_to_notes(events: &[RawInputEvent]) -> Vec<Note> {
    events
        .iter()
        .map(|e| {
            Note::new(
                e.pitch,
                e.on_time / 1000.0,
                e.duration_ms() / 1000.0,
                e.velocity,
            )
        })
        .collect()
}

/// Snap starts to the nearest grid line and durations to the nearest whole
/// number of grid steps (at least one). Output is sorted by start time.
pub fn quantize_to_grid(events: &[RawInputEvent], grid: GridSettings) -> Vec<Note> {
    let mut notes = events_to_notes(events);
    let Some(step) = grid_size(grid) else {
        log::warn!(target: "quantize", "unusable grid {:?}, keeping recorded timing", grid);
        notes.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        return notes;
    };

    for note in &mut notes {
        let start_steps = (note.start_time / step).round();
        let duration_steps = (note.duration / step).round().max(1.0);
        note.start_time = start_steps * step;
        note.duration = duration_steps * step;
    }
    notes.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
    notes
}

/// Discard recorded timing and spread the events evenly across `total_duration`.
pub fn equal_space_notes(events: &[RawInputEvent], total_duration: f64) -> Vec<Note> {
    if events.is_empty() {
        return Vec::new();
    }
    let mut ordered: Vec<&RawInputEvent> = events.iter().collect();
    ordered.sort_by(|a, b| a.on_time.total_cmp(&b.on_time));

    let slot = total_duration / ordered.len() as f64;
    ordered
        .into_iter()
        .enumerate()
        .map(|(i, e)| {
            Note::new(
                e.pitch,
                i as f64 * slot,
                slot * EQUAL_SPACING_SOUNDING_FRACTION,
                e.velocity,
            )
        })
        .collect()
}
