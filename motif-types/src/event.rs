use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Duration assumed for a recorded event that never received its note-off.
pub const DEFAULT_EVENT_DURATION_MS: f64 = 100.0;

/// A note captured during a recording session, timed in milliseconds since
/// the session started. `off_time` stays `None` while the key is held.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawInputEvent {
    pub pitch: u8,
    pub velocity: f64,
    pub on_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub off_time: Option<f64>,
}

impl RawInputEvent {
    pub fn new(pitch: u8, velocity: f64, on_time: f64, off_time: Option<f64>) -> Self {
        Self { pitch, velocity, on_time, off_time }
    }

    /// Held duration in milliseconds, falling back to
    /// [`DEFAULT_EVENT_DURATION_MS`] when the note-off is missing.
    pub fn duration_ms(&self) -> f64 {
        match self.off_time {
            Some(off) => off - self.on_time,
            None => DEFAULT_EVENT_DURATION_MS,
        }
    }
}

/// "The one-shot playback most recently started on this target has finished."
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionEvent {
    pub target_index: u32,
    /// When the notification reached this process.
    pub received_at: Instant,
}

impl CompletionEvent {
    pub fn new(target_index: u32) -> Self {
        Self::at(target_index, Instant::now())
    }

    pub fn at(target_index: u32, received_at: Instant) -> Self {
        Self { target_index, received_at }
    }
}
