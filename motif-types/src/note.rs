use serde::{Deserialize, Serialize};

/// Highest valid MIDI pitch.
pub const MAX_PITCH: u8 = 127;

/// Floor applied to every note duration, in seconds.
pub const MIN_NOTE_DURATION: f64 = 0.001;

/// Rejected note field.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("pitch {0} is outside 0..=127")]
    PitchOutOfRange(u32),
    #[error("start time {0} must be finite and non-negative")]
    InvalidStart(f64),
    #[error("duration {0} must be finite and positive")]
    InvalidDuration(f64),
    #[error("velocity {0} is outside 0.0..=1.0")]
    VelocityOutOfRange(f64),
}

/// A single note: MIDI pitch, absolute start and duration in seconds, velocity in 0..1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub pitch: u8,
    pub start_time: f64,
    pub duration: f64,
    pub velocity: f64,
}

impl Note {
    /// Build a note, clamping every field into its valid range.
    pub fn new(pitch: u8, start_time: f64, duration: f64, velocity: f64) -> Self {
        Self {
            pitch: pitch.min(MAX_PITCH),
            start_time: if start_time.is_finite() { start_time.max(0.0) } else { 0.0 },
            duration: clamp_duration(duration),
            velocity: if velocity.is_finite() { velocity.clamp(0.0, 1.0) } else { 0.0 },
        }
    }

    /// Build a note, rejecting out-of-range fields instead of clamping them.
    pub fn try_new(pitch: u32, start_time: f64, duration: f64, velocity: f64) -> Result<Self, ValidationError> {
        let note = Self {
            pitch: u8::try_from(pitch).map_err(|_| ValidationError::PitchOutOfRange(pitch))?,
            start_time,
            duration,
            velocity,
        };
        note.validate()?;
        Ok(note)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.pitch > MAX_PITCH {
            return Err(ValidationError::PitchOutOfRange(self.pitch as u32));
        }
        if !self.start_time.is_finite() || self.start_time < 0.0 {
            return Err(ValidationError::InvalidStart(self.start_time));
        }
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(ValidationError::InvalidDuration(self.duration));
        }
        if !(0.0..=1.0).contains(&self.velocity) {
            return Err(ValidationError::VelocityOutOfRange(self.velocity));
        }
        Ok(())
    }

    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = clamp_duration(duration);
        self
    }
}

fn clamp_duration(duration: f64) -> f64 {
    if duration.is_finite() {
        duration.max(MIN_NOTE_DURATION)
    } else {
        MIN_NOTE_DURATION
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_clamps_degenerate_fields() {
        let note = Note::new(200, -1.0, 0.0, 1.5);
        assert_eq!(note.pitch, 127);
        assert_eq!(note.start_time, 0.0);
        assert_eq!(note.duration, MIN_NOTE_DURATION);
        assert_eq!(note.velocity, 1.0);
    }

    #[test]
    fn try_new_rejects_out_of_range() {
        assert_eq!(
            Note::try_new(128, 0.0, 1.0, 0.5),
            Err(ValidationError::PitchOutOfRange(128))
        );
        assert!(matches!(
            Note::try_new(60, 0.0, 0.0, 0.5),
            Err(ValidationError::InvalidDuration(_))
        ));
        assert!(matches!(
            Note::try_new(60, 0.0, 1.0, 2.0),
            Err(ValidationError::VelocityOutOfRange(_))
        ));
        assert!(Note::try_new(60, 0.5, 0.25, 0.8).is_ok());
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let json = serde_json::to_value(Note::new(60, 0.5, 0.25, 0.8)).unwrap();
        assert_eq!(json["startTime"], 0.5);
        assert_eq!(json["pitch"], 60);
    }
}
