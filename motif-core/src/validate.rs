//! Musical sanity checks for a melody against a key and scale.

use std::ops::RangeInclusive;

use motif_types::{Key, Melody, Note, Scale};

/// Pitch range used when the caller doesn't give one (C3 to C6).
pub const DEFAULT_RANGE: RangeInclusive<u8> = 48..=84;

/// Share of notes that must be in the scale.
pub const KEY_MEMBERSHIP_THRESHOLD: f64 = 0.9;
pub const MAX_REST_DENSITY: f64 = 0.5;
pub const SHORT_NOTE_SECONDS: f64 = 0.1;
pub const MAX_SHORT_NOTE_RATIO: f64 = 0.3;

/// Accepted final two scale degrees.
const CADENCES: [(u8, u8, &str); 5] = [
    (7, 1, "leading tone to tonic"),
    (2, 1, "supertonic to tonic"),
    (5, 1, "dominant to tonic"),
    (4, 1, "subdominant to tonic"),
    (1, 1, "tonic to tonic"),
];

#[derive(Debug, Clone, PartialEq)]
pub struct KeyMembership {
    pub passed: bool,
    pub in_scale: usize,
    pub total: usize,
    /// Indices of the first few out-of-scale notes.
    pub outliers: Vec<usize>,
}

impl KeyMembership {
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.in_scale as f64 / self.total as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CadenceCheck {
    pub passed: bool,
    /// Scale degrees (1-7) of the notes examined, oldest first.
    pub degrees: Vec<u8>,
    pub description: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangeCheck {
    pub passed: bool,
    pub lowest: u8,
    pub highest: u8,
    pub allowed: RangeInclusive<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RhythmCheck {
    pub passed: bool,
    pub rest_density: f64,
    pub short_note_ratio: f64,
}

/// Which checks `validate_all` runs. Rhythm coherence always runs.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationChecks {
    pub key: bool,
    pub cadence: bool,
    pub range: bool,
    pub reference_range: Option<RangeInclusive<u8>>,
}

impl Default for ValidationChecks {
    fn default() -> Self {
        Self {
            key: true,
            cadence: true,
            range: true,
            reference_range: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationReport {
    pub passed: bool,
    pub empty: bool,
    pub key: Option<KeyMembership>,
    pub cadence: Option<CadenceCheck>,
    pub range: Option<RangeCheck>,
    pub rhythm: Option<RhythmCheck>,
}

pub struct MelodyValidator {
    key: Key,
    scale: Scale,
}

impl MelodyValidator {
    pub fn new(key: Key, scale: Scale) -> Self {
        Self { key, scale }
    }

    /// Validator for the key and scale recorded in the melody's metadata.
    /// `None` when either is missing or unrecognized.
    pub fn for_melody(melody: &Melody) -> Option<Self> {
        let metadata = melody.metadata();
        let key = Key::parse(metadata.key.as_deref()?)?;
        let scale = Scale::parse(metadata.scale.as_deref()?)?;
        Some(Self::new(key, scale))
    }

    /// Run the enabled checks. `notes` must be in start order.
    pub fn validate_all(&self, notes: &[Note], checks: &ValidationChecks) -> ValidationReport {
        if notes.is_empty() {
            return ValidationReport {
                empty: true,
                ..ValidationReport::default()
            };
        }

        let mut report = ValidationReport {
            key: checks.key.then(|| self.check_key_membership(notes)),
            cadence: checks.cadence.then(|| self.check_cadence(notes)),
            range: checks
                .range
                .then(|| self.check_range(notes, checks.reference_range.clone())),
            rhythm: Some(self.check_rhythm_coherence(notes)),
            ..ValidationReport::default()
        };
        report.passed = report.key.as_ref().map_or(true, |c| c.passed)
            && report.cadence.as_ref().map_or(true, |c| c.passed)
            && report.range.as_ref().map_or(true, |c| c.passed)
            && report.rhythm.as_ref().map_or(true, |c| c.passed);
        report
    }

    pub fn check_key_membership(&self, notes: &[Note]) -> KeyMembership {
        let outliers: Vec<usize> = notes
            .iter()
            .enumerate()
            .filter(|(_, n)| !self.scale.intervals().contains(&self.interval(n.pitch)))
            .map(|(i, _)| i)
            .collect();
        let in_scale = notes.len() - outliers.len();
        let passed = !notes.is_empty()
            && in_scale as f64 / notes.len() as f64 >= KEY_MEMBERSHIP_THRESHOLD;
        KeyMembership {
            passed,
            in_scale,
            total: notes.len(),
            outliers: outliers.into_iter().take(5).collect(),
        }
    }

    pub fn check_cadence(&self, notes: &[Note]) -> CadenceCheck {
        if notes.len() < 2 {
            return CadenceCheck {
                passed: false,
                degrees: notes.iter().map(|n| self.scale_degree(n.pitch)).collect(),
                description: "too short for a cadence",
            };
        }
        let tail = &notes[notes.len().saturating_sub(4)..];
        let degrees: Vec<u8> = tail.iter().map(|n| self.scale_degree(n.pitch)).collect();
        let (penultimate, last) = (degrees[degrees.len() - 2], degrees[degrees.len() - 1]);

        let description = CADENCES
            .iter()
            .find(|(from, to, _)| *from == penultimate && *to == last)
            .map(|(_, _, d)| *d)
            .or((last == 1).then_some("ends on tonic"));

        CadenceCheck {
            passed: description.is_some(),
            degrees,
            description: description.unwrap_or("no cadence"),
        }
    }

    pub fn check_range(&self, notes: &[Note], allowed: Option<RangeInclusive<u8>>) -> RangeCheck {
        let allowed = allowed.unwrap_or(DEFAULT_RANGE);
        let lowest = notes.iter().map(|n| n.pitch).min().unwrap_or(0);
        let highest = notes.iter().map(|n| n.pitch).max().unwrap_or(0);
        RangeCheck {
            passed: !notes.is_empty() && allowed.contains(&lowest) && allowed.contains(&highest),
            lowest,
            highest,
            allowed,
        }
    }

    pub fn check_rhythm_coherence(&self, notes: &[Note]) -> RhythmCheck {
        let (Some(first), Some(last)) = (notes.first(), notes.last()) else {
            return RhythmCheck { passed: false, rest_density: 0.0, short_note_ratio: 0.0 };
        };
        let total = last.end_time() - first.start_time;
        let sounding: f64 = notes.iter().map(|n| n.duration).sum();
        let rest_density = if total > 0.0 { (total - sounding) / total } else { 0.0 };
        let short = notes.iter().filter(|n| n.duration < SHORT_NOTE_SECONDS).count();
        let short_note_ratio = short as f64 / notes.len() as f64;
        RhythmCheck {
            passed: rest_density <= MAX_REST_DENSITY && short_note_ratio <= MAX_SHORT_NOTE_RATIO,
            rest_density,
            short_note_ratio,
        }
    }

    fn interval(&self, pitch: u8) -> i32 {
        (pitch as i32 - self.key.semitone()).rem_euclid(12)
    }

    /// Scale degree 1-7. Out-of-scale pitches take the degree of the nearest
    /// scale interval.
    pub fn scale_degree(&self, pitch: u8) -> u8 {
        let interval = self.interval(pitch);
        let intervals = self.scale.intervals();
        let index = intervals
            .iter()
            .position(|&i| i == interval)
            .or_else(|| {
                intervals
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, i)| (**i - interval).abs())
                    .map(|(idx, _)| idx)
            })
            .unwrap_or(0);
        (index % 7) as u8 + 1
    }
}
