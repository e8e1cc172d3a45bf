//! Deterministic melody transforms.
//!
//! Pure functions over note copies, like the quantize stages. Pitches that
//! would leave 0..=127 are clamped.

use motif_types::{Key, Note, Scale, MAX_PITCH};

/// Pitch the melody is mirrored around in [`invert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InversionAxis {
    /// Midpoint of the lowest and highest pitch, rounded down.
    Center,
    FirstNote,
    LastNote,
    Pitch(u8),
}

fn clamp_pitch(pitch: i32) -> u8 {
    pitch.clamp(0, MAX_PITCH as i32) as u8
}

fn with_pitch(note: &Note, pitch: i32) -> Note {
    Note { pitch: clamp_pitch(pitch), ..*note }
}

/// Shift every note by `semitones`.
pub fn transpose(notes: &[Note], semitones: i32) -> Vec<Note> {
    notes
        .iter()
        .map(|n| with_pitch(n, n.pitch as i32 + semitones))
        .collect()
}

/// Move every note `steps` scale degrees within `key`/`scale`.
///
/// A pitch outside the scale moves from the nearest scale degree below or at
/// it and keeps its chromatic offset from that degree.
pub fn transpose_diatonic(notes: &[Note], key: Key, scale: Scale, steps: i32) -> Vec<Note> {
    notes
        .iter()
        .map(|n| with_pitch(n, diatonic_step(n.pitch, key, scale, steps)))
        .collect()
}

fn diatonic_step(pitch: u8, key: Key, scale: Scale, steps: i32) -> i32 {
    let intervals = scale.intervals();
    let degrees = intervals.len() as i32;
    let relative = pitch as i32 - key.semitone();
    let octave = relative.div_euclid(12);
    let interval = relative.rem_euclid(12);

    // Scale intervals ascend from 0, so some degree is always at or below.
    let degree = intervals.iter().rposition(|&i| i <= interval).unwrap_or(0);
    let offset = interval - intervals[degree];

    let target = degree as i32 + steps;
    let target_octave = octave + target.div_euclid(degrees);
    let target_degree = target.rem_euclid(degrees) as usize;
    key.semitone() + target_octave * 12 + intervals[target_degree] + offset
}

/// Mirror pitches around `axis`. Timing is untouched.
pub fn invert(notes: &[Note], axis: InversionAxis) -> Vec<Note> {
    let (Some(first), Some(last)) = (notes.first(), notes.last()) else {
        return Vec::new();
    };
    let axis = match axis {
        InversionAxis::Center => {
            let lowest = notes.iter().map(|n| n.pitch as i32).min().unwrap_or(0);
            let highest = notes.iter().map(|n| n.pitch as i32).max().unwrap_or(0);
            (lowest + highest) / 2
        }
        InversionAxis::FirstNote => first.pitch as i32,
        InversionAxis::LastNote => last.pitch as i32,
        InversionAxis::Pitch(p) => p as i32,
    };
    notes
        .iter()
        .map(|n| with_pitch(n, 2 * axis - n.pitch as i32))
        .collect()
}

/// Scale onsets (relative to the earliest one) and durations by `factor`.
pub fn stretch(notes: &[Note], factor: f64) -> Vec<Note> {
    let Some(origin) = notes.iter().map(|n| n.start_time).reduce(f64::min) else {
        return Vec::new();
    };
    notes
        .iter()
        .map(|n| {
            Note::new(
                n.pitch,
                origin + (n.start_time - origin) * factor,
                n.duration * factor,
                n.velocity,
            )
        })
        .collect()
}

/// Lengthen by `factor` (2.0 doubles every value).
pub fn augment(notes: &[Note], factor: f64) -> Vec<Note> {
    stretch(notes, factor)
}

/// Shorten by `factor` (0.5 halves every value).
pub fn diminish(notes: &[Note], factor: f64) -> Vec<Note> {
    stretch(notes, factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(pitches: &[u8]) -> Vec<Note> {
        pitches
            .iter()
            .enumerate()
            .map(|(i, &p)| Note::new(p, 1.0 + i as f64 * 0.5, 0.5, 0.7))
            .collect()
    }

    fn pitches(notes: &[Note]) -> Vec<u8> {
        notes.iter().map(|n| n.pitch).collect()
    }

    #[test]
    fn transpose_clamps_to_midi_range() {
        assert_eq!(pitches(&transpose(&line(&[60, 120]), 12)), vec![72, 127]);
        assert_eq!(pitches(&transpose(&line(&[5]), -12)), vec![0]);
    }

    #[test]
    fn diatonic_step_follows_scale() {
        // C D E up a third in C major: E F G.
        let up = transpose_diatonic(&line(&[60, 62, 64]), Key::C, Scale::Major, 2);
        assert_eq!(pitches(&up), vec![64, 65, 67]);
        // B up one degree wraps into the next octave.
        let wrap = transpose_diatonic(&line(&[71]), Key::C, Scale::Major, 1);
        assert_eq!(pitches(&wrap), vec![72]);
        // C down one degree in G major lands on B.
        let down = transpose_diatonic(&line(&[60]), Key::G, Scale::Major, -1);
        assert_eq!(pitches(&down), vec![59]);
    }

    #[test]
    fn diatonic_step_keeps_chromatic_offset() {
        // C# sits a semitone above C; one degree up gives D#.
        let moved = transpose_diatonic(&line(&[61]), Key::C, Scale::Major, 1);
        assert_eq!(pitches(&moved), vec![63]);
    }

    #[test]
    fn inversion_axes() {
        let notes = line(&[60, 64, 67]);
        assert_eq!(pitches(&invert(&notes, InversionAxis::Center)), vec![66, 62, 59]);
        assert_eq!(pitches(&invert(&notes, InversionAxis::FirstNote)), vec![60, 56, 53]);
        assert_eq!(pitches(&invert(&notes, InversionAxis::LastNote)), vec![74, 70, 67]);
        assert_eq!(pitches(&invert(&notes, InversionAxis::Pitch(120))), vec![127, 127, 127]);
        assert!(invert(&[], InversionAxis::Center).is_empty());
    }

    #[test]
    fn augment_and_diminish_keep_the_first_onset() {
        let notes = line(&[60, 62]);
        let long = augment(&notes, 2.0);
        assert_eq!(long[0].start_time, 1.0);
        assert_eq!(long[1].start_time, 2.0);
        assert_eq!(long[1].duration, 1.0);

        let short = diminish(&notes, 0.5);
        assert_eq!(short[1].start_time, 1.25);
        assert_eq!(short[1].duration, 0.25);
        assert!(stretch(&[], 2.0).is_empty());
    }
}
