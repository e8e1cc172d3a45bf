use motif_types::Note;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VelocityMode {
    /// Every note gets the midpoint of the target range.
    Constant,
    /// Linearly map the observed velocity range onto the target range.
    Scale,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocitySettings {
    pub min: f64,
    pub max: f64,
    pub mode: VelocityMode,
}

pub fn normalize_velocities(notes: &[Note], settings: &VelocitySettings) -> Vec<Note> {
    if notes.is_empty() {
        return Vec::new();
    }
    let midpoint = (settings.min + settings.max) / 2.0;

    let observed_min = notes.iter().map(|n| n.velocity).fold(f64::INFINITY, f64::min);
    let observed_max = notes.iter().map(|n| n.velocity).fold(f64::NEG_INFINITY, f64::max);
    let observed_range = observed_max - observed_min;

    notes
        .iter()
        .map(|note| {
            let velocity = match settings.mode {
                VelocityMode::Constant => midpoint,
                VelocityMode::Scale if observed_range <= f64::EPSILON => midpoint,
                VelocityMode::Scale => {
                    let t = (note.velocity - observed_min) / observed_range;
                    settings.min + t * (settings.max - settings.min)
                }
            };
            Note { velocity: velocity.clamp(0.0, 1.0), ..*note }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_velocity(v: f64) -> Note {
        Note::new(60, 0.0, 0.5, v)
    }

    #[test]
    fn constant_mode_uses_midpoint() {
        let settings = VelocitySettings { min: 0.2, max: 0.8, mode: VelocityMode::Constant };
        let out = normalize_velocities(&[with_velocity(0.1), with_velocity(1.0)], &settings);
        assert!(out.iter().all(|n| (n.velocity - 0.5).abs() < 1e-12));
    }

    #[test]
    fn scale_mode_maps_observed_range() {
        let settings = VelocitySettings { min: 0.4, max: 0.8, mode: VelocityMode::Scale };
        let out = normalize_velocities(
            &[with_velocity(0.1), with_velocity(0.3), with_velocity(0.5)],
            &settings,
        );
        assert!((out[0].velocity - 0.4).abs() < 1e-12);
        assert!((out[1].velocity - 0.6).abs() < 1e-12);
        assert!((out[2].velocity - 0.8).abs() < 1e-12);
    }

    #[test]
    fn scale_mode_single_velocity_collapses_to_midpoint() {
        let settings = VelocitySettings { min: 0.2, max: 0.6, mode: VelocityMode::Scale };
        let out = normalize_velocities(&[with_velocity(0.9), with_velocity(0.9)], &settings);
        assert!(out.iter().all(|n| (n.velocity - 0.4).abs() < 1e-12));
    }

    #[test]
    fn timing_is_untouched() {
        let settings = VelocitySettings { min: 0.0, max: 1.0, mode: VelocityMode::Constant };
        let input = [Note::new(72, 1.5, 0.25, 0.3)];
        let out = normalize_velocities(&input, &settings);
        assert_eq!(out[0].start_time, 1.5);
        assert_eq!(out[0].duration, 0.25);
        assert_eq!(out[0].pitch, 72);
    }
}
