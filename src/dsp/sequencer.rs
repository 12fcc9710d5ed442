//! Step sequencer — maps a beat position onto a step index and the progress through it.

/// Where a beat position falls inside the repeating sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepPosition {
    /// Step index in `[0, step_count - 1]`.
    pub index: usize,
    /// Progress through the step in `[0, 1)`.
    pub progress: f64,
}

/// Locate `beat` inside a sequence of `step_count` steps of `step_beats` each.
///
/// Negative positions wrap like positive ones. A zero step count is treated as one step.
#[inline]
pub fn step_position(beat: f64, step_beats: f64, step_count: usize) -> StepPosition {
    let step_count = step_count.max(1);
    let sequence_beats = step_count as f64 * step_beats;
    let within = beat.rem_euclid(sequence_beats);
    let within = if within < sequence_beats { within } else { 0.0 };

    let raw_index = (within / step_beats).floor();
    let index = if raw_index.is_finite() && raw_index > 0.0 {
        (raw_index as usize).min(step_count - 1)
    } else {
        0
    };

    let progress = within.rem_euclid(step_beats) / step_beats;
    // rem_euclid may round up to the divisor itself
    let progress = if (0.0..1.0).contains(&progress) { progress } else { 0.0 };

    StepPosition { index, progress }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_step_at_zero() {
        let p = step_position(0.0, 0.25, 16);
        assert_eq!(p.index, 0);
        assert_eq!(p.progress, 0.0);
    }

    #[test]
    fn mid_step() {
        let p = step_position(1.125, 0.25, 16);
        assert_eq!(p.index, 4);
        assert!((p.progress - 0.5).abs() < 1e-9);
    }

    #[test]
    fn wraps_after_sequence() {
        // 4 steps of an eighth = 2 beats
        let p = step_position(2.6, 0.5, 4);
        assert_eq!(p.index, 1);
        assert!((p.progress - 0.2).abs() < 1e-9);
    }

    #[test]
    fn negative_positions_wrap() {
        let p = step_position(-0.25, 0.25, 16);
        assert_eq!(p.index, 15);
        assert!(p.progress.abs() < 1e-9);
    }

    #[test]
    fn bounds_and_periodicity() {
        for &step_beats in &[0.5, 1.0 / 3.0, 0.25, 1.0 / 6.0, 0.125, 1.0 / 12.0] {
            for step_count in [2usize, 3, 7, 16] {
                let sequence = step_count as f64 * step_beats;
                for i in 0..500 {
                    let beat = i as f64 * 0.0137;
                    let p = step_position(beat, step_beats, step_count);
                    assert!(p.index < step_count);
                    assert!((0.0..1.0).contains(&p.progress), "progress {} out of range", p.progress);

                    let q = step_position(beat + sequence, step_beats, step_count);
                    let same_step = q.index == p.index && (q.progress - p.progress).abs() < 1e-6;
                    // Floating point can land a hair either side of a boundary
                    let boundary = (q.progress - p.progress).abs() > 0.999;
                    assert!(same_step || boundary, "beat {beat}: {p:?} vs {q:?}");
                }
            }
        }
    }
}
