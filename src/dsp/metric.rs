//! Metric table — musical subdivision of one step, in quarter-note beats.

/// Step subdivisions, in `METRIC` parameter order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Eighth,
    EighthTriplet,
    Sixteenth,
    SixteenthTriplet,
    ThirtySecond,
    ThirtySecondTriplet,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::Eighth,
        Metric::EighthTriplet,
        Metric::Sixteenth,
        Metric::SixteenthTriplet,
        Metric::ThirtySecond,
        Metric::ThirtySecondTriplet,
    ];

    pub fn from_index(index: i32) -> Option<Metric> {
        usize::try_from(index).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Length of one step in quarter-note beats.
    pub fn step_beats(self) -> f64 {
        match self {
            Metric::Eighth => 0.5,
            Metric::EighthTriplet => 1.0 / 3.0,
            Metric::Sixteenth => 0.25,
            Metric::SixteenthTriplet => 0.5 / 3.0,
            Metric::ThirtySecond => 0.125,
            Metric::ThirtySecondTriplet => 0.25 / 3.0,
        }
    }

    pub fn is_triplet(self) -> bool {
        matches!(
            self,
            Metric::EighthTriplet | Metric::SixteenthTriplet | Metric::ThirtySecondTriplet
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            Metric::Eighth => "8th",
            Metric::EighthTriplet => "8th T",
            Metric::Sixteenth => "16th",
            Metric::SixteenthTriplet => "16th T",
            Metric::ThirtySecond => "32nd",
            Metric::ThirtySecondTriplet => "32nd T",
        }
    }
}

/// Step duration for a raw metric index. Unknown indices fall back to a sixteenth.
pub fn step_duration_beats(metric_index: i32) -> f64 {
    Metric::from_index(metric_index)
        .unwrap_or(Metric::Sixteenth)
        .step_beats()
}

/// Whether a raw metric index is a triplet subdivision. Unknown indices read as straight.
pub fn is_ternary(metric_index: i32) -> bool {
    Metric::from_index(metric_index).is_some_and(Metric::is_triplet)
}

/// Accented steps fall on every third step for triplet metrics and every
/// fourth (the downbeats) otherwise.
pub fn is_accented(step: usize, metric_index: i32) -> bool {
    if is_ternary(metric_index) {
        step % 3 == 0
    } else {
        step % 4 == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_values() {
        let expected = [0.5, 1.0 / 3.0, 0.25, 1.0 / 6.0, 0.125, 1.0 / 12.0];
        for (i, want) in expected.iter().enumerate() {
            let got = step_duration_beats(i as i32);
            assert!(got > 0.0);
            assert!((got - want).abs() < 1e-12, "metric {i}: {got} != {want}");
        }
    }

    #[test]
    fn out_of_range_falls_back_to_sixteenth() {
        assert_eq!(step_duration_beats(-1), 0.25);
        assert_eq!(step_duration_beats(6), 0.25);
        assert_eq!(step_duration_beats(i32::MAX), 0.25);
        assert!(!is_ternary(42));
    }

    #[test]
    fn ternary_flags() {
        let flags: Vec<bool> = (0..6).map(is_ternary).collect();
        assert_eq!(flags, vec![false, true, false, true, false, true]);
    }

    #[test]
    fn accents() {
        let straight: Vec<usize> = (0..16).filter(|&s| is_accented(s, 2)).collect();
        assert_eq!(straight, vec![0, 4, 8, 12]);
        let triplet: Vec<usize> = (0..12).filter(|&s| is_accented(s, 1)).collect();
        assert_eq!(triplet, vec![0, 3, 6, 9]);
    }

    #[test]
    fn labels_follow_index_order() {
        assert_eq!(Metric::from_index(3).map(Metric::label), Some("16th T"));
        assert_eq!(Metric::Sixteenth.index(), 2);
    }
}
