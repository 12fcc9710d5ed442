//! Parameter layout — the fixed, ordered list of every control the gate exposes.
//!
//! Per-step controls are keyed `<PREFIX>_<step>` with a 0-based step index
//! (`ON_0`, `LVL_15`, `AUX_LVL_3`, ...). Globals use bare keys.

use std::collections::HashMap;

use serde::Serialize;

use crate::dsp::metric::Metric;

/// Number of step slots held in the store, regardless of the configured step count.
pub const MAX_STEPS: usize = 16;
/// Smallest step count the `STEPS` parameter allows.
pub const MIN_STEPS: usize = 2;

pub const METRIC_KEY: &str = "METRIC";
pub const STEPS_KEY: &str = "STEPS";
pub const ATTACK_KEY: &str = "ATTACK";
pub const RELEASE_KEY: &str = "RELEASE";

/// A per-step parameter family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepParam {
    On,
    Duration,
    Level,
    AuxSend,
    Pan,
    Link,
}

impl StepParam {
    /// Families whose edits fan out across linked steps.
    pub const LINKABLE: [StepParam; 5] = [
        StepParam::On,
        StepParam::Duration,
        StepParam::Level,
        StepParam::AuxSend,
        StepParam::Pan,
    ];

    pub fn prefix(self) -> &'static str {
        match self {
            StepParam::On => "ON",
            StepParam::Duration => "DUR",
            StepParam::Level => "LVL",
            StepParam::AuxSend => "AUX_LVL",
            StepParam::Pan => "PAN",
            StepParam::Link => "LINK",
        }
    }

    fn display_name(self) -> &'static str {
        match self {
            StepParam::On => "On",
            StepParam::Duration => "Duration",
            StepParam::Level => "Level",
            StepParam::AuxSend => "Aux Send",
            StepParam::Pan => "Pan",
            StepParam::Link => "Link",
        }
    }

    /// Store key for this family at `step`.
    pub fn key(self, step: usize) -> String {
        format!("{}_{step}", self.prefix())
    }

    fn spec(self, step: usize) -> ParamSpec {
        let (kind, range, default, unit, automatable) = match self {
            StepParam::On => (ParamKind::Bool, ParamRange::TOGGLE, 1.0, "", true),
            StepParam::Duration => (ParamKind::Float, ParamRange::UNIT, 1.0, "", true),
            StepParam::Level => (ParamKind::Float, ParamRange::DECIBELS, 0.0, "dB", true),
            StepParam::AuxSend => (ParamKind::Float, ParamRange::DECIBELS, -60.0, "dB", true),
            StepParam::Pan => (ParamKind::Float, ParamRange::BIPOLAR, 0.0, "", true),
            StepParam::Link => (ParamKind::Bool, ParamRange::TOGGLE, 0.0, "", false),
        };
        ParamSpec {
            key: self.key(step),
            name: format!("{} {}", self.display_name(), step + 1),
            kind,
            range,
            default,
            unit,
            automatable,
            choices: Vec::new(),
        }
    }
}

/// Master controls. Moving one writes the same value into every linked step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MasterParam {
    Duration,
    Pan,
    Level,
    AuxSend,
}

impl MasterParam {
    pub const ALL: [MasterParam; 4] = [
        MasterParam::Duration,
        MasterParam::Pan,
        MasterParam::Level,
        MasterParam::AuxSend,
    ];

    pub fn key(self) -> &'static str {
        match self {
            MasterParam::Duration => "MASTER_DUR",
            MasterParam::Pan => "MASTER_PAN",
            MasterParam::Level => "MASTER_LVL",
            MasterParam::AuxSend => "MASTER_AUX_LVL",
        }
    }

    /// The step family this master drives.
    pub fn family(self) -> StepParam {
        match self {
            MasterParam::Duration => StepParam::Duration,
            MasterParam::Pan => StepParam::Pan,
            MasterParam::Level => StepParam::Level,
            MasterParam::AuxSend => StepParam::AuxSend,
        }
    }

    fn spec(self) -> ParamSpec {
        let (name, range, default, unit) = match self {
            MasterParam::Duration => ("Master Duration", ParamRange::UNIT, 1.0, ""),
            MasterParam::Pan => ("Master Pan", ParamRange::BIPOLAR, 0.0, ""),
            MasterParam::Level => ("Master Level", ParamRange::DECIBELS, 0.0, "dB"),
            MasterParam::AuxSend => ("Master Aux Send", ParamRange::DECIBELS, -60.0, "dB"),
        };
        ParamSpec {
            key: self.key().to_string(),
            name: name.to_string(),
            kind: ParamKind::Float,
            range,
            default,
            unit,
            automatable: false,
            choices: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Float,
    Int,
    Bool,
    Choice,
}

/// A value range with snapping interval and skew.
///
/// `normalized = ((v - min) / (max - min))^skew`, so a skew below 1 spreads
/// the low end of the range across more of the normalized span.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParamRange {
    pub min: f32,
    pub max: f32,
    /// Snapping interval, 0 for continuous.
    pub interval: f32,
    pub skew: f32,
}

impl ParamRange {
    pub const TOGGLE: ParamRange = ParamRange::new(0.0, 1.0, 1.0, 1.0);
    pub const UNIT: ParamRange = ParamRange::new(0.0, 1.0, 0.01, 1.0);
    pub const BIPOLAR: ParamRange = ParamRange::new(-1.0, 1.0, 0.01, 1.0);
    pub const DECIBELS: ParamRange = ParamRange::new(-60.0, 6.0, 0.1, 4.0);
    pub const MILLISECONDS: ParamRange = ParamRange::new(0.0, 100.0, 0.1, 0.3);

    pub const fn new(min: f32, max: f32, interval: f32, skew: f32) -> Self {
        Self { min, max, interval, skew }
    }

    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }

    /// Snap to the nearest legal value and clamp into range.
    pub fn snap(&self, value: f32) -> f32 {
        if self.interval > 0.0 {
            let steps = ((value - self.min) / self.interval).round();
            self.clamp(self.min + steps * self.interval)
        } else {
            self.clamp(value)
        }
    }

    pub fn to_normalized(&self, value: f32) -> f32 {
        let span = self.max - self.min;
        if span <= 0.0 {
            return 0.0;
        }
        let proportion = (self.clamp(value) - self.min) / span;
        if self.skew != 1.0 && proportion > 0.0 {
            proportion.powf(self.skew)
        } else {
            proportion
        }
    }

    pub fn from_normalized(&self, normalized: f32) -> f32 {
        let n = normalized.clamp(0.0, 1.0);
        let proportion = if self.skew != 1.0 && n > 0.0 {
            (n.ln() / self.skew).exp()
        } else {
            n
        };
        self.snap(self.min + (self.max - self.min) * proportion)
    }
}

/// Description of one parameter in the store.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamSpec {
    pub key: String,
    pub name: String,
    pub kind: ParamKind,
    pub range: ParamRange,
    pub default: f32,
    pub unit: &'static str,
    pub automatable: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<&'static str>,
}

/// The ordered parameter list plus a key index for control-side lookups.
#[derive(Debug, Clone)]
pub struct ParamLayout {
    specs: Vec<ParamSpec>,
    index: HashMap<String, usize>,
}

impl ParamLayout {
    pub fn new(specs: Vec<ParamSpec>) -> Self {
        let index = specs
            .iter()
            .enumerate()
            .map(|(i, spec)| (spec.key.clone(), i))
            .collect();
        ParamLayout { specs, index }
    }

    /// The gate's full layout: globals, per-step controls, masters, then link flags.
    pub fn standard() -> Self {
        let mut specs = vec![
            ParamSpec {
                key: METRIC_KEY.to_string(),
                name: "Metric".to_string(),
                kind: ParamKind::Choice,
                range: ParamRange::new(0.0, (Metric::ALL.len() - 1) as f32, 1.0, 1.0),
                default: Metric::Sixteenth.index() as f32,
                unit: "",
                automatable: true,
                choices: Metric::ALL.iter().map(|m| m.label()).collect(),
            },
            ParamSpec {
                key: STEPS_KEY.to_string(),
                name: "Steps".to_string(),
                kind: ParamKind::Int,
                range: ParamRange::new(MIN_STEPS as f32, MAX_STEPS as f32, 1.0, 1.0),
                default: MAX_STEPS as f32,
                unit: "",
                automatable: true,
                choices: Vec::new(),
            },
            ParamSpec {
                key: ATTACK_KEY.to_string(),
                name: "Attack".to_string(),
                kind: ParamKind::Float,
                range: ParamRange::MILLISECONDS,
                default: 0.0,
                unit: "ms",
                automatable: true,
                choices: Vec::new(),
            },
            ParamSpec {
                key: RELEASE_KEY.to_string(),
                name: "Release".to_string(),
                kind: ParamKind::Float,
                range: ParamRange::MILLISECONDS,
                default: 5.0,
                unit: "ms",
                automatable: true,
                choices: Vec::new(),
            },
        ];

        for step in 0..MAX_STEPS {
            for family in StepParam::LINKABLE {
                specs.push(family.spec(step));
            }
        }
        for master in MasterParam::ALL {
            specs.push(master.spec());
        }
        for step in 0..MAX_STEPS {
            specs.push(StepParam::Link.spec(step));
        }

        ParamLayout::new(specs)
    }

    pub fn specs(&self) -> &[ParamSpec] {
        &self.specs
    }

    pub fn spec(&self, index: usize) -> &ParamSpec {
        &self.specs[index]
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.index.get(key).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_layout_size() {
        let layout = ParamLayout::standard();
        // 4 globals + 5 families * 16 steps + 4 masters + 16 links
        assert_eq!(layout.len(), 4 + 5 * MAX_STEPS + 4 + MAX_STEPS);
    }

    #[test]
    fn step_keys() {
        assert_eq!(StepParam::On.key(0), "ON_0");
        assert_eq!(StepParam::AuxSend.key(15), "AUX_LVL_15");
        let layout = ParamLayout::standard();
        assert!(layout.index_of("LINK_7").is_some());
        assert!(layout.index_of("PAN_16").is_none());
    }

    #[test]
    fn defaults_match_controls() {
        let layout = ParamLayout::standard();
        let default_of = |key: &str| layout.spec(layout.index_of(key).unwrap()).default;
        assert_eq!(default_of(METRIC_KEY), 2.0);
        assert_eq!(default_of(STEPS_KEY), 16.0);
        assert_eq!(default_of(RELEASE_KEY), 5.0);
        assert_eq!(default_of("ON_3"), 1.0);
        assert_eq!(default_of("AUX_LVL_3"), -60.0);
        assert_eq!(default_of("LINK_3"), 0.0);
    }

    #[test]
    fn linear_range_normalizes() {
        let r = ParamRange::BIPOLAR;
        assert!((r.to_normalized(0.0) - 0.5).abs() < 1e-6);
        assert!((r.from_normalized(1.0) - 1.0).abs() < 1e-6);
        assert!((r.from_normalized(0.0) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn skewed_range_inverts() {
        let r = ParamRange::DECIBELS;
        for db in [-60.0_f32, -24.0, -6.0, 0.0, 6.0] {
            let back = r.from_normalized(r.to_normalized(db));
            assert!((back - db).abs() < 1e-3, "{db} dB came back as {back}");
        }
        // Skew 4 pushes 0 dB well above the linear midpoint
        assert!(r.to_normalized(0.0) > 0.6);
    }

    #[test]
    fn snap_to_interval() {
        let r = ParamRange::TOGGLE;
        assert_eq!(r.snap(0.7), 1.0);
        assert_eq!(r.snap(0.2), 0.0);
        assert_eq!(ParamRange::UNIT.snap(2.0), 1.0);
    }
}
