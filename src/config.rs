//! Engine settings — host-independent knobs that are not user parameters.

use serde::{Deserialize, Serialize};

use crate::error::GateError;

/// How the engine behaves when the host transport is stopped or incomplete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransportMode {
    /// Keep gating from an internally integrated beat clock.
    #[default]
    InternalClock,
    /// Follow the host only; mute whenever it is not playing.
    HostOnly,
}

/// Settings read once when the engine is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineSettings {
    pub transport_mode: TransportMode,
    /// Tempo used when the host does not report one.
    pub fallback_bpm: f64,
    /// Smallest normalized change the link propagator treats as an edit.
    pub link_epsilon: f32,
    /// Capacity of the parameter change queue handed to UI observers.
    pub change_queue_capacity: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            transport_mode: TransportMode::default(),
            fallback_bpm: 120.0,
            link_epsilon: 0.0001,
            change_queue_capacity: 1024,
        }
    }
}

impl EngineSettings {
    /// Parse settings from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, GateError> {
        let mut settings: EngineSettings =
            serde_json::from_str(json).map_err(GateError::InvalidSettings)?;
        if !settings.fallback_bpm.is_finite() || settings.fallback_bpm <= 0.0 {
            log::warn!(target: "gate::engine", "fallbackBpm {} ignored, using 120", settings.fallback_bpm);
            settings.fallback_bpm = 120.0;
        }
        settings.change_queue_capacity = settings.change_queue_capacity.max(1);
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = EngineSettings::default();
        assert_eq!(s.transport_mode, TransportMode::InternalClock);
        assert_eq!(s.fallback_bpm, 120.0);
        assert!((s.link_epsilon - 0.0001).abs() < 1e-9);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let s = EngineSettings::from_json(r#"{"transportMode":"hostOnly"}"#).unwrap();
        assert_eq!(s.transport_mode, TransportMode::HostOnly);
        assert_eq!(s.fallback_bpm, 120.0);
        assert_eq!(s.change_queue_capacity, 1024);
    }

    #[test]
    fn bad_bpm_falls_back() {
        let s = EngineSettings::from_json(r#"{"fallbackBpm":0}"#).unwrap();
        assert_eq!(s.fallback_bpm, 120.0);
        let s = EngineSettings::from_json(r#"{"fallbackBpm":-90}"#).unwrap();
        assert_eq!(s.fallback_bpm, 120.0);
    }

    #[test]
    fn malformed_json_is_an_error() {
        let err = EngineSettings::from_json("{transportMode").unwrap_err();
        assert!(matches!(err, GateError::InvalidSettings(_)));
    }
}
