//! Store indices resolved once, ahead of rendering.

use super::layout::{
    ATTACK_KEY, MAX_STEPS, METRIC_KEY, MIN_STEPS, RELEASE_KEY, STEPS_KEY, StepParam,
};
use super::store::ParamStore;
use crate::error::GateError;

/// One sequencer step as seen by the control surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepSlot {
    pub enabled: bool,
    /// Fraction of the step's window during which the gate is open.
    pub duration: f32,
    pub level_db: f32,
    pub aux_send_db: f32,
    pub pan: f32,
    pub linked: bool,
}

/// Global settings read at the top of every block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub metric_index: i32,
    pub step_count: usize,
    pub attack_ms: f32,
    pub release_ms: f32,
}

/// Per-family index tables into a [`ParamStore`].
#[derive(Debug, Clone)]
pub struct ParamHandles {
    pub metric: usize,
    pub steps: usize,
    pub attack: usize,
    pub release: usize,
    on: [usize; MAX_STEPS],
    duration: [usize; MAX_STEPS],
    level: [usize; MAX_STEPS],
    aux_send: [usize; MAX_STEPS],
    pan: [usize; MAX_STEPS],
    link: [usize; MAX_STEPS],
}

impl ParamHandles {
    pub fn resolve(store: &ParamStore) -> Result<Self, GateError> {
        Ok(ParamHandles {
            metric: store.index(METRIC_KEY)?,
            steps: store.index(STEPS_KEY)?,
            attack: store.index(ATTACK_KEY)?,
            release: store.index(RELEASE_KEY)?,
            on: resolve_family(store, StepParam::On)?,
            duration: resolve_family(store, StepParam::Duration)?,
            level: resolve_family(store, StepParam::Level)?,
            aux_send: resolve_family(store, StepParam::AuxSend)?,
            pan: resolve_family(store, StepParam::Pan)?,
            link: resolve_family(store, StepParam::Link)?,
        })
    }

    #[inline]
    pub fn family(&self, family: StepParam) -> &[usize; MAX_STEPS] {
        match family {
            StepParam::On => &self.on,
            StepParam::Duration => &self.duration,
            StepParam::Level => &self.level,
            StepParam::AuxSend => &self.aux_send,
            StepParam::Pan => &self.pan,
            StepParam::Link => &self.link,
        }
    }

    #[inline]
    pub fn step(&self, family: StepParam, step: usize) -> usize {
        self.family(family)[step]
    }

    #[inline]
    pub fn is_linked(&self, store: &ParamStore, step: usize) -> bool {
        store.value(self.link[step]) > 0.5
    }

    pub fn read_config(&self, store: &ParamStore) -> EngineConfig {
        EngineConfig {
            metric_index: store.value(self.metric).round() as i32,
            step_count: (store.value(self.steps).round() as usize).clamp(MIN_STEPS, MAX_STEPS),
            attack_ms: store.value(self.attack).max(0.0),
            release_ms: store.value(self.release).max(0.0),
        }
    }

    pub fn read_step(&self, store: &ParamStore, step: usize) -> StepSlot {
        StepSlot {
            enabled: store.value(self.on[step]) > 0.5,
            duration: store.value(self.duration[step]),
            level_db: store.value(self.level[step]),
            aux_send_db: store.value(self.aux_send[step]),
            pan: store.value(self.pan[step]),
            linked: self.is_linked(store, step),
        }
    }
}

fn resolve_family(store: &ParamStore, family: StepParam) -> Result<[usize; MAX_STEPS], GateError> {
    let mut indices = [0; MAX_STEPS];
    for (step, slot) in indices.iter_mut().enumerate() {
        *slot = store.index(&family.key(step))?;
    }
    Ok(indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::layout::ParamLayout;

    #[test]
    fn resolves_standard_layout() {
        let store = ParamStore::default();
        let handles = ParamHandles::resolve(&store).unwrap();
        assert_eq!(handles.step(StepParam::Pan, 3), store.index("PAN_3").unwrap());
        assert_eq!(handles.step(StepParam::Link, 15), store.index("LINK_15").unwrap());
    }

    #[test]
    fn missing_key_fails_resolution() {
        let mut specs = ParamLayout::standard().specs().to_vec();
        specs.retain(|s| s.key != "LVL_9");
        let store = ParamStore::new(ParamLayout::new(specs), 8);
        match ParamHandles::resolve(&store) {
            Err(GateError::UnknownParameter { key }) => assert_eq!(key, "LVL_9"),
            other => panic!("expected UnknownParameter, got {other:?}"),
        }
    }

    #[test]
    fn reads_config_and_steps() {
        let store = ParamStore::default();
        let handles = ParamHandles::resolve(&store).unwrap();
        store.set("STEPS", 7.0).unwrap();
        store.set("METRIC", 4.0).unwrap();
        let config = handles.read_config(&store);
        assert_eq!(config.step_count, 7);
        assert_eq!(config.metric_index, 4);
        assert_eq!(config.release_ms, 5.0);

        store.set("ON_2", 0.0).unwrap();
        store.set("LINK_2", 1.0).unwrap();
        let slot = handles.read_step(&store, 2);
        assert!(!slot.enabled);
        assert!(slot.linked);
        assert_eq!(slot.level_db, 0.0);
    }
}
