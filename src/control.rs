//! Control surface — the operations an editor performs on the shared store.
//!
//! Runs on the control/UI thread. Everything here goes through the store's
//! atomic cells, so it never contends with the audio thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use crate::dsp::metric;
use crate::error::GateError;
use crate::params::{
    EngineConfig, MAX_STEPS, MasterParam, ParamChange, ParamHandles, ParamStore, StepParam,
    StepSlot,
};

pub struct ControlSurface {
    params: Arc<ParamStore>,
    handles: ParamHandles,
    active_step: Arc<AtomicI32>,
}

impl ControlSurface {
    /// `active_step` is the indicator handle published by the processor.
    pub fn new(params: Arc<ParamStore>, active_step: Arc<AtomicI32>) -> Result<Self, GateError> {
        let handles = ParamHandles::resolve(&params)?;
        Ok(ControlSurface {
            params,
            handles,
            active_step,
        })
    }

    pub fn params(&self) -> &Arc<ParamStore> {
        &self.params
    }

    pub fn config(&self) -> EngineConfig {
        self.handles.read_config(&self.params)
    }

    pub fn step_slot(&self, step: usize) -> Option<StepSlot> {
        (step < MAX_STEPS).then(|| self.handles.read_step(&self.params, step))
    }

    pub fn step(&self, step: usize, family: StepParam) -> Option<f32> {
        (step < MAX_STEPS).then(|| self.params.value(self.handles.step(family, step)))
    }

    /// Write one step's value. Returns the stored value, or `None` for an out-of-range step.
    pub fn set_step(&self, step: usize, family: StepParam, value: f32) -> Option<f32> {
        (step < MAX_STEPS).then(|| self.params.set_value(self.handles.step(family, step), value))
    }

    pub fn link_all(&self) {
        self.set_links(|_| true);
    }

    pub fn link_none(&self) {
        self.set_links(|_| false);
    }

    pub fn invert_links(&self) {
        self.set_links(|linked| !linked);
    }

    fn set_links(&self, f: impl Fn(bool) -> bool) {
        for step in 0..MAX_STEPS {
            let linked = self.handles.is_linked(&self.params, step);
            let value = if f(linked) { 1.0 } else { 0.0 };
            self.params.set_value(self.handles.step(StepParam::Link, step), value);
        }
    }

    pub fn master(&self, master: MasterParam) -> f32 {
        // Master keys are part of every standard layout
        self.params.get(master.key()).unwrap_or(0.0)
    }

    /// Move a master control and copy the value into every linked step.
    /// Returns how many steps were written.
    pub fn set_master(&self, master: MasterParam, value: f32) -> Result<usize, GateError> {
        let stored = self.params.set(master.key(), value)?;
        let family = master.family();
        let mut written = 0;
        for step in 0..MAX_STEPS {
            if self.handles.is_linked(&self.params, step) {
                self.params.set_value(self.handles.step(family, step), stored);
                written += 1;
            }
        }
        log::debug!(target: "gate::params", "{} = {stored} applied to {written} linked steps", master.key());
        Ok(written)
    }

    /// Steps drawn with an accent for the current metric.
    pub fn accented_steps(&self) -> Vec<usize> {
        let config = self.config();
        (0..config.step_count)
            .filter(|&step| metric::is_accented(step, config.metric_index))
            .collect()
    }

    /// Number of steps currently in the sequence.
    pub fn visible_steps(&self) -> usize {
        self.config().step_count
    }

    /// Publish edits made by the engine and drain everything queued so far.
    /// Meant for a single UI poller; other receivers of the queue see less.
    pub fn take_changes(&self) -> Vec<ParamChange> {
        self.params.publish_pending();
        self.params.changes().try_iter().collect()
    }

    /// Step the engine last reported as active, `None` while muted.
    pub fn active_step(&self) -> Option<usize> {
        usize::try_from(self.active_step.load(Ordering::Relaxed)).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface() -> ControlSurface {
        ControlSurface::new(Arc::new(ParamStore::default()), Arc::new(AtomicI32::new(-1))).unwrap()
    }

    #[test]
    fn link_buttons() {
        let c = surface();
        c.set_step(3, StepParam::Link, 1.0);
        c.invert_links();
        assert_eq!(c.step(3, StepParam::Link), Some(0.0));
        assert_eq!(c.step(4, StepParam::Link), Some(1.0));
        c.link_none();
        assert!((0..MAX_STEPS).all(|s| !c.step_slot(s).unwrap().linked));
        c.link_all();
        assert!((0..MAX_STEPS).all(|s| c.step_slot(s).unwrap().linked));
    }

    #[test]
    fn master_writes_only_linked_steps() {
        let c = surface();
        c.set_step(0, StepParam::Link, 1.0);
        c.set_step(5, StepParam::Link, 1.0);
        let written = c.set_master(MasterParam::Pan, -0.5).unwrap();
        assert_eq!(written, 2);
        assert_eq!(c.step(0, StepParam::Pan), Some(-0.5));
        assert_eq!(c.step(5, StepParam::Pan), Some(-0.5));
        assert_eq!(c.step(1, StepParam::Pan), Some(0.0));
        assert_eq!(c.master(MasterParam::Pan), -0.5);
    }

    #[test]
    fn master_value_is_clamped() {
        let c = surface();
        c.link_all();
        c.set_master(MasterParam::Level, 20.0).unwrap();
        assert_eq!(c.step(9, StepParam::Level), Some(6.0));
    }

    #[test]
    fn accents_follow_metric() {
        let c = surface();
        assert_eq!(c.accented_steps(), vec![0, 4, 8, 12]);
        c.params().set("METRIC", 1.0).unwrap();
        c.params().set("STEPS", 9.0).unwrap();
        assert_eq!(c.accented_steps(), vec![0, 3, 6]);
        assert_eq!(c.visible_steps(), 9);
    }

    #[test]
    fn take_changes_includes_engine_edits() {
        let c = surface();
        c.set_step(0, StepParam::Pan, 0.25);
        let dur = c.params().index("DUR_9").unwrap();
        c.params().set_normalized_from_audio(dur, 0.5);
        let changes = c.take_changes();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[1], ParamChange { index: dur, value: c.params().value(dur) });
        assert!((changes[1].value - 0.5).abs() < 1e-6);
        assert!(c.take_changes().is_empty());
    }

    #[test]
    fn out_of_range_step() {
        let c = surface();
        assert_eq!(c.set_step(MAX_STEPS, StepParam::On, 0.0), None);
        assert!(c.step_slot(MAX_STEPS).is_none());
    }

    #[test]
    fn active_step_indicator() {
        let indicator = Arc::new(AtomicI32::new(-1));
        let c = ControlSurface::new(Arc::new(ParamStore::default()), Arc::clone(&indicator)).unwrap();
        assert_eq!(c.active_step(), None);
        indicator.store(7, Ordering::Relaxed);
        assert_eq!(c.active_step(), Some(7));
    }
}
