//! Block renderer — runs the gate over one host block.
//!
//! Per block: propagate linked edits, resolve the transport, read the global
//! config and publish the active step. Per sample: locate the step, resolve the
//! gate target, advance the envelope, apply level and pan, and write both buses.
//!
//! Nothing in [`GateProcessor::process`] allocates, locks, or returns an error.
//! Transport problems mute the block and clear the active-step indicator.

use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use crate::config::EngineSettings;
use crate::error::GateError;
use crate::params::{EngineConfig, ParamHandles, ParamStore, StepParam};

use super::gate::{GateSmoother, RampTimes};
use super::link::LinkPropagator;
use super::metric;
use super::pan::pan_gains;
use super::sequencer::step_position;
use super::transport::{PlayHead, TransportFault, TransportState, TransportTracker};

const DEFAULT_SAMPLE_RATE: f64 = 44100.0;

/// Outcome of one `process` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BlockStatus {
    Rendered(TransportState),
    Muted(TransportFault),
}

impl BlockStatus {
    pub fn is_muted(&self) -> bool {
        matches!(self, BlockStatus::Muted(_))
    }
}

/// Decibels to linear gain.
#[inline]
pub fn db_to_gain(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

pub struct GateProcessor {
    params: Arc<ParamStore>,
    handles: ParamHandles,
    sample_rate: f64,
    max_block_size: usize,
    transport: TransportTracker,
    gate: GateSmoother,
    linker: LinkPropagator,
    active_step: Arc<AtomicI32>,
    last_fault: Option<TransportFault>,
}

impl GateProcessor {
    /// Build a processor over `params`. Store indices are resolved here, once.
    pub fn new(params: Arc<ParamStore>, settings: &EngineSettings) -> Result<Self, GateError> {
        let handles = ParamHandles::resolve(&params)?;
        let mut linker = LinkPropagator::new(settings.link_epsilon);
        linker.prime(&params, &handles);
        Ok(GateProcessor {
            params,
            handles,
            sample_rate: DEFAULT_SAMPLE_RATE,
            max_block_size: 0,
            transport: TransportTracker::new(settings.transport_mode, settings.fallback_bpm),
            gate: GateSmoother::new(DEFAULT_SAMPLE_RATE),
            linker,
            active_step: Arc::new(AtomicI32::new(-1)),
            last_fault: None,
        })
    }

    /// Called by the host before streaming starts and whenever rate or block size change.
    /// Never concurrent with `process`.
    pub fn prepare(&mut self, sample_rate: f64, max_block_size: usize) {
        let sample_rate = if sample_rate.is_finite() && sample_rate > 0.0 {
            sample_rate
        } else {
            log::warn!(target: "gate::engine", "invalid sample rate {sample_rate}, using {DEFAULT_SAMPLE_RATE}");
            DEFAULT_SAMPLE_RATE
        };
        self.sample_rate = sample_rate;
        self.max_block_size = max_block_size;
        self.gate.reset(sample_rate);
        self.transport.reset();
        self.active_step.store(-1, Ordering::Relaxed);
        self.last_fault = None;
        log::debug!(target: "gate::engine", "prepared at {sample_rate} Hz, max block {max_block_size}");
    }

    pub fn release_resources(&mut self) {
        self.active_step.store(-1, Ordering::Relaxed);
        log::debug!(target: "gate::engine", "resources released");
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn max_block_size(&self) -> usize {
        self.max_block_size
    }

    pub fn params(&self) -> &Arc<ParamStore> {
        &self.params
    }

    /// Step shown as active, or -1 when muted.
    pub fn active_step(&self) -> i32 {
        self.active_step.load(Ordering::Relaxed)
    }

    /// Shared handle to the active-step indicator for observers on other threads.
    pub fn active_step_handle(&self) -> Arc<AtomicI32> {
        Arc::clone(&self.active_step)
    }

    /// Render one block. The sample count is the shortest of the six buffers;
    /// output samples beyond it are left untouched.
    pub fn process(
        &mut self,
        play_head: Option<&dyn PlayHead>,
        input: [&[f32]; 2],
        main: [&mut [f32]; 2],
        aux: [&mut [f32]; 2],
    ) -> BlockStatus {
        let [main_left, main_right] = main;
        let [aux_left, aux_right] = aux;
        let num_samples = input[0]
            .len()
            .min(input[1].len())
            .min(main_left.len())
            .min(main_right.len())
            .min(aux_left.len())
            .min(aux_right.len());

        self.linker.propagate(&self.params, &self.handles);

        let state = match self.transport.resolve(play_head, num_samples, self.sample_rate) {
            Ok(state) => state,
            Err(fault) => {
                self.note_fault(Some(fault));
                self.active_step.store(-1, Ordering::Relaxed);
                for out in [main_left, main_right, aux_left, aux_right] {
                    out.fill(0.0);
                }
                return BlockStatus::Muted(fault);
            }
        };
        self.note_fault(None);

        let config = self.handles.read_config(&self.params);
        let step_beats = metric::step_duration_beats(config.metric_index);
        let step_count = config.step_count;

        let indicator = step_position(state.start_beat, step_beats, step_count);
        self.active_step.store(indicator.index as i32, Ordering::Relaxed);

        let ramp = ramp_times(&config);
        let params = &*self.params;
        let handles = &self.handles;

        for n in 0..num_samples {
            let position = step_position(state.beat_at(n), step_beats, step_count);
            let step = position.index;

            let enabled = params.value(handles.step(StepParam::On, step)) > 0.5;
            let duration = params.value(handles.step(StepParam::Duration, step));
            let target = if enabled && position.progress < duration as f64 {
                1.0
            } else {
                0.0
            };
            let gain = self.gate.next_sample(target, ramp);

            let level = db_to_gain(params.value(handles.step(StepParam::Level, step)));
            let aux_level = db_to_gain(params.value(handles.step(StepParam::AuxSend, step)));
            let (pan_left, pan_right) = pan_gains(params.value(handles.step(StepParam::Pan, step)));

            let left = input[0][n] * gain;
            let right = input[1][n] * gain;
            main_left[n] = left * level * pan_left;
            main_right[n] = right * level * pan_right;
            aux_left[n] = left * aux_level * pan_left;
            aux_right[n] = right * aux_level * pan_right;
        }

        BlockStatus::Rendered(state)
    }

    fn note_fault(&mut self, fault: Option<TransportFault>) {
        if fault == self.last_fault {
            return;
        }
        match fault {
            Some(fault) => log::debug!(target: "gate::transport", "muting output: {fault:?}"),
            None => log::debug!(target: "gate::transport", "transport available, gating resumed"),
        }
        self.last_fault = fault;
    }
}

fn ramp_times(config: &EngineConfig) -> RampTimes {
    RampTimes {
        attack_ms: config.attack_ms,
        release_ms: config.release_ms,
    }
}
