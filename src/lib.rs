pub mod config;
pub mod control;
pub mod dsp;
pub mod error;
pub mod params;

use std::sync::Arc;

use crate::config::EngineSettings;
use crate::control::ControlSurface;
use crate::dsp::processor::GateProcessor;
use crate::dsp::transport::{PlayHead, PositionInfo};
use crate::error::GateError;
use crate::params::{ParamSnapshot, ParamStore};
use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the stepgate-core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// Create a fresh parameter store plus the processor and control surface sharing it.
pub fn build(settings: &EngineSettings) -> Result<(GateProcessor, ControlSurface), GateError> {
    let params = Arc::new(ParamStore::standard(settings.change_queue_capacity));
    let processor = GateProcessor::new(Arc::clone(&params), settings)?;
    let controls = ControlSurface::new(params, processor.active_step_handle())?;
    Ok((processor, controls))
}

fn to_js(e: GateError) -> JsValue {
    JsValue::from_str(&format!("{e}"))
}

/// WASM-exposed gate for an AudioWorklet host. The worklet pushes the
/// transport before each block and pulls planar stereo buffers back.
#[wasm_bindgen]
pub struct GateNode {
    processor: GateProcessor,
    controls: ControlSurface,
    transport: Option<PositionInfo>,
}

#[wasm_bindgen]
impl GateNode {
    #[wasm_bindgen(constructor)]
    pub fn new(sample_rate: f64) -> Result<GateNode, JsValue> {
        let (mut processor, controls) = build(&EngineSettings::default()).map_err(to_js)?;
        processor.prepare(sample_rate, 128);
        Ok(GateNode {
            processor,
            controls,
            transport: None,
        })
    }

    pub fn prepare(&mut self, sample_rate: f64, max_block_size: usize) {
        self.processor.prepare(sample_rate, max_block_size);
    }

    /// Report the host transport for the next block. Pass NaN for a `bpm` or
    /// `ppq` the host does not know. Negative `ppq` is a pre-roll position.
    pub fn set_transport(&mut self, bpm: f64, ppq: f64, playing: bool) {
        self.transport = Some(PositionInfo {
            bpm: (!bpm.is_nan()).then_some(bpm),
            ppq_position: (!ppq.is_nan()).then_some(ppq),
            is_playing: playing,
        });
    }

    /// Forget the transport; subsequent blocks are muted.
    pub fn clear_transport(&mut self) {
        self.transport = None;
    }

    /// Render one block. Returns false when the block was muted.
    pub fn process(
        &mut self,
        in_left: &[f32],
        in_right: &[f32],
        main_left: &mut [f32],
        main_right: &mut [f32],
        aux_left: &mut [f32],
        aux_right: &mut [f32],
    ) -> bool {
        let play_head = self.transport.as_ref().map(|p| p as &dyn PlayHead);
        !self
            .processor
            .process(
                play_head,
                [in_left, in_right],
                [main_left, main_right],
                [aux_left, aux_right],
            )
            .is_muted()
    }

    pub fn set_param(&self, key: &str, value: f32) -> Result<f32, JsValue> {
        self.controls.params().set(key, value).map_err(to_js)
    }

    pub fn get_param(&self, key: &str) -> Result<f32, JsValue> {
        self.controls.params().get(key).map_err(to_js)
    }

    pub fn active_step(&self) -> i32 {
        self.processor.active_step()
    }

    pub fn link_all(&self) {
        self.controls.link_all();
    }

    pub fn link_none(&self) {
        self.controls.link_none();
    }

    pub fn invert_links(&self) {
        self.controls.invert_links();
    }

    /// Keys of parameters changed since the last call, including values
    /// rewritten by linked-step propagation.
    pub fn changed_params(&self) -> Vec<String> {
        let params = self.controls.params();
        self.controls
            .take_changes()
            .into_iter()
            .map(|change| params.layout().spec(change.index).key.clone())
            .collect()
    }

    pub fn accented_steps(&self) -> Vec<u32> {
        self.controls
            .accented_steps()
            .into_iter()
            .map(|s| s as u32)
            .collect()
    }

    /// Flat key → value JSON of every parameter.
    pub fn state_json(&self) -> Result<String, JsValue> {
        self.controls.params().snapshot().to_json().map_err(to_js)
    }

    pub fn load_state_json(&self, json: &str) -> Result<usize, JsValue> {
        let snapshot = ParamSnapshot::from_json(json).map_err(to_js)?;
        Ok(self.controls.params().restore(&snapshot))
    }

    /// Parameter descriptions (key, name, range, default, unit) for building a UI.
    pub fn parameter_layout(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(self.controls.params().layout().specs())
            .map_err(|e| JsValue::from_str(&format!("{e}")))
    }
}
