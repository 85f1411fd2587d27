//! WarbleEngine - Main WASM interface for the pedal
//!
//! The page owns the `AudioContext`. Before each call it passes in
//! `ctx.currentTime` via [`WarbleEngine::set_time`]; after each call it drains
//! the recorded host commands and replays them onto its Web Audio nodes.

use super::error::WarbleError;
use crate::command::CommandQueue;
use crate::config::EngineConfig;
use crate::control::{ControlSource, PedalMode, WaveformSelector};
use crate::engine::{Event, PedalEngine};
use crate::host::{SampleBuffer, VoiceId};
use crate::waveform::WaveformKind;
use wasm_bindgen::prelude::*;

/// Main WASM interface for the modulation pedal
#[wasm_bindgen]
pub struct WarbleEngine {
    engine: PedalEngine<CommandQueue>,
}

#[wasm_bindgen]
impl WarbleEngine {
    /// Create an engine, optionally from a JSON config document
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<WarbleEngine, JsValue> {
        // Initialize panic hook for better error messages
        console_error_panic_hook::set_once();

        let config = match config_json {
            Some(json) => {
                EngineConfig::from_json(&json).map_err(|e| WarbleError::from(e).into_js())?
            }
            None => EngineConfig::default(),
        };
        let engine = PedalEngine::new(config, CommandQueue::new())
            .map_err(|e| WarbleError::from(e).into_js())?;
        Ok(Self { engine })
    }

    /// Current config as JSON
    pub fn config_json(&self) -> Result<String, JsValue> {
        self.engine
            .config()
            .to_json()
            .map_err(|e| WarbleError::from(e).into_js())
    }

    // =========================================================================
    // Clock & Commands
    // =========================================================================

    /// Feed the audio clock (`AudioContext.currentTime`)
    pub fn set_time(&mut self, time: f64) {
        self.engine.host_mut().set_time(time);
    }

    /// Take every host command recorded since the last drain
    pub fn drain_commands(&mut self) -> Result<JsValue, JsValue> {
        let commands = self.engine.host_mut().drain();
        serde_wasm_bindgen::to_value(&commands).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Number of commands waiting to be drained
    pub fn pending_command_count(&self) -> usize {
        self.engine.host().pending_count()
    }

    // =========================================================================
    // Playback
    // =========================================================================

    /// Report the decoded sample's duration in seconds
    pub fn load_sample(&mut self, duration: f64, label: Option<String>) -> Result<(), JsValue> {
        let mut buffer = SampleBuffer::new(duration);
        buffer.label = label;
        self.dispatch(Event::SampleLoaded(buffer))
    }

    pub fn play(&mut self) -> Result<(), JsValue> {
        self.dispatch(Event::Play)
    }

    pub fn stop(&mut self) -> Result<(), JsValue> {
        self.dispatch(Event::Stop)
    }

    /// Forward a source node's `onended`
    pub fn voice_ended(&mut self, voice: u64) -> Result<(), JsValue> {
        self.dispatch(Event::VoiceEnded(VoiceId::from_ffi(voice)))
    }

    #[wasm_bindgen(getter)]
    pub fn is_playing(&self) -> bool {
        self.engine.is_playing()
    }

    // =========================================================================
    // Controls
    // =========================================================================

    pub fn set_rate(&mut self, value: f64) -> Result<(), JsValue> {
        self.dispatch(Event::SetRate(value))
    }

    pub fn set_depth(&mut self, value: f64) -> Result<(), JsValue> {
        self.dispatch(Event::SetDepth(value))
    }

    pub fn set_waveform_position(&mut self, position: usize) -> Result<(), JsValue> {
        self.dispatch(Event::SetWaveformPosition(position))
    }

    pub fn next_waveform(&mut self) -> Result<(), JsValue> {
        self.dispatch(Event::StepWaveform(1))
    }

    pub fn prev_waveform(&mut self) -> Result<(), JsValue> {
        self.dispatch(Event::StepWaveform(-1))
    }

    /// Select a shape by name, e.g. `"triangle"` or `"ramp"`
    pub fn set_waveform(&mut self, name: &str) -> Result<(), JsValue> {
        let kind = parse_waveform(name)?;
        self.dispatch(Event::SetWaveform(kind))
    }

    pub fn toggle_pedal_mode(&mut self) -> Result<(), JsValue> {
        self.dispatch(Event::TogglePedalMode)
    }

    /// Set the mode by name: `"vibrato"`, `"chorus"` or `"tremolo"`
    pub fn set_pedal_mode(&mut self, name: &str) -> Result<(), JsValue> {
        let mode = parse_pedal_mode(name)?;
        self.dispatch(Event::SetPedalMode(mode))
    }

    /// Call periodically (e.g. from `requestAnimationFrame`)
    pub fn tick(&mut self) -> Result<(), JsValue> {
        self.dispatch(Event::Tick)
    }

    // =========================================================================
    // State Queries
    // =========================================================================

    #[wasm_bindgen(getter)]
    pub fn pedal_mode(&self) -> String {
        self.engine.state().pedal_mode().name().into()
    }

    #[wasm_bindgen(getter)]
    pub fn waveform(&self) -> String {
        self.engine.state().waveform().name().into()
    }

    #[wasm_bindgen(getter)]
    pub fn waveform_position(&self) -> usize {
        self.engine.state().controls.waveform_position()
    }

    #[wasm_bindgen(getter)]
    pub fn rate(&self) -> f64 {
        self.engine.state().rate_control()
    }

    #[wasm_bindgen(getter)]
    pub fn depth(&self) -> f64 {
        self.engine.state().depth_control()
    }

    /// Snapshot of the control positions
    pub fn get_controls(&self) -> Result<JsValue, JsValue> {
        let snapshot = self.engine.state().controls.snapshot();
        serde_wasm_bindgen::to_value(&snapshot).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Names of the selector detents, in knob order
    pub fn selector_labels(&self) -> js_sys::Array {
        WaveformSelector::POSITIONS
            .iter()
            .map(|kind| JsValue::from_str(kind.name()))
            .collect()
    }

    pub fn scheduler_runs(&self) -> f64 {
        self.engine.scheduler_runs() as f64
    }

    // =========================================================================
    // Internal
    // =========================================================================

    fn dispatch(&mut self, event: Event) -> Result<(), JsValue> {
        self.engine
            .dispatch(event)
            .map_err(|e| WarbleError::from(e).into_js())
    }
}

fn parse_waveform(s: &str) -> Result<WaveformKind, JsValue> {
    WaveformKind::ALL
        .into_iter()
        .find(|kind| kind.name() == s)
        .ok_or_else(|| JsValue::from_str(&format!("Unknown waveform: {}", s)))
}

fn parse_pedal_mode(s: &str) -> Result<PedalMode, JsValue> {
    match s {
        "vibrato" => Ok(PedalMode::Vibrato),
        "chorus" => Ok(PedalMode::Chorus),
        "tremolo" => Ok(PedalMode::Tremolo),
        _ => Err(JsValue::from_str(&format!("Unknown pedal mode: {}", s))),
    }
}
