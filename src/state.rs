//! Effect State
//!
//! The pedal's mutable state lives in one struct with one owner (the engine).
//! Controls change only through the setters below; each setter reports
//! whether anything actually changed so redundant UI events do not trigger a
//! reschedule.

use crate::config::EngineConfig;
use crate::control::{ControlSource, FixedControls, Knob, PedalMode, WaveformSelector};
use crate::reapply::Cooldown;
use crate::waveform::WaveformKind;

/// Knob, selector and footswitch positions
#[derive(Debug, Clone, PartialEq)]
pub struct PedalControls {
    mode: PedalMode,
    rate: Knob,
    depth: Knob,
    selector: WaveformSelector,
    /// Shape chosen through the API that has no detent (e.g. ramp)
    waveform_override: Option<WaveformKind>,
}

impl PedalControls {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            mode: config.initial_pedal_mode,
            rate: Knob::new(config.initial_rate),
            depth: Knob::new(config.initial_depth),
            selector: WaveformSelector::new(config.initial_waveform_position),
            waveform_override: None,
        }
    }

    pub fn set_rate(&mut self, value: f64) -> bool {
        self.rate.set(value)
    }

    pub fn set_depth(&mut self, value: f64) -> bool {
        self.depth.set(value)
    }

    pub fn set_waveform_position(&mut self, position: usize) -> bool {
        let cleared = self.waveform_override.take().is_some();
        self.selector.set_position(position) || cleared
    }

    pub fn step_waveform(&mut self, steps: i32) -> bool {
        let cleared = self.waveform_override.take().is_some();
        self.selector.step(steps) || cleared
    }

    /// Select a shape directly. Shapes on the panel move the selector.
    pub fn set_waveform(&mut self, kind: WaveformKind) -> bool {
        match WaveformSelector::position_of(kind) {
            Some(position) => self.set_waveform_position(position),
            None => {
                let changed = self.waveform_override != Some(kind);
                self.waveform_override = Some(kind);
                changed
            }
        }
    }

    pub fn set_mode(&mut self, mode: PedalMode) -> bool {
        let changed = mode != self.mode;
        self.mode = mode;
        changed
    }

    /// Advance the footswitch, returning the new mode
    pub fn toggle_mode(&mut self) -> PedalMode {
        self.mode = self.mode.next();
        self.mode
    }

    pub fn waveform_position(&self) -> usize {
        self.selector.position()
    }

    pub fn snapshot(&self) -> FixedControls {
        FixedControls {
            mode: self.mode,
            rate: self.rate.value(),
            depth: self.depth.value(),
            waveform: self.waveform(),
        }
    }
}

impl ControlSource for PedalControls {
    fn pedal_mode(&self) -> PedalMode {
        self.mode
    }

    fn rate_control(&self) -> f64 {
        self.rate.value()
    }

    fn depth_control(&self) -> f64 {
        self.depth.value()
    }

    fn waveform(&self) -> WaveformKind {
        self.waveform_override.unwrap_or_else(|| self.selector.kind())
    }
}

/// Everything the live re-apply loop reads and writes
#[derive(Debug, Clone, PartialEq)]
pub struct EffectState {
    pub controls: PedalControls,
    pub cooldown: Cooldown,
}

impl EffectState {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            controls: PedalControls::from_config(config),
            cooldown: Cooldown::new(config.cooldown_seconds),
        }
    }
}

impl ControlSource for EffectState {
    fn pedal_mode(&self) -> PedalMode {
        self.controls.pedal_mode()
    }

    fn rate_control(&self) -> f64 {
        self.controls.rate_control()
    }

    fn depth_control(&self) -> f64 {
        self.controls.depth_control()
    }

    fn waveform(&self) -> WaveformKind {
        self.controls.waveform()
    }
}
