//! Control Surface Model
//!
//! The pedal exposes three knobs and a footswitch:
//!
//! - **Rate** - continuous 0-100, mapped to LFO frequency
//! - **Depth** - continuous 0-100, mapped to cents (vibrato/chorus) or gain (tremolo)
//! - **Mode** - seven detents selecting the LFO shape
//! - **Pedal type** - cycles vibrato → chorus → tremolo
//!
//! The widgets that draw and drag these controls live outside this crate;
//! here they are plain value holders with the same clamping behavior.

use crate::waveform::WaveformKind;
use serde::{Deserialize, Serialize};

/// Lowest control value
pub const CONTROL_MIN: f64 = 0.0;
/// Highest control value
pub const CONTROL_MAX: f64 = 100.0;

/// Linearly map `x` from one range onto another
#[inline]
pub fn remap(x: f64, in_min: f64, in_max: f64, out_min: f64, out_max: f64) -> f64 {
    (x - in_min) * (out_max - out_min) / (in_max - in_min) + out_min
}

/// Limit `value` to `[min, max]`
#[inline]
pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}

/// Map a 0-100 control value onto a physical range
#[inline]
pub fn control_to_range(control: f64, range: (f64, f64)) -> f64 {
    remap(
        clamp(control, CONTROL_MIN, CONTROL_MAX),
        CONTROL_MIN,
        CONTROL_MAX,
        range.0,
        range.1,
    )
}

/// A continuous rotary control holding a value in 0-100
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Knob {
    value: f64,
}

impl Knob {
    pub fn new(value: f64) -> Self {
        Self {
            value: clamp(value, CONTROL_MIN, CONTROL_MAX),
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Set the value, clamping to 0-100. Returns true if it changed.
    pub fn set(&mut self, value: f64) -> bool {
        let value = clamp(value, CONTROL_MIN, CONTROL_MAX);
        let changed = value != self.value;
        self.value = value;
        changed
    }
}

impl Default for Knob {
    fn default() -> Self {
        Self::new(50.0)
    }
}

/// Seven-detent waveform selector.
///
/// Detent order follows the printed panel, counter-clockwise to clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveformSelector {
    position: usize,
}

impl WaveformSelector {
    pub const POSITIONS: [WaveformKind; 7] = [
        WaveformKind::Random,
        WaveformKind::Square,
        WaveformKind::Triangle,
        WaveformKind::Sine,
        WaveformKind::EnvelopeDecay,
        WaveformKind::EnvelopeAttack,
        WaveformKind::EnvelopeRelease,
    ];

    /// Create a selector at `position`, saturating at the last detent
    pub fn new(position: usize) -> Self {
        Self {
            position: position.min(Self::POSITIONS.len() - 1),
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn kind(&self) -> WaveformKind {
        Self::POSITIONS[self.position]
    }

    /// Position of a kind on the panel, if it has one
    pub fn position_of(kind: WaveformKind) -> Option<usize> {
        Self::POSITIONS.iter().position(|&k| k == kind)
    }

    /// Move to `position`, saturating. Returns true if it moved.
    pub fn set_position(&mut self, position: usize) -> bool {
        let position = position.min(Self::POSITIONS.len() - 1);
        let changed = position != self.position;
        self.position = position;
        changed
    }

    /// Move by `steps` detents, saturating at both ends
    pub fn step(&mut self, steps: i32) -> bool {
        let target = (self.position as i64 + steps as i64).max(0) as usize;
        self.set_position(target)
    }
}

impl Default for WaveformSelector {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Pedal effect type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "wasm", derive(tsify::Tsify))]
#[cfg_attr(feature = "wasm", tsify(into_wasm_abi, from_wasm_abi))]
#[serde(rename_all = "snake_case")]
pub enum PedalMode {
    /// Pitch modulation of one voice
    #[default]
    Vibrato,
    /// Vibrato plus an unmodulated duplicate voice
    Chorus,
    /// Output gain modulation
    Tremolo,
}

impl PedalMode {
    /// Next mode in footswitch order
    pub fn next(self) -> Self {
        match self {
            PedalMode::Vibrato => PedalMode::Chorus,
            PedalMode::Chorus => PedalMode::Tremolo,
            PedalMode::Tremolo => PedalMode::Vibrato,
        }
    }

    /// Whether the mode needs a duplicate voice
    pub fn spawns_duplicate(self) -> bool {
        self == PedalMode::Chorus
    }

    /// Whether the mode modulates pitch rather than gain
    pub fn modulates_pitch(self) -> bool {
        matches!(self, PedalMode::Vibrato | PedalMode::Chorus)
    }

    pub fn name(self) -> &'static str {
        match self {
            PedalMode::Vibrato => "vibrato",
            PedalMode::Chorus => "chorus",
            PedalMode::Tremolo => "tremolo",
        }
    }
}

/// Source of the current control values.
///
/// The re-apply loop reads controls through this trait, so the same loop
/// serves knob-driven pedals, fixed presets, and tests.
pub trait ControlSource {
    fn pedal_mode(&self) -> PedalMode;
    /// Rate control, 0-100
    fn rate_control(&self) -> f64;
    /// Depth control, 0-100
    fn depth_control(&self) -> f64;
    fn waveform(&self) -> WaveformKind;
}

/// Fixed control values, handy for presets
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixedControls {
    pub mode: PedalMode,
    pub rate: f64,
    pub depth: f64,
    pub waveform: WaveformKind,
}

impl ControlSource for FixedControls {
    fn pedal_mode(&self) -> PedalMode {
        self.mode
    }

    fn rate_control(&self) -> f64 {
        self.rate
    }

    fn depth_control(&self) -> f64 {
        self.depth
    }

    fn waveform(&self) -> WaveformKind {
        self.waveform
    }
}
