//! Waveform Generator
//!
//! A stateless LFO: every value is computed directly from the sample index,
//! so any window of the modulation curve can be recomputed without replaying
//! what came before it.
//!
//! ```text
//! x = 2π · f · (i / sample_rate)      u = x / 2π
//!
//! Sine       depth · sin(x)
//! Triangle   depth · (2·|2·(u − ⌊u + ½⌋)| − 1)
//! Square     depth · sign(depth · sin(x))
//! Ramp       depth · 2·(u − ⌊u + ½⌋)
//! ```
//!
//! All defined shapes are bipolar and stay inside `[-depth, depth]`. Triangle
//! starts at its trough (`-depth`), Sine and Ramp start at zero, Square starts
//! high.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// LFO waveform shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "wasm", derive(tsify::Tsify))]
#[cfg_attr(feature = "wasm", tsify(into_wasm_abi, from_wasm_abi))]
#[serde(rename_all = "snake_case")]
pub enum WaveformKind {
    Sine,
    Triangle,
    Square,
    Ramp,
    Random,
    EnvelopeDecay,
    EnvelopeAttack,
    EnvelopeRelease,
}

impl WaveformKind {
    /// Every kind, defined or not
    pub const ALL: [WaveformKind; 8] = [
        WaveformKind::Sine,
        WaveformKind::Triangle,
        WaveformKind::Square,
        WaveformKind::Ramp,
        WaveformKind::Random,
        WaveformKind::EnvelopeDecay,
        WaveformKind::EnvelopeAttack,
        WaveformKind::EnvelopeRelease,
    ];

    /// Whether this kind has a formula
    pub fn is_defined(self) -> bool {
        matches!(
            self,
            WaveformKind::Sine | WaveformKind::Triangle | WaveformKind::Square | WaveformKind::Ramp
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            WaveformKind::Sine => "sine",
            WaveformKind::Triangle => "triangle",
            WaveformKind::Square => "square",
            WaveformKind::Ramp => "ramp",
            WaveformKind::Random => "random",
            WaveformKind::EnvelopeDecay => "envelope_decay",
            WaveformKind::EnvelopeAttack => "envelope_attack",
            WaveformKind::EnvelopeRelease => "envelope_release",
        }
    }
}

/// What to do when asked for a waveform without a formula
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaveformPolicy {
    /// Surface `Error::UnsupportedWaveform`
    Strict,
    /// Substitute a sine of the same rate and depth
    #[default]
    SineFallback,
}

impl WaveformPolicy {
    /// Resolve the kind that will actually be generated
    pub fn resolve(self, kind: WaveformKind) -> Result<WaveformKind> {
        match (kind.is_defined(), self) {
            (true, _) => Ok(kind),
            (false, WaveformPolicy::SineFallback) => Ok(WaveformKind::Sine),
            (false, WaveformPolicy::Strict) => Err(Error::UnsupportedWaveform(kind)),
        }
    }
}

/// Compute one LFO value.
///
/// Deterministic and side-effect free. Undefined kinds fail with
/// `Error::UnsupportedWaveform`; callers wanting a fallback resolve the kind
/// through [`WaveformPolicy`] first.
#[inline]
pub fn generate(
    sample_index: u64,
    sample_rate: f64,
    kind: WaveformKind,
    frequency_hz: f64,
    depth: f64,
) -> Result<f64> {
    let time = sample_index as f64 / sample_rate;
    let x = TAU * frequency_hz * time;

    match kind {
        WaveformKind::Sine => Ok(depth * x.sin()),
        WaveformKind::Triangle => {
            let u = x / TAU;
            let triangle = 2.0 * (2.0 * (u - (u + 0.5).floor())).abs() - 1.0;
            Ok(depth * triangle)
        }
        // sign of a zero product counts as positive, so the wave starts high
        WaveformKind::Square => Ok(depth * (depth * x.sin()).signum()),
        WaveformKind::Ramp => {
            let u = x / TAU;
            Ok(depth * 2.0 * (u - (u + 0.5).floor()))
        }
        other => Err(Error::UnsupportedWaveform(other)),
    }
}
