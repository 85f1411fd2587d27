//! Engine Configuration
//!
//! All tunable constants of the pedal in one serializable struct. Missing
//! fields fall back to the reference pedal's values, so a partial JSON
//! document like `{"cooldown_seconds": 0.05}` is a valid config.

use crate::control::{PedalMode, WaveformSelector, CONTROL_MAX, CONTROL_MIN};
use crate::error::{Error, Result};
use crate::schedule::LFO_SAMPLE_RATE;
use crate::waveform::WaveformPolicy;
use serde::{Deserialize, Serialize};

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// LFO evaluations per second of modulation
    pub lfo_sample_rate: f64,
    /// Minimum host-clock time between two reschedules
    pub cooldown_seconds: f64,
    /// Rate knob range, in Hz
    pub rate_range_hz: (f64, f64),
    /// Depth knob range for vibrato and chorus, in cents
    pub vibrato_depth_range: (f64, f64),
    /// Depth knob range for tremolo, as output gain
    pub tremolo_depth_range: (f64, f64),
    /// Output gain when tremolo is not active
    pub output_volume: f64,
    pub initial_rate: f64,
    pub initial_depth: f64,
    pub initial_waveform_position: usize,
    pub initial_pedal_mode: PedalMode,
    pub waveform_policy: WaveformPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lfo_sample_rate: LFO_SAMPLE_RATE,
            cooldown_seconds: 0.1,
            rate_range_hz: (0.0, 10.0),
            vibrato_depth_range: (0.0, 60.0),
            tremolo_depth_range: (0.0, 1.0),
            output_volume: 1.0,
            initial_rate: 50.0,
            initial_depth: 50.0,
            initial_waveform_position: 3,
            initial_pedal_mode: PedalMode::Vibrato,
            waveform_policy: WaveformPolicy::SineFallback,
        }
    }
}

impl EngineConfig {
    /// Parse from JSON and validate
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check every field is in range
    pub fn validate(&self) -> Result<()> {
        if !(self.lfo_sample_rate > 0.0 && self.lfo_sample_rate.is_finite()) {
            return Err(invalid("lfo_sample_rate must be positive and finite"));
        }
        if !(self.cooldown_seconds >= 0.0 && self.cooldown_seconds.is_finite()) {
            return Err(invalid("cooldown_seconds must be finite and not negative"));
        }
        check_range("rate_range_hz", self.rate_range_hz)?;
        check_range("vibrato_depth_range", self.vibrato_depth_range)?;
        check_range("tremolo_depth_range", self.tremolo_depth_range)?;
        if !(self.output_volume >= 0.0 && self.output_volume.is_finite()) {
            return Err(invalid("output_volume must be finite and not negative"));
        }
        for (name, value) in [
            ("initial_rate", self.initial_rate),
            ("initial_depth", self.initial_depth),
        ] {
            if !(CONTROL_MIN..=CONTROL_MAX).contains(&value) {
                return Err(invalid(&format!(
                    "{} must be within {}..={}, got {}",
                    name, CONTROL_MIN, CONTROL_MAX, value
                )));
            }
        }
        if self.initial_waveform_position >= WaveformSelector::POSITIONS.len() {
            return Err(invalid(&format!(
                "initial_waveform_position must be below {}",
                WaveformSelector::POSITIONS.len()
            )));
        }
        Ok(())
    }
}

fn check_range(name: &str, (min, max): (f64, f64)) -> Result<()> {
    if !(min >= 0.0 && max >= min && max.is_finite()) {
        return Err(invalid(&format!(
            "{} must satisfy 0 <= min <= max, got ({}, {})",
            name, min, max
        )));
    }
    Ok(())
}

fn invalid(msg: &str) -> Error {
    Error::InvalidConfig(msg.to_string())
}
