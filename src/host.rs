//! Host Audio Platform
//!
//! The engine never produces audio samples itself. It drives a host that
//! owns the real audio graph (Web Audio in the browser) through a handful of
//! primitives: create and start a voice from the loaded sample, stop it, and
//! schedule or cancel step changes on two kinds of parameter:
//!
//! ```text
//!   voice ──detune──┐
//!   voice ──detune──┼──► output gain ──► destination
//!                   ┘
//! ```
//!
//! Each voice has its own detune parameter (cents); all voices share one
//! output gain stage.
//!
//! [`SimulatedHost`] implements the trait in memory with a manually advanced
//! clock, which is how the engine is exercised outside the browser.

use crate::error::{Error, Result};
use crate::timeline::ParamTimeline;
use serde::{Deserialize, Serialize};
use slotmap::{Key, KeyData};
use std::collections::HashMap;

slotmap::new_key_type! {
    /// Identifier of one voice. Generational, so a stopped voice's id is never
    /// mistaken for a newer voice occupying the same slot.
    pub struct VoiceId;
}

impl VoiceId {
    /// Stable integer form for crossing into JavaScript
    pub fn to_ffi(self) -> u64 {
        self.data().as_ffi()
    }

    pub fn from_ffi(value: u64) -> Self {
        KeyData::from_ffi(value).into()
    }
}

/// A parameter the engine can automate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamTarget {
    /// Pitch offset of one voice, in cents
    Detune(VoiceId),
    /// Shared output gain stage
    OutputGain,
}

/// A decoded sample, as reported by the loader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleBuffer {
    /// Length in seconds at normal playback rate
    pub duration: f64,
    #[serde(default)]
    pub label: Option<String>,
}

impl SampleBuffer {
    pub fn new(duration: f64) -> Self {
        Self {
            duration: duration.max(0.0),
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Audio platform primitives the engine schedules against
pub trait AudioHost {
    /// Monotonic host clock, in seconds
    fn current_time(&self) -> f64;

    /// Create a voice bound to `buffer`. Failure aborts the play request.
    fn create_voice(&mut self, voice: VoiceId, buffer: &SampleBuffer) -> Result<()>;

    /// Start a created voice at `when`, `offset` seconds into the sample
    fn start_voice(&mut self, voice: VoiceId, when: f64, offset: f64);

    /// Stop a voice at `when`, discarding its scheduled automation
    fn stop_voice(&mut self, voice: VoiceId, when: f64);

    fn set_value_at_time(&mut self, target: ParamTarget, value: f64, time: f64);

    /// Remove scheduled values at or after `from`
    fn cancel_scheduled_values(&mut self, target: ParamTarget, from: f64);
}

/// Lifecycle record of one simulated voice
#[derive(Debug, Clone)]
pub struct SimulatedVoice {
    pub buffer_duration: f64,
    pub detune: ParamTimeline,
    /// `(when, offset)` of the start call
    pub started: Option<(f64, f64)>,
    pub stopped_at: Option<f64>,
}

impl SimulatedVoice {
    /// Host time at which the sample runs out on its own
    pub fn natural_end(&self) -> Option<f64> {
        self.started
            .map(|(when, offset)| when + (self.buffer_duration - offset).max(0.0))
    }

    pub fn is_playing_at(&self, time: f64) -> bool {
        match (self.started, self.stopped_at) {
            (Some((when, _)), None) => {
                when <= time && self.natural_end().map_or(true, |end| time < end)
            }
            (Some((when, _)), Some(stop)) => when <= time && time < stop,
            _ => false,
        }
    }
}

/// In-memory host with a manual clock.
///
/// Stopped voices stay in the map so their timelines can be inspected after
/// the fact. Long runs should call [`SimulatedHost::prune_stopped`] now and
/// then, otherwise every voice ever created is kept.
#[derive(Debug, Clone)]
pub struct SimulatedHost {
    now: f64,
    output_gain: ParamTimeline,
    voices: HashMap<VoiceId, SimulatedVoice>,
    creation_failure: Option<String>,
    created: usize,
}

impl SimulatedHost {
    /// Create a host whose output gain rests at `output_volume`
    pub fn new(output_volume: f64) -> Self {
        Self {
            now: 0.0,
            output_gain: ParamTimeline::new(output_volume),
            voices: HashMap::new(),
            creation_failure: None,
            created: 0,
        }
    }

    pub fn set_time(&mut self, time: f64) {
        self.now = self.now.max(time);
    }

    pub fn advance(&mut self, seconds: f64) {
        self.now += seconds.max(0.0);
    }

    /// Make the next `create_voice` call fail with `reason`
    pub fn fail_next_voice_creation(&mut self, reason: impl Into<String>) {
        self.creation_failure = Some(reason.into());
    }

    pub fn voice(&self, id: VoiceId) -> Option<&SimulatedVoice> {
        self.voices.get(&id)
    }

    pub fn output_gain(&self) -> &ParamTimeline {
        &self.output_gain
    }

    /// Total voices ever created
    pub fn created_count(&self) -> usize {
        self.created
    }

    /// Voices producing sound right now
    pub fn playing_voices(&self) -> Vec<VoiceId> {
        self.voices
            .iter()
            .filter(|(_, v)| v.is_playing_at(self.now))
            .map(|(&id, _)| id)
            .collect()
    }

    /// Drop voices whose stop time has passed. Returns how many were removed.
    ///
    /// Voices that ran out on their own are kept until stopped, so
    /// [`SimulatedHost::naturally_ended`] still reports them.
    pub fn prune_stopped(&mut self) -> usize {
        let now = self.now;
        let before = self.voices.len();
        self.voices
            .retain(|_, v| v.stopped_at.map_or(true, |stop| stop > now));
        before - self.voices.len()
    }

    /// Voices that ran out on their own by now and were never stopped.
    ///
    /// A browser host would fire `onended` for each of these.
    pub fn naturally_ended(&self) -> Vec<VoiceId> {
        self.voices
            .iter()
            .filter(|(_, v)| {
                v.stopped_at.is_none() && v.natural_end().map_or(false, |end| end <= self.now)
            })
            .map(|(&id, _)| id)
            .collect()
    }
}

impl Default for SimulatedHost {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl AudioHost for SimulatedHost {
    fn current_time(&self) -> f64 {
        self.now
    }

    fn create_voice(&mut self, voice: VoiceId, buffer: &SampleBuffer) -> Result<()> {
        if let Some(reason) = self.creation_failure.take() {
            return Err(Error::VoiceCreation { reason });
        }
        self.voices.insert(
            voice,
            SimulatedVoice {
                buffer_duration: buffer.duration,
                detune: ParamTimeline::new(0.0),
                started: None,
                stopped_at: None,
            },
        );
        self.created += 1;
        Ok(())
    }

    fn start_voice(&mut self, voice: VoiceId, when: f64, offset: f64) {
        if let Some(v) = self.voices.get_mut(&voice) {
            v.started = Some((when, offset));
        }
    }

    fn stop_voice(&mut self, voice: VoiceId, when: f64) {
        if let Some(v) = self.voices.get_mut(&voice) {
            if v.stopped_at.is_none() {
                v.stopped_at = Some(when);
                v.detune.cancel_scheduled_values(when);
            }
        }
    }

    fn set_value_at_time(&mut self, target: ParamTarget, value: f64, time: f64) {
        match target {
            ParamTarget::Detune(id) => {
                if let Some(v) = self.voices.get_mut(&id) {
                    v.detune.set_value_at_time(value, time);
                }
            }
            ParamTarget::OutputGain => self.output_gain.set_value_at_time(value, time),
        }
    }

    fn cancel_scheduled_values(&mut self, target: ParamTarget, from: f64) {
        match target {
            ParamTarget::Detune(id) => {
                if let Some(v) = self.voices.get_mut(&id) {
                    v.detune.cancel_scheduled_values(from);
                }
            }
            ParamTarget::OutputGain => {
                self.output_gain.cancel_scheduled_values(from);
            }
        }
    }
}
