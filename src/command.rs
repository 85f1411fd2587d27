//! Host Command Queue
//!
//! An [`AudioHost`] that records what the engine asks for instead of doing it.
//! A thin page-side shim drains the queue after each engine call and replays
//! the commands onto real Web Audio nodes:
//!
//! | Command                  | Web Audio call                                   |
//! |--------------------------|--------------------------------------------------|
//! | `create_voice`           | `ctx.createBufferSource()`, connect to gain      |
//! | `start_voice`            | `source.start(when, offset)`                     |
//! | `stop_voice`             | `source.stop(when)`                              |
//! | `set_values`             | `param.setValueAtTime(value, time)` per event    |
//! | `cancel_scheduled_values`| `param.cancelScheduledValues(from)`              |
//!
//! Consecutive writes to one parameter are coalesced into a single
//! `set_values` command so a reschedule crosses the JS boundary once.

use crate::error::Result;
use crate::host::{AudioHost, ParamTarget, SampleBuffer, VoiceId};
use serde::{Deserialize, Serialize};

/// Parameter addressed by a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "wasm", derive(tsify::Tsify))]
#[cfg_attr(feature = "wasm", tsify(into_wasm_abi, from_wasm_abi))]
#[serde(rename_all = "snake_case", tag = "param")]
pub enum CommandTarget {
    Detune { voice: u64 },
    OutputGain,
}

impl From<ParamTarget> for CommandTarget {
    fn from(target: ParamTarget) -> Self {
        match target {
            ParamTarget::Detune(id) => CommandTarget::Detune { voice: id.to_ffi() },
            ParamTarget::OutputGain => CommandTarget::OutputGain,
        }
    }
}

/// One host operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "wasm", derive(tsify::Tsify))]
#[cfg_attr(feature = "wasm", tsify(into_wasm_abi, from_wasm_abi))]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum HostCommand {
    CreateVoice {
        voice: u64,
    },
    StartVoice {
        voice: u64,
        when: f64,
        offset: f64,
    },
    StopVoice {
        voice: u64,
        when: f64,
    },
    /// `(time, value)` pairs in ascending time order
    SetValues {
        target: CommandTarget,
        events: Vec<(f64, f64)>,
    },
    CancelScheduledValues {
        target: CommandTarget,
        from: f64,
    },
}

/// Recording host fed by the page's audio clock
#[derive(Debug, Clone, Default)]
pub struct CommandQueue {
    now: f64,
    commands: Vec<HostCommand>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update the clock from `AudioContext.currentTime`
    pub fn set_time(&mut self, time: f64) {
        self.now = self.now.max(time);
    }

    pub fn commands(&self) -> &[HostCommand] {
        &self.commands
    }

    pub fn pending_count(&self) -> usize {
        self.commands.len()
    }

    /// Take every recorded command, oldest first
    pub fn drain(&mut self) -> Vec<HostCommand> {
        core::mem::take(&mut self.commands)
    }
}

impl AudioHost for CommandQueue {
    fn current_time(&self) -> f64 {
        self.now
    }

    fn create_voice(&mut self, voice: VoiceId, _buffer: &SampleBuffer) -> Result<()> {
        self.commands.push(HostCommand::CreateVoice {
            voice: voice.to_ffi(),
        });
        Ok(())
    }

    fn start_voice(&mut self, voice: VoiceId, when: f64, offset: f64) {
        self.commands.push(HostCommand::StartVoice {
            voice: voice.to_ffi(),
            when,
            offset,
        });
    }

    fn stop_voice(&mut self, voice: VoiceId, when: f64) {
        self.commands.push(HostCommand::StopVoice {
            voice: voice.to_ffi(),
            when,
        });
    }

    fn set_value_at_time(&mut self, target: ParamTarget, value: f64, time: f64) {
        let target = CommandTarget::from(target);
        if let Some(HostCommand::SetValues {
            target: last,
            events,
        }) = self.commands.last_mut()
        {
            if *last == target {
                events.push((time, value));
                return;
            }
        }
        self.commands.push(HostCommand::SetValues {
            target,
            events: vec![(time, value)],
        });
    }

    fn cancel_scheduled_values(&mut self, target: ParamTarget, from: f64) {
        self.commands.push(HostCommand::CancelScheduledValues {
            target: target.into(),
            from,
        });
    }
}
