//! # Warble: LFO Modulation Pedal Engine
//!
//! `warble` is the control side of a sample-playback effects pedal. It turns
//! knob positions into low-frequency-oscillator curves and schedules them onto
//! an audio host's parameter timelines. It never renders audio itself; the
//! host (Web Audio in the browser, or [`SimulatedHost`] in tests) does.
//!
//! ## Architecture
//!
//! ```text
//!  Event ──► PedalEngine::dispatch
//!               │
//!               ├─► VoiceManager ───────────────► AudioHost voices
//!               │
//!               └─► LiveReapply (cooldown gate)
//!                      │
//!                      ├─► Schedule ◄── generate()   (256 values / s)
//!                      │
//!                      └─► EffectRouter ──────────► detune / output gain
//! ```
//!
//! - **Vibrato** modulates the playing voice's detune
//! - **Chorus** adds an unmodulated duplicate voice alongside
//! - **Tremolo** modulates the shared output gain
//!
//! ## Quick Start
//!
//! ```rust
//! use warble::prelude::*;
//!
//! let mut engine = PedalEngine::new(EngineConfig::default(), SimulatedHost::default()).unwrap();
//! engine.dispatch(Event::SampleLoaded(SampleBuffer::new(2.0))).unwrap();
//! engine.dispatch(Event::Play).unwrap();
//!
//! // Turn the rate knob a bit later on the host clock
//! engine.host_mut().advance(0.5);
//! engine.dispatch(Event::SetRate(80.0)).unwrap();
//!
//! assert_eq!(engine.scheduler_runs(), 2);
//! ```

pub mod command;
pub mod config;
pub mod control;
pub mod engine;
pub mod error;
pub mod host;
pub mod reapply;
pub mod router;
pub mod schedule;
pub mod state;
pub mod timeline;
pub mod voices;
pub mod waveform;

#[cfg(feature = "wasm")]
pub mod wasm;

/// Prelude module for convenient imports
pub mod prelude {
    // Waveforms & Scheduling
    pub use crate::schedule::{
        schedule, ModulationParams, ModulationSample, Schedule, LFO_SAMPLE_RATE,
    };
    pub use crate::waveform::{generate, WaveformKind, WaveformPolicy};

    // Controls
    pub use crate::control::{
        ControlSource, FixedControls, Knob, PedalMode, WaveformSelector, CONTROL_MAX, CONTROL_MIN,
    };
    pub use crate::state::{EffectState, PedalControls};

    // Host
    pub use crate::command::{CommandQueue, CommandTarget, HostCommand};
    pub use crate::host::{AudioHost, ParamTarget, SampleBuffer, SimulatedHost, VoiceId};
    pub use crate::timeline::{ParamTimeline, TimelineEvent};

    // Engine
    pub use crate::config::EngineConfig;
    pub use crate::engine::{Event, PedalEngine};
    pub use crate::error::{Error, Result};
    pub use crate::reapply::{Cooldown, LiveReapply, ReapplyOutcome};
    pub use crate::router::EffectRouter;
    pub use crate::voices::{EndedVoice, VoiceManager, VoiceRole};
}

// Re-export key types at crate root for convenience
pub use prelude::*;
