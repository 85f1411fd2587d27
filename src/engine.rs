//! Pedal Engine
//!
//! Single entry point for everything that happens to the pedal. UI handlers,
//! the sample loader and the host's end-of-playback callbacks all turn into
//! an [`Event`] and go through [`PedalEngine::dispatch`], which decides what
//! scheduling work follows:
//!
//! | Event                         | Work                                            |
//! |-------------------------------|-------------------------------------------------|
//! | `SampleLoaded`                | install buffer                                  |
//! | `Play`                        | new voice generation, immediate apply           |
//! | `Stop`                        | cancel automation, stop all voices              |
//! | `VoiceEnded`                  | end generation if it was the primary            |
//! | `SetRate`, `SetDepth`, shapes | update controls, apply through cooldown         |
//! | `TogglePedalMode`, `SetPedalMode` | sync double, immediate apply on the new channel |
//! | `Tick`                        | apply if a change was dropped by the cooldown   |
//!
//! Failures are sorted the same way everywhere: nothing-playing is a no-op,
//! a modulation failure leaves the voice playing dry, and only load or
//! voice-creation failures reach the caller.

use crate::config::EngineConfig;
use crate::control::{ControlSource, PedalMode};
use crate::error::{Error, Result};
use crate::host::{AudioHost, SampleBuffer, VoiceId};
use crate::reapply::{LiveReapply, ReapplyOutcome};
use crate::router::EffectRouter;
use crate::state::EffectState;
use crate::voices::{EndedVoice, VoiceManager};
use crate::waveform::WaveformKind;
use log::{debug, info, warn};

/// Something that happened to the pedal
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The loader finished decoding the sample
    SampleLoaded(SampleBuffer),
    Play,
    Stop,
    /// The host reports a voice ran out on its own
    VoiceEnded(VoiceId),
    /// Rate knob, 0-100
    SetRate(f64),
    /// Depth knob, 0-100
    SetDepth(f64),
    SetWaveformPosition(usize),
    /// Move the waveform selector by this many detents
    StepWaveform(i32),
    SetWaveform(WaveformKind),
    TogglePedalMode,
    SetPedalMode(PedalMode),
    /// Periodic host callback; flushes changes held back by the cooldown
    Tick,
}

/// The modulation pedal, driving an [`AudioHost`]
#[derive(Debug)]
pub struct PedalEngine<H: AudioHost> {
    config: EngineConfig,
    host: H,
    state: EffectState,
    voices: VoiceManager,
    router: EffectRouter,
    reapply: LiveReapply,
}

impl<H: AudioHost> PedalEngine<H> {
    /// Create an engine after validating `config`
    pub fn new(config: EngineConfig, host: H) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            state: EffectState::new(&config),
            voices: VoiceManager::new(),
            router: EffectRouter::new(&config),
            reapply: LiveReapply::new(config.lfo_sample_rate, config.waveform_policy),
            config,
            host,
        })
    }

    /// Handle one event
    pub fn dispatch(&mut self, event: Event) -> Result<()> {
        match event {
            Event::SampleLoaded(buffer) => {
                info!(
                    "sample loaded: {} ({:.2}s)",
                    buffer.label.as_deref().unwrap_or("unnamed"),
                    buffer.duration
                );
                self.voices.set_buffer(buffer);
                Ok(())
            }
            Event::Play => self.play(),
            Event::Stop => {
                self.stop();
                Ok(())
            }
            Event::VoiceEnded(id) => {
                self.voice_ended(id);
                Ok(())
            }
            Event::SetRate(value) => {
                let changed = self.state.controls.set_rate(value);
                self.apply_if(changed)
            }
            Event::SetDepth(value) => {
                let changed = self.state.controls.set_depth(value);
                self.apply_if(changed)
            }
            Event::SetWaveformPosition(position) => {
                let changed = self.state.controls.set_waveform_position(position);
                self.apply_if(changed)
            }
            Event::StepWaveform(steps) => {
                let changed = self.state.controls.step_waveform(steps);
                self.apply_if(changed)
            }
            Event::SetWaveform(kind) => {
                let changed = self.state.controls.set_waveform(kind);
                self.apply_if(changed)
            }
            Event::TogglePedalMode => {
                let mode = self.state.controls.toggle_mode();
                self.mode_changed(mode)
            }
            Event::SetPedalMode(mode) => {
                if self.state.controls.set_mode(mode) {
                    self.mode_changed(mode)
                } else {
                    Ok(())
                }
            }
            Event::Tick => {
                let pending = self.state.cooldown.is_pending();
                self.apply_if(pending)
            }
        }
    }

    fn play(&mut self) -> Result<()> {
        let now = self.host.current_time();
        self.router.cancel(&mut self.host, now);

        let with_duplicate = self.state.pedal_mode().spawns_duplicate();
        if let Err(e) = self.voices.play(&mut self.host, with_duplicate) {
            warn!("play failed: {}", e);
            return Err(e);
        }

        self.state.cooldown.reset();
        self.apply()
    }

    fn stop(&mut self) {
        let now = self.host.current_time();
        self.router.cancel(&mut self.host, now);
        if self.voices.stop_all(&mut self.host) > 0 {
            info!("stopped at {:.3}", now);
        } else {
            debug!("stop with nothing playing");
        }
    }

    fn voice_ended(&mut self, id: VoiceId) {
        match self.voices.handle_ended(&mut self.host, id) {
            EndedVoice::Generation => {
                let now = self.host.current_time();
                self.router.cancel(&mut self.host, now);
                info!("playback finished at {:.3}", now);
            }
            EndedVoice::Duplicate => debug!("chorus double finished"),
            EndedVoice::Stale => debug!("ignoring end of superseded voice"),
        }
    }

    fn mode_changed(&mut self, mode: PedalMode) -> Result<()> {
        info!("pedal mode: {}", mode.name());
        if !self.voices.is_active() {
            return Ok(());
        }

        // the reschedule below releases the previous mode's channel
        if let Err(e) = self
            .voices
            .sync_duplicate(&mut self.host, mode.spawns_duplicate())
        {
            warn!("chorus double unavailable: {}", e);
        }

        self.state.cooldown.reset();
        self.apply()
    }

    fn apply_if(&mut self, needed: bool) -> Result<()> {
        if needed {
            self.apply()
        } else {
            Ok(())
        }
    }

    /// Run the live re-apply loop, absorbing the failures that must not
    /// interrupt playback
    fn apply(&mut self) -> Result<()> {
        let outcome = self.reapply.run(
            &mut self.state.cooldown,
            &self.state.controls,
            &self.voices,
            &mut self.router,
            &mut self.host,
        );
        match outcome {
            Ok(ReapplyOutcome::Applied { .. }) | Ok(ReapplyOutcome::CoolingDown) => Ok(()),
            Err(Error::NoActiveVoice) => {
                debug!("control change with nothing playing");
                Ok(())
            }
            // already logged; the voice keeps playing unmodulated
            Err(Error::UnsupportedWaveform(_)) | Err(Error::InvalidConfig(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutable host access, e.g. to advance its clock
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn state(&self) -> &EffectState {
        &self.state
    }

    pub fn voices(&self) -> &VoiceManager {
        &self.voices
    }

    pub fn router(&self) -> &EffectRouter {
        &self.router
    }

    /// How many times a modulation schedule was built
    pub fn scheduler_runs(&self) -> u64 {
        self.reapply.scheduler_runs()
    }

    pub fn is_playing(&self) -> bool {
        self.voices.is_active()
    }

    pub fn into_host(self) -> H {
        self.host
    }
}
