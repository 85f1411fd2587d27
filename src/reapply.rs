//! Live Re-apply Loop
//!
//! Dragging a knob produces a burst of change events. Rescheduling the whole
//! remaining curve on each one would flood the host with automation, so
//! reschedules go through a cooldown gate measured on the host's audio clock
//! (which stops while the audio context is suspended, unlike wall time).
//!
//! ```text
//!   event ──► no voice? ──yes──► no-op
//!                 │no
//!                 ▼
//!           cooldown left? ──yes──► drop (mark pending)
//!                 │no
//!                 ▼
//!   cancel old channel ─► build params ─► schedule ─► route ─► reset cooldown
//! ```
//!
//! Dropped requests are not queued. The engine's `Tick` re-applies once the
//! gate opens if something was dropped, so the latest control state always
//! wins.

use crate::control::ControlSource;
use crate::error::Result;
use crate::host::AudioHost;
use crate::router::EffectRouter;
use crate::schedule::Schedule;
use crate::voices::VoiceManager;
use crate::waveform::WaveformPolicy;
use log::{debug, trace, warn};

/// Rate limiter for reschedules, driven by the host clock
#[derive(Debug, Clone, PartialEq)]
pub struct Cooldown {
    window: f64,
    remaining: f64,
    last_tick: Option<f64>,
    pending: bool,
}

impl Cooldown {
    pub fn new(window: f64) -> Self {
        Self {
            window: window.max(0.0),
            remaining: 0.0,
            last_tick: None,
            pending: false,
        }
    }

    /// Gate one request at host time `now`.
    ///
    /// Elapsed time since the previous request is taken off the remaining
    /// cooldown. Returns true (and re-arms the full window) if the request may
    /// proceed; otherwise the request is dropped and marked pending.
    pub fn try_acquire(&mut self, now: f64) -> bool {
        let elapsed = self.last_tick.map_or(0.0, |last| (now - last).max(0.0));
        self.last_tick = Some(now);
        self.remaining -= elapsed;

        if self.remaining > 0.0 {
            self.pending = true;
            return false;
        }
        self.remaining = self.window;
        self.pending = false;
        true
    }

    /// Open the gate for the next request
    pub fn reset(&mut self) {
        self.remaining = 0.0;
    }

    /// A request was dropped since the last successful one
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn remaining(&self) -> f64 {
        self.remaining.max(0.0)
    }

    pub fn window(&self) -> f64 {
        self.window
    }
}

/// What a re-apply request did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReapplyOutcome {
    /// Fresh curve written with this many events
    Applied { events: usize },
    /// Dropped by the cooldown
    CoolingDown,
}

/// Reschedules modulation for the playing voice
#[derive(Debug, Clone)]
pub struct LiveReapply {
    lfo_sample_rate: f64,
    policy: WaveformPolicy,
    scheduler_runs: u64,
}

impl LiveReapply {
    pub fn new(lfo_sample_rate: f64, policy: WaveformPolicy) -> Self {
        Self {
            lfo_sample_rate,
            policy,
            scheduler_runs: 0,
        }
    }

    /// Handle one re-apply request.
    ///
    /// Returns `Error::NoActiveVoice` when nothing is playing (the cooldown is
    /// left untouched). Modulation errors cancel the router's automation, so
    /// playback continues unmodulated, and are returned for the caller to log.
    pub fn run<H, C>(
        &mut self,
        cooldown: &mut Cooldown,
        controls: &C,
        voices: &VoiceManager,
        router: &mut EffectRouter,
        host: &mut H,
    ) -> Result<ReapplyOutcome>
    where
        H: AudioHost,
        C: ControlSource + ?Sized,
    {
        let primary = voices.require_primary()?;
        let now = host.current_time();

        if !cooldown.try_acquire(now) {
            trace!(
                "reschedule dropped, {:.3}s of cooldown left",
                cooldown.remaining()
            );
            return Ok(ReapplyOutcome::CoolingDown);
        }

        let (anchor, end) = voices
            .playback_window()
            .ok_or(crate::error::Error::NoActiveVoice)?;
        let mode = controls.pedal_mode();

        let scheduled = router
            .lfo_params(controls, (end - now).max(0.0))
            .resolved(self.policy)
            .and_then(|params| {
                Schedule::window(anchor, now, end, self.lfo_sample_rate, &params)
                    .map(|schedule| (params, schedule))
            });

        let (params, schedule) = match scheduled {
            Ok(scheduled) => scheduled,
            Err(e) => {
                warn!("modulation skipped: {}", e);
                router.cancel(host, now);
                return Err(e);
            }
        };
        self.scheduler_runs += 1;

        let events = router.route(mode, schedule, primary, voices.duplicate(), host);
        debug!(
            "rescheduled {} ({}) with {} events over {:.3}s from {:.3}",
            mode.name(),
            controls.waveform().name(),
            events,
            params.duration_seconds,
            now
        );
        Ok(ReapplyOutcome::Applied { events })
    }

    /// Number of schedules built so far
    pub fn scheduler_runs(&self) -> u64 {
        self.scheduler_runs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::control::{FixedControls, PedalMode};
    use crate::error::Error;
    use crate::host::{SampleBuffer, SimulatedHost};
    use crate::waveform::WaveformKind;

    #[test]
    fn test_first_request_passes() {
        let mut cd = Cooldown::new(0.1);
        assert!(cd.try_acquire(0.0));
        assert_eq!(cd.remaining(), 0.1);
    }

    #[test]
    fn test_burst_collapses_to_one() {
        let mut cd = Cooldown::new(0.1);
        let passed = (0..10)
            .filter(|i| cd.try_acquire(*i as f64 * 0.005))
            .count();
        assert_eq!(passed, 1);
        assert!(cd.is_pending());
    }

    #[test]
    fn test_one_more_after_window() {
        let mut cd = Cooldown::new(0.1);
        assert!(cd.try_acquire(1.0));
        assert!(!cd.try_acquire(1.04));
        assert!(!cd.try_acquire(1.08));
        assert!(cd.try_acquire(1.125));
        assert!(!cd.is_pending());
        assert!(!cd.try_acquire(1.15));
    }

    #[test]
    fn test_reset_opens_gate() {
        let mut cd = Cooldown::new(0.1);
        assert!(cd.try_acquire(0.0));
        cd.reset();
        assert!(cd.try_acquire(0.01));
    }

    #[test]
    fn test_zero_window_never_blocks() {
        let mut cd = Cooldown::new(0.0);
        assert!((0..5).all(|_| cd.try_acquire(2.0)));
    }

    fn playing() -> (VoiceManager, SimulatedHost) {
        let mut voices = VoiceManager::with_buffer(SampleBuffer::new(3.0));
        let mut host = SimulatedHost::default();
        voices.play(&mut host, false).unwrap();
        (voices, host)
    }

    fn controls(waveform: WaveformKind) -> FixedControls {
        FixedControls {
            mode: PedalMode::Vibrato,
            rate: 20.0,
            depth: 50.0,
            waveform,
        }
    }

    #[test]
    fn test_no_voice_is_benign_and_keeps_cooldown() {
        let config = EngineConfig::default();
        let mut cd = Cooldown::new(0.1);
        let mut router = EffectRouter::new(&config);
        let mut reapply = LiveReapply::new(256.0, WaveformPolicy::SineFallback);
        let mut host = SimulatedHost::default();

        let err = reapply
            .run(
                &mut cd,
                &controls(WaveformKind::Sine),
                &VoiceManager::new(),
                &mut router,
                &mut host,
            )
            .unwrap_err();
        assert!(err.is_benign());
        assert_eq!(reapply.scheduler_runs(), 0);
        assert!(cd.try_acquire(0.0));
    }

    #[test]
    fn test_schedules_remaining_window() {
        let config = EngineConfig::default();
        let (voices, mut host) = playing();
        let mut cd = Cooldown::new(0.1);
        let mut router = EffectRouter::new(&config);
        let mut reapply = LiveReapply::new(256.0, WaveformPolicy::SineFallback);

        host.set_time(1.0);
        let outcome = reapply
            .run(
                &mut cd,
                &controls(WaveformKind::Sine),
                &voices,
                &mut router,
                &mut host,
            )
            .unwrap();
        // two seconds left of a three second sample
        assert_eq!(outcome, ReapplyOutcome::Applied { events: 512 });
    }

    #[test]
    fn test_strict_policy_degrades_to_dry() {
        let config = EngineConfig::default();
        let (voices, mut host) = playing();
        let mut cd = Cooldown::new(0.1);
        let mut router = EffectRouter::new(&config);
        let mut reapply = LiveReapply::new(256.0, WaveformPolicy::Strict);

        let err = reapply
            .run(
                &mut cd,
                &controls(WaveformKind::EnvelopeAttack),
                &voices,
                &mut router,
                &mut host,
            )
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedWaveform(_)));

        let primary = voices.primary().unwrap();
        assert!(host.voice(primary).unwrap().detune.is_empty());
        assert_eq!(host.playing_voices(), vec![primary]);
    }

    #[test]
    fn test_fallback_policy_substitutes_sine() {
        let config = EngineConfig::default();
        let (voices, mut host) = playing();
        let mut cd = Cooldown::new(0.1);
        let mut router = EffectRouter::new(&config);
        let mut reapply = LiveReapply::new(256.0, WaveformPolicy::SineFallback);

        let outcome = reapply
            .run(
                &mut cd,
                &controls(WaveformKind::Random),
                &voices,
                &mut router,
                &mut host,
            )
            .unwrap();
        assert_eq!(outcome, ReapplyOutcome::Applied { events: 768 });
    }
}
