//! Effect Router
//!
//! One LFO curve, three interpretations:
//!
//! | Mode    | Target                 | Depth knob maps to | Written value          |
//! |---------|------------------------|--------------------|------------------------|
//! | Vibrato | primary voice detune   | 0-60 cents         | `value`                |
//! | Chorus  | primary voice detune   | 0-60 cents         | `value` (+ dry double) |
//! | Tremolo | shared output gain     | 0-1 gain           | `value + depth / 2`    |
//!
//! For tremolo the LFO swings by half the depth and is lifted by the other
//! half, so the gain moves between silence and the full depth instead of going
//! negative.
//!
//! The router remembers which channel it last wrote. Rewriting the same
//! channel only cancels its future values: the value already in effect holds
//! until the new curve's first grid point, so a reschedule between grid
//! points never jumps. Moving to another channel releases the old one, which
//! is parked at its resting value (no detune, or the output volume) so a mode
//! switch leaves neither stale automation nor a stuck pitch bend behind.

use crate::config::EngineConfig;
use crate::control::{control_to_range, ControlSource, PedalMode};
use crate::host::{AudioHost, ParamTarget, VoiceId};
use crate::schedule::{ModulationParams, ModulationSample, Schedule};

/// Routes modulation curves onto host parameters
#[derive(Debug, Clone)]
pub struct EffectRouter {
    rate_range_hz: (f64, f64),
    vibrato_depth_range: (f64, f64),
    tremolo_depth_range: (f64, f64),
    output_volume: f64,
    /// Channel holding automation this router wrote
    routed: Option<ParamTarget>,
}

impl EffectRouter {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            rate_range_hz: config.rate_range_hz,
            vibrato_depth_range: config.vibrato_depth_range,
            tremolo_depth_range: config.tremolo_depth_range,
            output_volume: config.output_volume,
            routed: None,
        }
    }

    /// Physical depth for the controls' current mode
    pub fn physical_depth<C: ControlSource + ?Sized>(&self, controls: &C) -> f64 {
        let range = match controls.pedal_mode() {
            PedalMode::Vibrato | PedalMode::Chorus => self.vibrato_depth_range,
            PedalMode::Tremolo => self.tremolo_depth_range,
        };
        control_to_range(controls.depth_control(), range)
    }

    pub fn physical_rate<C: ControlSource + ?Sized>(&self, controls: &C) -> f64 {
        control_to_range(controls.rate_control(), self.rate_range_hz)
    }

    /// LFO parameters to schedule for the current controls.
    ///
    /// For tremolo the LFO depth is half the physical depth; [`route`] adds
    /// the other half back as an offset.
    ///
    /// [`route`]: EffectRouter::route
    pub fn lfo_params<C: ControlSource + ?Sized>(
        &self,
        controls: &C,
        duration_seconds: f64,
    ) -> ModulationParams {
        let depth = self.physical_depth(controls);
        let lfo_depth = match controls.pedal_mode() {
            PedalMode::Tremolo => depth / 2.0,
            _ => depth,
        };
        ModulationParams::new(
            controls.waveform(),
            self.physical_rate(controls),
            lfo_depth,
            duration_seconds,
        )
    }

    /// The parameter a mode writes to
    pub fn target_for(mode: PedalMode, primary: VoiceId) -> ParamTarget {
        match mode {
            PedalMode::Vibrato | PedalMode::Chorus => ParamTarget::Detune(primary),
            PedalMode::Tremolo => ParamTarget::OutputGain,
        }
    }

    /// Write a schedule onto the channel for `mode`.
    ///
    /// Automation this router previously wrote is cancelled from the current
    /// host time first. On the same channel the held value bridges the gap to
    /// the first new sample; a different channel is released to its resting
    /// value. The secondary (chorus) voice is kept free of detune automation.
    /// Returns the number of values written.
    pub fn route<H: AudioHost>(
        &mut self,
        mode: PedalMode,
        schedule: Schedule,
        primary: VoiceId,
        secondary: Option<VoiceId>,
        host: &mut H,
    ) -> usize {
        let now = host.current_time();
        let target = Self::target_for(mode, primary);

        if self.routed == Some(target) {
            host.cancel_scheduled_values(target, now);
        } else {
            self.cancel(host, now);
        }

        if let Some(secondary) = secondary {
            host.cancel_scheduled_values(ParamTarget::Detune(secondary), now);
        }

        let offset = match mode {
            PedalMode::Tremolo => schedule.depth(),
            _ => 0.0,
        };

        let mut written = 0;
        for ModulationSample { time, value } in schedule {
            host.set_value_at_time(target, value + offset, time);
            written += 1;
        }

        self.routed = Some(target);
        written
    }

    /// Release the routed channel: cancel its automation from `from` onward
    /// and park it at its resting value.
    pub fn cancel<H: AudioHost>(&mut self, host: &mut H, from: f64) {
        if let Some(target) = self.routed.take() {
            host.cancel_scheduled_values(target, from);
            host.set_value_at_time(target, self.resting_value(target), from);
        }
    }

    /// Value a channel returns to when no modulation drives it
    pub fn resting_value(&self, target: ParamTarget) -> f64 {
        match target {
            ParamTarget::Detune(_) => 0.0,
            ParamTarget::OutputGain => self.output_volume,
        }
    }

    /// Channel currently carrying this router's automation
    pub fn routed(&self) -> Option<ParamTarget> {
        self.routed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::FixedControls;
    use crate::host::{SampleBuffer, SimulatedHost};
    use crate::schedule::{schedule, LFO_SAMPLE_RATE};
    use crate::waveform::WaveformKind;
    use approx::assert_abs_diff_eq;
    use slotmap::SlotMap;

    fn controls(mode: PedalMode, depth: f64) -> FixedControls {
        FixedControls {
            mode,
            rate: 50.0,
            depth,
            waveform: WaveformKind::Sine,
        }
    }

    fn host_with_voices(n: usize) -> (SimulatedHost, Vec<VoiceId>) {
        let mut host = SimulatedHost::default();
        let mut keys: SlotMap<VoiceId, ()> = SlotMap::with_key();
        let ids: Vec<VoiceId> = (0..n).map(|_| keys.insert(())).collect();
        for &id in &ids {
            host.create_voice(id, &SampleBuffer::new(10.0)).unwrap();
            host.start_voice(id, 0.0, 0.0);
        }
        (host, ids)
    }

    #[test]
    fn test_vibrato_depth_mapping() {
        let router = EffectRouter::new(&EngineConfig::default());
        let c = controls(PedalMode::Vibrato, 50.0);
        assert_abs_diff_eq!(router.physical_depth(&c), 30.0);
        assert_abs_diff_eq!(router.physical_rate(&c), 5.0);
        assert_abs_diff_eq!(router.lfo_params(&c, 1.0).depth, 30.0);
    }

    #[test]
    fn test_tremolo_depth_mapping() {
        let router = EffectRouter::new(&EngineConfig::default());
        let c = controls(PedalMode::Tremolo, 50.0);
        assert_abs_diff_eq!(router.physical_depth(&c), 0.5);
        assert_abs_diff_eq!(router.lfo_params(&c, 1.0).depth, 0.25);
    }

    #[test]
    fn test_vibrato_writes_detune() {
        let (mut host, ids) = host_with_voices(1);
        let mut router = EffectRouter::new(&EngineConfig::default());
        let params = ModulationParams::new(WaveformKind::Triangle, 2.0, 20.0, 1.0);
        let s = schedule(0.0, 1.0, LFO_SAMPLE_RATE, &params).unwrap();

        let written = router.route(PedalMode::Vibrato, s, ids[0], None, &mut host);
        assert_eq!(written, 256);

        let detune = &host.voice(ids[0]).unwrap().detune;
        assert_eq!(detune.len(), 256);
        assert_abs_diff_eq!(detune.value_at(0.0), -20.0);
        assert!(host.output_gain().is_empty());
    }

    #[test]
    fn test_tremolo_gain_stays_in_range() {
        let (mut host, ids) = host_with_voices(1);
        let mut router = EffectRouter::new(&EngineConfig::default());
        let c = FixedControls {
            waveform: WaveformKind::Triangle,
            ..controls(PedalMode::Tremolo, 50.0)
        };
        let s = schedule(0.0, 2.0, LFO_SAMPLE_RATE, &router.lfo_params(&c, 2.0)).unwrap();
        router.route(PedalMode::Tremolo, s, ids[0], None, &mut host);

        let gain = host.output_gain().events();
        assert_eq!(gain.len(), 512);
        let min = gain.iter().map(|e| e.value).fold(f64::INFINITY, f64::min);
        let max = gain.iter().map(|e| e.value).fold(f64::NEG_INFINITY, f64::max);
        assert_abs_diff_eq!(min, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(max, 0.5, epsilon = 1e-9);
        assert!(host.voice(ids[0]).unwrap().detune.is_empty());
    }

    #[test]
    fn test_switching_channels_cancels_previous() {
        let (mut host, ids) = host_with_voices(1);
        let mut router = EffectRouter::new(&EngineConfig::default());
        let params = ModulationParams::new(WaveformKind::Sine, 4.0, 0.25, 0.0);

        let s = schedule(0.0, 4.0, LFO_SAMPLE_RATE, &params).unwrap();
        router.route(PedalMode::Tremolo, s, ids[0], None, &mut host);
        assert_eq!(router.routed(), Some(ParamTarget::OutputGain));

        host.set_time(1.0);
        let s = Schedule::window(0.0, 1.0, 4.0, LFO_SAMPLE_RATE, &params).unwrap();
        router.route(PedalMode::Vibrato, s, ids[0], None, &mut host);

        // gain automation after the switch is gone, parked at the resting volume
        let gain = host.output_gain();
        assert!(gain.pending_after(1.0).is_empty());
        assert_eq!(gain.value_at(1.0), 1.0);

        let detune = &host.voice(ids[0]).unwrap().detune;
        assert!(detune.events().iter().all(|e| e.time >= 1.0));
        assert_eq!(router.routed(), Some(ParamTarget::Detune(ids[0])));
    }

    #[test]
    fn test_chorus_double_stays_dry() {
        let (mut host, ids) = host_with_voices(2);
        let mut router = EffectRouter::new(&EngineConfig::default());
        let params = ModulationParams::new(WaveformKind::Sine, 4.0, 30.0, 0.0);
        let s = schedule(0.0, 1.0, LFO_SAMPLE_RATE, &params).unwrap();

        router.route(PedalMode::Chorus, s, ids[0], Some(ids[1]), &mut host);
        assert_eq!(host.voice(ids[0]).unwrap().detune.len(), 256);
        assert!(host.voice(ids[1]).unwrap().detune.is_empty());
    }

    #[test]
    fn test_switching_away_from_detune_recenters_pitch() {
        let (mut host, ids) = host_with_voices(1);
        let mut router = EffectRouter::new(&EngineConfig::default());
        let params = ModulationParams::new(WaveformKind::Sine, 5.0, 30.0, 0.0);

        let s = schedule(0.0, 4.0, LFO_SAMPLE_RATE, &params).unwrap();
        router.route(PedalMode::Vibrato, s, ids[0], None, &mut host);

        host.set_time(1.05);
        let s = Schedule::window(0.0, 1.05, 4.0, LFO_SAMPLE_RATE, &params).unwrap();
        router.route(PedalMode::Tremolo, s, ids[0], None, &mut host);

        let detune = &host.voice(ids[0]).unwrap().detune;
        assert!(detune.value_at(1.04).abs() > 20.0);
        assert_eq!(detune.value_at(1.05), 0.0);
        assert_eq!(detune.value_at(3.9), 0.0);
        assert!(detune.pending_after(1.05).is_empty());
    }

    #[test]
    fn test_same_channel_reroute_holds_current_value() {
        let (mut host, ids) = host_with_voices(1);
        let mut router = EffectRouter::new(&EngineConfig::default());
        let c = controls(PedalMode::Tremolo, 50.0);

        let s = schedule(0.0, 4.0, LFO_SAMPLE_RATE, &router.lfo_params(&c, 4.0)).unwrap();
        router.route(PedalMode::Tremolo, s, ids[0], None, &mut host);
        let held = host.output_gain().value_at(1.0);

        // between grid points: the next new sample lands at 257/256
        host.set_time(1.001);
        let c = controls(PedalMode::Tremolo, 51.0);
        let s = Schedule::window(0.0, 1.001, 4.0, LFO_SAMPLE_RATE, &router.lfo_params(&c, 3.0))
            .unwrap();
        router.route(PedalMode::Tremolo, s, ids[0], None, &mut host);

        let gain = host.output_gain();
        assert_abs_diff_eq!(gain.value_at(1.001), held);
        assert_abs_diff_eq!(gain.value_at(1.003), held);
        assert!(gain.value_at(1.003) <= 0.51);
        assert!(gain
            .events()
            .iter()
            .all(|e| e.value <= 0.51 + 1e-9));
    }

    #[test]
    fn test_resting_values() {
        let config = EngineConfig {
            output_volume: 0.8,
            ..EngineConfig::default()
        };
        let router = EffectRouter::new(&config);
        let (_, ids) = host_with_voices(1);
        assert_eq!(router.resting_value(ParamTarget::OutputGain), 0.8);
        assert_eq!(router.resting_value(ParamTarget::Detune(ids[0])), 0.0);
    }

    #[test]
    fn test_cancel_without_routing_is_noop() {
        let (mut host, _) = host_with_voices(1);
        let mut router = EffectRouter::new(&EngineConfig::default());
        router.cancel(&mut host, 0.0);
        assert!(host.output_gain().is_empty());
    }
}
