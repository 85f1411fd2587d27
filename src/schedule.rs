//! Modulation Scheduler
//!
//! Walks a time window at a fixed control resolution and yields
//! `(time, value)` pairs ready to be written onto a parameter timeline.
//!
//! The resolution (256 evaluations per second by default) is independent of
//! the host's audio sample rate, which bounds the number of timeline events a
//! reschedule creates: ten seconds of modulation is 2560 events whether the
//! host runs at 44.1 kHz or 192 kHz.
//!
//! A [`Schedule`] is a lazy iterator. It is cheap to clone and to restart, and
//! every value is computed from its index alone, so rescheduling from the
//! middle of a voice costs only the samples that remain.

use crate::error::{Error, Result};
use crate::waveform::{generate, WaveformKind, WaveformPolicy};
use serde::{Deserialize, Serialize};
use std::iter::FusedIterator;

/// Default LFO evaluation rate (evaluations per second)
pub const LFO_SAMPLE_RATE: f64 = 256.0;

/// Physical LFO parameters for one scheduling pass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "wasm", derive(tsify::Tsify))]
#[cfg_attr(feature = "wasm", tsify(into_wasm_abi, from_wasm_abi))]
pub struct ModulationParams {
    pub kind: WaveformKind,
    /// LFO frequency in Hz, never negative
    pub rate_hz: f64,
    /// Peak deviation in the target's unit (cents or gain), never negative
    pub depth: f64,
    /// Length of the curve these parameters describe. [`Schedule::new`] and
    /// [`Schedule::window`] take their extent explicitly; use
    /// [`Schedule::from_params`] to schedule exactly this length.
    pub duration_seconds: f64,
}

impl ModulationParams {
    pub fn new(kind: WaveformKind, rate_hz: f64, depth: f64, duration_seconds: f64) -> Self {
        Self {
            kind,
            rate_hz: rate_hz.max(0.0),
            depth: depth.max(0.0),
            duration_seconds: duration_seconds.max(0.0),
        }
    }

    /// Apply a waveform policy, substituting or rejecting undefined kinds
    pub fn resolved(self, policy: WaveformPolicy) -> Result<Self> {
        Ok(Self {
            kind: policy.resolve(self.kind)?,
            ..self
        })
    }
}

/// One point of a modulation curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModulationSample {
    /// Absolute time on the host clock, in seconds
    pub time: f64,
    pub value: f64,
}

/// Lazy, restartable sequence of modulation samples.
///
/// Sample `n` of the sequence is LFO index `first_index + n`, placed at
/// `anchor + (first_index + n) / sample_rate`.
#[derive(Debug, Clone)]
pub struct Schedule {
    anchor: f64,
    sample_rate: f64,
    kind: WaveformKind,
    rate_hz: f64,
    depth: f64,
    first_index: u64,
    len: usize,
    cursor: usize,
}

impl Schedule {
    /// Schedule `ceil(duration · sample_rate)` samples starting at `start`.
    ///
    /// Fails for undefined waveform kinds and for a non-positive sample rate.
    pub fn new(
        start: f64,
        duration: f64,
        sample_rate: f64,
        params: &ModulationParams,
    ) -> Result<Self> {
        check_inputs(sample_rate, params)?;
        let len = if duration > 0.0 {
            (duration * sample_rate).ceil() as usize
        } else {
            0
        };
        Ok(Self::build(start, sample_rate, params, 0, len))
    }

    /// Schedule `params.duration_seconds` worth of samples from `start`
    pub fn from_params(start: f64, sample_rate: f64, params: &ModulationParams) -> Result<Self> {
        Self::new(start, params.duration_seconds, sample_rate, params)
    }

    /// Schedule the part of an LFO anchored at `anchor` that falls in
    /// `[from, until)`.
    ///
    /// The LFO grid stays aligned with the anchor, so repeated windows over
    /// the same voice continue one curve instead of restarting its phase.
    pub fn window(
        anchor: f64,
        from: f64,
        until: f64,
        sample_rate: f64,
        params: &ModulationParams,
    ) -> Result<Self> {
        check_inputs(sample_rate, params)?;
        let first = ((from - anchor) * sample_rate).ceil().max(0.0);
        let end = ((until - anchor) * sample_rate).ceil().max(0.0);
        let len = if end > first { (end - first) as usize } else { 0 };
        Ok(Self::build(anchor, sample_rate, params, first as u64, len))
    }

    fn build(
        anchor: f64,
        sample_rate: f64,
        params: &ModulationParams,
        first_index: u64,
        len: usize,
    ) -> Self {
        Self {
            anchor,
            sample_rate,
            kind: params.kind,
            rate_hz: params.rate_hz,
            depth: params.depth,
            first_index,
            len,
            cursor: 0,
        }
    }

    /// Rewind to the first sample
    pub fn restart(&mut self) {
        self.cursor = 0;
    }

    /// Total number of samples, independent of iteration progress
    pub fn total_len(&self) -> usize {
        self.len
    }

    pub fn kind(&self) -> WaveformKind {
        self.kind
    }

    pub fn depth(&self) -> f64 {
        self.depth
    }

    /// Time of the first sample, if any
    pub fn start_time(&self) -> Option<f64> {
        (self.len > 0).then(|| self.time_of(0))
    }

    #[inline]
    fn time_of(&self, n: usize) -> f64 {
        self.anchor + (self.first_index + n as u64) as f64 / self.sample_rate
    }
}

fn check_inputs(sample_rate: f64, params: &ModulationParams) -> Result<()> {
    if !(sample_rate > 0.0) {
        return Err(Error::InvalidConfig(format!(
            "LFO sample rate must be positive, got {}",
            sample_rate
        )));
    }
    if !params.kind.is_defined() {
        return Err(Error::UnsupportedWaveform(params.kind));
    }
    Ok(())
}

impl Iterator for Schedule {
    type Item = ModulationSample;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.len {
            return None;
        }
        let n = self.cursor;
        self.cursor += 1;

        let index = self.first_index + n as u64;
        // kind was checked at construction
        let value = generate(index, self.sample_rate, self.kind, self.rate_hz, self.depth)
            .unwrap_or(0.0);

        Some(ModulationSample {
            time: self.time_of(n),
            value,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.cursor;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Schedule {}

impl FusedIterator for Schedule {}

/// Schedule `ceil(duration · sample_rate)` samples starting at `start`
pub fn schedule(
    start: f64,
    duration: f64,
    sample_rate: f64,
    params: &ModulationParams,
) -> Result<Schedule> {
    Schedule::new(start, duration, sample_rate, params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn triangle() -> ModulationParams {
        ModulationParams::new(WaveformKind::Triangle, 2.0, 20.0, 1.0)
    }

    #[test]
    fn test_one_second_triangle() {
        let params = triangle();
        let samples: Vec<_> = schedule(0.0, 1.0, LFO_SAMPLE_RATE, &params)
            .unwrap()
            .collect();

        assert_eq!(samples.len(), 256);
        assert_abs_diff_eq!(samples[0].time, 0.0);
        assert_abs_diff_eq!(samples[0].value, -20.0);
        assert_abs_diff_eq!(samples[1].time, 1.0 / 256.0);
        assert!(samples.last().unwrap().time < 1.0);
    }

    #[test]
    fn test_length_is_ceiling() {
        let params = ModulationParams::new(WaveformKind::Sine, 5.0, 1.0, 0.0);
        for &(duration, expected) in &[(0.5, 128), (0.001, 1), (2.5, 640), (1.0 / 3.0, 86)] {
            let s = schedule(3.0, duration, LFO_SAMPLE_RATE, &params).unwrap();
            assert_eq!(s.len(), expected, "duration {}", duration);
        }
    }

    #[test]
    fn test_times_strictly_increase() {
        let params = ModulationParams::new(WaveformKind::Ramp, 7.0, 3.0, 0.0);
        let s = schedule(12.25, 4.0, LFO_SAMPLE_RATE, &params).unwrap();
        let times: Vec<f64> = s.map(|m| m.time).collect();
        assert!(times.windows(2).all(|w| w[1] > w[0]));
        assert_abs_diff_eq!(times[0], 12.25);
    }

    #[test]
    fn test_from_params_uses_duration_field() {
        let params = ModulationParams::new(WaveformKind::Sine, 3.0, 10.0, 0.5);
        let s = Schedule::from_params(2.0, LFO_SAMPLE_RATE, &params).unwrap();
        assert_eq!(s.len(), 128);
        assert_eq!(s.start_time(), Some(2.0));
        let explicit: Vec<_> = schedule(2.0, 0.5, LFO_SAMPLE_RATE, &params).unwrap().collect();
        assert_eq!(s.collect::<Vec<_>>(), explicit);
    }

    #[test]
    fn test_zero_duration_is_empty() {
        let mut s = schedule(1.0, 0.0, LFO_SAMPLE_RATE, &triangle()).unwrap();
        assert_eq!(s.len(), 0);
        assert!(s.next().is_none());
        assert!(s.start_time().is_none());
    }

    #[test]
    fn test_zero_rate_is_constant() {
        let params = ModulationParams::new(WaveformKind::Square, 0.0, 4.0, 0.0);
        assert!(schedule(0.0, 1.0, LFO_SAMPLE_RATE, &params)
            .unwrap()
            .all(|m| m.value == 4.0));

        let params = ModulationParams::new(WaveformKind::Sine, 0.0, 4.0, 0.0);
        assert!(schedule(0.0, 1.0, LFO_SAMPLE_RATE, &params)
            .unwrap()
            .all(|m| m.value == 0.0));
    }

    #[test]
    fn test_idempotent_and_restartable() {
        let params = ModulationParams::new(WaveformKind::Sine, 3.3, 12.0, 0.0);
        let a: Vec<_> = schedule(0.5, 2.0, LFO_SAMPLE_RATE, &params)
            .unwrap()
            .collect();
        let b: Vec<_> = schedule(0.5, 2.0, LFO_SAMPLE_RATE, &params)
            .unwrap()
            .collect();
        assert_eq!(a, b);

        let mut s = schedule(0.5, 2.0, LFO_SAMPLE_RATE, &params).unwrap();
        let first: Vec<_> = s.by_ref().take(10).collect();
        s.restart();
        let again: Vec<_> = s.take(10).collect();
        assert_eq!(first, again);
    }

    #[test]
    fn test_window_continues_anchored_curve() {
        let params = ModulationParams::new(WaveformKind::Sine, 2.0, 10.0, 0.0);
        let full: Vec<_> = schedule(1.0, 4.0, LFO_SAMPLE_RATE, &params)
            .unwrap()
            .collect();

        // reschedule from 2.3 s into the same voice
        let tail: Vec<_> = Schedule::window(1.0, 3.3, 5.0, LFO_SAMPLE_RATE, &params)
            .unwrap()
            .collect();

        let offset = full.len() - tail.len();
        assert!(tail[0].time >= 3.3);
        for (a, b) in full[offset..].iter().zip(&tail) {
            assert_abs_diff_eq!(a.time, b.time, epsilon = 1e-9);
            assert_abs_diff_eq!(a.value, b.value, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_window_past_end_is_empty() {
        let params = triangle();
        let s = Schedule::window(0.0, 5.0, 4.0, LFO_SAMPLE_RATE, &params).unwrap();
        assert_eq!(s.len(), 0);
    }

    #[test]
    fn test_rejects_undefined_kind() {
        let params = ModulationParams::new(WaveformKind::Random, 1.0, 1.0, 1.0);
        assert!(matches!(
            schedule(0.0, 1.0, LFO_SAMPLE_RATE, &params),
            Err(Error::UnsupportedWaveform(WaveformKind::Random))
        ));

        let resolved = params.resolved(WaveformPolicy::SineFallback).unwrap();
        assert!(schedule(0.0, 1.0, LFO_SAMPLE_RATE, &resolved).is_ok());
    }

    #[test]
    fn test_rejects_bad_sample_rate() {
        assert!(matches!(
            schedule(0.0, 1.0, 0.0, &triangle()),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_params_never_negative() {
        let p = ModulationParams::new(WaveformKind::Sine, -1.0, -5.0, -2.0);
        assert_eq!(p.rate_hz, 0.0);
        assert_eq!(p.depth, 0.0);
        assert_eq!(p.duration_seconds, 0.0);
    }
}
