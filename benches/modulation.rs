//! Modulation Scheduling Benchmarks
//!
//! A reschedule runs inside a UI event handler, so it has to finish well
//! inside one frame. The LFO resolution is fixed, which makes the cost a
//! function of the remaining sample length only:
//!
//! ```text
//! events = ceil(remaining_seconds · 256)
//! ```
//!
//! | Remaining | Events | Frame budget (60 Hz) |
//! |-----------|--------|----------------------|
//! | 1 s       | 256    | 16.7 ms              |
//! | 10 s      | 2560   | 16.7 ms              |
//! | 60 s      | 15360  | 16.7 ms              |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use warble::prelude::*;

// ============================================================================
// Constants
// ============================================================================

const DURATIONS: [f64; 3] = [1.0, 10.0, 60.0];
const SHAPES: [WaveformKind; 4] = [
    WaveformKind::Sine,
    WaveformKind::Triangle,
    WaveformKind::Square,
    WaveformKind::Ramp,
];

// ============================================================================
// Helper Functions
// ============================================================================

/// Engine playing a sample of `duration` seconds, with no cooldown so every
/// knob change reschedules
fn playing_engine(duration: f64, mode: PedalMode) -> PedalEngine<SimulatedHost> {
    let config = EngineConfig {
        cooldown_seconds: 0.0,
        ..EngineConfig::default()
    };
    let mut engine = PedalEngine::new(config, SimulatedHost::default()).unwrap();
    engine
        .dispatch(Event::SampleLoaded(SampleBuffer::new(duration)))
        .unwrap();
    engine.dispatch(Event::SetPedalMode(mode)).unwrap();
    engine.dispatch(Event::Play).unwrap();
    engine
}

// ============================================================================
// Waveform Benchmarks
// ============================================================================

fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("waveform/generate");

    for kind in SHAPES {
        group.throughput(Throughput::Elements(1024));
        group.bench_with_input(BenchmarkId::new("1024", kind.name()), &kind, |b, &kind| {
            b.iter(|| {
                let mut acc = 0.0;
                for i in 0..1024u64 {
                    acc += generate(black_box(i), LFO_SAMPLE_RATE, kind, 5.0, 30.0).unwrap_or(0.0);
                }
                acc
            });
        });
    }

    group.finish();
}

// ============================================================================
// Scheduling Benchmarks
// ============================================================================

fn bench_schedule(c: &mut Criterion) {
    let mut group = c.benchmark_group("schedule/collect");

    for duration in DURATIONS {
        let name = format!("{}s", duration as u32);
        let params = ModulationParams::new(WaveformKind::Sine, 5.0, 30.0, duration);

        group.throughput(Throughput::Elements((duration * LFO_SAMPLE_RATE) as u64));
        group.bench_with_input(BenchmarkId::new("sine", &name), &params, |b, params| {
            b.iter(|| {
                schedule(0.0, black_box(params.duration_seconds), LFO_SAMPLE_RATE, params)
                    .unwrap()
                    .map(|s| s.value)
                    .sum::<f64>()
            });
        });
    }

    group.finish();
}

// ============================================================================
// Re-apply Benchmarks
// ============================================================================

fn bench_reschedule(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine/reschedule");

    for mode in [PedalMode::Vibrato, PedalMode::Chorus, PedalMode::Tremolo] {
        for duration in DURATIONS {
            let name = format!("{}/{}s", mode.name(), duration as u32);
            group.bench_function(BenchmarkId::new("knob", &name), |b| {
                let mut engine = playing_engine(duration, mode);
                let mut knob = 0.0;
                b.iter(|| {
                    knob = (knob + 1.0) % 100.0;
                    engine.dispatch(Event::SetRate(black_box(knob))).unwrap();
                });
            });
        }
    }

    group.finish();
}

// ============================================================================
// Criterion Groups
// ============================================================================

criterion_group!(waveform_benches, bench_generate,);

criterion_group!(schedule_benches, bench_schedule, bench_reschedule,);

criterion_main!(waveform_benches, schedule_benches);
