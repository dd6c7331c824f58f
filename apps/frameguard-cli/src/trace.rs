use clap::ValueEnum;
use rand::Rng;
use rand::rngs::StdRng;

/// Synthetic frame-time and memory traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// ~60 FPS with light jitter.
    Steady,
    /// Frame time climbs from 16ms to 60ms.
    Degrading,
    /// Steady frames with a 300ms hitch every 90 frames.
    Stutter,
    /// Steady frames with the heap at 95%.
    MemoryPressure,
    /// 20 FPS for the first half, 60 FPS after.
    Recovery,
}

#[derive(Debug, Clone, Copy)]
pub struct TraceFrame {
    pub frame_ms: f64,
    pub memory: f64,
}

pub fn frame_at(scenario: Scenario, index: usize, total: usize, rng: &mut StdRng) -> TraceFrame {
    let jitter = rng.gen_range(-1.5..1.5);
    let progress = index as f64 / total.max(1) as f64;
    let (frame_ms, memory) = match scenario {
        Scenario::Steady => (16.7 + jitter, 0.4),
        Scenario::Degrading => (16.0 + 44.0 * progress + jitter, 0.4 + 0.3 * progress),
        Scenario::Stutter => {
            if index % 90 == 89 {
                (300.0, 0.45)
            } else {
                (16.7 + jitter, 0.45)
            }
        }
        Scenario::MemoryPressure => (16.7 + jitter, 0.95),
        Scenario::Recovery => {
            if progress < 0.5 {
                (50.0 + jitter, 0.6)
            } else {
                (16.7 + jitter, 0.5)
            }
        }
    };
    TraceFrame {
        frame_ms: frame_ms.max(1.0),
        memory,
    }
}
