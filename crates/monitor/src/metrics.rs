use serde::{Deserialize, Serialize};

/// Points available from raw frame rate.
const FPS_POINTS: f64 = 70.0;
/// Points available from frame-time stability.
const STABILITY_POINTS: f64 = 30.0;
/// Frame-time deviation at which stability points are halved.
const STABILITY_REFERENCE_MS: f64 = 10.0;
const STUTTER_PENALTY_PER_EVENT: f64 = 5.0;
const MAX_STUTTER_PENALTY: f64 = 30.0;

/// Per-frame performance snapshot handed to consumers by value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub current_fps: u32,
    pub average_frame_time: f64,
    /// Heap usage ratio in `[0, 1]`.
    pub memory_usage: f64,
    pub stutter_count: u64,
    pub last_stutter_time: Option<f64>,
    /// Composite health score in `[0, 100]`.
    pub performance_score: u8,
}

/// Composite health score.
///
/// `fps_score = min(70, 70 * fps / target)`; `stability` is up to 30 points,
/// inversely proportional to the frame-time standard deviation and scaled by
/// how close the frame rate is to target; each recent stutter costs 5 points
/// (capped at 30). Non-finite inputs degrade to the worst case for that term.
pub fn performance_score(
    fps: f64,
    target_fps: f64,
    frame_time_std_dev: f64,
    recent_stutters: usize,
) -> u8 {
    let target = if target_fps.is_finite() && target_fps > 0.0 {
        target_fps
    } else {
        60.0
    };
    let fps = if fps.is_finite() {
        fps.max(0.0)
    } else if fps > 0.0 {
        f64::MAX
    } else {
        0.0
    };
    let headroom = (fps / target).min(1.0);

    let fps_score = (FPS_POINTS * fps / target).min(FPS_POINTS);
    let deviation = if frame_time_std_dev.is_finite() {
        frame_time_std_dev.max(0.0)
    } else {
        f64::MAX
    };
    let stability = STABILITY_POINTS * headroom / (1.0 + deviation / STABILITY_REFERENCE_MS);
    let penalty = (STUTTER_PENALTY_PER_EVENT * recent_stutters as f64).min(MAX_STUTTER_PENALTY);

    (fps_score + stability - penalty).clamp(0.0, 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steady_sixty_fps_scores_full_marks() {
        assert_eq!(performance_score(60.0, 60.0, 0.0, 0), 100);
    }

    #[test]
    fn all_zero_inputs_stay_in_range() {
        assert_eq!(performance_score(0.0, 0.0, 0.0, 0), 0);
    }

    #[test]
    fn extreme_inputs_stay_in_range() {
        let s = performance_score(f64::MAX, f64::MAX, f64::MAX, usize::MAX);
        assert!(s <= 100);
        let s = performance_score(f64::INFINITY, 60.0, f64::NAN, usize::MAX);
        assert!(s <= 100);
        let s = performance_score(f64::NAN, -1.0, -5.0, 0);
        assert!(s <= 100);
    }

    #[test]
    fn stutters_reduce_score() {
        let clean = performance_score(60.0, 60.0, 2.0, 0);
        let stuttery = performance_score(60.0, 60.0, 2.0, 3);
        assert_eq!(clean - stuttery, 15);
    }

    #[test]
    fn variance_reduces_stability() {
        let steady = performance_score(60.0, 60.0, 0.0, 0);
        let jittery = performance_score(60.0, 60.0, 20.0, 0);
        assert!(jittery < steady);
        assert_eq!(jittery, 80);
    }

    #[test]
    fn steady_twenty_fps_scores_below_half() {
        assert!(performance_score(20.0, 60.0, 0.0, 0) < 50);
    }
}
