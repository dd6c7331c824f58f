//! Quality levels and the dynamic quality state machine.
//!
//! # Invariants
//! - Exactly one level is current at any time.
//! - Reductions and increases use separate thresholds, and no two automatic
//!   changes happen within the adjustment cooldown.
//! - A decided change takes effect at the start of the next tick.
//! - A manual override suspends automatic transitions until cleared.

mod level;
mod manager;

pub use level::{DeviceProfile, QualityLevel, QualitySettings};
pub use manager::{
    DynamicQualityManager, QualityChange, QualityConfig, QualitySignal, TransitionReason,
};

pub fn crate_info() -> &'static str {
    "frameguard-quality v0.1.0"
}
