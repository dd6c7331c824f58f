//! Shared types for the frameguard performance-adaptation layer.
//!
//! # Invariants
//! - Nothing in this crate owns per-frame state; it only defines the vocabulary
//!   the other crates speak.
//! - History containers are fixed capacity and drop the oldest entry.

mod clock;
mod handle;
mod listeners;
mod ring;
mod types;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use handle::VisualHandle;
pub use listeners::{ListenerError, ListenerId, ListenerResult, ListenerSet};
pub use ring::RingBuffer;
pub use types::{Aabb, EntityId, Viewport};

pub fn crate_info() -> &'static str {
    "frameguard-common v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("common"));
    }
}
