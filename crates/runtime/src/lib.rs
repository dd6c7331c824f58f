//! Composition root for the frameguard adaptation layer.
//!
//! # Invariants
//! - There is no global state: every service is owned by one
//!   [`AdaptiveRuntime`] and reached through it.
//! - A quality decision made in `end_frame` reaches the renderer only at the
//!   next `begin_frame`.
//! - Configuration is validated before any component is built.

mod config;
mod runtime;

pub use config::{ConfigError, RuntimeConfig};
pub use runtime::{AdaptiveRuntime, COLLISION_SECTION, FrameReport, FrameStart, RENDER_SECTION};

pub fn crate_info() -> &'static str {
    "frameguard-runtime v0.1.0"
}
