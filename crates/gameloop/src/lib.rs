//! Game loop optimizer: batched entity updates that skip work for entities
//! far from the camera.
//!
//! # Invariants
//! - Entities outside the camera plus margin are never ticked.
//! - Every expired entity is handed to the removal callback exactly once and
//!   leaves the collection in the same pass; survivors keep their order.
//! - Pass timing history is fixed capacity.

mod optimizer;

pub use optimizer::{GameLoopOptimizer, LoopConfig, LoopEntity, LoopStats, PassKind, PassStats};

pub fn crate_info() -> &'static str {
    "frameguard-gameloop v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("gameloop"));
    }
}
