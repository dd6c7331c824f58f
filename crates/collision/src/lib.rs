//! Spatially indexed collision detection between a player box and the
//! obstacle and item collections of a tick.
//!
//! # Invariants
//! - The indexed query reports exactly the pairs a linear scan would: the
//!   lowest-index overlapping obstacle, and every overlapping item.
//! - The grid is rebuilt from the input slices on every query; no entity
//!   state survives between ticks.
//! - Zero entities is a valid input and produces an empty report.

mod grid;
mod index;

pub use frameguard_common::Aabb;

pub use grid::{CellCoord, EntityKind, GridEntry, SpatialGrid};
pub use index::{
    Collider, CollisionConfig, CollisionReport, QueryStats, SpatialCollisionIndex,
    brute_force_query,
};

pub fn crate_info() -> &'static str {
    "frameguard-collision v0.1.0"
}
