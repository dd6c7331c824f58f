use glam::Vec2;

use crate::EntityId;

/// Opaque visual object owned by the host's renderer.
///
/// The adaptation layer never draws anything itself; it only reads a
/// position and flips the handful of properties every rendering backend
/// exposes. Swap in any backend without changing consumers.
pub trait VisualHandle {
    fn id(&self) -> EntityId;

    fn position(&self) -> Vec2;

    fn is_visible(&self) -> bool;

    fn set_visible(&mut self, visible: bool);

    fn set_scale(&mut self, scale: f32);

    fn set_alpha(&mut self, alpha: f32);

    /// Switch to a cheaper representation. Backends without one ignore it.
    fn set_simplified(&mut self, _simplified: bool) {}
}
