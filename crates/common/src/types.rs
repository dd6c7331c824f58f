use glam::Vec2;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a game entity or visual handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

/// Axis-aligned bounding box in world units.
///
/// Touching edges count as an intersection, matching how the host's arcade
/// physics treats rectangle overlap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    /// Box from two corners in any order.
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    pub fn from_center_size(center: Vec2, size: Vec2) -> Self {
        let half = size.abs() * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Halves before adding so boxes spanning most of the f32 range stay finite.
    pub fn center(&self) -> Vec2 {
        self.min * 0.5 + self.max * 0.5
    }

    pub fn half_extents(&self) -> Vec2 {
        self.max * 0.5 - self.min * 0.5
    }

    /// Inclusive overlap test.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    pub fn contains_point(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// Grow the box by `margin` on every side. Negative margins are treated as zero.
    pub fn expanded(&self, margin: f32) -> Self {
        let m = Vec2::splat(margin.max(0.0));
        Self {
            min: self.min - m,
            max: self.max + m,
        }
    }
}

/// The camera's visible world rectangle for the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    /// Visible rectangle as a box.
    pub fn bounds(&self) -> Aabb {
        Aabb::new(
            Vec2::new(self.x, self.y),
            Vec2::new(self.x + self.width, self.y + self.height),
        )
    }

    /// Whether `p` lies inside the viewport grown by `margin` on every side.
    pub fn contains_with_margin(&self, p: Vec2, margin: f32) -> bool {
        self.bounds().expanded(margin).contains_point(p)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(0.0, 0.0, 800.0, 600.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extreme_box_keeps_finite_extents() {
        let b = Aabb::new(Vec2::new(-3.0e38, -10.0), Vec2::new(3.0e38, 10.0));
        assert_eq!(b.center(), Vec2::ZERO);
        assert!(b.half_extents().x.is_finite());
        assert_eq!(b.half_extents().y, 10.0);
    }

    #[test]
    fn entity_id_uniqueness() {
        let a = EntityId::new();
        let b = EntityId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn aabb_touching_edges_intersect() {
        let a = Aabb::new(Vec2::ZERO, Vec2::new(10.0, 10.0));
        let b = Aabb::new(Vec2::new(10.0, 0.0), Vec2::new(20.0, 10.0));
        let c = Aabb::new(Vec2::new(10.5, 0.0), Vec2::new(20.0, 10.0));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn aabb_new_normalizes_corners() {
        let a = Aabb::new(Vec2::new(5.0, 5.0), Vec2::new(-5.0, -5.0));
        assert_eq!(a.min, Vec2::new(-5.0, -5.0));
        assert_eq!(a.half_extents(), Vec2::new(5.0, 5.0));
    }

    #[test]
    fn viewport_center_and_margin() {
        let view = Viewport::new(0.0, 0.0, 800.0, 600.0);
        assert_eq!(view.center(), Vec2::new(400.0, 300.0));
        assert!(!view.contains_with_margin(Vec2::new(-50.0, 300.0), 0.0));
        assert!(view.contains_with_margin(Vec2::new(-50.0, 300.0), 100.0));
    }
}
