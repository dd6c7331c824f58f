use frameguard_collision::Collider;
use frameguard_common::{Aabb, EntityId, VisualHandle};
use frameguard_gameloop::LoopEntity;
use frameguard_render::{TextFactory, TextStyle};
use glam::Vec2;
use rand::Rng;
use rand::rngs::StdRng;

/// Headless stand-in for a scrolling obstacle or pickup.
#[derive(Debug, Clone)]
pub struct Body {
    pub id: EntityId,
    pub position: Vec2,
    pub size: Vec2,
    pub speed: f32,
    pub visible: bool,
}

impl Body {
    pub fn random(rng: &mut StdRng, x_range: std::ops::Range<f32>) -> Self {
        Self {
            id: EntityId::new(),
            position: Vec2::new(rng.gen_range(x_range), rng.gen_range(0.0..600.0)),
            size: Vec2::splat(rng.gen_range(16.0..48.0)),
            speed: rng.gen_range(0.1..0.4),
            visible: true,
        }
    }
}

impl Collider for Body {
    fn bounds(&self) -> Aabb {
        Aabb::from_center_size(self.position, self.size)
    }
}

impl LoopEntity for Body {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn tick(&mut self, delta_ms: f64, _now_ms: f64) {
        self.position.x -= self.speed * delta_ms as f32;
    }

    fn is_expired(&self, _now_ms: f64) -> bool {
        self.position.x < -100.0
    }
}

impl VisualHandle for Body {
    fn id(&self) -> EntityId {
        self.id
    }

    fn position(&self) -> Vec2 {
        self.position
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn set_scale(&mut self, _scale: f32) {}

    fn set_alpha(&mut self, _alpha: f32) {}
}

/// Counts text objects instead of drawing them.
#[derive(Debug, Default)]
pub struct CountingTextFactory {
    pub created: u64,
    pub destroyed: u64,
}

impl TextFactory for CountingTextFactory {
    type Handle = u64;

    fn create(&mut self, _text: &str, _style: &TextStyle, _position: Vec2) -> u64 {
        self.created += 1;
        self.created
    }

    fn reposition(&mut self, _handle: &u64, _position: Vec2) {}

    fn destroy(&mut self, _handle: u64) {
        self.destroyed += 1;
    }
}
