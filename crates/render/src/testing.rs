use frameguard_common::{EntityId, VisualHandle};
use glam::Vec2;

/// In-memory handle recording whatever the optimizer sets on it.
#[derive(Debug, Clone)]
pub struct Sprite {
    pub id: EntityId,
    pub position: Vec2,
    pub visible: bool,
    pub scale: f32,
    pub alpha: f32,
    pub simplified: bool,
}

impl Sprite {
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            id: EntityId::new(),
            position: Vec2::new(x, y),
            visible: true,
            scale: 1.0,
            alpha: 1.0,
            simplified: false,
        }
    }
}

impl VisualHandle for Sprite {
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

    fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
    }

    fn set_alpha(&mut self, alpha: f32) {
        self.alpha = alpha;
    }

    fn set_simplified(&mut self, simplified: bool) {
        self.simplified = simplified;
    }
}
