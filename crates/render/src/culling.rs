use std::collections::HashSet;

use frameguard_common::{EntityId, Viewport, VisualHandle};
use frameguard_quality::QualityLevel;

/// Extra world units kept around the camera before an object is hidden.
pub fn culling_margin(level: QualityLevel) -> f32 {
    match level {
        QualityLevel::Ultra => 200.0,
        QualityLevel::High => 150.0,
        QualityLevel::Medium => 100.0,
        QualityLevel::Low => 50.0,
        QualityLevel::Minimal => 25.0,
    }
}

/// Counts from one culling pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CullOutcome {
    pub visible: usize,
    pub culled: usize,
    pub restored: usize,
}

/// Hides objects outside the expanded camera rectangle and shows them again
/// once they come back.
///
/// Only objects this culler hid are ever made visible again, so an object
/// the host hid for its own reasons stays hidden.
#[derive(Debug, Default)]
pub struct Culler {
    hidden: HashSet<EntityId>,
}

impl Culler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hide objects outside the camera grown by `margin` and show again the ones this culler hid earlier.
    pub fn cull<H: VisualHandle>(&mut self, objects: &mut [H], camera: &Viewport, margin: f32) -> CullOutcome {
        let bounds = camera.bounds().expanded(margin);
        let mut outcome = CullOutcome::default();

        for object in objects.iter_mut() {
            let id = object.id();
            if bounds.contains_point(object.position()) {
                if self.hidden.remove(&id) {
                    object.set_visible(true);
                    outcome.restored += 1;
                }
                if object.is_visible() {
                    outcome.visible += 1;
                }
            } else {
                if object.is_visible() {
                    object.set_visible(false);
                    self.hidden.insert(id);
                }
                if self.hidden.contains(&id) {
                    outcome.culled += 1;
                }
            }
        }
        outcome
    }

    /// Drop tracking for an object that no longer exists.
    pub fn forget(&mut self, id: EntityId) {
        self.hidden.remove(&id);
    }

    /// Whether this culler is currently hiding `id`.
    pub fn is_culled(&self, id: EntityId) -> bool {
        self.hidden.contains(&id)
    }

    pub fn culled_count(&self) -> usize {
        self.hidden.len()
    }

    pub fn clear(&mut self) {
        self.hidden.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Sprite;
    use glam::Vec2;

    #[test]
    fn margins_shrink_with_quality() {
        for pair in QualityLevel::ALL.windows(2) {
            assert!(culling_margin(pair[0]) < culling_margin(pair[1]));
        }
    }

    #[test]
    fn hides_outside_and_restores_inside() {
        let camera = Viewport::default();
        let mut culler = Culler::new();
        let mut objects = vec![Sprite::at(400.0, 300.0), Sprite::at(-500.0, 300.0)];

        let first = culler.cull(&mut objects, &camera, 100.0);
        assert_eq!(first, CullOutcome { visible: 1, culled: 1, restored: 0 });
        assert!(!objects[1].visible);
        assert!(culler.is_culled(objects[1].id));

        objects[1].position = Vec2::new(-50.0, 300.0);
        let second = culler.cull(&mut objects, &camera, 100.0);
        assert_eq!(second, CullOutcome { visible: 2, culled: 0, restored: 1 });
        assert!(objects[1].visible);
        assert_eq!(culler.culled_count(), 0);
    }

    #[test]
    fn host_hidden_objects_stay_hidden() {
        let camera = Viewport::default();
        let mut culler = Culler::new();
        let mut objects = vec![Sprite::at(400.0, 300.0)];
        objects[0].visible = false;

        let outcome = culler.cull(&mut objects, &camera, 0.0);
        assert_eq!(outcome.visible, 0);
        assert_eq!(outcome.restored, 0);
        assert!(!objects[0].visible);
    }

    #[test]
    fn margin_controls_what_survives() {
        let camera = Viewport::default();
        let mut culler = Culler::new();
        let mut objects = vec![Sprite::at(850.0, 300.0)];
        assert_eq!(culler.cull(&mut objects, &camera, 100.0).culled, 0);
        assert_eq!(culler.cull(&mut objects, &camera, 0.0).culled, 1);
    }
}
