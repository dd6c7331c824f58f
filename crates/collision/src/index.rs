use frameguard_common::Aabb;
use serde::{Deserialize, Serialize};

use crate::grid::{EntityKind, GridEntry, SpatialGrid};

/// Anything that can take part in a collision query.
pub trait Collider {
    fn bounds(&self) -> Aabb;

    /// Inactive entities (pooled, dying) are skipped by both query paths.
    fn is_active(&self) -> bool {
        true
    }
}

impl Collider for Aabb {
    fn bounds(&self) -> Aabb {
        *self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    /// Grid cell edge length in world units.
    pub cell_size: f32,
    /// When false every query takes the linear-scan path.
    pub use_spatial_index: bool,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            cell_size: 128.0,
            use_spatial_index: true,
        }
    }
}

/// Outcome of one collision query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollisionReport {
    /// First obstacle (lowest index) overlapping the player.
    pub obstacle_hit: Option<usize>,
    /// Every item overlapping the player, ascending.
    pub items_hit: Vec<usize>,
}

impl CollisionReport {
    pub fn is_empty(&self) -> bool {
        self.obstacle_hit.is_none() && self.items_hit.is_empty()
    }
}

/// Per-query diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryStats {
    pub total_entities: usize,
    pub candidates: usize,
    pub aabb_tests: usize,
    pub cells_visited: usize,
    pub indexed: bool,
}

/// Grid-accelerated collision queries.
///
/// Every query rebuilds the grid from the slices it is given, looks only at
/// the cells around the player, and reports exactly what a linear scan over
/// the same slices would.
#[derive(Debug)]
pub struct SpatialCollisionIndex {
    config: CollisionConfig,
    grid: SpatialGrid,
    candidates: Vec<GridEntry>,
    stats: QueryStats,
}

impl SpatialCollisionIndex {
    /// Create an index. An invalid cell size falls back to 128.
    pub fn new(config: CollisionConfig) -> Self {
        Self {
            grid: SpatialGrid::new(config.cell_size),
            config,
            candidates: Vec::new(),
            stats: QueryStats::default(),
        }
    }

    /// Test `player` against obstacles and items.
    ///
    /// Obstacles stop at the first confirmed hit; items are all reported.
    /// Callbacks run in ascending index order, obstacles first.
    pub fn query<O, I>(
        &mut self,
        player: &Aabb,
        obstacles: &[O],
        items: &[I],
        mut on_obstacle_hit: impl FnMut(usize, &O),
        mut on_item_hit: impl FnMut(usize, &I),
    ) -> CollisionReport
    where
        O: Collider,
        I: Collider,
    {
        if !self.config.use_spatial_index {
            let (report, stats) = scan(player, obstacles, items, &mut on_obstacle_hit, &mut on_item_hit);
            self.stats = stats;
            return report;
        }

        let _span = tracing::info_span!("collision_query").entered();
        self.rebuild(obstacles, items);

        self.candidates.clear();
        let center = self.grid.cell_of(player.center().x, player.center().y);
        let half = player.half_extents();
        let radius = self.grid.search_radius(half.x.max(half.y));
        let cells_visited = self.grid.collect_neighbourhood(center, radius, &mut self.candidates);
        self.candidates.sort_unstable_by_key(|e| (e.kind, e.index));

        let mut report = CollisionReport::default();
        let mut tests = 0;
        for entry in &self.candidates {
            match entry.kind {
                EntityKind::Obstacle => {
                    if report.obstacle_hit.is_some() {
                        continue;
                    }
                    tests += 1;
                    let obstacle = &obstacles[entry.index];
                    if player.intersects(&obstacle.bounds()) {
                        report.obstacle_hit = Some(entry.index);
                        on_obstacle_hit(entry.index, obstacle);
                    }
                }
                EntityKind::Item => {
                    tests += 1;
                    let item = &items[entry.index];
                    if player.intersects(&item.bounds()) {
                        report.items_hit.push(entry.index);
                        on_item_hit(entry.index, item);
                    }
                }
            }
        }

        self.stats = QueryStats {
            total_entities: obstacles.len() + items.len(),
            candidates: self.candidates.len(),
            aabb_tests: tests,
            cells_visited,
            indexed: true,
        };
        tracing::trace!(
            candidates = self.stats.candidates,
            total = self.stats.total_entities,
            obstacle_hit = ?report.obstacle_hit,
            items = report.items_hit.len(),
            "collision query complete"
        );
        report
    }

    fn rebuild<O: Collider, I: Collider>(&mut self, obstacles: &[O], items: &[I]) {
        self.grid.clear();
        for (index, o) in obstacles.iter().enumerate().filter(|(_, o)| o.is_active()) {
            self.grid.insert(
                &o.bounds(),
                GridEntry {
                    kind: EntityKind::Obstacle,
                    index,
                },
            );
        }
        for (index, i) in items.iter().enumerate().filter(|(_, i)| i.is_active()) {
            self.grid.insert(
                &i.bounds(),
                GridEntry {
                    kind: EntityKind::Item,
                    index,
                },
            );
        }
    }

    /// Diagnostics from the last query.
    pub fn stats(&self) -> QueryStats {
        self.stats
    }

    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    pub fn config(&self) -> &CollisionConfig {
        &self.config
    }

    /// Toggle between the grid and the linear scan.
    pub fn set_use_spatial_index(&mut self, enabled: bool) {
        self.config.use_spatial_index = enabled;
    }
}

impl Default for SpatialCollisionIndex {
    fn default() -> Self {
        Self::new(CollisionConfig::default())
    }
}

/// Reference linear scan. Same semantics and callback order as the indexed path.
pub fn brute_force_query<O, I>(
    player: &Aabb,
    obstacles: &[O],
    items: &[I],
    mut on_obstacle_hit: impl FnMut(usize, &O),
    mut on_item_hit: impl FnMut(usize, &I),
) -> CollisionReport
where
    O: Collider,
    I: Collider,
{
    scan(player, obstacles, items, &mut on_obstacle_hit, &mut on_item_hit).0
}

fn scan<O, I>(
    player: &Aabb,
    obstacles: &[O],
    items: &[I],
    on_obstacle_hit: &mut impl FnMut(usize, &O),
    on_item_hit: &mut impl FnMut(usize, &I),
) -> (CollisionReport, QueryStats)
where
    O: Collider,
    I: Collider,
{
    let mut report = CollisionReport::default();
    let mut tests = 0;

    for (index, obstacle) in obstacles.iter().enumerate().filter(|(_, o)| o.is_active()) {
        tests += 1;
        if player.intersects(&obstacle.bounds()) {
            report.obstacle_hit = Some(index);
            on_obstacle_hit(index, obstacle);
            break;
        }
    }
    for (index, item) in items.iter().enumerate().filter(|(_, i)| i.is_active()) {
        tests += 1;
        if player.intersects(&item.bounds()) {
            report.items_hit.push(index);
            on_item_hit(index, item);
        }
    }

    let stats = QueryStats {
        total_entities: obstacles.len() + items.len(),
        candidates: obstacles.len() + items.len(),
        aabb_tests: tests,
        cells_visited: 0,
        indexed: false,
    };
    (report, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    fn square(x: f32, y: f32, size: f32) -> Aabb {
        Aabb::from_center_size(Vec2::new(x, y), Vec2::splat(size))
    }

    struct Pickup {
        bounds: Aabb,
        collected: bool,
    }

    impl Collider for Pickup {
        fn bounds(&self) -> Aabb {
            self.bounds
        }

        fn is_active(&self) -> bool {
            !self.collected
        }
    }

    #[test]
    fn empty_world_is_empty_report() {
        let mut index = SpatialCollisionIndex::default();
        let report = index.query::<Aabb, Aabb>(&square(0.0, 0.0, 32.0), &[], &[], |_, _| {}, |_, _| {});
        assert!(report.is_empty());
        assert_eq!(index.stats().total_entities, 0);
    }

    #[test]
    fn obstacles_stop_at_first_hit() {
        let mut index = SpatialCollisionIndex::default();
        let obstacles = [square(500.0, 0.0, 10.0), square(5.0, 0.0, 20.0), square(-5.0, 0.0, 20.0)];
        let mut hits = Vec::new();
        let report = index.query::<Aabb, Aabb>(
            &square(0.0, 0.0, 32.0),
            &obstacles,
            &[],
            |i, _| hits.push(i),
            |_, _| {},
        );
        assert_eq!(report.obstacle_hit, Some(1));
        assert_eq!(hits, vec![1]);
    }

    #[test]
    fn items_are_all_collected() {
        let mut index = SpatialCollisionIndex::default();
        let items = [square(5.0, 5.0, 10.0), square(400.0, 0.0, 10.0), square(-8.0, 0.0, 10.0)];
        let mut picked = Vec::new();
        let report = index.query::<Aabb, Aabb>(
            &square(0.0, 0.0, 32.0),
            &[],
            &items,
            |_, _| {},
            |i, _| picked.push(i),
        );
        assert_eq!(report.items_hit, vec![0, 2]);
        assert_eq!(picked, vec![0, 2]);
    }

    #[test]
    fn inactive_entities_are_ignored() {
        let mut index = SpatialCollisionIndex::default();
        let items = [Pickup {
            bounds: square(0.0, 0.0, 10.0),
            collected: true,
        }];
        let report = index.query::<Aabb, Pickup>(&square(0.0, 0.0, 32.0), &[], &items, |_, _| {}, |_, _| {});
        assert!(report.items_hit.is_empty());
        let reference = brute_force_query::<Aabb, Pickup>(&square(0.0, 0.0, 32.0), &[], &items, |_, _| {}, |_, _| {});
        assert_eq!(report, reference);
    }

    #[test]
    fn index_only_examines_nearby_candidates() {
        let mut index = SpatialCollisionIndex::default();
        let obstacles: Vec<Aabb> = (0..100).map(|i| square(i as f32 * 300.0, 0.0, 20.0)).collect();
        index.query::<Aabb, Aabb>(&square(0.0, 0.0, 32.0), &obstacles, &[], |_, _| {}, |_, _| {});
        let stats = index.stats();
        assert!(stats.indexed);
        assert_eq!(stats.total_entities, 100);
        assert_eq!(stats.candidates, 1);
    }

    #[test]
    fn straddling_cell_boundary_is_found() {
        let mut index = SpatialCollisionIndex::default();
        let obstacles = [square(130.0, 0.0, 10.0)];
        let report = index.query::<Aabb, Aabb>(&square(120.0, 0.0, 16.0), &obstacles, &[], |_, _| {}, |_, _| {});
        assert_eq!(report.obstacle_hit, Some(0));
    }

    #[test]
    fn huge_obstacle_far_from_player_cell_still_hits() {
        let mut index = SpatialCollisionIndex::default();
        let wall = [square(1000.0, 0.0, 2000.0)];
        let report = index.query::<Aabb, Aabb>(&square(10.0, 0.0, 16.0), &wall, &[], |_, _| {}, |_, _| {});
        assert_eq!(report.obstacle_hit, Some(0));
    }

    #[test]
    fn disabled_index_takes_linear_path() {
        let mut index = SpatialCollisionIndex::new(CollisionConfig {
            use_spatial_index: false,
            ..CollisionConfig::default()
        });
        let obstacles = [square(0.0, 0.0, 10.0)];
        let report = index.query::<Aabb, Aabb>(&square(0.0, 0.0, 10.0), &obstacles, &[], |_, _| {}, |_, _| {});
        assert_eq!(report.obstacle_hit, Some(0));
        assert!(!index.stats().indexed);
    }
}
