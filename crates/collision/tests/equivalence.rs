use std::cell::RefCell;

use frameguard_collision::{Aabb, SpatialCollisionIndex, brute_force_query};
use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_box(rng: &mut StdRng, extent: f32, min_size: f32, max_size: f32) -> Aabb {
    let center = Vec2::new(rng.gen_range(-extent..extent), rng.gen_range(-extent..extent));
    let size = Vec2::new(rng.gen_range(min_size..max_size), rng.gen_range(min_size..max_size));
    Aabb::from_center_size(center, size)
}

#[test]
fn indexed_matches_linear_scan_on_random_worlds() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut index = SpatialCollisionIndex::default();

    for round in 0..200 {
        let obstacle_count = rng.gen_range(0..60);
        let item_count = rng.gen_range(0..60);
        let obstacles: Vec<Aabb> = (0..obstacle_count)
            .map(|_| random_box(&mut rng, 800.0, 4.0, 160.0))
            .collect();
        let items: Vec<Aabb> = (0..item_count)
            .map(|_| random_box(&mut rng, 800.0, 4.0, 48.0))
            .collect();
        let player = random_box(&mut rng, 800.0, 16.0, 64.0);

        let indexed_calls = RefCell::new(Vec::new());
        let indexed = index.query(
            &player,
            &obstacles,
            &items,
            |i, _| indexed_calls.borrow_mut().push(('o', i)),
            |i, _| indexed_calls.borrow_mut().push(('i', i)),
        );
        let linear_calls = RefCell::new(Vec::new());
        let linear = brute_force_query(
            &player,
            &obstacles,
            &items,
            |i, _| linear_calls.borrow_mut().push(('o', i)),
            |i, _| linear_calls.borrow_mut().push(('i', i)),
        );

        assert_eq!(indexed, linear, "round {round} diverged");
        assert_eq!(
            indexed_calls.into_inner(),
            linear_calls.into_inner(),
            "round {round} callback order diverged"
        );
    }
}

#[test]
fn dense_obstacle_field_agrees_and_prunes() {
    let mut rng = StdRng::seed_from_u64(42);
    let obstacles: Vec<Aabb> = (0..1000)
        .map(|_| random_box(&mut rng, 2000.0, 8.0, 40.0))
        .collect();
    let items: Vec<Aabb> = (0..50).map(|_| random_box(&mut rng, 2000.0, 8.0, 24.0)).collect();
    let player = Aabb::from_center_size(Vec2::new(0.0, 0.0), Vec2::splat(32.0));

    let mut index = SpatialCollisionIndex::default();
    let indexed = index.query(&player, &obstacles, &items, |_, _| {}, |_, _| {});
    let linear = brute_force_query(&player, &obstacles, &items, |_, _| {}, |_, _| {});

    assert_eq!(indexed, linear);
    let stats = index.stats();
    assert!(stats.indexed);
    assert_eq!(stats.total_entities, 1050);
    assert!(stats.candidates < stats.total_entities / 10);
}

#[test]
fn zero_entities_yield_empty_report() {
    let mut index = SpatialCollisionIndex::default();
    let player = Aabb::from_center_size(Vec2::ZERO, Vec2::splat(32.0));
    let report = index.query::<Aabb, Aabb>(&player, &[], &[], |_, _| {}, |_, _| {});
    assert!(report.is_empty());
}

#[test]
fn far_away_coordinates_do_not_overflow() {
    let mut index = SpatialCollisionIndex::default();
    let player = Aabb::from_center_size(Vec2::splat(1.0e30), Vec2::splat(32.0));
    let obstacles = [Aabb::from_center_size(Vec2::splat(-1.0e30), Vec2::splat(32.0))];
    let report = index.query::<Aabb, Aabb>(&player, &obstacles, &[], |_, _| {}, |_, _| {});
    assert!(report.is_empty());
}

#[test]
fn box_spanning_the_float_range_is_found() {
    let mut index = SpatialCollisionIndex::default();
    let player = Aabb::from_center_size(Vec2::new(1.0e6, 0.0), Vec2::splat(32.0));
    let obstacles = [Aabb::new(Vec2::new(-3.0e38, -10.0), Vec2::new(3.0e38, 10.0))];
    let indexed = index.query::<Aabb, Aabb>(&player, &obstacles, &[], |_, _| {}, |_, _| {});
    let linear = brute_force_query::<Aabb, Aabb>(&player, &obstacles, &[], |_, _| {}, |_, _| {});
    assert_eq!(indexed.obstacle_hit, Some(0));
    assert_eq!(indexed, linear);
}

#[test]
fn unbounded_obstacle_is_found() {
    let mut index = SpatialCollisionIndex::default();
    let player = Aabb::from_center_size(Vec2::new(5.0e5, 3.0), Vec2::splat(16.0));
    let obstacles = [Aabb::new(
        Vec2::new(f32::NEG_INFINITY, 0.0),
        Vec2::new(f32::INFINITY, 8.0),
    )];
    let indexed = index.query::<Aabb, Aabb>(&player, &obstacles, &[], |_, _| {}, |_, _| {});
    let linear = brute_force_query::<Aabb, Aabb>(&player, &obstacles, &[], |_, _| {}, |_, _| {});
    assert_eq!(indexed, linear);
    assert_eq!(indexed.obstacle_hit, Some(0));
}
