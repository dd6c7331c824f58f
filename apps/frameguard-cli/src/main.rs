mod trace;
mod world;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use frameguard_collision::{Aabb, SpatialCollisionIndex, brute_force_query};
use frameguard_common::{ManualClock, Viewport};
use frameguard_monitor::MemoryGauge;
use frameguard_quality::QualityLevel;
use frameguard_render::TextStyle;
use frameguard_runtime::{AdaptiveRuntime, RuntimeConfig};
use glam::Vec2;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing_subscriber::EnvFilter;

use crate::trace::{Scenario, frame_at};
use crate::world::{Body, CountingTextFactory};

#[derive(Parser)]
#[command(name = "frameguard-cli", about = "Drive the frameguard adaptation layer headlessly")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print crate versions
    Info,
    /// Replay a synthetic frame trace through the full runtime
    Simulate {
        #[arg(short, long, value_enum, default_value = "degrading")]
        scenario: Scenario,
        /// Number of frames to simulate
        #[arg(short, long, default_value = "600")]
        frames: usize,
        /// JSON or YAML runtime config
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Starting quality level (minimal..ultra)
        #[arg(long)]
        device_level: Option<String>,
        #[arg(long, default_value = "42")]
        seed: u64,
        /// Print the final metrics snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Compare the spatial index against a linear scan
    BenchCollision {
        #[arg(short, long, default_value = "1000")]
        obstacles: usize,
        #[arg(short, long, default_value = "100")]
        items: usize,
        #[arg(long, default_value = "1000")]
        iterations: usize,
        #[arg(long, default_value = "7")]
        seed: u64,
    },
    /// Print the default runtime config as YAML
    DefaultConfig,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("frameguard-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", frameguard_common::crate_info());
            println!("monitor: {}", frameguard_monitor::crate_info());
            println!("quality: {}", frameguard_quality::crate_info());
            println!("collision: {}", frameguard_collision::crate_info());
            println!("render: {}", frameguard_render::crate_info());
            println!("gameloop: {}", frameguard_gameloop::crate_info());
            println!("runtime: {}", frameguard_runtime::crate_info());
        }
        Commands::Simulate {
            scenario,
            frames,
            config,
            device_level,
            seed,
            json,
        } => simulate(scenario, frames, config, device_level, seed, json)?,
        Commands::BenchCollision {
            obstacles,
            items,
            iterations,
            seed,
        } => bench_collision(obstacles, items, iterations, seed)?,
        Commands::DefaultConfig => {
            print!("{}", RuntimeConfig::default().to_yaml()?);
        }
    }

    Ok(())
}

fn simulate(
    scenario: Scenario,
    frames: usize,
    config: Option<PathBuf>,
    device_level: Option<String>,
    seed: u64,
    json: bool,
) -> anyhow::Result<()> {
    let config = match config {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading runtime config");
            RuntimeConfig::from_path(&path)?
        }
        None => RuntimeConfig::default(),
    };
    let device_hint = match device_level {
        Some(name) => Some(
            QualityLevel::from_name(&name)
                .ok_or_else(|| anyhow::anyhow!("unknown quality level {name:?}"))?,
        ),
        None => None,
    };

    let clock = ManualClock::new();
    let gauge = MemoryGauge::new();
    let mut runtime = AdaptiveRuntime::new(
        config,
        Box::new(clock.clone()),
        Box::new(gauge.clone()),
        CountingTextFactory::default(),
        device_hint,
    )?;

    let mut rng = StdRng::seed_from_u64(seed);
    let mut obstacles: Vec<Body> = (0..40).map(|_| Body::random(&mut rng, 0.0..2000.0)).collect();
    let mut items: Vec<Body> = (0..20).map(|_| Body::random(&mut rng, 0.0..2000.0)).collect();
    let player = Aabb::from_center_size(Vec2::new(120.0, 300.0), Vec2::splat(32.0));
    let camera = Viewport::default();
    let style = TextStyle::default();

    println!("Simulating {scenario:?} for {frames} frames (seed={seed})");
    let mut score = 0u64;
    let mut issues = 0usize;
    let mut transitions = Vec::new();
    let mut emergency_flips = 0usize;
    let mut last_delta = 16.7;

    for index in 0..frames {
        let sample = frame_at(scenario, index, frames, &mut rng);
        gauge.set_ratio(sample.memory);

        let start = runtime.begin_frame(camera);
        if let Some(change) = start.quality_change {
            transitions.push(change);
        }

        let report = runtime.query_collisions(&player, &obstacles, &items, |_, _| {}, |_, _| {});
        score += report.items_hit.len() as u64;

        runtime.update_obstacles(&mut obstacles, last_delta, |_| {});
        runtime.update_items(&mut items, last_delta, |_| {});
        while obstacles.len() < 40 {
            obstacles.push(Body::random(&mut rng, 900.0..1400.0));
        }
        while items.len() < 20 {
            items.push(Body::random(&mut rng, 900.0..1400.0));
        }

        runtime.optimize_visuals(&mut obstacles);
        runtime.optimize_visuals(&mut items);
        let now = runtime.monitor().now_ms();
        runtime
            .renderer_mut()
            .get_cached_text(&format!("Score: {score}"), &style, Vec2::new(16.0, 16.0), now);

        clock.advance(sample.frame_ms);
        last_delta = sample.frame_ms;
        let end = runtime.end_frame();
        issues += end.issues.len();
        if let Some(level) = end.staged_quality {
            tracing::debug!(frame = index, ?level, "quality change staged");
        }
        if end.emergency.is_some() {
            emergency_flips += 1;
        }
    }

    let metrics = runtime.monitor().metrics();
    let stats = runtime.renderer().stats();
    println!(
        "Final: fps={}, avg_frame={:.1}ms, score={}, memory={:.2}, stutters={}",
        metrics.current_fps,
        metrics.average_frame_time,
        metrics.performance_score,
        metrics.memory_usage,
        metrics.stutter_count
    );
    println!(
        "Quality: {} ({} transitions), emergency={} ({} flips), issues={}",
        runtime.current_quality(),
        transitions.len(),
        runtime.is_emergency_mode(),
        emergency_flips,
        issues
    );
    for change in &transitions {
        println!(
            "  {:>8.0}ms  {} -> {}  {:?}",
            change.applied_at_ms, change.from, change.to, change.reason
        );
    }
    println!(
        "Render (last frame): rendered={}, culled={}, lod_reductions={}, cache_hit_rate={:.2}",
        stats.objects_rendered,
        stats.objects_culled,
        stats.lod_reductions,
        stats.cache_hit_rate()
    );
    let texts = runtime.renderer().text_cache().factory();
    println!("Text objects: created={}, destroyed={}", texts.created, texts.destroyed);
    for (name, timing) in runtime.monitor().section_timings() {
        println!(
            "  section {name}: avg={:.3}ms max={:.3}ms calls={}",
            timing.average_ms, timing.max_ms, timing.calls
        );
    }
    if json {
        println!("{}", serde_json::to_string_pretty(&metrics)?);
    }
    Ok(())
}

fn bench_collision(obstacle_count: usize, item_count: usize, iterations: usize, seed: u64) -> anyhow::Result<()> {
    let mut rng = StdRng::seed_from_u64(seed);
    let obstacles: Vec<Body> = (0..obstacle_count)
        .map(|_| Body::random(&mut rng, -2000.0..2000.0))
        .collect();
    let items: Vec<Body> = (0..item_count)
        .map(|_| Body::random(&mut rng, -2000.0..2000.0))
        .collect();
    let player = Aabb::from_center_size(Vec2::new(0.0, 300.0), Vec2::splat(32.0));
    let iterations = iterations.max(1);

    let mut index = SpatialCollisionIndex::default();
    let start = Instant::now();
    let mut indexed = index.query(&player, &obstacles, &items, |_, _| {}, |_, _| {});
    for _ in 1..iterations {
        indexed = index.query(&player, &obstacles, &items, |_, _| {}, |_, _| {});
    }
    let indexed_time = start.elapsed();

    let start = Instant::now();
    let mut linear = brute_force_query(&player, &obstacles, &items, |_, _| {}, |_, _| {});
    for _ in 1..iterations {
        linear = brute_force_query(&player, &obstacles, &items, |_, _| {}, |_, _| {});
    }
    let linear_time = start.elapsed();

    anyhow::ensure!(indexed == linear, "indexed {indexed:?} disagrees with linear {linear:?}");

    let stats = index.stats();
    println!("Collision bench: {obstacle_count} obstacles, {item_count} items, {iterations} iterations");
    println!(
        "  indexed: {:?}/query (candidates {} of {})",
        per_query(indexed_time, iterations),
        stats.candidates,
        stats.total_entities
    );
    println!("  linear:  {:?}/query", per_query(linear_time, iterations));
    println!(
        "  result: obstacle_hit={:?}, items_hit={:?}",
        indexed.obstacle_hit, indexed.items_hit
    );
    Ok(())
}

/// Mean duration of one query over `iterations` runs.
fn per_query(total: Duration, iterations: usize) -> Duration {
    total.div_f64(iterations.max(1) as f64)
}
