//! Headless soak run for the projectile manager.
//!
//! Drives a player, a boss and a ring of minions around a circular arena
//! for a fixed number of ticks. Every actor fires on seeded random
//! cadences at the opposing side; the run ends with a stats summary.
//!
//! ```text
//! RUST_LOG=volley_engine=debug cargo run --release --bin volley_soak -- --ticks 3600 --json
//! ```

use std::cell::RefCell;
use std::f32::consts::TAU;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::Parser;
use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use volley_engine::faction::Faction;
use volley_engine::game::{
    HealthTarget, ManagerStats, ProjectileManager, TargetRef, VolleyConfig,
};
use volley_engine::world::ArenaBounds;

#[derive(Debug, Parser)]
#[command(name = "volley_soak", about = "Soak-test the projectile manager")]
struct Cli {
    /// Simulation ticks to run
    #[arg(long, default_value_t = 3600)]
    ticks: u32,

    /// Fixed timestep in seconds
    #[arg(long, default_value_t = 1.0 / 60.0)]
    dt: f32,

    /// RNG seed for firing patterns
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Number of minions kept alive
    #[arg(long, default_value_t = 6)]
    minions: usize,

    /// Arena radius
    #[arg(long, default_value_t = 60.0)]
    arena_radius: f32,

    /// JSON config file (defaults are used when absent)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the final report as JSON
    #[arg(long)]
    json: bool,
}

/// Actor moved by the harness and shared with the manager as a target.
struct Dummy {
    state: Rc<RefCell<HealthTarget>>,
    target: TargetRef,
    orbit_radius: f32,
    orbit_speed: f32,
    phase: f32,
    fire_chance: f32,
}

impl Dummy {
    fn spawn(
        faction: Faction,
        radius: f32,
        health: f32,
        orbit_radius: f32,
        orbit_speed: f32,
        phase: f32,
        fire_chance: f32,
    ) -> Self {
        let state = Rc::new(RefCell::new(HealthTarget::new(
            faction,
            Vec3::ZERO,
            radius,
            health,
        )));
        let target: TargetRef = state.clone();
        let mut dummy = Self {
            state,
            target,
            orbit_radius,
            orbit_speed,
            phase,
            fire_chance,
        };
        dummy.step(0.0);
        dummy
    }

    fn step(&mut self, time: f32) {
        let angle = self.phase + time * self.orbit_speed;
        self.state.borrow_mut().position =
            Vec3::new(angle.cos() * self.orbit_radius, 1.0, angle.sin() * self.orbit_radius);
    }

    fn position(&self) -> Vec3 {
        self.state.borrow().position
    }

    fn faction(&self) -> Faction {
        self.state.borrow().faction
    }

    fn is_destroyed(&self) -> bool {
        self.state.borrow().is_destroyed()
    }
}

#[derive(Debug, Serialize)]
struct SoakReport {
    seed: u64,
    ticks: u32,
    hits: u64,
    kills: u64,
    peak_active: usize,
    emergency_cleanups: u64,
    stats: ManagerStats,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::filter::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => VolleyConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => VolleyConfig::default(),
    };
    let mut manager = ProjectileManager::new(config).context("invalid projectile config")?;
    manager.set_arena_bounds(ArenaBounds::circular(cli.arena_radius));

    let mut rng = ChaCha8Rng::seed_from_u64(cli.seed);
    let mut actors = spawn_actors(&cli, &mut rng);
    for actor in &actors {
        manager.register_target(&actor.target);
    }

    let mut report = SoakReport {
        seed: cli.seed,
        ticks: cli.ticks,
        hits: 0,
        kills: 0,
        peak_active: 0,
        emergency_cleanups: 0,
        stats: manager.stats(),
    };

    for tick in 0..cli.ticks {
        let time = tick as f32 * cli.dt;
        for actor in &mut actors {
            actor.step(time);
        }
        if tick % 30 == 0 {
            manager.refresh_targets();
        }

        fire(&mut manager, &actors, &mut rng);

        if manager.emergency_cleanup() > 0 {
            report.emergency_cleanups += 1;
        }
        report.peak_active = report.peak_active.max(manager.active_count());

        let viewpoint = actors[0].position() + Vec3::new(0.0, 8.0, -12.0);
        let hits = manager.update(cli.dt, viewpoint);
        report.hits += hits.len() as u64;

        for actor in actors.iter_mut().filter(|a| a.is_destroyed()) {
            report.kills += 1;
            manager.unregister_target(&actor.target);
            let faction = actor.faction();
            *actor = respawn(faction, &mut rng);
            manager.register_target(&actor.target);
            tracing::debug!(tick, %faction, "actor respawned");
        }
    }

    report.stats = manager.stats();
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }
    Ok(())
}

fn spawn_actors(cli: &Cli, rng: &mut ChaCha8Rng) -> Vec<Dummy> {
    let mut actors = vec![
        Dummy::spawn(Faction::Player, 0.6, 500.0, 25.0, 0.4, 0.0, 0.5),
        Dummy::spawn(Faction::Boss, 3.0, 2000.0, 5.0, 0.2, 3.1, 0.15),
    ];
    actors.extend((0..cli.minions).map(|_| respawn(Faction::Minion, rng)));
    actors
}

fn respawn(faction: Faction, rng: &mut ChaCha8Rng) -> Dummy {
    match faction {
        Faction::Player => Dummy::spawn(Faction::Player, 0.6, 500.0, 25.0, 0.4, rng.gen_range(0.0..TAU), 0.5),
        Faction::Boss => Dummy::spawn(Faction::Boss, 3.0, 2000.0, 5.0, 0.2, rng.gen_range(0.0..TAU), 0.15),
        Faction::Minion => Dummy::spawn(
            Faction::Minion,
            0.8,
            40.0,
            rng.gen_range(12.0..40.0),
            rng.gen_range(-0.8..0.8),
            rng.gen_range(0.0..TAU),
            0.05,
        ),
    }
}

/// Roll every actor's trigger and aim at a random hostile actor.
fn fire(manager: &mut ProjectileManager, actors: &[Dummy], rng: &mut ChaCha8Rng) {
    for shooter in actors {
        if !rng.gen_bool(shooter.fire_chance as f64) {
            continue;
        }
        let faction = shooter.faction();
        let hostile: Vec<&Dummy> = actors
            .iter()
            .filter(|a| faction.is_hostile_to(a.faction()))
            .collect();
        if hostile.is_empty() {
            continue;
        }
        let aim = hostile[rng.gen_range(0..hostile.len())].position();
        let spread = Vec3::new(rng.gen_range(-1.0..1.0), 0.0, rng.gen_range(-1.0..1.0));
        let origin = shooter.position();
        manager.spawn_projectile(faction, origin, aim + spread - origin, None, None);
    }
}

fn print_summary(report: &SoakReport) {
    let stats = &report.stats;
    println!("volley soak: seed {} over {} ticks ({:.1}s simulated)", report.seed, report.ticks, stats.elapsed);
    println!("  spawned        {:>8}  refused {}", stats.spawned_total, stats.refused_spawns);
    println!("  hits           {:>8}  kills {}", report.hits, report.kills);
    println!(
        "  expired        {:>8}  (lifetime {}, distance {}, out of bounds {})",
        stats.expired_lifetime + stats.expired_distance + stats.out_of_bounds,
        stats.expired_lifetime,
        stats.expired_distance,
        stats.out_of_bounds
    );
    println!("  peak active    {:>8}  / {}", report.peak_active, stats.max_projectiles);
    println!(
        "  emergency      {:>8}  ({} projectiles released)",
        report.emergency_cleanups, stats.emergency_released
    );
    for pool in &stats.pools {
        println!(
            "  pool {:<8}  in use {:>3}  free {:>3}  created {:>3} / {}",
            pool.faction.name(),
            pool.in_use,
            pool.free,
            pool.created,
            pool.max_size
        );
    }
    println!(
        "  effects alive  {:>8}  evicted {}  draw calls {}",
        stats.effects_alive, stats.effects_evicted, stats.effect_draw_calls
    );
}
