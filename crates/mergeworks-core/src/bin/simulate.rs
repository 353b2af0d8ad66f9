//! Headless balance run.
//!
//! Places spawners, a gate and a seller, then steps the world with a simple
//! stand-in for physics: every tick, equal-priced neighbours are reported
//! as colliding, one ball passes the gate and every few ticks the oldest
//! ball rolls into the seller. Prints one JSON summary line to stdout.
//!
//! Built only with the `cli` feature:
//! `cargo run -p mergeworks-core --features cli --bin simulate -- --ticks 600`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use glam::Vec2;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mergeworks_core::gadget::{SellerConfig, SpawnerConfig};
use mergeworks_core::{
    GadgetKind, GateEffect, JsonFileStore, KeyValueStore, MemoryStore, SimConfig, SimEvent, World,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Override the config seed.
    #[arg(long)]
    seed: Option<u64>,
    /// Number of ticks to run.
    #[arg(long, default_value_t = 3_600)]
    ticks: u64,
    /// Seconds per tick.
    #[arg(long, default_value_t = 1.0 / 60.0)]
    dt: f32,
    /// JSON config file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// JSON file to persist the balance in. In-memory if omitted.
    #[arg(long)]
    store: Option<PathBuf>,
    /// Sell the oldest ball every this many ticks.
    #[arg(long, default_value_t = 30)]
    sell_every: u64,
}

#[derive(Debug, Default, Serialize)]
struct Summary {
    seed: u64,
    ticks: u64,
    balance: i64,
    active: usize,
    capacity: usize,
    spawned: usize,
    merges: usize,
    aborted_merges: usize,
    sold: usize,
    purchases: BTreeMap<String, u32>,
    highest_price: u64,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => SimConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SimConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    let store: Box<dyn KeyValueStore> = match &cli.store {
        Some(path) => Box::new(
            JsonFileStore::open(path)
                .with_context(|| format!("opening store {}", path.display()))?,
        ),
        None => Box::new(MemoryStore::new()),
    };

    let seed = config.seed;
    let mut world = World::new(config, store);
    info!(seed, ticks = cli.ticks, "simulation started");

    world.add_spawner(SpawnerConfig {
        position: Vec2::new(-2.0, 0.0),
        ..SpawnerConfig::default()
    });
    let gate = world.add_gate(GateEffect::Add(1));
    let seller = world.add_seller(SellerConfig::default());

    let mut summary = Summary {
        seed,
        ..Summary::default()
    };
    for tick in 0..cli.ticks {
        drive(&mut world, gate, seller, tick, cli.sell_every);
        world.step(cli.dt);
        for record in world.take_events() {
            tally(&mut summary, &record.event);
        }
        buy_what_we_can(&mut world);
    }
    for record in world.take_events() {
        tally(&mut summary, &record.event);
    }

    summary.ticks = world.tick();
    summary.balance = world.ledger().balance();
    summary.active = world.pool().active_count();
    summary.capacity = world.pool().capacity();
    for kind in [GadgetKind::Spawner, GadgetKind::Gate, GadgetKind::Seller] {
        summary
            .purchases
            .insert(kind.to_string(), world.shop().purchased(kind));
    }
    info!(balance = summary.balance, "simulation finished");

    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn drive(
    world: &mut World,
    gate: mergeworks_core::GadgetId,
    seller: mergeworks_core::GadgetId,
    tick: u64,
    sell_every: u64,
) {
    let mut by_price: BTreeMap<u64, Vec<_>> = BTreeMap::new();
    for ball in world.pool().active_balls() {
        by_price.entry(ball.price()).or_default().push(ball.id());
    }
    for ids in by_price.values() {
        for pair in ids.chunks_exact(2) {
            world.notify_collision(pair[0], pair[1]);
        }
    }

    let newest = world.pool().active_ids().last();
    if let Some(id) = newest {
        world.pass_through_gate(gate, id);
    }
    if sell_every > 0 && tick % sell_every == sell_every - 1 {
        let oldest = world.pool().active_ids().next();
        if let Some(oldest) = oldest {
            world.enter_seller(seller, oldest);
        }
    }
}

fn buy_what_we_can(world: &mut World) {
    let Some(price) = world.shop().price_of(GadgetKind::Spawner) else {
        return;
    };
    if !world.ledger().can_afford(i64::try_from(price).unwrap_or(i64::MAX)) {
        return;
    }
    if world.purchase(GadgetKind::Spawner).is_some() {
        let row = u16::try_from(world.shop().purchased(GadgetKind::Spawner)).unwrap_or(u16::MAX);
        world.add_spawner(SpawnerConfig {
            position: Vec2::new(-2.0, f32::from(row)),
            ..SpawnerConfig::default()
        });
    }
}

fn tally(summary: &mut Summary, event: &SimEvent) {
    match event {
        SimEvent::Spawned { .. } => summary.spawned += 1,
        SimEvent::MergeCompleted { price, .. } => {
            summary.merges += 1;
            summary.highest_price = summary.highest_price.max(*price);
        }
        SimEvent::MergeAborted { .. } => summary.aborted_merges += 1,
        SimEvent::Sold { price, .. } => {
            summary.sold += 1;
            summary.highest_price = summary.highest_price.max(*price);
        }
        _ => {}
    }
}
