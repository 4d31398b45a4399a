use anyhow::Result;
use clap::Parser;
use tracing::info;

use v2v_abstract::SimConfig;
use v2v_sim::SimulationEngine;

const HIGHWAY_SPEED: f64 = 27.8;
const CITY_SPEED: f64 = 11.1;

/// Headless V2V network simulator runner.
#[derive(Parser, Debug)]
#[command(author, version, about = "Headless V2V network simulator")]
struct Args {
    /// Simulated duration to run, in seconds.
    #[arg(long, default_value_t = 30.0)]
    duration: f64,

    /// Number of trailing-traffic vehicles, in addition to the hero pair.
    #[arg(long, default_value_t = 8)]
    vehicles: u32,

    /// Seed for the medium's packet-loss sampling.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Probability (0.0-1.0) that any given packet is lost in transit.
    #[arg(long, default_value_t = 0.05)]
    packet_loss: f64,

    /// Print statistics as compact JSON instead of pretty-printed.
    #[arg(long, default_value_t = false)]
    compact: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let config = SimConfig {
        seed: args.seed,
        packet_loss_probability: args.packet_loss,
        ..Default::default()
    }
    .validated()?;

    let mut engine = SimulationEngine::new(config);
    engine.on_message(|vehicle, message| {
        info!(vehicle = %vehicle.id, ?message, "message sent");
    });

    spawn_hero_scenario(&mut engine, args.vehicles);

    info!(duration = args.duration, "running simulation");
    engine.run(args.duration);

    let stats = engine.statistics();
    let json = if args.compact {
        serde_json::to_string(&stats)?
    } else {
        serde_json::to_string_pretty(&stats)?
    };
    println!("{json}");

    Ok(())
}

/// Rear car faster than a slower lead car 40m ahead (CWM + braking demo),
/// plus `trailing` vehicles spaced well behind at the rear car's own speed
/// so they pose no collision risk. Mirrors the hero scenario used to
/// exercise config/message/vehicle/engine integration together.
fn spawn_hero_scenario(engine: &mut SimulationEngine, trailing: u32) {
    engine.spawn((0.0, 0.0), HIGHWAY_SPEED);
    engine.spawn((40.0, 0.0), CITY_SPEED);

    for i in 0..trailing {
        let position = (-100.0 - (i as f64 + 2.0) * 20.0, 0.0);
        engine.spawn(position, HIGHWAY_SPEED);
    }
}
