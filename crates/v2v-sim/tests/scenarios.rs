use std::fs;

use v2v_abstract::{ScenarioAssertion, SimConfig, TestScenario, VehicleId};
use v2v_sim::SimulationEngine;

/// Loads a TOML scenario fixture, runs it to completion, and checks every
/// declared assertion against the finished run.
fn run_fixture(path: &str) {
    let content = fs::read_to_string(path).unwrap_or_else(|e| panic!("reading {path}: {e}"));
    let scenario: TestScenario =
        toml::from_str(&content).unwrap_or_else(|e| panic!("parsing {path}: {e}"));

    let mut config = SimConfig::default();
    scenario.config.apply_to(&mut config);
    let config = config.validated().expect("scenario config should be valid");

    let mut engine = SimulationEngine::new(config);
    let ids: Vec<VehicleId> = scenario
        .spawns
        .iter()
        .map(|spawn| engine.spawn(spawn.position, spawn.velocity))
        .collect();

    engine.run(scenario.duration_seconds);

    let stats = engine.statistics();
    for assertion in &scenario.assertions {
        match assertion {
            ScenarioAssertion::BsmCount { min, max } => {
                assert!(
                    stats.total_bsm_sent >= *min,
                    "{}: total_bsm_sent {} below min {min}",
                    scenario.name,
                    stats.total_bsm_sent
                );
                if let Some(max) = max {
                    assert!(
                        stats.total_bsm_sent <= *max,
                        "{}: total_bsm_sent {} above max {max}",
                        scenario.name,
                        stats.total_bsm_sent
                    );
                }
            }
            ScenarioAssertion::CwmCount { min, max } => {
                assert!(
                    stats.total_cwm_sent >= *min,
                    "{}: total_cwm_sent {} below min {min}",
                    scenario.name,
                    stats.total_cwm_sent
                );
                if let Some(max) = max {
                    assert!(
                        stats.total_cwm_sent <= *max,
                        "{}: total_cwm_sent {} above max {max}",
                        scenario.name,
                        stats.total_cwm_sent
                    );
                }
            }
            ScenarioAssertion::PacketLoss { value, epsilon } => {
                assert!(
                    (stats.packet_loss - value).abs() <= *epsilon,
                    "{}: packet_loss {} not within {epsilon} of {value}",
                    scenario.name,
                    stats.packet_loss
                );
            }
            ScenarioAssertion::BeliefMapEmpty { spawn_index } => {
                let vehicle = engine
                    .vehicle(&ids[*spawn_index])
                    .unwrap_or_else(|| panic!("{}: no vehicle at index {spawn_index}", scenario.name));
                assert!(
                    vehicle.beliefs.is_empty(),
                    "{}: expected empty belief-map for spawn {spawn_index}, found {} entries",
                    scenario.name,
                    vehicle.beliefs.len()
                );
            }
        }
    }
}

#[test]
fn lone_vehicle_bsm_cadence() {
    run_fixture("tests/fixtures/lone_vehicle.toml");
}

#[test]
fn rear_end_risk_triggers_cwm() {
    run_fixture("tests/fixtures/rear_end_risk.toml");
}

#[test]
fn out_of_range_peers_never_meet() {
    run_fixture("tests/fixtures/out_of_range.toml");
}

#[test]
fn full_packet_loss_drops_everything() {
    run_fixture("tests/fixtures/full_packet_loss.toml");
}

#[test]
fn belief_pruned_after_peer_diverges() {
    run_fixture("tests/fixtures/belief_pruned_after_divergence.toml");
}
