use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, error, info};
use v2v_abstract::{Message, SimConfig, VehicleId};

use crate::collision;
use crate::medium::Medium;
use crate::trace::Statistics;
use crate::vehicle::Vehicle;
use crate::vehicle_manager::VehicleManager;

/// Owns the clock, the fleet, the medium and the observer registries, and
/// drives the tick loop as an explicit fixed-step driver (no external
/// event-loop dependency).
pub struct SimulationEngine {
    clock: f64,
    config: SimConfig,
    medium: Medium,
    vehicles: VehicleManager,

    message_observers: Vec<Box<dyn FnMut(&Vehicle, &Message)>>,
    tick_observers: Vec<Box<dyn FnMut(f64)>>,

    total_bsm_sent: u64,
    total_cwm_sent: u64,
    collisions_prevented: u64,
}

impl SimulationEngine {
    pub fn new(config: SimConfig) -> Self {
        Self {
            medium: Medium::new(&config),
            clock: 0.0,
            config,
            vehicles: VehicleManager::new(),
            message_observers: Vec::new(),
            tick_observers: Vec::new(),
            total_bsm_sent: 0,
            total_cwm_sent: 0,
            collisions_prevented: 0,
        }
    }

    pub fn spawn(&mut self, position: (f64, f64), velocity: f64) -> VehicleId {
        let id = self.vehicles.spawn(position, velocity, &self.config);
        info!(vehicle = %id, x = position.0, y = position.1, velocity, "vehicle spawned");
        id
    }

    pub fn vehicle(&self, id: &VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(id)
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        self.vehicles.vehicles()
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }

    /// Registers a callback invoked for every message a vehicle sends
    /// (BSM or CWM). A panicking observer is caught and logged, never
    /// propagated into the loop.
    pub fn on_message(&mut self, observer: impl FnMut(&Vehicle, &Message) + 'static) {
        self.message_observers.push(Box::new(observer));
    }

    /// Registers a callback invoked once per tick, after all vehicles have
    /// been processed, with the new simulated clock value.
    pub fn on_tick(&mut self, observer: impl FnMut(f64) + 'static) {
        self.tick_observers.push(Box::new(observer));
    }

    /// Advances the simulation by `duration_seconds`, in fixed steps of
    /// `simulation_timestep`. Partial trailing steps are dropped, matching
    /// a fixed-step driver rather than rounding up into an extra tick.
    pub fn run(&mut self, duration_seconds: f64) {
        let steps = (duration_seconds / self.config.simulation_timestep).floor() as u64;
        debug!(steps, duration_seconds, "running simulation");
        for _ in 0..steps {
            self.tick();
        }
    }

    /// One pass of the four ordered phases: physics, medium delivery,
    /// per-vehicle process/detect/send/manage, observer callbacks.
    fn tick(&mut self) {
        let dt = self.config.simulation_timestep;

        self.vehicles.update_all_physics(dt, &self.config);
        self.clock += dt;
        let now = self.clock;

        let deliveries = self.medium.deliver(now, self.vehicles.vehicles());
        for (receiver_id, message, digest) in deliveries {
            if let Some(vehicle) = self.vehicles.get_mut(&receiver_id) {
                vehicle.protocol.receive(&receiver_id, message, digest);
            }
        }

        let ids: Vec<VehicleId> = self.vehicles.vehicles().iter().map(|v| v.id.clone()).collect();
        for id in ids {
            self.process_vehicle(&id, now);
        }

        for observer in &mut self.tick_observers {
            if panic::catch_unwind(AssertUnwindSafe(|| observer(now))).is_err() {
                error!(now, "tick observer panicked, continuing");
            }
        }
    }

    fn process_vehicle(&mut self, id: &VehicleId, now: f64) {
        loop {
            let vehicle = self.vehicles.get_mut(id).expect("vehicle exists during its own tick");
            let Some(message) = vehicle.protocol.process(id, now, &mut self.medium) else {
                break;
            };

            if let Some(bsm) = message.as_bsm() {
                let vehicle = self.vehicles.get_mut(id).expect("vehicle exists during its own tick");
                vehicle.on_received_bsm(bsm);
            }
            self.notify_message_observers(id, &message);
        }

        let vehicle = self.vehicles.get_mut(id).expect("vehicle exists during its own tick");
        if let Some(cwm) = collision::detect(vehicle, &self.config) {
            self.total_cwm_sent += 1;
            self.collisions_prevented += 1;
            let vehicle = self.vehicles.get_mut(id).expect("vehicle exists during its own tick");
            vehicle.protocol.send(id, now, cwm.clone(), &mut self.medium);
            self.notify_message_observers(id, &cwm);
        }

        let vehicle = self.vehicles.get_mut(id).expect("vehicle exists during its own tick");
        if vehicle.should_send_bsm(now, &self.config) {
            let bsm = vehicle.generate_bsm(now);
            self.total_bsm_sent += 1;
            vehicle.protocol.send(id, now, bsm.clone(), &mut self.medium);
            self.notify_message_observers(id, &bsm);
        }

        let vehicle = self.vehicles.get_mut(id).expect("vehicle exists during its own tick");
        vehicle.protocol.manage(id, now, &self.config, &mut self.medium);
        vehicle.prune_beliefs(now, &self.config);
    }

    fn notify_message_observers(&mut self, id: &VehicleId, message: &Message) {
        let Some(vehicle) = self.vehicles.get(id) else {
            return;
        };
        for observer in &mut self.message_observers {
            if panic::catch_unwind(AssertUnwindSafe(|| observer(vehicle, message))).is_err() {
                error!(vehicle = %id, "message observer panicked, continuing");
            }
        }
    }

    /// Snapshot of the simulation's statistics, derived from running
    /// counters rather than accumulated lazily — repeated mid-run calls are
    /// cheap and consistent.
    pub fn statistics(&self) -> Statistics {
        Statistics {
            simulation_time: self.clock,
            vehicle_count: self.vehicles.len(),
            total_bsm_sent: self.total_bsm_sent,
            bsm_rate: self.total_bsm_sent as f64 / self.clock.max(1.0),
            total_cwm_sent: self.total_cwm_sent,
            collisions_prevented: self.collisions_prevented,
            total_packets: self.medium.total_packets,
            lost_packets: self.medium.lost_packets,
            packet_loss: self.medium.packet_loss(),
            average_latency: self.medium.average_latency(),
        }
    }
}
