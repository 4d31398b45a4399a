use std::collections::HashMap;

use v2v_abstract::{SimConfig, VehicleId};

use crate::vehicle::Vehicle;

/// Owns the fleet in stable insertion order, so per-tick processing order
/// is deterministic, plus an id→index map for O(1) lookup.
#[derive(Default)]
pub struct VehicleManager {
    vehicles: Vec<Vehicle>,
    index: HashMap<VehicleId, usize>,
    next_counter: u32,
}

impl VehicleManager {
    pub fn new() -> Self {
        Self {
            vehicles: Vec::new(),
            index: HashMap::new(),
            next_counter: 1,
        }
    }

    pub fn spawn(&mut self, position: (f64, f64), velocity: f64, cfg: &SimConfig) -> VehicleId {
        let id = VehicleId::from_counter(self.next_counter);
        self.next_counter += 1;

        self.index.insert(id.clone(), self.vehicles.len());
        self.vehicles.push(Vehicle::spawn(id.clone(), position, velocity, cfg));
        id
    }

    pub fn get(&self, id: &VehicleId) -> Option<&Vehicle> {
        self.index.get(id).map(|&i| &self.vehicles[i])
    }

    pub fn get_mut(&mut self, id: &VehicleId) -> Option<&mut Vehicle> {
        let idx = *self.index.get(id)?;
        self.vehicles.get_mut(idx)
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    /// Advances every vehicle's physics by `dt` — the first phase of a tick.
    pub fn update_all_physics(&mut self, dt: f64, cfg: &SimConfig) {
        for vehicle in &mut self.vehicles {
            vehicle.update_physics(dt, cfg);
        }
    }
}
