//! JSON payloads for the reporting collaborator (HTTP status page).
//!
//! Field names are part of the external contract and must not change:
//! the web UI reads `max_cap`, `curr_cap`, `soc` and friends directly.

use serde::Serialize;

use crate::gauge::{BatterySnapshot, Pack};

/// One element of the `/battery` array.
#[derive(Debug, Serialize)]
pub struct BatteryReport {
    pub pack: Pack,
    pub max_cap: f32,
    pub curr_cap: f32,
    pub soc: f32,
    pub charging: bool,
    pub charge_cycles: f32,
    pub age: f32,
    pub ttf: f32,
    pub tte: f32,
    pub current: f32,
    pub voltage: f32,
}

impl BatteryReport {
    pub fn new(pack: Pack, s: &BatterySnapshot) -> Self {
        Self {
            pack,
            max_cap: s.max_capacity_mah,
            curr_cap: s.capacity_mah,
            soc: s.state_of_charge,
            charging: s.charging,
            charge_cycles: s.cycles,
            age: s.age,
            ttf: s.time_to_full_min,
            tte: s.time_to_empty_min,
            current: s.current_ma,
            voltage: s.voltage_v,
        }
    }
}

#[derive(Debug, Serialize)]
struct ArmStatus {
    armed: bool,
}

/// Encode the battery list, one object per pack in the order given.
pub fn battery_json(packs: &[(Pack, BatterySnapshot)]) -> Result<String, serde_json::Error> {
    let reports: Vec<BatteryReport> = packs
        .iter()
        .map(|(pack, snap)| BatteryReport::new(*pack, snap))
        .collect();
    serde_json::to_string(&reports)
}

/// Encode `{"armed": …}`.
pub fn arm_status_json(armed: bool) -> Result<String, serde_json::Error> {
    serde_json::to_string(&ArmStatus { armed })
}
