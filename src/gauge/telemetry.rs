//! Telemetry snapshot: one read of every reporting register, decoded.

use embedded_hal::i2c::I2c;
use serde::Serialize;

use super::registers::{
    AGE, AVG_CURRENT, CHARGING_CURRENT, CHARGING_VOLTAGE, CYCLES, FULL_CAP_REP, REP_CAP, REP_SOC,
    Register, TTE, TTF, VCELL,
};
use super::transport::RegisterBus;
use crate::error::{Error, Result};

pub const SNAPSHOT_LEN: usize = 11;

/// Registers read per snapshot, in read order.
pub const SNAPSHOT_REGISTERS: [Register; SNAPSHOT_LEN] = [
    FULL_CAP_REP,
    REP_CAP,
    REP_SOC,
    CYCLES,
    TTE,
    TTF,
    AGE,
    AVG_CURRENT,
    VCELL,
    CHARGING_CURRENT,
    CHARGING_VOLTAGE,
];

/// Decoded pack telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BatterySnapshot {
    pub max_capacity_mah: f32,
    pub capacity_mah: f32,
    /// 0.0 ..= 1.0
    pub state_of_charge: f32,
    pub cycles: f32,
    pub time_to_empty_min: f32,
    pub time_to_full_min: f32,
    /// Remaining full capacity relative to design, 0.0 ..= 1.0
    pub age: f32,
    /// Positive while charging.
    pub current_ma: f32,
    pub voltage_v: f32,
    pub charging_current_ma: f32,
    pub charging_voltage_v: f32,
    pub charging: bool,
}

impl BatterySnapshot {
    /// Decode raw words laid out as [`SNAPSHOT_REGISTERS`].
    pub fn decode(raw: &[u16; SNAPSHOT_LEN], charging_threshold_ma: f32) -> Self {
        let [full, rep, soc, cycles, tte, ttf, age, current, vcell, chg_i, chg_v] = *raw;
        let current_ma = AVG_CURRENT.decode(current);
        Self {
            max_capacity_mah: FULL_CAP_REP.decode(full),
            capacity_mah: REP_CAP.decode(rep),
            state_of_charge: REP_SOC.decode(soc),
            cycles: CYCLES.decode(cycles),
            time_to_empty_min: TTE.decode(tte),
            time_to_full_min: TTF.decode(ttf),
            age: AGE.decode(age),
            current_ma,
            voltage_v: VCELL.decode(vcell),
            charging_current_ma: CHARGING_CURRENT.decode(chg_i),
            charging_voltage_v: CHARGING_VOLTAGE.decode(chg_v),
            charging: current_ma > charging_threshold_ma,
        }
    }
}

pub(super) fn read_snapshot<I: I2c>(
    bus: &mut RegisterBus<I>,
    charging_threshold_ma: f32,
) -> Result<BatterySnapshot> {
    let mut raw = [0u16; SNAPSHOT_LEN];
    for (slot, reg) in raw.iter_mut().zip(SNAPSHOT_REGISTERS) {
        *slot = bus.read_word(reg).map_err(|e| match e {
            Error::Bus(cause) => Error::TelemetryRead {
                register: reg.addr,
                cause,
            },
            other => other,
        })?;
    }
    Ok(BatterySnapshot::decode(&raw, charging_threshold_ma))
}
