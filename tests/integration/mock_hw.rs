//! Mock hardware for integration tests.
//!
//! `FakeGauge` simulates a MAX17330 register file on both I²C addresses and
//! records every register write, so tests can assert on exact NV command
//! sequences.  `MockPin`, `MockNvs` and `MockDelay` stand in for the arm
//! relay GPIO, flash storage and the delay provider.  Every mock is a cheap
//! clonable handle so tests keep one copy after moving the other into the
//! code under test.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, OutputPin};
use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};
use powerboard::app::events::PowerEvent;
use powerboard::app::ports::{EventSink, StorageError, StoragePort};
use powerboard::gauge::registers::{
    ADDR_NV_CONFIG, ADDR_VOLATILE, AGE, AVG_CURRENT, CHARGING_CURRENT, CHARGING_VOLTAGE, CONFIG2,
    CONFIG2_POR_CMD, CYCLES, DEV_NAME, FULL_CAP_REP, HISTORY_WRITES, NV_BANK_START, REP_CAP,
    REP_SOC, STATUS, TTE, TTF, VCELL,
};

/// `Batt`: same voltage as `VCell` at a 4x coarser LSB.
const PACK_VOLTAGE_ADDR: u16 = 0x0D7;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap()
}

// ── FakeGauge ─────────────────────────────────────────────────

#[derive(Default)]
pub struct GaugeSim {
    pub regs: HashMap<u16, u16>,
    /// Every word written, as (full register address, value).
    pub writes: Vec<(u16, u16)>,
    /// Registers whose reads NACK.
    pub failing_reads: HashSet<u16>,
    /// Every transaction NACKs on the address byte.
    pub offline: bool,
    /// Config2 reads that report bit 15 still set after a reset request.
    pub reset_busy_reads: u32,
    busy_left: u32,
    pub config2_reads: u32,
    pointer: u16,
}

#[derive(Clone, Default)]
pub struct FakeGauge(Arc<Mutex<GaugeSim>>);

impl FakeGauge {
    /// A known-revision chip with plausible telemetry, two NV writes used,
    /// and factory (unprovisioned) NV configuration.
    pub fn healthy() -> Self {
        let gauge = Self::default();
        {
            let mut sim = gauge.sim();
            for (reg, raw) in [
                (DEV_NAME.addr, 0x4076),
                (STATUS.addr, 0x0002),
                (FULL_CAP_REP.addr, 0x0640), // 800 mAh
                (REP_CAP.addr, 0x0320),      // 400 mAh
                (REP_SOC.addr, 0x3200),      // 50 %
                (CYCLES.addr, 8),            // 2 cycles
                (TTE.addr, 640),             // 60 min
                (TTF.addr, 0),
                (AGE.addr, 0x6400), // 100 %
                (AVG_CURRENT.addr, 0xFF00), // -40 mA
                (VCELL.addr, 51_200),        // 4.0 V
                (PACK_VOLTAGE_ADDR, 12_800), // Batt, 4.0 V at 0.3125 mV
                (CHARGING_CURRENT.addr, 0x0040),
                (CHARGING_VOLTAGE.addr, 53_760),
                (HISTORY_WRITES.addr, 0x0020), // 2 writes used
            ] {
                sim.regs.insert(reg, raw);
            }
        }
        gauge
    }

    pub fn sim(&self) -> MutexGuard<'_, GaugeSim> {
        lock(&self.0)
    }

    pub fn set(&self, reg: u16, raw: u16) {
        self.sim().regs.insert(reg, raw);
    }

    pub fn get(&self, reg: u16) -> u16 {
        self.sim().regs.get(&reg).copied().unwrap_or(0)
    }

    pub fn fail_read(&self, reg: u16) {
        self.sim().failing_reads.insert(reg);
    }

    pub fn set_offline(&self, offline: bool) {
        self.sim().offline = offline;
    }

    pub fn writes(&self) -> Vec<(u16, u16)> {
        self.sim().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.sim().writes.clear();
    }

    /// Writes that landed in the NV bank.
    pub fn nv_writes(&self) -> Vec<(u16, u16)> {
        self.writes()
            .into_iter()
            .filter(|(reg, _)| *reg >= NV_BANK_START)
            .collect()
    }
}

impl GaugeSim {
    fn write_word(&mut self, reg: u16, value: u16) {
        self.writes.push((reg, value));
        if reg == CONFIG2.addr && value & CONFIG2_POR_CMD != 0 {
            self.busy_left = self.reset_busy_reads;
        }
        self.regs.insert(reg, value);
    }

    fn read_word(&mut self, reg: u16) -> Result<u16, ErrorKind> {
        if self.failing_reads.contains(&reg) {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data));
        }
        if reg == CONFIG2.addr {
            self.config2_reads += 1;
            let base = self.regs.get(&reg).copied().unwrap_or(0) & !CONFIG2_POR_CMD;
            if self.busy_left > 0 {
                self.busy_left -= 1;
                return Ok(base | CONFIG2_POR_CMD);
            }
            return Ok(base);
        }
        Ok(self.regs.get(&reg).copied().unwrap_or(0))
    }
}

impl ErrorType for FakeGauge {
    type Error = ErrorKind;
}

impl I2c for FakeGauge {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let mut sim = self.sim();
        let base = match address {
            ADDR_VOLATILE => 0,
            ADDR_NV_CONFIG => NV_BANK_START,
            _ => return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)),
        };
        if sim.offline {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }

        for op in operations {
            match op {
                Operation::Write(bytes) => {
                    let Some((&ptr, data)) = bytes.split_first() else {
                        continue;
                    };
                    sim.pointer = base + u16::from(ptr);
                    for (i, word) in data.chunks_exact(2).enumerate() {
                        let reg = sim.pointer + i as u16;
                        sim.write_word(reg, u16::from_le_bytes([word[0], word[1]]));
                    }
                }
                Operation::Read(buf) => {
                    let start = sim.pointer;
                    for (i, out) in buf.chunks_exact_mut(2).enumerate() {
                        let value = sim.read_word(start + i as u16)?;
                        out.copy_from_slice(&value.to_le_bytes());
                    }
                }
            }
        }
        Ok(())
    }
}

// ── MockPin ───────────────────────────────────────────────────

#[derive(Default)]
pub struct PinSim {
    /// `None` until first driven.
    pub level: Option<bool>,
    pub fail: bool,
    pub sets: u32,
}

#[derive(Clone, Default)]
pub struct MockPin(Arc<Mutex<PinSim>>);

impl MockPin {
    pub fn level(&self) -> Option<bool> {
        lock(&self.0).level
    }

    pub fn set_fail(&self, fail: bool) {
        lock(&self.0).fail = fail;
    }

    pub fn sets(&self) -> u32 {
        lock(&self.0).sets
    }

    fn drive(&mut self, high: bool) -> Result<(), digital::ErrorKind> {
        let mut pin = lock(&self.0);
        if pin.fail {
            return Err(digital::ErrorKind::Other);
        }
        pin.level = Some(high);
        pin.sets += 1;
        Ok(())
    }
}

impl digital::ErrorType for MockPin {
    type Error = digital::ErrorKind;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.drive(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.drive(true)
    }
}

// ── MockNvs ───────────────────────────────────────────────────

#[derive(Default)]
pub struct NvsSim {
    pub data: HashMap<String, Vec<u8>>,
    pub fail_writes: bool,
    pub writes: u32,
}

#[derive(Clone, Default)]
pub struct MockNvs(Arc<Mutex<NvsSim>>);

impl MockNvs {
    fn key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }

    pub fn with(namespace: &str, key: &str, value: &[u8]) -> Self {
        let nvs = Self::default();
        lock(&nvs.0)
            .data
            .insert(Self::key(namespace, key), value.to_vec());
        nvs
    }

    pub fn get(&self, namespace: &str, key: &str) -> Option<Vec<u8>> {
        lock(&self.0).data.get(&Self::key(namespace, key)).cloned()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        lock(&self.0).fail_writes = fail;
    }

    pub fn writes(&self) -> u32 {
        lock(&self.0).writes
    }
}

impl StoragePort for MockNvs {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        match lock(&self.0).data.get(&Self::key(namespace, key)) {
            Some(v) => {
                let len = v.len().min(buf.len());
                buf[..len].copy_from_slice(&v[..len]);
                Ok(len)
            }
            None => Err(StorageError::NotFound),
        }
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        let mut nvs = lock(&self.0);
        if nvs.fail_writes {
            return Err(StorageError::IoError);
        }
        nvs.writes += 1;
        nvs.data.insert(Self::key(namespace, key), data.to_vec());
        Ok(())
    }
}

// ── MockDelay ─────────────────────────────────────────────────

/// Returns immediately; remembers every millisecond delay requested.
#[derive(Clone, Default)]
pub struct MockDelay(Arc<Mutex<Vec<u32>>>);

impl MockDelay {
    pub fn log(&self) -> Vec<u32> {
        lock(&self.0).clone()
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, _ns: u32) {}

    fn delay_ms(&mut self, ms: u32) {
        lock(&self.0).push(ms);
    }
}

// ── LogSink (EventSink mock) ─────────────────────────────────

pub struct LogSink {
    pub events: Vec<PowerEvent>,
}

impl LogSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }
}

impl EventSink for LogSink {
    fn emit(&mut self, event: &PowerEvent) {
        self.events.push(*event);
    }
}
