//! MAX17330 fuel-gauge driver.
//!
//! One [`FuelGauge`] per battery pack, generic over the `embedded-hal` I²C
//! bus and delay provider so the whole protocol runs against a simulated
//! register file on the host.
//!
//! ```text
//!   Uninitialized ──bring_up──▶ Identified ──status──▶ Ready
//!         ▲                         │                    │
//!         └──── hard_reset ─────────┴────────────────────┘
//!   any bus/identity/history failure ──▶ Faulted (terminal)
//! ```
//!
//! NV protocol (unlock, write history, provisioning, hard reset) lives in
//! [`nv`]; telemetry decoding in [`telemetry`].

pub mod nv;
pub mod registers;
pub mod telemetry;
pub mod transport;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{error, info, warn};
use serde::Serialize;

use crate::error::{Error, Result};
use registers::{DEV_NAME, KNOWN_DEVICE_NAMES, STATUS, STATUS_POR};
use transport::RegisterBus;

pub use nv::{NvWriteHistory, ProvisionOutcome};
pub use telemetry::BatterySnapshot;

/// The two independent battery packs on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Pack {
    Flight,
    Pyro,
}

impl Pack {
    pub const ALL: [Pack; 2] = [Pack::Flight, Pack::Pyro];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Flight => "flight",
            Self::Pyro => "pyro",
        }
    }
}

impl core::fmt::Display for Pack {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Driver lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GaugeState {
    Uninitialized,
    /// Device name checked; status not yet read.
    Identified,
    Ready,
    /// Bring-up or NV history failed.  Terminal.
    Faulted,
}

/// What bring-up learned about the chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GaugeIdentity {
    pub device_name: u16,
    /// The chip has been through a power-on reset since the flag was last cleared.
    pub power_on_reset: bool,
}

pub struct FuelGauge<I, D> {
    pack: Pack,
    bus: RegisterBus<I>,
    delay: D,
    state: GaugeState,
    charging_threshold_ma: f32,
}

impl<I: I2c, D: DelayNs> FuelGauge<I, D> {
    pub fn new(pack: Pack, i2c: I, delay: D, charging_threshold_ma: f32) -> Self {
        Self {
            pack,
            bus: RegisterBus::new(i2c),
            delay,
            state: GaugeState::Uninitialized,
            charging_threshold_ma,
        }
    }

    pub fn pack(&self) -> Pack {
        self.pack
    }

    pub fn state(&self) -> GaugeState {
        self.state
    }

    /// Identify the chip and move to `Ready`.
    ///
    /// Any bus failure or an unknown device name leaves the driver `Faulted`.
    pub fn bring_up(&mut self) -> Result<GaugeIdentity> {
        if self.state != GaugeState::Uninitialized {
            return Err(Error::NotReady(self.state));
        }

        let device_name = match self.bus.read_word(DEV_NAME) {
            Ok(name) => name,
            Err(e) => return Err(self.fault("DevName read failed", e)),
        };
        if !KNOWN_DEVICE_NAMES.contains(&device_name) {
            return Err(self.fault(
                "unknown device",
                Error::IdentityMismatch { found: device_name },
            ));
        }
        self.state = GaugeState::Identified;
        info!("[{}] gauge identified: DevName=0x{:04X}", self.pack, device_name);

        let status = match self.bus.read_word(STATUS) {
            Ok(status) => status,
            Err(e) => return Err(self.fault("Status read failed", e)),
        };
        let power_on_reset = status & STATUS_POR != 0;
        if power_on_reset {
            info!("[{}] gauge reports power-on reset", self.pack);
        }

        self.state = GaugeState::Ready;
        info!("[{}] gauge ready", self.pack);
        Ok(GaugeIdentity {
            device_name,
            power_on_reset,
        })
    }

    /// Read and decode one full telemetry cycle.  `Ready` only.
    pub fn snapshot(&mut self) -> Result<BatterySnapshot> {
        self.require_ready()?;
        telemetry::read_snapshot(&mut self.bus, self.charging_threshold_ma)
    }

    fn require_ready(&self) -> Result<()> {
        match self.state {
            GaugeState::Ready => Ok(()),
            other => Err(Error::NotReady(other)),
        }
    }

    fn fault(&mut self, what: &str, cause: Error) -> Error {
        error!("[{}] gauge faulted: {} ({})", self.pack, what, cause);
        self.state = GaugeState::Faulted;
        cause
    }

    fn warn_history(&self, history: NvWriteHistory) {
        if history.remaining() == 0 {
            warn!(
                "[{}] NV write budget exhausted ({} of {} used)",
                self.pack,
                history.used,
                registers::MAX_NV_WRITES
            );
        } else {
            info!(
                "[{}] NV writes used {}, remaining {}",
                self.pack,
                history.used,
                history.remaining()
            );
        }
    }
}
