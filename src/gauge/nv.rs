//! Non-volatile configuration protocol.
//!
//! The NV block survives power loss but accepts only [`MAX_NV_WRITES`]
//! commit cycles over the chip's lifetime, so every path here either
//! avoids writing or reports how much of the budget is left.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{info, warn};

use super::registers::{
    CLEAR_WRITE_PROTECT, CMD_COPY_NV, CMD_HARDWARE_RESET, CMD_RECALL_HISTORY, COMMAND, COMM_STAT,
    CONFIG2, CONFIG2_POR_CMD, HISTORY_WRITES, MAX_NV_WRITES, N_ICHG_CFG, N_ODSC_TH, N_PACK_CFG,
};
use super::{FuelGauge, GaugeState};
use crate::config::ProvisioningProfile;
use crate::error::{Error, Result};

/// Settle time between the recall-history command and reading 0x1FD.
pub const HISTORY_SETTLE_MS: u32 = 5;
/// Time the chip needs to burn the shadow registers into NV.
pub const NV_COMMIT_MS: u32 = 8;
/// Wait after the hardware-reset command before the config reset.
pub const HARD_RESET_SETTLE_MS: u32 = 10;
/// Interval between Config2 polls while a config reset runs.
pub const RESET_POLL_INTERVAL_MS: u32 = 1;

/// NV commit cycles consumed so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NvWriteHistory {
    pub used: u8,
}

impl NvWriteHistory {
    pub fn remaining(self) -> u8 {
        MAX_NV_WRITES.saturating_sub(self.used)
    }

    pub fn is_exhausted(self) -> bool {
        self.remaining() == 0
    }
}

/// Decode the raw history word.
///
/// The byte-swapped word is a unary countdown: leading zero bits from the
/// MSB down to the first set bit count the writes consumed.  `0x0000` means
/// the history block could not be read and yields `None`.
pub fn decode_write_history(raw: u16) -> Option<NvWriteHistory> {
    if raw == 0 {
        return None;
    }
    Some(NvWriteHistory {
        used: raw.swap_bytes().leading_zeros() as u8,
    })
}

/// Result of a provisioning request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// NV already held the profile; nothing was written.
    AlreadyProvisioned,
    /// The profile was written and committed.  `history` is the budget as
    /// read before this commit.
    Committed { history: NvWriteHistory },
}

impl<I: I2c, D: DelayNs> FuelGauge<I, D> {
    /// Clear the write-protect bits.  The chip needs two back-to-back writes.
    pub fn unlock_nv(&mut self) -> Result<()> {
        self.bus.write_word(COMM_STAT, CLEAR_WRITE_PROTECT)?;
        self.bus.write_word(COMM_STAT, CLEAR_WRITE_PROTECT)
    }

    /// Recall and decode the NV write history.  `Ready` only.
    ///
    /// An unreadable history block faults the driver.
    pub fn write_history(&mut self) -> Result<NvWriteHistory> {
        self.require_ready()?;
        self.unlock_nv()?;
        self.bus.write_word(COMMAND, CMD_RECALL_HISTORY)?;
        self.delay.delay_ms(HISTORY_SETTLE_MS);

        let raw = self.bus.read_word(HISTORY_WRITES)?;
        match decode_write_history(raw) {
            Some(history) => {
                self.warn_history(history);
                Ok(history)
            }
            None => Err(self.fault("write history unreadable", Error::HistoryUnreadable)),
        }
    }

    /// Bring the NV configuration in line with `profile`.
    ///
    /// Skips all writes when NV already matches.  After a commit the chip is
    /// reset; the new values are not read back in this call.  A profile
    /// without an over-discharge threshold is refused before any bus traffic.
    pub fn provision(&mut self, profile: &ProvisioningProfile) -> Result<ProvisionOutcome> {
        self.require_ready()?;
        let Some(odsc_target) = profile.overdischarge_threshold else {
            warn!("[{}] provisioning refused: nODSCTh not configured", self.pack);
            return Err(Error::Config("over-discharge threshold not configured"));
        };

        let charge = self.bus.read_word(N_ICHG_CFG)?;
        let pack = self.bus.read_word(N_PACK_CFG)?;
        let odsc = self.bus.read_word(N_ODSC_TH)?;
        if charge == profile.charge_current_cfg
            && pack == profile.pack_cfg
            && odsc == odsc_target
        {
            info!("[{}] NV already provisioned", self.pack);
            return Ok(ProvisionOutcome::AlreadyProvisioned);
        }

        info!(
            "[{}] provisioning NV: nIChgCfg 0x{:04X}->0x{:04X}, nPackCfg 0x{:04X}->0x{:04X}, nODSCTh 0x{:04X}->0x{:04X}",
            self.pack,
            charge,
            profile.charge_current_cfg,
            pack,
            profile.pack_cfg,
            odsc,
            odsc_target
        );

        let history = self.write_history()?;
        if history.is_exhausted() {
            return Err(Error::NvWritesExhausted { used: history.used });
        }

        self.unlock_nv()?;
        self.bus.write_word(N_ICHG_CFG, profile.charge_current_cfg)?;
        self.bus.write_word(N_PACK_CFG, profile.pack_cfg)?;
        self.bus.write_word(N_ODSC_TH, odsc_target)?;
        self.bus.write_word(COMMAND, CMD_COPY_NV)?;
        self.delay.delay_ms(NV_COMMIT_MS);
        self.bus.write_word(COMMAND, CMD_HARDWARE_RESET)?;

        info!(
            "[{}] NV committed ({} writes left before this commit)",
            self.pack,
            history.remaining()
        );
        Ok(ProvisionOutcome::Committed { history })
    }

    /// Full reset: hardware reset, then a configuration reset polled until
    /// Config2 bit 15 clears or `max_polls` reads have seen it still set.
    ///
    /// On success the driver is `Uninitialized` and needs [`bring_up`](Self::bring_up).
    pub fn hard_reset(&mut self, max_polls: u32) -> Result<()> {
        if self.state == GaugeState::Faulted {
            return Err(Error::NotReady(self.state));
        }

        info!("[{}] hard reset", self.pack);
        self.bus.write_word(COMMAND, CMD_HARDWARE_RESET)?;
        self.delay.delay_ms(HARD_RESET_SETTLE_MS);
        self.bus.write_word(CONFIG2, CONFIG2_POR_CMD)?;

        let mut polls = 0;
        loop {
            self.delay.delay_ms(RESET_POLL_INTERVAL_MS);
            let config2 = self.bus.read_word(CONFIG2)?;
            if config2 & CONFIG2_POR_CMD == 0 {
                break;
            }
            polls += 1;
            if polls >= max_polls {
                return Err(Error::ResetTimeout { polls });
            }
        }

        self.state = GaugeState::Uninitialized;
        info!("[{}] reset complete after {} busy polls", self.pack, polls);
        Ok(())
    }
}
