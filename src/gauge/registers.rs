//! MAX17330 register map.
//!
//! Single source of truth for every register the driver touches.  Each
//! entry carries its 10-bit address and decode rule as data, so the
//! driver never duplicates per-register scaling logic.
//!
//! The chip answers on two I²C addresses: registers below `0x100` live in
//! the volatile (RAM) bank, everything from `0x100` up is the non-volatile
//! configuration bank.  On the wire only the low address byte is sent.

// ---------------------------------------------------------------------------
// Device address space
// ---------------------------------------------------------------------------

/// 7-bit I²C address of the volatile register bank (0x6C in 8-bit form).
pub const ADDR_VOLATILE: u8 = 0x36;
/// 7-bit I²C address of the NV configuration bank (0x16 in 8-bit form).
pub const ADDR_NV_CONFIG: u8 = 0x0B;
/// First register address served by the NV bank.
pub const NV_BANK_START: u16 = 0x100;

/// Which of the two device address spaces a register belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bank {
    VolatileBank,
    NvConfigBank,
}

impl Bank {
    /// Resolve the bank from the register address alone.
    pub const fn resolve(addr: u16) -> Self {
        if addr < NV_BANK_START {
            Self::VolatileBank
        } else {
            Self::NvConfigBank
        }
    }

    /// 7-bit bus address for this bank.
    pub const fn device_address(self) -> u8 {
        match self {
            Self::VolatileBank => ADDR_VOLATILE,
            Self::NvConfigBank => ADDR_NV_CONFIG,
        }
    }
}

// ---------------------------------------------------------------------------
// Decode rules
// ---------------------------------------------------------------------------

/// Linear scale applied to a raw count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scale {
    /// Physical value = raw × factor.
    Mul(f32),
    /// Physical value = raw ÷ divisor.
    Div(f32),
}

impl Scale {
    fn apply(self, raw: f32) -> f32 {
        match self {
            Self::Mul(factor) => raw * factor,
            Self::Div(divisor) => raw / divisor,
        }
    }
}

/// How a raw 16-bit word turns into a physical value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decode {
    Unsigned(Scale),
    /// Two's-complement word.
    Signed(Scale),
    /// Flags / command words; no physical unit.
    Bits,
}

/// One entry of the register table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Register {
    pub addr: u16,
    pub name: &'static str,
    pub decode: Decode,
}

impl Register {
    const fn bits(addr: u16, name: &'static str) -> Self {
        Self {
            addr,
            name,
            decode: Decode::Bits,
        }
    }

    const fn unsigned(addr: u16, name: &'static str, scale: Scale) -> Self {
        Self {
            addr,
            name,
            decode: Decode::Unsigned(scale),
        }
    }

    const fn signed(addr: u16, name: &'static str, scale: Scale) -> Self {
        Self {
            addr,
            name,
            decode: Decode::Signed(scale),
        }
    }

    pub const fn bank(&self) -> Bank {
        Bank::resolve(self.addr)
    }

    /// Register pointer byte sent on the bus.
    pub const fn wire_address(&self) -> u8 {
        (self.addr & 0xFF) as u8
    }

    /// Apply this register's decode rule to a raw word.
    #[allow(clippy::cast_possible_wrap)]
    pub fn decode(&self, raw: u16) -> f32 {
        match self.decode {
            Decode::Unsigned(scale) => scale.apply(f32::from(raw)),
            Decode::Signed(scale) => scale.apply(f32::from(raw as i16)),
            Decode::Bits => f32::from(raw),
        }
    }
}

// ---------------------------------------------------------------------------
// Scale factors
// ---------------------------------------------------------------------------

/// mAh per capacity count.
pub const CAPACITY_MAH_PER_LSB: f32 = 0.5;
/// Percentage registers: 1/256 % per count, reported as a fraction.
pub const PERCENT_FRACTION_DIVISOR: f32 = 25_600.0;
/// Cycles register counts quarter cycles.
pub const CYCLES_DIVISOR: f32 = 4.0;
/// Minutes per time count (5.625 s).
pub const TIME_MIN_PER_LSB: f32 = 0.093_75;
/// mA per current count.
pub const CURRENT_MA_PER_LSB: f32 = 0.156_25;
/// Volts per voltage count.
pub const VOLTAGE_V_PER_LSB: f32 = 78.125e-6;

// ---------------------------------------------------------------------------
// Volatile bank
// ---------------------------------------------------------------------------

pub const STATUS: Register = Register::bits(0x000, "Status");
pub const REP_CAP: Register =
    Register::unsigned(0x005, "RepCap", Scale::Mul(CAPACITY_MAH_PER_LSB));
pub const REP_SOC: Register =
    Register::unsigned(0x006, "RepSOC", Scale::Div(PERCENT_FRACTION_DIVISOR));
pub const AGE: Register = Register::unsigned(0x007, "Age", Scale::Div(PERCENT_FRACTION_DIVISOR));
pub const FULL_CAP_REP: Register =
    Register::unsigned(0x010, "FullCapRep", Scale::Mul(CAPACITY_MAH_PER_LSB));
pub const TTE: Register = Register::unsigned(0x011, "TTE", Scale::Mul(TIME_MIN_PER_LSB));
pub const CYCLES: Register = Register::unsigned(0x017, "Cycles", Scale::Div(CYCLES_DIVISOR));
/// Cell voltage.  `Batt` (0x0D7) reports the pack at a coarser LSB and is not read.
pub const VCELL: Register = Register::unsigned(0x01A, "VCell", Scale::Mul(VOLTAGE_V_PER_LSB));
pub const AVG_CURRENT: Register =
    Register::signed(0x01D, "AvgCurrent", Scale::Mul(CURRENT_MA_PER_LSB));
pub const TTF: Register = Register::unsigned(0x020, "TTF", Scale::Mul(TIME_MIN_PER_LSB));
pub const DEV_NAME: Register = Register::bits(0x021, "DevName");
pub const CHARGING_CURRENT: Register =
    Register::signed(0x028, "ChargingCurrent", Scale::Mul(CURRENT_MA_PER_LSB));
pub const CHARGING_VOLTAGE: Register =
    Register::unsigned(0x02A, "ChargingVoltage", Scale::Mul(VOLTAGE_V_PER_LSB));
pub const COMMAND: Register = Register::bits(0x060, "Command");
pub const COMM_STAT: Register = Register::bits(0x061, "CommStat");
/// Config2; doubles as the software (configuration) reset register.
pub const CONFIG2: Register = Register::bits(0x0AB, "Config2");

// ---------------------------------------------------------------------------
// NV configuration bank
// ---------------------------------------------------------------------------

pub const N_PACK_CFG: Register = Register::bits(0x1B5, "nPackCfg");
pub const N_ICHG_CFG: Register = Register::bits(0x1D8, "nIChgCfg");
pub const N_ODSC_TH: Register = Register::bits(0x1DD, "nODSCTh");
pub const HISTORY_WRITES: Register = Register::bits(0x1FD, "nHistoryWrites");

// ---------------------------------------------------------------------------
// Command words and bits
// ---------------------------------------------------------------------------

/// Written twice to CommStat to clear the write-protect bits.
pub const CLEAR_WRITE_PROTECT: u16 = 0x0000;
/// Command: recall the NV write-history block into 0x1FD.
pub const CMD_RECALL_HISTORY: u16 = 0xE29B;
/// Command: copy the NV shadow registers into NV memory.
pub const CMD_COPY_NV: u16 = 0xE904;
/// Command: full power-on reset (reloads volatile state from NV).
pub const CMD_HARDWARE_RESET: u16 = 0x000F;
/// Config2 bit that starts a configuration reset; reads back set while busy.
pub const CONFIG2_POR_CMD: u16 = 1 << 15;
/// Status bit set after a power-on reset.
pub const STATUS_POR: u16 = 1 << 1;

/// DevName values of the two silicon revisions this board ships with.
pub const KNOWN_DEVICE_NAMES: [u16; 2] = [0x4076, 0x4077];

/// NV memory accepts this many commit cycles over the device lifetime.
pub const MAX_NV_WRITES: u8 = 7;
