//! Unified error types for the power board firmware.
//!
//! A single `Error` enum that every subsystem converts into, so the
//! controller and the collaborators above it handle failures uniformly.
//! All variants are `Copy`; nothing here allocates.

use core::fmt;

use embedded_hal::i2c::ErrorKind;

use crate::app::ports::StorageError;
use crate::gauge::GaugeState;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible core operation funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Transport-level failure talking to a fuel gauge.
    Bus(BusError),
    /// Bring-up read a device name that is not a known silicon revision.
    IdentityMismatch { found: u16 },
    /// The NV write-history block read back as all zeros.
    HistoryUnreadable,
    /// A register read failed while assembling a telemetry snapshot.
    TelemetryRead { register: u16, cause: BusError },
    /// The interlock pin moved but the `armed` flag could not be persisted.
    ///
    /// `armed` is the state the board is physically in.
    Persistence { armed: bool, cause: StorageError },
    /// The interlock output pin rejected a level change.
    Gpio,
    /// Operation not allowed in the driver's current state.
    NotReady(GaugeState),
    /// The configuration reset did not finish within the allowed polls.
    ResetTimeout { polls: u32 },
    /// The NV block has no commit cycles left.
    NvWritesExhausted { used: u8 },
    /// A transfer asked for more words than the stack buffers hold.
    TransferTooLarge { words: usize },
    /// The board configuration is missing a value the operation needs.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(e) => write!(f, "bus: {e}"),
            Self::IdentityMismatch { found } => {
                write!(f, "unexpected device name 0x{found:04X}")
            }
            Self::HistoryUnreadable => write!(f, "NV write history unreadable"),
            Self::TelemetryRead { register, cause } => {
                write!(f, "telemetry read of 0x{register:03X} failed: {cause}")
            }
            Self::Persistence { armed, cause } => write!(
                f,
                "interlock {} but state not persisted: {cause}",
                if *armed { "armed" } else { "disarmed" }
            ),
            Self::Gpio => write!(f, "interlock GPIO write failed"),
            Self::NotReady(state) => write!(f, "gauge not ready ({state:?})"),
            Self::ResetTimeout { polls } => {
                write!(f, "reset still in progress after {polls} polls")
            }
            Self::NvWritesExhausted { used } => {
                write!(f, "NV write budget exhausted ({used} used)")
            }
            Self::TransferTooLarge { words } => {
                write!(f, "transfer of {words} words exceeds buffer")
            }
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Bus errors
// ---------------------------------------------------------------------------

/// A failed I²C transaction, reduced to the portable `embedded-hal` kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// The device (or a data byte) was not acknowledged.
    Nack,
    /// Lost arbitration to another bus master.
    ArbitrationLoss,
    /// Timeout or any other driver-reported failure.
    Other,
}

impl BusError {
    /// Classify a HAL error.
    pub fn from_hal<E: embedded_hal::i2c::Error>(err: &E) -> Self {
        Self::from_kind(err.kind())
    }

    pub fn from_kind(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::NoAcknowledge(_) => Self::Nack,
            ErrorKind::ArbitrationLoss => Self::ArbitrationLoss,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nack => write!(f, "NACK"),
            Self::ArbitrationLoss => write!(f, "arbitration lost"),
            Self::Other => write!(f, "bus fault or timeout"),
        }
    }
}

impl From<BusError> for Error {
    fn from(e: BusError) -> Self {
        Self::Bus(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
