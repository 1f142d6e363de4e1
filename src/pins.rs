//! GPIO / peripheral pin assignments for the power board.
//!
//! Single source of truth; [`crate::config::BoardConfig::default`] and the
//! firmware entry point reference this module rather than hard-coding pins.

// ---------------------------------------------------------------------------
// Arm interlock
// ---------------------------------------------------------------------------

/// Digital output: arm relay driver. HIGH = armed, LOW = safe.
pub const ARM_GPIO: i32 = 16;

// ---------------------------------------------------------------------------
// Flight pack fuel gauge (MAX17330)
// ---------------------------------------------------------------------------

pub const FLIGHT_I2C_PORT: u8 = 0;
pub const FLIGHT_SCL_GPIO: i32 = 9;
pub const FLIGHT_SDA_GPIO: i32 = 10;

// ---------------------------------------------------------------------------
// Pyro pack fuel gauge (MAX17330)
// ---------------------------------------------------------------------------

/// Second controller; the pyro gauge never shares the flight bus.
pub const PYRO_I2C_PORT: u8 = 1;
pub const PYRO_SCL_GPIO: i32 = 11;
pub const PYRO_SDA_GPIO: i32 = 12;
