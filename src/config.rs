//! Board configuration parameters
//!
//! All tunable parameters for the power board.
//! Values can be overridden via NVS; pin numbers default to [`crate::pins`].

use serde::{Deserialize, Serialize};

use crate::pins;

/// Bus wiring for one pack's fuel gauge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackBusConfig {
    /// ESP-IDF I²C port number
    pub port: u8,
    pub scl_gpio: i32,
    pub sda_gpio: i32,
}

/// Expected contents of the three NV registers touched by provisioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningProfile {
    /// nIChgCfg: charge current limit
    pub charge_current_cfg: u16,
    /// nPackCfg: pack flags (thermistor disabled)
    pub pack_cfg: u16,
    /// nODSCTh: over-discharge current threshold.  Board-specific with no
    /// safe default; provisioning refuses to run until the stored config
    /// sets it.
    pub overdischarge_threshold: Option<u16>,
}

impl Default for ProvisioningProfile {
    fn default() -> Self {
        Self {
            charge_current_cfg: 0x184B,
            pack_cfg: 0x0001,
            overdischarge_threshold: None,
        }
    }
}

/// Core board configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardConfig {
    // --- Buses ---
    /// I²C clock (Hz), shared by both gauge buses
    pub i2c_clock_hz: u32,
    /// Per-transaction bus timeout (milliseconds)
    pub i2c_timeout_ms: u32,
    pub flight_bus: PackBusConfig,
    pub pyro_bus: PackBusConfig,

    // --- Interlock ---
    /// Digital output driving the arm relay (HIGH = armed)
    pub arm_gpio: i32,

    // --- Gauge ---
    /// Average current (mA) above which a pack counts as charging
    pub charging_threshold_ma: f32,
    /// Ceiling on Config2 polls during a hard reset (1 ms apart)
    pub reset_max_polls: u32,
    pub provisioning: ProvisioningProfile,

    // --- Timing ---
    /// Telemetry poll interval (milliseconds)
    pub telemetry_interval_ms: u32,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            // Buses
            i2c_clock_hz: 400_000,
            i2c_timeout_ms: 100,
            flight_bus: PackBusConfig {
                port: pins::FLIGHT_I2C_PORT,
                scl_gpio: pins::FLIGHT_SCL_GPIO,
                sda_gpio: pins::FLIGHT_SDA_GPIO,
            },
            pyro_bus: PackBusConfig {
                port: pins::PYRO_I2C_PORT,
                scl_gpio: pins::PYRO_SCL_GPIO,
                sda_gpio: pins::PYRO_SDA_GPIO,
            },

            // Interlock
            arm_gpio: pins::ARM_GPIO,

            // Gauge
            charging_threshold_ma: 10.0,
            reset_max_polls: 1000, // ~1 s
            provisioning: ProvisioningProfile::default(),

            // Timing
            telemetry_interval_ms: 1000,
        }
    }
}
