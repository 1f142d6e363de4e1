//! Power Board Firmware: main entry point
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  Adapters (outer ring)                   │
//! │                                                          │
//! │  GaugeBus ×2      PinDriver     NvsAdapter  LogEventSink │
//! │  (I2c, 100 ms)    (arm relay)   (Storage)   (EventSink)  │
//! │                                                          │
//! │  ───────────── Port / embedded-hal boundary ──────────── │
//! │                                                          │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │  PowerController                                   │  │
//! │  │  FuelGauge(flight) · FuelGauge(pyro) · Interlock   │  │
//! │  └────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::{Context, Result};
use esp_idf_hal::delay::{Delay, FreeRtos};
use esp_idf_hal::gpio::{AnyOutputPin, PinDriver};
use esp_idf_hal::peripherals::Peripherals;
use log::{info, warn};

use powerboard::adapters::i2c::GaugeBus;
use powerboard::adapters::log_sink::LogEventSink;
use powerboard::adapters::nvs::NvsAdapter;
use powerboard::app::ports::ConfigPort;
use powerboard::app::report;
use powerboard::config::BoardConfig;
use powerboard::gauge::{FuelGauge, Pack};
use powerboard::power::{ArmInterlock, PowerController};

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Powerboard v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. NVS + config ───────────────────────────────────────
    let nvs = NvsAdapter::new().context("NVS init")?;
    let config = nvs.load().unwrap_or_else(|e| {
        warn!("config load failed ({}), using defaults", e);
        BoardConfig::default()
    });

    let peripherals = Peripherals::take()?;

    // ── 3. Arm interlock (restores the persisted level first) ─
    // SAFETY: the arm GPIO is validated against both bus pin sets and is
    // claimed nowhere else.
    let arm_pin = PinDriver::output(unsafe { AnyOutputPin::new(config.arm_gpio) })?;
    let interlock = ArmInterlock::restore(arm_pin, nvs).context("restore interlock")?;

    // ── 4. Gauge buses ────────────────────────────────────────
    let flight_bus = GaugeBus::open(
        peripherals.i2c0,
        &config.flight_bus,
        config.i2c_clock_hz,
        config.i2c_timeout_ms,
    )?;
    let pyro_bus = GaugeBus::open(
        peripherals.i2c1,
        &config.pyro_bus,
        config.i2c_clock_hz,
        config.i2c_timeout_ms,
    )?;

    let flight = FuelGauge::new(
        Pack::Flight,
        flight_bus,
        Delay::new_default(),
        config.charging_threshold_ma,
    );
    let pyro = FuelGauge::new(
        Pack::Pyro,
        pyro_bus,
        Delay::new_default(),
        config.charging_threshold_ma,
    );

    // ── 5. Controller bring-up ────────────────────────────────
    let controller = PowerController::new(flight, pyro, interlock, &config);
    controller
        .initialize()
        .context("fuel gauge bring-up failed; board not operable")?;
    if let Ok(status) = report::arm_status_json(controller.is_armed()) {
        info!("boot complete: {}", status);
    }

    // ── 6. Telemetry loop ─────────────────────────────────────
    let mut sink = LogEventSink::new();
    loop {
        controller.publish_telemetry(&mut sink);

        if !controller.is_durable() {
            match controller.retry_persist() {
                Ok(()) => info!("interlock state persisted on retry"),
                Err(e) => warn!("interlock persist retry failed: {}", e),
            }
        }

        FreeRtos::delay_ms(config.telemetry_interval_ms);
    }
}
