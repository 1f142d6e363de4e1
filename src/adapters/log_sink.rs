//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing power events to the ESP-IDF logger
//! (UART / USB-CDC in production).  The web status collaborator would
//! implement the same trait.

use log::{info, warn};

use crate::app::events::PowerEvent;
use crate::app::ports::EventSink;
use crate::gauge::ProvisionOutcome;

/// Adapter that logs every [`PowerEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &PowerEvent) {
        match event {
            PowerEvent::Telemetry { pack, snapshot: s } => {
                info!(
                    "TELEM | {} | {:.0}/{:.0}mAh soc={:.1}% | {:.3}V {:.1}mA{} | \
                     cycles={:.2} age={:.1}% | tte={:.0}min ttf={:.0}min",
                    pack,
                    s.capacity_mah,
                    s.max_capacity_mah,
                    s.state_of_charge * 100.0,
                    s.voltage_v,
                    s.current_ma,
                    if s.charging { " CHG" } else { "" },
                    s.cycles,
                    s.age * 100.0,
                    s.time_to_empty_min,
                    s.time_to_full_min,
                );
            }
            PowerEvent::ArmStateChanged { armed, durable } => {
                info!(
                    "ARM   | {}{}",
                    if *armed { "ARMED" } else { "disarmed" },
                    if *durable { "" } else { " (NOT PERSISTED)" }
                );
            }
            PowerEvent::Provisioned { pack, outcome } => match outcome {
                ProvisionOutcome::AlreadyProvisioned => {
                    info!("NV    | {} already provisioned", pack);
                }
                ProvisionOutcome::Committed { history } => {
                    info!(
                        "NV    | {} committed, {} writes were left",
                        pack,
                        history.remaining()
                    );
                }
            },
            PowerEvent::WriteHistory { pack, history } => {
                info!(
                    "NV    | {} writes used={} remaining={}",
                    pack,
                    history.used,
                    history.remaining()
                );
            }
            PowerEvent::GaugeReset(pack) => {
                info!("RESET | {} gauge back up", pack);
            }
            PowerEvent::CommandFailed { pack, error } => match pack {
                Some(pack) => warn!("FAIL  | {}: {}", pack, error),
                None => warn!("FAIL  | interlock: {}", error),
            },
        }
    }
}
