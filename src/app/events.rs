//! Outbound power events.
//!
//! The [`PowerController`](crate::power::PowerController) emits these
//! through the [`EventSink`](super::ports::EventSink) port.

use crate::error::Error;
use crate::gauge::{BatterySnapshot, NvWriteHistory, Pack, ProvisionOutcome};

/// Structured events emitted by the power core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PowerEvent {
    /// Periodic telemetry for one pack.
    Telemetry { pack: Pack, snapshot: BatterySnapshot },

    /// The interlock changed (or re-asserted) its level.
    ArmStateChanged { armed: bool, durable: bool },

    /// Provisioning finished for a pack.
    Provisioned { pack: Pack, outcome: ProvisionOutcome },

    /// NV write history read from a pack.
    WriteHistory { pack: Pack, history: NvWriteHistory },

    /// A pack's gauge was reset and is ready again.
    GaugeReset(Pack),

    /// A command failed.
    CommandFailed { pack: Option<Pack>, error: Error },
}
