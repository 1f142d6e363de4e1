//! Inbound commands to the power controller.
//!
//! These represent operator actions arriving from the outside world (HTTP
//! handlers, serial console) that
//! [`PowerController::handle_command`](crate::power::PowerController::handle_command)
//! interprets and acts upon.

use crate::gauge::Pack;

/// Commands that external adapters can send into the power core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerCommand {
    /// Close the arm relay and persist `armed = true`.
    Arm,

    /// Open the arm relay and persist `armed = false`.
    Disarm,

    /// Write the provisioning profile to a pack's NV block if it differs.
    Provision(Pack),

    /// Report how many NV commit cycles a pack's gauge has left.
    ReadWriteHistory(Pack),

    /// Hard-reset a pack's gauge and bring it back up.
    HardReset(Pack),
}
