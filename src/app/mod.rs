//! Application surface: pure domain types, zero I/O.
//!
//! Commands in, events out, port traits for everything the core persists
//! or reports, and the JSON encoding handed to the web collaborator.
//! Hardware access happens through [`ports`] and `embedded-hal` traits,
//! keeping this layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod report;
