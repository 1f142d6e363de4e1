//! Power board firmware library.
//!
//! MAX17330 fuel-gauge driver for the flight and pyro packs, the persisted
//! arm interlock, and the controller tying them together.  Everything here
//! builds on the host.  ESP-IDF specific code needs both the `espidf`
//! feature and an `espidf` target; without either, the adapters use their
//! simulation backends.  The firmware binary requires the feature:
//!
//! ```text
//! cargo build --release --features espidf
//! ```

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod error;
pub mod gauge;
pub mod pins;
pub mod power;

pub use error::{BusError, Error, Result};
