//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements            | Connects to              |
//! |------------|-----------------------|--------------------------|
//! | `i2c`      | embedded-hal `I2c`    | ESP-IDF I²C master       |
//! | `log_sink` | EventSink             | Serial log output        |
//! | `nvs`      | ConfigPort            | NVS / in-memory store    |
//! |            | StoragePort           |                          |

pub mod i2c;
pub mod log_sink;
pub mod nvs;
