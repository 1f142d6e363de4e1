//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements both [`ConfigPort`] and [`StoragePort`] for the power board.
//!
//! - Config validation: every field is range-checked before persistence.
//! - Atomic writes: ESP-IDF NVS commits are atomic per `nvs_commit()`.
//! - Host builds keep everything in an in-memory map (dev/test only).

use crate::app::ports::{ConfigError, ConfigPort, StorageError, StoragePort};
use crate::config::{BoardConfig, PackBusConfig};
use log::{info, warn};

#[cfg(not(all(feature = "espidf", target_os = "espidf")))]
use std::collections::HashMap;

#[cfg(all(feature = "espidf", target_os = "espidf"))]
use esp_idf_svc::sys::*;

const CONFIG_NAMESPACE: &str = "powerboard";
const CONFIG_KEY: &str = "boardcfg";

/// NVS keys and namespaces are limited to 15 characters plus NUL.
const NVS_NAME_MAX: usize = 15;

#[cfg(all(feature = "espidf", target_os = "espidf"))]
const MAX_BLOB_SIZE: usize = 512;

pub struct NvsAdapter {
    #[cfg(not(all(feature = "espidf", target_os = "espidf")))]
    store: std::cell::RefCell<HashMap<String, Vec<u8>>>,
}

impl NvsAdapter {
    /// Create a new NvsAdapter and initialise NVS flash.
    ///
    /// On first boot or after a version mismatch the NVS partition is
    /// erased and re-initialised automatically.
    pub fn new() -> Result<Self, StorageError> {
        #[cfg(all(feature = "espidf", target_os = "espidf"))]
        {
            // SAFETY: called from the main task before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES as esp_err_t
                || ret == ESP_ERR_NVS_NEW_VERSION_FOUND as esp_err_t
            {
                warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != ESP_OK as esp_err_t {
                    return Err(StorageError::IoError);
                }
                if unsafe { nvs_flash_init() } != ESP_OK as esp_err_t {
                    return Err(StorageError::IoError);
                }
            } else if ret != ESP_OK as esp_err_t {
                return Err(StorageError::IoError);
            }
            info!("NvsAdapter: ESP-IDF NVS initialised");
        }

        #[cfg(not(all(feature = "espidf", target_os = "espidf")))]
        info!("NvsAdapter: simulation backend");

        Ok(Self {
            #[cfg(not(all(feature = "espidf", target_os = "espidf")))]
            store: std::cell::RefCell::new(HashMap::new()),
        })
    }

    #[cfg(not(all(feature = "espidf", target_os = "espidf")))]
    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }

    /// Open an NVS namespace, execute a closure with the handle, then close.
    #[cfg(all(feature = "espidf", target_os = "espidf"))]
    fn with_nvs_handle<F, T>(namespace: &str, write: bool, f: F) -> Result<T, esp_err_t>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, esp_err_t>,
    {
        let ns = c_name(namespace);
        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        // SAFETY: `ns` is NUL-terminated and outlives the call.
        let ret = unsafe { nvs_open(ns.as_ptr().cast(), mode, &mut handle) };
        if ret != ESP_OK as esp_err_t {
            return Err(ret);
        }

        let result = f(handle);
        // SAFETY: `handle` was opened above and is not used afterwards.
        unsafe { nvs_close(handle) };
        result
    }

    #[cfg(all(feature = "espidf", target_os = "espidf"))]
    fn write_blob(namespace: &str, key: &str, data: &[u8]) -> Result<(), esp_err_t> {
        let key = c_name(key);
        Self::with_nvs_handle(namespace, true, |handle| {
            // SAFETY: `key` is NUL-terminated; `data` is valid for `data.len()` bytes.
            let ret = unsafe {
                nvs_set_blob(handle, key.as_ptr().cast(), data.as_ptr().cast(), data.len())
            };
            if ret != ESP_OK as esp_err_t {
                return Err(ret);
            }
            // SAFETY: handle is open read-write.
            let ret = unsafe { nvs_commit(handle) };
            if ret != ESP_OK as esp_err_t {
                return Err(ret);
            }
            Ok(())
        })
    }
}

/// Copy a namespace or key into a NUL-terminated buffer, truncating to the
/// NVS limit.
#[cfg_attr(not(all(feature = "espidf", target_os = "espidf")), allow(dead_code))]
fn c_name(name: &str) -> [u8; NVS_NAME_MAX + 1] {
    let mut buf = [0u8; NVS_NAME_MAX + 1];
    let bytes = name.as_bytes();
    let len = bytes.len().min(NVS_NAME_MAX);
    buf[..len].copy_from_slice(&bytes[..len]);
    buf
}

fn validate_bus(bus: &PackBusConfig) -> Result<(), ConfigError> {
    if bus.port > 1 {
        return Err(ConfigError::ValidationFailed("I2C port must be 0 or 1"));
    }
    if !(0..=48).contains(&bus.scl_gpio) || !(0..=48).contains(&bus.sda_gpio) {
        return Err(ConfigError::ValidationFailed("I2C GPIO must be 0–48"));
    }
    if bus.scl_gpio == bus.sda_gpio {
        return Err(ConfigError::ValidationFailed("SCL and SDA must differ"));
    }
    Ok(())
}

fn validate_config(cfg: &BoardConfig) -> Result<(), ConfigError> {
    if !(10_000..=400_000).contains(&cfg.i2c_clock_hz) {
        return Err(ConfigError::ValidationFailed(
            "i2c_clock_hz must be 10 kHz–400 kHz",
        ));
    }
    if !(1..=1000).contains(&cfg.i2c_timeout_ms) {
        return Err(ConfigError::ValidationFailed(
            "i2c_timeout_ms must be 1–1000",
        ));
    }
    validate_bus(&cfg.flight_bus)?;
    validate_bus(&cfg.pyro_bus)?;
    let flight = [cfg.flight_bus.scl_gpio, cfg.flight_bus.sda_gpio];
    let pyro = [cfg.pyro_bus.scl_gpio, cfg.pyro_bus.sda_gpio];
    if cfg.flight_bus.port == cfg.pyro_bus.port || flight.iter().any(|p| pyro.contains(p)) {
        return Err(ConfigError::ValidationFailed(
            "flight and pyro buses must not share a port or pin",
        ));
    }
    if !(0..=48).contains(&cfg.arm_gpio)
        || flight.contains(&cfg.arm_gpio)
        || pyro.contains(&cfg.arm_gpio)
    {
        return Err(ConfigError::ValidationFailed(
            "arm_gpio must be 0–48 and not a bus pin",
        ));
    }
    if !(0.0..=1000.0).contains(&cfg.charging_threshold_ma) {
        return Err(ConfigError::ValidationFailed(
            "charging_threshold_ma must be 0–1000",
        ));
    }
    if !(1..=10_000).contains(&cfg.reset_max_polls) {
        return Err(ConfigError::ValidationFailed(
            "reset_max_polls must be 1–10000",
        ));
    }
    if !(100..=60_000).contains(&cfg.telemetry_interval_ms) {
        return Err(ConfigError::ValidationFailed(
            "telemetry_interval_ms must be 100–60000",
        ));
    }
    Ok(())
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<BoardConfig, ConfigError> {
        let mut buf = [0u8; 256];
        match self.read(CONFIG_NAMESPACE, CONFIG_KEY, &mut buf) {
            Ok(len) => {
                let cfg: BoardConfig =
                    postcard::from_bytes(&buf[..len]).map_err(|_| ConfigError::Corrupted)?;
                info!("NvsAdapter: loaded config ({} bytes)", len);
                Ok(cfg)
            }
            Err(StorageError::NotFound) => {
                info!("NvsAdapter: no stored config, using defaults");
                Ok(BoardConfig::default())
            }
            Err(e) => {
                warn!("NvsAdapter: config read error ({}), using defaults", e);
                Ok(BoardConfig::default())
            }
        }
    }

    fn save(&self, config: &BoardConfig) -> Result<(), ConfigError> {
        validate_config(config)?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;

        #[cfg(not(all(feature = "espidf", target_os = "espidf")))]
        {
            let key = Self::composite_key(CONFIG_NAMESPACE, CONFIG_KEY);
            self.store.borrow_mut().insert(key, bytes);
            info!("NvsAdapter: config saved (simulation)");
            Ok(())
        }

        #[cfg(all(feature = "espidf", target_os = "espidf"))]
        {
            match Self::write_blob(CONFIG_NAMESPACE, CONFIG_KEY, &bytes) {
                Ok(()) => {
                    info!("NvsAdapter: config saved to NVS ({} bytes)", bytes.len());
                    Ok(())
                }
                Err(e) => {
                    warn!("NvsAdapter: NVS write error {}", e);
                    Err(ConfigError::IoError)
                }
            }
        }
    }
}

impl StoragePort for NvsAdapter {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        #[cfg(not(all(feature = "espidf", target_os = "espidf")))]
        {
            let composite = Self::composite_key(namespace, key);
            match self.store.borrow().get(&composite) {
                Some(data) => {
                    let len = data.len().min(buf.len());
                    buf[..len].copy_from_slice(&data[..len]);
                    Ok(len)
                }
                None => Err(StorageError::NotFound),
            }
        }

        #[cfg(all(feature = "espidf", target_os = "espidf"))]
        {
            let key = c_name(key);
            let result = Self::with_nvs_handle(namespace, false, |handle| {
                let mut size = buf.len().min(MAX_BLOB_SIZE);
                // SAFETY: `buf` is valid for `size` bytes; `key` is NUL-terminated.
                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        key.as_ptr().cast(),
                        buf.as_mut_ptr().cast(),
                        &mut size,
                    )
                };
                if ret != ESP_OK as esp_err_t {
                    return Err(ret);
                }
                Ok(size)
            });
            match result {
                Ok(size) => Ok(size),
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND as esp_err_t => Err(StorageError::NotFound),
                Err(_) => Err(StorageError::IoError),
            }
        }
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        #[cfg(not(all(feature = "espidf", target_os = "espidf")))]
        {
            let composite = Self::composite_key(namespace, key);
            self.store.borrow_mut().insert(composite, data.to_vec());
            Ok(())
        }

        #[cfg(all(feature = "espidf", target_os = "espidf"))]
        {
            Self::write_blob(namespace, key, data).map_err(|e| {
                if e == ESP_ERR_NVS_NOT_ENOUGH_SPACE as esp_err_t {
                    StorageError::Full
                } else {
                    StorageError::IoError
                }
            })
        }
    }
}
