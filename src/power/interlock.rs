//! Arm/disarm interlock: one output pin plus a persisted `armed` flag.
//!
//! The flag is the source of truth.  After every successful transition the
//! pin level, the in-memory flag and the stored byte agree.  When the store
//! rejects a write the pin and flag have already moved; the interlock
//! remembers that the state is not durable until a later write succeeds.

use embedded_hal::digital::OutputPin;
use log::{info, warn};

use crate::app::ports::{StorageError, StoragePort};
use crate::error::{Error, Result};

/// NVS namespace holding the interlock state.
pub const NAMESPACE: &str = "powerboard";
/// Key of the one-byte flag: `0` = disarmed, `1` = armed.
pub const ARMED_KEY: &str = "armed";

pub struct ArmInterlock<P, S> {
    pin: P,
    storage: S,
    armed: bool,
    durable: bool,
}

impl<P: OutputPin, S: StoragePort> ArmInterlock<P, S> {
    /// Load the persisted flag and drive the pin to match it.
    pub fn restore(pin: P, storage: S) -> Result<Self> {
        let armed = load_flag(&storage);
        let mut interlock = Self {
            pin,
            storage,
            armed,
            durable: true,
        };
        interlock.drive(armed)?;
        info!(
            "interlock restored: {}",
            if armed { "ARMED" } else { "disarmed" }
        );
        Ok(interlock)
    }

    pub fn arm(&mut self) -> Result<()> {
        self.transition(true)
    }

    pub fn disarm(&mut self) -> Result<()> {
        self.transition(false)
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// `false` while the stored flag may disagree with [`is_armed`](Self::is_armed).
    pub fn is_durable(&self) -> bool {
        self.durable
    }

    /// Write the current flag again without touching the pin.
    pub fn retry_persist(&mut self) -> Result<()> {
        self.persist()
    }

    fn transition(&mut self, armed: bool) -> Result<()> {
        self.drive(armed)?;
        if self.armed != armed {
            info!("interlock {}", if armed { "ARMED" } else { "disarmed" });
        }
        self.armed = armed;
        self.persist()
    }

    fn drive(&mut self, armed: bool) -> Result<()> {
        let res = if armed {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        res.map_err(|_| {
            warn!("interlock pin rejected level change (armed={})", armed);
            Error::Gpio
        })
    }

    fn persist(&mut self) -> Result<()> {
        match self
            .storage
            .write(NAMESPACE, ARMED_KEY, &[u8::from(self.armed)])
        {
            Ok(()) => {
                self.durable = true;
                Ok(())
            }
            Err(cause) => {
                self.durable = false;
                warn!(
                    "interlock state armed={} not persisted: {}",
                    self.armed, cause
                );
                Err(Error::Persistence {
                    armed: self.armed,
                    cause,
                })
            }
        }
    }
}

/// Missing key or unreadable byte both mean disarmed.
fn load_flag<S: StoragePort>(storage: &S) -> bool {
    let mut buf = [0u8; 1];
    match storage.read(NAMESPACE, ARMED_KEY, &mut buf) {
        Ok(1) => match buf[0] {
            0 => false,
            1 => true,
            other => {
                warn!("stored armed flag 0x{:02X} invalid, assuming disarmed", other);
                false
            }
        },
        Ok(len) => {
            warn!("stored armed flag has length {}, assuming disarmed", len);
            false
        }
        Err(StorageError::NotFound) => false,
        Err(e) => {
            warn!("armed flag unreadable ({}), assuming disarmed", e);
            false
        }
    }
}
