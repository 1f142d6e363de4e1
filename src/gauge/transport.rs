//! Register transport: 16-bit register access over one I²C channel.
//!
//! Every call re-derives the device address from the register via
//! [`Bank::resolve`](super::registers::Bank::resolve); a single session
//! mixes volatile and NV accesses, so nothing is cached.
//!
//! Words travel little-endian.  Transfer buffers live on the stack and are
//! sized for [`MAX_WORDS`] words; there is no retry at this layer and the
//! per-transaction timeout belongs to the bus implementation.

use embedded_hal::i2c::I2c;
use heapless::Vec;

use super::registers::Register;
use crate::error::{BusError, Error, Result};

/// Largest number of words a single transfer may carry.
pub const MAX_WORDS: usize = 4;

const BUF_BYTES: usize = 1 + 2 * MAX_WORDS;

/// Register-level access to one fuel gauge.
pub struct RegisterBus<I> {
    i2c: I,
}

impl<I: I2c> RegisterBus<I> {
    pub fn new(i2c: I) -> Self {
        Self { i2c }
    }

    /// Write consecutive words starting at `reg`.
    pub fn write(&mut self, reg: Register, values: &[u16]) -> Result<()> {
        if values.len() > MAX_WORDS {
            return Err(Error::TransferTooLarge {
                words: values.len(),
            });
        }

        let mut frame: Vec<u8, BUF_BYTES> = Vec::new();
        // Capacity is checked above; pushes cannot fail.
        let _ = frame.push(reg.wire_address());
        for value in values {
            let _ = frame.extend_from_slice(&value.to_le_bytes());
        }

        self.i2c
            .write(reg.bank().device_address(), &frame)
            .map_err(|e| Error::Bus(BusError::from_hal(&e)))
    }

    /// Write a single word.
    pub fn write_word(&mut self, reg: Register, value: u16) -> Result<()> {
        self.write(reg, &[value])
    }

    /// Read `out.len()` consecutive words starting at `reg`.
    pub fn read(&mut self, reg: Register, out: &mut [u16]) -> Result<()> {
        if out.len() > MAX_WORDS {
            return Err(Error::TransferTooLarge { words: out.len() });
        }

        let mut raw = [0u8; 2 * MAX_WORDS];
        let raw = &mut raw[..2 * out.len()];
        self.i2c
            .write_read(reg.bank().device_address(), &[reg.wire_address()], raw)
            .map_err(|e| Error::Bus(BusError::from_hal(&e)))?;

        for (word, bytes) in out.iter_mut().zip(raw.chunks_exact(2)) {
            *word = u16::from_le_bytes([bytes[0], bytes[1]]);
        }
        Ok(())
    }

    /// Read a single word.
    pub fn read_word(&mut self, reg: Register) -> Result<u16> {
        let mut word = [0u16; 1];
        self.read(reg, &mut word)?;
        Ok(word[0])
    }
}
