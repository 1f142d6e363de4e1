//! ESP-IDF I²C bus adapter for the fuel gauges.
//!
//! Wraps an `esp-idf-hal` [`I2cDriver`] and implements the `embedded-hal`
//! [`I2c`](embedded_hal::i2c::I2c) trait with a bounded per-transaction
//! timeout; the stock driver impl blocks forever on a stuck bus.
//!
//! Host builds have no bus here; tests drive the gauge through a simulated
//! register file instead.

#[cfg(all(feature = "espidf", target_os = "espidf"))]
pub use esp_impl::{EspBusError, GaugeBus};

#[cfg(all(feature = "espidf", target_os = "espidf"))]
mod esp_impl {
    use embedded_hal::i2c::{self, ErrorKind, ErrorType, NoAcknowledgeSource, Operation};
    use esp_idf_hal::delay::TickType;
    use esp_idf_hal::gpio::AnyIOPin;
    use esp_idf_hal::i2c::{I2c as EspI2cPeripheral, I2cConfig, I2cDriver};
    use esp_idf_hal::peripheral::Peripheral;
    use esp_idf_hal::units::Hertz;
    use esp_idf_svc::sys::{ESP_ERR_TIMEOUT, ESP_FAIL, EspError, TickType_t, esp_err_t};
    use log::info;

    use crate::config::PackBusConfig;

    /// Driver error carrying the raw ESP-IDF code.
    #[derive(Debug)]
    pub struct EspBusError(pub EspError);

    impl core::fmt::Display for EspBusError {
        fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
            write!(f, "I2C error {}", self.0)
        }
    }

    impl i2c::Error for EspBusError {
        fn kind(&self) -> ErrorKind {
            let code = self.0.code();
            // The legacy driver reports a missing ACK as a generic failure.
            if code == ESP_FAIL as esp_err_t {
                ErrorKind::NoAcknowledge(NoAcknowledgeSource::Unknown)
            } else if code == ESP_ERR_TIMEOUT as esp_err_t {
                ErrorKind::Other
            } else {
                ErrorKind::Bus
            }
        }
    }

    /// One gauge's bus: a dedicated controller with a bounded timeout.
    pub struct GaugeBus {
        driver: I2cDriver<'static>,
        timeout: TickType_t,
    }

    impl GaugeBus {
        pub fn open<I: EspI2cPeripheral>(
            i2c: impl Peripheral<P = I> + 'static,
            wiring: &PackBusConfig,
            clock_hz: u32,
            timeout_ms: u32,
        ) -> Result<Self, EspError> {
            // SAFETY: each GPIO is claimed by exactly one bus; the board
            // config keeps the flight and pyro pin sets disjoint.
            let (sda, scl) = unsafe {
                (
                    AnyIOPin::new(wiring.sda_gpio),
                    AnyIOPin::new(wiring.scl_gpio),
                )
            };
            let config = I2cConfig::new()
                .baudrate(Hertz(clock_hz))
                .sda_enable_pullup(false)
                .scl_enable_pullup(false);
            let driver = I2cDriver::new(i2c, sda, scl, &config)?;
            info!(
                "I2C{}: SCL={} SDA={} @ {} Hz, timeout {} ms",
                wiring.port, wiring.scl_gpio, wiring.sda_gpio, clock_hz, timeout_ms
            );
            Ok(Self {
                driver,
                timeout: TickType::new_millis(u64::from(timeout_ms)).ticks(),
            })
        }
    }

    impl ErrorType for GaugeBus {
        type Error = EspBusError;
    }

    impl i2c::I2c for GaugeBus {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            match operations {
                [Operation::Write(bytes), Operation::Read(buf)] => self
                    .driver
                    .write_read(address, bytes, buf, self.timeout)
                    .map_err(EspBusError),
                ops => {
                    for op in ops {
                        match op {
                            Operation::Write(bytes) => {
                                self.driver.write(address, bytes, self.timeout)
                            }
                            Operation::Read(buf) => self.driver.read(address, buf, self.timeout),
                        }
                        .map_err(EspBusError)?;
                    }
                    Ok(())
                }
            }
        }
    }
}
