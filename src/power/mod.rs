//! Power controller: both fuel gauges plus the arm interlock.
//!
//! Each pack's driver and the interlock sit behind their own mutex, so
//! methods take `&self` and a telemetry poller can share the controller
//! with a command handler.  A pack's lock is held for the whole operation,
//! including multi-step provisioning and reset sequences; the two packs
//! never wait on each other.

pub mod interlock;

use std::sync::{Mutex, MutexGuard, PoisonError};

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::i2c::I2c;
use log::{info, warn};

use crate::app::commands::PowerCommand;
use crate::app::events::PowerEvent;
use crate::app::ports::{EventSink, StoragePort};
use crate::config::{BoardConfig, ProvisioningProfile};
use crate::error::Result;
use crate::gauge::{
    BatterySnapshot, FuelGauge, GaugeIdentity, GaugeState, NvWriteHistory, Pack, ProvisionOutcome,
};
pub use interlock::ArmInterlock;

pub struct PowerController<I, D, P, S> {
    flight: Mutex<FuelGauge<I, D>>,
    pyro: Mutex<FuelGauge<I, D>>,
    interlock: Mutex<ArmInterlock<P, S>>,
    profile: ProvisioningProfile,
    reset_max_polls: u32,
}

impl<I, D, P, S> PowerController<I, D, P, S>
where
    I: I2c,
    D: DelayNs,
    P: OutputPin,
    S: StoragePort,
{
    pub fn new(
        flight: FuelGauge<I, D>,
        pyro: FuelGauge<I, D>,
        interlock: ArmInterlock<P, S>,
        config: &BoardConfig,
    ) -> Self {
        Self {
            flight: Mutex::new(flight),
            pyro: Mutex::new(pyro),
            interlock: Mutex::new(interlock),
            profile: config.provisioning,
            reset_max_polls: config.reset_max_polls,
        }
    }

    /// Bring up Flight, then Pyro.  A board with one dead gauge is not
    /// operable, so the first failure aborts.
    pub fn initialize(&self) -> Result<()> {
        for pack in Pack::ALL {
            self.gauge(pack).bring_up()?;
        }
        info!("power controller initialised");
        Ok(())
    }

    pub fn snapshot(&self, pack: Pack) -> Result<BatterySnapshot> {
        self.gauge(pack).snapshot()
    }

    /// Snapshot both packs, Flight first.
    pub fn snapshot_all(&self) -> Result<[(Pack, BatterySnapshot); 2]> {
        Ok([
            (Pack::Flight, self.snapshot(Pack::Flight)?),
            (Pack::Pyro, self.snapshot(Pack::Pyro)?),
        ])
    }

    pub fn gauge_state(&self, pack: Pack) -> GaugeState {
        self.gauge(pack).state()
    }

    pub fn arm(&self) -> Result<()> {
        self.interlock().arm()
    }

    pub fn disarm(&self) -> Result<()> {
        self.interlock().disarm()
    }

    pub fn is_armed(&self) -> bool {
        self.interlock().is_armed()
    }

    pub fn is_durable(&self) -> bool {
        self.interlock().is_durable()
    }

    pub fn retry_persist(&self) -> Result<()> {
        self.interlock().retry_persist()
    }

    pub fn provision(&self, pack: Pack) -> Result<ProvisionOutcome> {
        self.gauge(pack).provision(&self.profile)
    }

    pub fn write_history(&self, pack: Pack) -> Result<NvWriteHistory> {
        self.gauge(pack).write_history()
    }

    /// Reset a pack's gauge and bring it back up, all under one lock.
    pub fn hard_reset(&self, pack: Pack, max_polls: u32) -> Result<GaugeIdentity> {
        let mut gauge = self.gauge(pack);
        gauge.hard_reset(max_polls)?;
        gauge.bring_up()
    }

    /// Apply an operator command and report the outcome through `sink`.
    pub fn handle_command<E: EventSink>(&self, cmd: PowerCommand, sink: &mut E) -> Result<()> {
        let (pack, result) = match cmd {
            PowerCommand::Arm => (None, self.transition(ArmInterlock::arm)),
            PowerCommand::Disarm => (None, self.transition(ArmInterlock::disarm)),
            PowerCommand::Provision(pack) => (
                Some(pack),
                self.provision(pack)
                    .map(|outcome| PowerEvent::Provisioned { pack, outcome }),
            ),
            PowerCommand::ReadWriteHistory(pack) => (
                Some(pack),
                self.write_history(pack)
                    .map(|history| PowerEvent::WriteHistory { pack, history }),
            ),
            PowerCommand::HardReset(pack) => (
                Some(pack),
                self.hard_reset(pack, self.reset_max_polls)
                    .map(|_| PowerEvent::GaugeReset(pack)),
            ),
        };

        match result {
            Ok(event) => {
                sink.emit(&event);
                Ok(())
            }
            Err(error) => {
                warn!("command {:?} failed: {}", cmd, error);
                sink.emit(&PowerEvent::CommandFailed { pack, error });
                Err(error)
            }
        }
    }

    /// Read both packs and emit one telemetry event per pack that answered.
    pub fn publish_telemetry<E: EventSink>(&self, sink: &mut E) {
        for pack in Pack::ALL {
            match self.snapshot(pack) {
                Ok(snapshot) => sink.emit(&PowerEvent::Telemetry { pack, snapshot }),
                Err(error) => {
                    warn!("[{}] telemetry failed: {}", pack, error);
                    sink.emit(&PowerEvent::CommandFailed {
                        pack: Some(pack),
                        error,
                    });
                }
            }
        }
    }

    /// Apply an interlock transition and read back the resulting state
    /// under the same lock.
    fn transition(&self, apply: fn(&mut ArmInterlock<P, S>) -> Result<()>) -> Result<PowerEvent> {
        let mut interlock = self.interlock();
        apply(&mut *interlock)?;
        Ok(PowerEvent::ArmStateChanged {
            armed: interlock.is_armed(),
            durable: interlock.is_durable(),
        })
    }

    fn gauge(&self, pack: Pack) -> MutexGuard<'_, FuelGauge<I, D>> {
        let slot = match pack {
            Pack::Flight => &self.flight,
            Pack::Pyro => &self.pyro,
        };
        slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn interlock(&self) -> MutexGuard<'_, ArmInterlock<P, S>> {
        self.interlock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
