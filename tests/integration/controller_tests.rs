//! PowerController: both packs plus the interlock, driven through commands.

use crate::mock_hw::{FakeGauge, LogSink, MockDelay, MockNvs, MockPin};

use powerboard::app::commands::PowerCommand;
use powerboard::app::events::PowerEvent;
use powerboard::app::report;
use powerboard::config::BoardConfig;
use powerboard::gauge::registers::{
    AVG_CURRENT, CMD_COPY_NV, COMMAND, DEV_NAME, FULL_CAP_REP, N_ICHG_CFG, N_ODSC_TH, N_PACK_CFG,
};
use powerboard::gauge::{FuelGauge, GaugeState, NvWriteHistory, Pack, ProvisionOutcome};
use powerboard::power::{ArmInterlock, PowerController};
use powerboard::{Error, app::ports::StorageError};

type Controller = PowerController<FakeGauge, MockDelay, MockPin, MockNvs>;

struct Rig {
    ctl: Controller,
    flight: FakeGauge,
    pyro: FakeGauge,
    pin: MockPin,
    nvs: MockNvs,
}

fn rig_with(flight: FakeGauge, pyro: FakeGauge, config: &BoardConfig) -> Rig {
    let pin = MockPin::default();
    let nvs = MockNvs::default();
    let interlock = ArmInterlock::restore(pin.clone(), nvs.clone()).unwrap();
    let ctl = PowerController::new(
        FuelGauge::new(
            Pack::Flight,
            flight.clone(),
            MockDelay::default(),
            config.charging_threshold_ma,
        ),
        FuelGauge::new(
            Pack::Pyro,
            pyro.clone(),
            MockDelay::default(),
            config.charging_threshold_ma,
        ),
        interlock,
        config,
    );
    Rig {
        ctl,
        flight,
        pyro,
        pin,
        nvs,
    }
}

fn board_config() -> BoardConfig {
    let mut config = BoardConfig::default();
    config.provisioning.overdischarge_threshold = Some(0x0A00);
    config
}

fn ready_rig() -> Rig {
    let rig = rig_with(FakeGauge::healthy(), FakeGauge::healthy(), &board_config());
    rig.ctl.initialize().unwrap();
    rig
}

// ── Initialisation ────────────────────────────────────────────

#[test]
fn initialize_brings_up_both_packs() {
    let rig = ready_rig();
    assert_eq!(rig.ctl.gauge_state(Pack::Flight), GaugeState::Ready);
    assert_eq!(rig.ctl.gauge_state(Pack::Pyro), GaugeState::Ready);
    assert!(!rig.ctl.is_armed());
}

#[test]
fn initialize_fails_when_either_pack_fails() {
    let pyro = FakeGauge::healthy();
    pyro.set(DEV_NAME.addr, 0xBEEF);
    let rig = rig_with(FakeGauge::healthy(), pyro, &BoardConfig::default());

    assert_eq!(
        rig.ctl.initialize(),
        Err(Error::IdentityMismatch { found: 0xBEEF })
    );
    assert_eq!(rig.ctl.gauge_state(Pack::Flight), GaugeState::Ready);
    assert_eq!(rig.ctl.gauge_state(Pack::Pyro), GaugeState::Faulted);
}

// ── Telemetry ─────────────────────────────────────────────────

#[test]
fn packs_report_independently() {
    let rig = ready_rig();
    rig.pyro.set(FULL_CAP_REP.addr, 0x0C80); // 1600 mAh

    assert_eq!(rig.ctl.snapshot(Pack::Flight).unwrap().max_capacity_mah, 800.0);
    assert_eq!(rig.ctl.snapshot(Pack::Pyro).unwrap().max_capacity_mah, 1600.0);
}

#[test]
fn charging_threshold_comes_from_config() {
    let config = BoardConfig {
        charging_threshold_ma: 50.0,
        ..Default::default()
    };
    let rig = rig_with(FakeGauge::healthy(), FakeGauge::healthy(), &config);
    rig.ctl.initialize().unwrap();
    rig.flight.set(AVG_CURRENT.addr, 0x0100); // 40 mA

    assert!(!rig.ctl.snapshot(Pack::Flight).unwrap().charging);
}

#[test]
fn publish_telemetry_emits_per_pack() {
    let rig = ready_rig();
    rig.pyro.set_offline(true);
    let mut sink = LogSink::new();

    rig.ctl.publish_telemetry(&mut sink);

    assert_eq!(sink.events.len(), 2);
    assert!(matches!(
        sink.events[0],
        PowerEvent::Telemetry {
            pack: Pack::Flight,
            ..
        }
    ));
    assert!(matches!(
        sink.events[1],
        PowerEvent::CommandFailed {
            pack: Some(Pack::Pyro),
            error: Error::TelemetryRead { .. },
        }
    ));
}

#[test]
fn battery_report_lists_both_packs() {
    let rig = ready_rig();
    let json = report::battery_json(&rig.ctl.snapshot_all().unwrap()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value[0]["pack"].as_str(), Some("flight"));
    assert_eq!(value[1]["pack"].as_str(), Some("pyro"));
    assert_eq!(value[1]["curr_cap"].as_f64(), Some(400.0));
}

// ── Commands ──────────────────────────────────────────────────

#[test]
fn arm_command_drives_pin_and_persists() {
    let rig = ready_rig();
    let mut sink = LogSink::new();

    rig.ctl.handle_command(PowerCommand::Arm, &mut sink).unwrap();

    assert!(rig.ctl.is_armed());
    assert_eq!(rig.pin.level(), Some(true));
    assert_eq!(rig.nvs.get("powerboard", "armed"), Some(vec![1]));
    assert_eq!(
        sink.events,
        vec![PowerEvent::ArmStateChanged {
            armed: true,
            durable: true,
        }]
    );
    assert_eq!(
        report::arm_status_json(rig.ctl.is_armed()).unwrap(),
        r#"{"armed":true}"#
    );
}

#[test]
fn arm_with_failed_persistence_reports_and_recovers() {
    let rig = ready_rig();
    let mut sink = LogSink::new();
    rig.nvs.set_fail_writes(true);

    let err = rig
        .ctl
        .handle_command(PowerCommand::Arm, &mut sink)
        .unwrap_err();
    let expected = Error::Persistence {
        armed: true,
        cause: StorageError::IoError,
    };
    assert_eq!(err, expected);
    assert!(rig.ctl.is_armed());
    assert!(!rig.ctl.is_durable());
    assert_eq!(
        sink.events,
        vec![PowerEvent::CommandFailed {
            pack: None,
            error: expected,
        }]
    );

    rig.nvs.set_fail_writes(false);
    rig.ctl.retry_persist().unwrap();
    assert!(rig.ctl.is_durable());
    assert_eq!(rig.nvs.get("powerboard", "armed"), Some(vec![1]));
}

#[test]
fn disarm_command_after_arm() {
    let rig = ready_rig();
    let mut sink = LogSink::new();
    rig.ctl.arm().unwrap();

    rig.ctl
        .handle_command(PowerCommand::Disarm, &mut sink)
        .unwrap();
    assert!(!rig.ctl.is_armed());
    assert_eq!(rig.pin.level(), Some(false));
    assert_eq!(rig.nvs.get("powerboard", "armed"), Some(vec![0]));
}

#[test]
fn provision_touches_only_the_requested_pack() {
    let rig = ready_rig();
    let mut sink = LogSink::new();
    rig.flight.clear_writes();
    rig.pyro.clear_writes();

    rig.ctl
        .handle_command(PowerCommand::Provision(Pack::Pyro), &mut sink)
        .unwrap();

    assert!(rig.flight.writes().is_empty());
    assert!(rig.pyro.writes().contains(&(COMMAND.addr, CMD_COPY_NV)));
    assert_eq!(
        sink.events,
        vec![PowerEvent::Provisioned {
            pack: Pack::Pyro,
            outcome: ProvisionOutcome::Committed {
                history: NvWriteHistory { used: 2 }
            },
        }]
    );
}

#[test]
fn provision_uses_configured_profile() {
    let config = board_config();
    let rig = rig_with(FakeGauge::healthy(), FakeGauge::healthy(), &config);
    rig.ctl.initialize().unwrap();
    let profile = config.provisioning;
    rig.flight.set(N_ICHG_CFG.addr, profile.charge_current_cfg);
    rig.flight.set(N_PACK_CFG.addr, profile.pack_cfg);
    rig.flight.set(N_ODSC_TH.addr, 0x0A00);

    assert_eq!(
        rig.ctl.provision(Pack::Flight),
        Ok(ProvisionOutcome::AlreadyProvisioned)
    );
}

#[test]
fn write_history_command() {
    let rig = ready_rig();
    let mut sink = LogSink::new();
    rig.ctl
        .handle_command(PowerCommand::ReadWriteHistory(Pack::Flight), &mut sink)
        .unwrap();
    assert_eq!(
        sink.events,
        vec![PowerEvent::WriteHistory {
            pack: Pack::Flight,
            history: NvWriteHistory { used: 2 },
        }]
    );
}

#[test]
fn hard_reset_command_brings_gauge_back() {
    let rig = ready_rig();
    rig.flight.sim().reset_busy_reads = 2;
    let mut sink = LogSink::new();

    rig.ctl
        .handle_command(PowerCommand::HardReset(Pack::Flight), &mut sink)
        .unwrap();

    assert_eq!(rig.ctl.gauge_state(Pack::Flight), GaugeState::Ready);
    assert_eq!(sink.events, vec![PowerEvent::GaugeReset(Pack::Flight)]);
}

#[test]
fn hard_reset_command_respects_poll_ceiling() {
    let config = BoardConfig {
        reset_max_polls: 5,
        ..Default::default()
    };
    let rig = rig_with(FakeGauge::healthy(), FakeGauge::healthy(), &config);
    rig.ctl.initialize().unwrap();
    rig.pyro.sim().reset_busy_reads = u32::MAX;
    let mut sink = LogSink::new();

    assert_eq!(
        rig.ctl
            .handle_command(PowerCommand::HardReset(Pack::Pyro), &mut sink),
        Err(Error::ResetTimeout { polls: 5 })
    );
    assert_eq!(rig.pyro.sim().config2_reads, 5);
}

// ── Concurrency ───────────────────────────────────────────────

#[test]
fn poller_and_command_handler_share_the_controller() {
    let rig = ready_rig();
    let ctl = &rig.ctl;

    std::thread::scope(|s| {
        s.spawn(|| {
            for _ in 0..50 {
                ctl.snapshot(Pack::Flight).unwrap();
                ctl.snapshot(Pack::Pyro).unwrap();
            }
        });
        s.spawn(|| {
            for i in 0..50 {
                if i % 2 == 0 {
                    ctl.arm().unwrap();
                } else {
                    ctl.disarm().unwrap();
                }
            }
        });
    });

    // 50 transitions, last one a disarm.
    assert!(!ctl.is_armed());
    assert_eq!(rig.pin.level(), Some(false));
    assert_eq!(rig.nvs.get("powerboard", "armed"), Some(vec![0]));
}

#[test]
fn concurrent_arm_commands_report_their_own_transition() {
    let rig = ready_rig();
    let ctl = &rig.ctl;

    let run = |cmd: PowerCommand| {
        let mut sink = LogSink::new();
        for _ in 0..100 {
            ctl.handle_command(cmd, &mut sink).unwrap();
        }
        sink.events
    };

    let (armed_events, disarmed_events) = std::thread::scope(|s| {
        let arming = s.spawn(|| run(PowerCommand::Arm));
        let disarming = s.spawn(|| run(PowerCommand::Disarm));
        (arming.join().unwrap(), disarming.join().unwrap())
    });

    assert!(armed_events.iter().all(|e| *e
        == PowerEvent::ArmStateChanged {
            armed: true,
            durable: true,
        }));
    assert!(disarmed_events.iter().all(|e| *e
        == PowerEvent::ArmStateChanged {
            armed: false,
            durable: true,
        }));
}
