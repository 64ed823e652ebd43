//! End-to-end control loop tests: commissioning lifecycle, Matter writes
//! turned into pulses, physical inputs and the button.

use smartfan::app::commands::AppCommand;
use smartfan::app::events::AppEvent;
use smartfan::app::fan_cluster::{FanMode, attributes};
use smartfan::app::ports::AttrValue;
use smartfan::config::FanConfig;
use smartfan::fsm::CommissioningPhase;

use crate::mock_hw::{MockCommissioning, Rig};

fn commissioned_rig() -> (Rig, MockCommissioning) {
    let mut rig = Rig::new(FanConfig::default());
    let commissioning = MockCommissioning::new(true);
    rig.start(&commissioning);
    rig.step(&commissioning); // sync
    rig.step(&commissioning); // -> Done
    assert_eq!(rig.app.phase(), CommissioningPhase::Done);
    rig.sink.events.clear();
    (rig, commissioning)
}

// ── Commissioning lifecycle ───────────────────────────────────

#[test]
fn uncommissioned_boot_prints_pairing_once() {
    let mut rig = Rig::new(FanConfig::default());
    let commissioning = MockCommissioning::new(false);
    rig.start(&commissioning);
    assert_eq!(rig.sink.events[0], AppEvent::Started(CommissioningPhase::NotStarted));

    rig.run_for(1000, &commissioning);
    assert_eq!(rig.app.phase(), CommissioningPhase::Waiting);
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::PairingInstructions { .. })),
        1
    );
    let Some(AppEvent::PairingInstructions {
        manual_code,
        qr_url,
    }) = rig
        .sink
        .events
        .iter()
        .find(|e| matches!(e, AppEvent::PairingInstructions { .. }))
    else {
        panic!("no pairing instructions");
    };
    assert_eq!(manual_code.as_str(), "34970112332");
    assert_eq!(qr_url.as_str(), "MT:Y.K9042C00KA0648G00");
}

#[test]
fn pairing_reminder_every_five_seconds() {
    let mut rig = Rig::new(FanConfig::default());
    let commissioning = MockCommissioning::new(false);
    rig.start(&commissioning);
    rig.run_for(20_000, &commissioning);
    let reminders = rig
        .sink
        .count(|e| matches!(e, AppEvent::PairingReminder { .. }));
    assert!((3..=4).contains(&reminders), "got {reminders} reminders");
}

#[test]
fn commissioned_at_boot_syncs_then_runs() {
    let mut rig = Rig::new(FanConfig::default());
    let commissioning = MockCommissioning::new(true);
    rig.start(&commissioning);
    assert_eq!(
        rig.sink.events[0],
        AppEvent::Started(CommissioningPhase::JustCompleted)
    );
    rig.run_for(100, &commissioning);
    assert_eq!(rig.app.phase(), CommissioningPhase::Done);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::StateSynced(_))), 1);
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::PairingInstructions { .. })),
        0
    );
}

#[test]
fn waiting_to_done_syncs_exactly_once() {
    let mut rig = Rig::new(FanConfig::default());
    let commissioning = MockCommissioning::new(false);
    rig.start(&commissioning);
    rig.run_for(500, &commissioning);

    commissioning.set_commissioned(true);
    rig.run_for(500, &commissioning);

    assert_eq!(rig.app.phase(), CommissioningPhase::Done);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::StateSynced(_))), 1);
    assert!(rig.sink.contains(&AppEvent::PhaseChanged {
        from: CommissioningPhase::Waiting,
        to: CommissioningPhase::JustCompleted,
    }));
    assert!(rig.sink.contains(&AppEvent::PhaseChanged {
        from: CommissioningPhase::JustCompleted,
        to: CommissioningPhase::Done,
    }));
}

#[test]
fn sync_adopts_physical_switch_position() {
    let mut rig = Rig::new(FanConfig::default());
    let commissioning = MockCommissioning::new(false);
    rig.start(&commissioning);
    rig.run_for(100, &commissioning);

    rig.inputs.snapshot.speed_level = Some(2);
    rig.inputs.snapshot.oscillation_on = Some(true);
    commissioning.set_commissioned(true);
    rig.run_for(100, &commissioning);

    assert_eq!(rig.fan.current_speed(), 2);
    assert!(rig.fan.current_oscillation());
    assert_eq!(rig.read(attributes::SPEED_SETTING), Some(AttrValue::U8(2)));
    assert_eq!(rig.read(attributes::ROCK_SETTING), Some(AttrValue::Bitmap8(1)));
    assert_eq!(rig.speed_pin.pulses(), 0);
    assert_eq!(rig.osc_pin.pulses(), 0);
}

#[test]
fn external_decommission_restarts_pairing() {
    let (mut rig, commissioning) = commissioned_rig();
    commissioning.set_commissioned(false);
    rig.run_for(50, &commissioning);
    assert_eq!(rig.app.phase(), CommissioningPhase::Waiting);
    assert!(rig.sink.contains(&AppEvent::PhaseChanged {
        from: CommissioningPhase::Done,
        to: CommissioningPhase::NotStarted,
    }));
}

// ── Matter writes to pulses ───────────────────────────────────

#[test]
fn speed_zero_to_three_takes_three_pulses() {
    let (mut rig, commissioning) = commissioned_rig();
    assert_eq!(rig.write(attributes::SPEED_SETTING, AttrValue::U8(3)), Some(AttrValue::U8(3)));
    assert_eq!(rig.fan.expected_speed(), 3);

    rig.run_for(1500, &commissioning);
    assert_eq!(rig.speed_pin.pulses(), 3);
    assert_eq!(rig.fan.current_speed(), 3);
    assert!(!rig.fan.is_speed_pulsing());
    assert_eq!(rig.read(attributes::SPEED_CURRENT), Some(AttrValue::U8(3)));
    assert_eq!(
        rig.read(attributes::FAN_MODE),
        Some(AttrValue::Enum8(FanMode::On as u8))
    );
    assert_eq!(rig.sink.count(|e| *e == AppEvent::SpeedSettled(3)), 1);
}

#[test]
fn speed_three_to_one_wraps_through_off() {
    let (mut rig, commissioning) = commissioned_rig();
    rig.write(attributes::SPEED_SETTING, AttrValue::U8(3));
    rig.run_for(1500, &commissioning);
    let before = rig.speed_pin.pulses();

    rig.write(attributes::SPEED_SETTING, AttrValue::U8(1));
    rig.run_for(1500, &commissioning);
    assert_eq!(rig.speed_pin.pulses() - before, 2);
    assert_eq!(rig.fan.current_speed(), 1);
}

#[test]
fn repeated_write_does_not_add_pulses() {
    let (mut rig, commissioning) = commissioned_rig();
    rig.write(attributes::SPEED_SETTING, AttrValue::U8(2));
    rig.run_for(100, &commissioning);
    rig.write(attributes::SPEED_SETTING, AttrValue::U8(2));
    rig.run_for(100, &commissioning);
    rig.write(attributes::SPEED_SETTING, AttrValue::U8(2));
    rig.run_for(1500, &commissioning);
    assert_eq!(rig.speed_pin.pulses(), 2);
    assert_eq!(rig.fan.current_speed(), 2);
}

#[test]
fn no_pulses_before_commissioning_completes() {
    let mut rig = Rig::new(FanConfig::default());
    let commissioning = MockCommissioning::new(false);
    rig.start(&commissioning);
    rig.run_for(100, &commissioning);

    rig.write(attributes::SPEED_SETTING, AttrValue::U8(2));
    rig.run_for(2000, &commissioning);
    assert_eq!(rig.speed_pin.pulses(), 0);
    assert_eq!(rig.fan.current_speed(), 0);
}

#[test]
fn rock_write_toggles_oscillation() {
    let (mut rig, commissioning) = commissioned_rig();
    assert_eq!(
        rig.write(attributes::ROCK_SETTING, AttrValue::Bitmap8(0x07)),
        Some(AttrValue::Bitmap8(0x01))
    );
    assert!(rig.osc_pin.is_high());
    rig.run_for(500, &commissioning);
    assert!(!rig.osc_pin.is_high());
    assert_eq!(rig.osc_pin.pulses(), 1);
    assert!(rig.fan.current_oscillation());
    assert!(rig.sink.contains(&AppEvent::OscillationToggled(true)));
}

// ── Physical inputs ───────────────────────────────────────────

#[test]
fn physical_speed_change_is_mirrored_without_pulses() {
    let (mut rig, commissioning) = commissioned_rig();
    rig.inputs.snapshot.speed_level = Some(2);
    rig.run_for(50, &commissioning);

    assert_eq!(rig.fan.current_speed(), 2);
    assert_eq!(rig.fan.expected_speed(), 2);
    assert_eq!(rig.speed_pin.pulses(), 0);
    assert_eq!(rig.read(attributes::SPEED_SETTING), Some(AttrValue::U8(2)));
    assert_eq!(rig.read(attributes::SPEED_CURRENT), Some(AttrValue::U8(2)));
    assert_eq!(rig.sink.count(|e| *e == AppEvent::PhysicalSpeedObserved(2)), 1);
}

#[test]
fn physical_input_ignored_during_session_then_honoured() {
    let (mut rig, commissioning) = commissioned_rig();
    rig.inputs.snapshot.speed_level = Some(0);
    rig.write(attributes::SPEED_SETTING, AttrValue::U8(3));
    rig.run_for(100, &commissioning);
    assert!(rig.fan.is_speed_pulsing());

    // panel still reports 1 while the session runs
    rig.inputs.snapshot.speed_level = Some(1);
    rig.run_for(500, &commissioning);
    assert!(rig.fan.is_speed_pulsing());
    assert_eq!(rig.fan.expected_speed(), 3);

    rig.run_for(1000, &commissioning);
    assert!(!rig.fan.is_speed_pulsing());
    assert_eq!(rig.fan.current_speed(), 1);
    assert_eq!(rig.read(attributes::SPEED_SETTING), Some(AttrValue::U8(1)));
}

// ── Button ────────────────────────────────────────────────────

#[test]
fn long_hold_forces_speed_off_before_decommission() {
    let (mut rig, commissioning) = commissioned_rig();
    rig.write(attributes::SPEED_SETTING, AttrValue::U8(2));
    rig.run_for(1000, &commissioning);
    assert_eq!(rig.fan.current_speed(), 2);

    let fan = rig.fan.clone();
    commissioning.set_decommission_hook(move || fan.expected_speed());

    rig.inputs.snapshot.button_pressed = true;
    rig.run_for(5000, &commissioning);
    assert_eq!(commissioning.decommission_calls.get(), 0);
    rig.run_for(20, &commissioning);

    assert_eq!(commissioning.decommission_calls.get(), 1);
    assert_eq!(commissioning.hook_result.get(), Some(0));
    assert!(rig.sink.contains(&AppEvent::Decommissioned));
    assert!(!rig.fan.current_oscillation());

    rig.run_for(20, &commissioning);
    assert_ne!(rig.app.phase(), CommissioningPhase::Done);
}

#[test]
fn decommission_while_oscillating_leaves_pin_low() {
    let (mut rig, commissioning) = commissioned_rig();
    rig.write(attributes::ROCK_SETTING, AttrValue::Bitmap8(0x01));
    rig.run_for(500, &commissioning);
    assert!(rig.fan.current_oscillation());

    rig.inputs.snapshot.button_pressed = true;
    rig.run_for(5020, &commissioning);
    rig.inputs.snapshot.button_pressed = false;
    assert_eq!(commissioning.decommission_calls.get(), 1);

    rig.run_for(60_000, &commissioning);
    assert_eq!(rig.app.phase(), CommissioningPhase::Waiting);
    assert!(!rig.osc_pin.is_high());
    assert!(!rig.fan.is_oscillation_pulsing());
    assert!(!rig.fan.current_oscillation());
    assert_eq!(rig.osc_pin.pulses(), 2);
    assert_eq!(rig.read(attributes::ROCK_SETTING), Some(AttrValue::Bitmap8(0)));
}

#[test]
fn rock_write_before_commissioning_still_drops_pin() {
    let mut rig = Rig::new(FanConfig::default());
    let commissioning = MockCommissioning::new(false);
    rig.start(&commissioning);
    rig.run_for(100, &commissioning);

    rig.write(attributes::ROCK_SETTING, AttrValue::Bitmap8(0x01));
    assert!(rig.osc_pin.is_high());
    rig.run_for(500, &commissioning);
    assert_eq!(rig.app.phase(), CommissioningPhase::Waiting);
    assert!(!rig.osc_pin.is_high());
    assert_eq!(rig.osc_pin.pulses(), 1);
}

#[test]
fn speed_off_at_decommission_survives_re_pairing() {
    let (mut rig, commissioning) = commissioned_rig();
    rig.write(attributes::SPEED_SETTING, AttrValue::U8(2));
    rig.run_for(1000, &commissioning);
    assert_eq!(rig.fan.current_speed(), 2);

    rig.inputs.snapshot.button_pressed = true;
    rig.run_for(5020, &commissioning);
    rig.inputs.snapshot.button_pressed = false;
    assert_eq!(commissioning.decommission_calls.get(), 1);
    assert_eq!(rig.read(attributes::SPEED_SETTING), Some(AttrValue::U8(0)));

    // no pulses while unpaired
    let pulses_before = rig.speed_pin.pulses();
    rig.run_for(2000, &commissioning);
    assert_eq!(rig.speed_pin.pulses(), pulses_before);
    assert_eq!(rig.fan.current_speed(), 2);

    commissioning.set_commissioned(true);
    rig.run_for(3000, &commissioning);
    assert_eq!(rig.app.phase(), CommissioningPhase::Done);
    assert_eq!(rig.fan.current_speed(), 0);
    assert_eq!(rig.read(attributes::SPEED_SETTING), Some(AttrValue::U8(0)));
    assert_eq!(rig.read(attributes::SPEED_CURRENT), Some(AttrValue::U8(0)));
    assert_eq!(
        rig.read(attributes::FAN_MODE),
        Some(AttrValue::Enum8(FanMode::Off as u8))
    );
}

#[test]
fn short_press_cycles_speed() {
    let (mut rig, commissioning) = commissioned_rig();
    rig.inputs.snapshot.button_pressed = true;
    rig.run_for(300, &commissioning);
    rig.inputs.snapshot.button_pressed = false;
    rig.run_for(10, &commissioning);

    assert!(rig.sink.contains(&AppEvent::SpeedCycled(1)));
    assert_eq!(rig.fan.expected_speed(), 1);
    assert_eq!(rig.read(attributes::SPEED_SETTING), Some(AttrValue::U8(1)));

    rig.run_for(1000, &commissioning);
    assert_eq!(rig.fan.current_speed(), 1);
}

#[test]
fn cycle_wraps_from_max_to_off() {
    let (mut rig, commissioning) = commissioned_rig();
    rig.write(attributes::SPEED_SETTING, AttrValue::U8(3));
    rig.run_for(1500, &commissioning);
    rig.app
        .handle_command(AppCommand::CycleSpeed, &commissioning, &mut rig.sink);
    assert_eq!(rig.fan.expected_speed(), 0);
    assert_eq!(rig.read(attributes::SPEED_SETTING), Some(AttrValue::U8(0)));
}

#[test]
fn bounce_does_not_cycle() {
    let (mut rig, commissioning) = commissioned_rig();
    rig.inputs.snapshot.button_pressed = true;
    rig.run_for(100, &commissioning);
    rig.inputs.snapshot.button_pressed = false;
    rig.run_for(100, &commissioning);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::SpeedCycled(_))), 0);
}

#[test]
fn cycling_can_be_disabled() {
    let config = FanConfig {
        button_cycles_speed: false,
        ..FanConfig::default()
    };
    let mut rig = Rig::new(config);
    let commissioning = MockCommissioning::new(true);
    rig.start(&commissioning);
    rig.run_for(50, &commissioning);

    rig.inputs.snapshot.button_pressed = true;
    rig.run_for(300, &commissioning);
    rig.inputs.snapshot.button_pressed = false;
    rig.run_for(10, &commissioning);
    assert_eq!(rig.fan.expected_speed(), 0);
}

// ── Status ────────────────────────────────────────────────────

#[test]
fn status_reported_every_ten_seconds() {
    let (mut rig, commissioning) = commissioned_rig();
    rig.run_for(30_000, &commissioning);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::Status(_))), 3);
}

#[test]
fn commands_share_the_write_paths() {
    let (mut rig, commissioning) = commissioned_rig();
    rig.app
        .handle_command(AppCommand::RequestSpeed(9), &commissioning, &mut rig.sink);
    assert_eq!(rig.fan.expected_speed(), 3);
    assert_eq!(rig.read(attributes::SPEED_SETTING), Some(AttrValue::U8(3)));

    rig.app
        .handle_command(AppCommand::RequestOscillation(true), &commissioning, &mut rig.sink);
    assert!(rig.osc_pin.is_high());

    rig.app
        .handle_command(AppCommand::Decommission, &commissioning, &mut rig.sink);
    assert_eq!(commissioning.decommission_calls.get(), 1);
    assert_eq!(rig.fan.expected_speed(), 0);
}
