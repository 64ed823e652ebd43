//! Application service: the per-tick control loop.
//!
//! [`AppService`] owns the commissioning tracker and the button gesture
//! driver, and drives the shared [`FanController`]. All I/O flows through
//! port traits passed in at each call, so the whole loop runs on the host
//! against mock adapters.
//!
//! ```text
//!  InputPort ─────────▶ ┌──────────────────────────────┐ ──▶ EventSink
//!  CommissioningPort ──▶│          AppService          │
//!                       │ tracker · button · fan ticks │
//!                       └──────────────┬───────────────┘
//!                                      ▼
//!                         Arc<FanController> ◀── Matter writes
//! ```

use std::sync::Arc;

use embedded_hal::digital::OutputPin;
use log::{debug, info, warn};

use crate::config::FanConfig;
use crate::control::ObserveOutcome;
use crate::control::oscillation::OscillationTick;
use crate::control::speed::SpeedTick;
use crate::drivers::button::{ButtonDriver, ButtonEvent};
use crate::drivers::inputs::InputSnapshot;
use crate::fsm::context::CommissioningContext;
use crate::fsm::states::build_phase_table;
use crate::fsm::{CommissioningFsm, CommissioningPhase};

use super::commands::AppCommand;
use super::events::AppEvent;
use super::fan::FanController;
use super::ports::{CommissioningPort, EventSink, InputPort};

pub struct AppService<S: OutputPin, O: OutputPin> {
    fan: Arc<FanController<S, O>>,
    fsm: CommissioningFsm,
    ctx: CommissioningContext,
    button: ButtonDriver,
    button_cycles_speed: bool,
    status_interval_ms: u32,
    last_status_ms: u32,
}

impl<S: OutputPin, O: OutputPin> AppService<S, O> {
    /// Does not start the tracker; call [`start`](Self::start) next.
    pub fn new(config: &FanConfig, fan: Arc<FanController<S, O>>) -> Self {
        Self {
            fan,
            fsm: CommissioningFsm::new(build_phase_table(), CommissioningPhase::NotStarted),
            ctx: CommissioningContext::new(config.commissioning_reminder_ms),
            button: ButtonDriver::new(config.button_debounce_ms, config.decommission_hold_ms),
            button_cycles_speed: config.button_cycles_speed,
            status_interval_ms: config.status_interval_ms,
            last_status_ms: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Start the tracker. A device that already holds a fabric skips the
    /// pairing announcement and goes straight to the one-time sync.
    pub fn start(
        &mut self,
        now_ms: u32,
        commissioning: &impl CommissioningPort,
        sink: &mut impl EventSink,
    ) {
        self.ctx.now_ms = now_ms;
        self.ctx.commissioned = commissioning.is_commissioned();
        self.last_status_ms = now_ms;
        self.fsm.start(&mut self.ctx);
        if self.ctx.commissioned {
            self.fsm
                .force_transition(CommissioningPhase::JustCompleted, &mut self.ctx);
        }
        let phase = self.fsm.phase();
        sink.emit(&AppEvent::Started(phase));
        info!("AppService started in {:?}", phase);
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// One control cycle: sample inputs, advance the tracker, carry out its
    /// actions, then run the fan machinery if commissioning is done.
    pub fn tick(
        &mut self,
        now_ms: u32,
        inputs: &mut impl InputPort,
        commissioning: &impl CommissioningPort,
        sink: &mut impl EventSink,
    ) {
        let snapshot = inputs.read_inputs();

        // 1. Commissioning tracker
        self.ctx.now_ms = now_ms;
        self.ctx.commissioned = commissioning.is_commissioned();
        if let Some((from, to)) = self.fsm.tick(&mut self.ctx) {
            sink.emit(&AppEvent::PhaseChanged { from, to });
            if to == CommissioningPhase::Done {
                self.last_status_ms = now_ms;
            }
        }

        // 2. Tracker side effects
        let actions = self.ctx.take_actions();
        if actions.announce_pairing {
            sink.emit(&AppEvent::PairingInstructions {
                manual_code: commissioning.manual_pairing_code(),
                qr_url: commissioning.qr_code_url(),
            });
        }
        if actions.remind {
            sink.emit(&AppEvent::PairingReminder {
                manual_code: commissioning.manual_pairing_code(),
            });
        }

        // 3. Phase work. Outside Done no pulse may start, but one already
        //    on the wire is always carried to completion.
        match self.fsm.phase() {
            CommissioningPhase::Done => self.run_fan(now_ms, &snapshot, sink),
            CommissioningPhase::JustCompleted if self.ctx.sync_pending() => {
                self.finish_pulses(now_ms, sink);
                self.run_sync(&snapshot, sink);
            }
            _ => self.finish_pulses(now_ms, sink),
        }

        // 4. Button: sampled always, acted on only once commissioned
        if let Some(event) = self.button.tick(now_ms, snapshot.button_pressed) {
            if self.fsm.phase() == CommissioningPhase::Done {
                self.on_button(event, commissioning, sink);
            } else {
                debug!("button {:?} ignored in {}", event, self.fsm.phase_name());
            }
        }
    }

    // ── Command handling ──────────────────────────────────────

    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        commissioning: &impl CommissioningPort,
        sink: &mut impl EventSink,
    ) {
        match cmd {
            AppCommand::RequestSpeed(level) => {
                if let Err(e) = self.fan.set_speed(level) {
                    warn!("speed command: {}", e);
                }
            }
            AppCommand::RequestOscillation(on) => {
                if let Err(e) = self.fan.set_oscillation(on) {
                    warn!("oscillation command: {}", e);
                }
            }
            AppCommand::CycleSpeed => self.cycle_speed(sink),
            AppCommand::Decommission => self.decommission(commissioning, sink),
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn phase(&self) -> CommissioningPhase {
        self.fsm.phase()
    }

    pub fn tick_count(&self) -> u64 {
        self.fsm.tick_count()
    }

    pub fn fan(&self) -> &Arc<FanController<S, O>> {
        &self.fan
    }

    // ── Internal ──────────────────────────────────────────────

    fn run_sync(&mut self, snapshot: &InputSnapshot, sink: &mut impl EventSink) {
        match self.fan.sync_after_commissioning(snapshot) {
            Ok(report) => {
                self.ctx.mark_synced();
                info!(
                    "sync: speed={} oscillating={} physical_override={}",
                    report.speed, report.oscillating, report.physical_override
                );
                sink.emit(&AppEvent::StateSynced(report));
            }
            Err(e) => debug!("sync deferred: {}", e),
        }
    }

    fn run_fan(&mut self, now_ms: u32, snapshot: &InputSnapshot, sink: &mut impl EventSink) {
        if let SpeedTick::Settled { current } = self.fan.advance_speed(now_ms) {
            sink.emit(&AppEvent::SpeedSettled(current));
        }
        if let OscillationTick::Toggled { current } = self.fan.advance_oscillation(now_ms) {
            sink.emit(&AppEvent::OscillationToggled(current));
        }

        if let Some(level) = snapshot.speed_level {
            if self.fan.observe_physical_speed(level) == ObserveOutcome::Applied {
                sink.emit(&AppEvent::PhysicalSpeedObserved(level));
            }
        }
        if let Some(on) = snapshot.oscillation_on {
            if self.fan.observe_physical_oscillation(on) == ObserveOutcome::Applied {
                sink.emit(&AppEvent::PhysicalOscillationObserved(on));
            }
        }

        if now_ms.wrapping_sub(self.last_status_ms) >= self.status_interval_ms {
            match self.fan.status() {
                Some(status) => {
                    self.last_status_ms = now_ms;
                    sink.emit(&AppEvent::Status(status));
                }
                None => debug!("status deferred: fan state locked"),
            }
        }
    }

    fn finish_pulses(&mut self, now_ms: u32, sink: &mut impl EventSink) {
        if let SpeedTick::Settled { current } = self.fan.finish_speed_pulse(now_ms) {
            sink.emit(&AppEvent::SpeedSettled(current));
        }
        if let OscillationTick::Toggled { current } = self.fan.finish_oscillation_pulse(now_ms) {
            sink.emit(&AppEvent::OscillationToggled(current));
        }
    }

    fn on_button(
        &mut self,
        event: ButtonEvent,
        commissioning: &impl CommissioningPort,
        sink: &mut impl EventSink,
    ) {
        match event {
            ButtonEvent::LongPress => self.decommission(commissioning, sink),
            ButtonEvent::ShortPress if self.button_cycles_speed => self.cycle_speed(sink),
            ButtonEvent::ShortPress => debug!("button: speed cycling disabled"),
        }
    }

    fn cycle_speed(&mut self, sink: &mut impl EventSink) {
        match self.fan.cycle_speed() {
            Ok(next) => sink.emit(&AppEvent::SpeedCycled(next)),
            Err(e) => warn!("speed cycle: {}", e),
        }
    }

    /// Fan off through the normal request paths, SpeedSetting and
    /// RockSetting included, then drop all fabrics. Pulses this opens are
    /// finished by the ticks that follow whatever the phase.
    fn decommission(&mut self, commissioning: &impl CommissioningPort, sink: &mut impl EventSink) {
        warn!("decommissioning: turning fan off and removing fabrics");
        if let Err(e) = self.fan.set_speed(0) {
            warn!("decommission: speed off {}", e);
        }
        if self.fan.has_oscillation() {
            if let Err(e) = self.fan.set_oscillation(false) {
                warn!("decommission: oscillation off {}", e);
            }
        }
        commissioning.decommission();
        sink.emit(&AppEvent::Decommissioned);
    }
}
