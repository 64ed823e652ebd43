//! Mock hardware and Matter collaborators for integration tests.
//!
//! Pins record every level written, inputs and time are set by the test,
//! and the commissioning mock can sample fan state at the moment
//! `decommission()` is called.

use std::cell::{Cell, RefCell};
use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use embedded_hal::digital::{ErrorType, OutputPin};
use parking_lot::Mutex;

use smartfan::adapters::matter_node::MatterNode;
use smartfan::app::events::AppEvent;
use smartfan::app::fan::FanController;
use smartfan::app::fan_cluster::{CLUSTER_ID, FanAttributes, FanEndpoint};
use smartfan::app::ports::{
    AttrValue, AttributePath, AttributeStore, Clock, CommissioningPort, EventSink, InputPort,
    PairingCode, QrCodeUrl,
};
use smartfan::app::service::AppService;
use smartfan::config::FanConfig;
use smartfan::drivers::inputs::InputSnapshot;

// ── Output pin ────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MockPin {
    levels: Arc<Mutex<Vec<bool>>>,
}

#[allow(dead_code)]
impl MockPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_high(&self) -> bool {
        self.levels.lock().last().copied().unwrap_or(false)
    }

    pub fn pulses(&self) -> usize {
        let levels = self.levels.lock();
        let mut prev = false;
        let mut count = 0;
        for &level in levels.iter() {
            if level && !prev {
                count += 1;
            }
            prev = level;
        }
        count
    }
}

impl ErrorType for MockPin {
    type Error = Infallible;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.levels.lock().push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.levels.lock().push(true);
        Ok(())
    }
}

// ── Inputs ────────────────────────────────────────────────────

/// Input port whose snapshot the test writes directly.
#[derive(Default)]
pub struct ScriptedInputs {
    pub snapshot: InputSnapshot,
}

impl InputPort for ScriptedInputs {
    fn read_inputs(&mut self) -> InputSnapshot {
        self.snapshot
    }
}

// ── Clock ─────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct ManualClock(Arc<AtomicU32>);

impl ManualClock {
    pub fn set(&self, now_ms: u32) {
        self.0.store(now_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }
}

// ── Commissioning ─────────────────────────────────────────────

pub struct MockCommissioning {
    commissioned: Cell<bool>,
    pub decommission_calls: Cell<u32>,
    /// Evaluated inside `decommission()`; result kept in `hook_result`.
    hook: RefCell<Option<Box<dyn Fn() -> u8>>>,
    pub hook_result: Cell<Option<u8>>,
}

#[allow(dead_code)]
impl MockCommissioning {
    pub fn new(commissioned: bool) -> Self {
        Self {
            commissioned: Cell::new(commissioned),
            decommission_calls: Cell::new(0),
            hook: RefCell::new(None),
            hook_result: Cell::new(None),
        }
    }

    pub fn set_commissioned(&self, commissioned: bool) {
        self.commissioned.set(commissioned);
    }

    pub fn set_decommission_hook(&self, hook: impl Fn() -> u8 + 'static) {
        *self.hook.borrow_mut() = Some(Box::new(hook));
    }
}

impl CommissioningPort for MockCommissioning {
    fn is_commissioned(&self) -> bool {
        self.commissioned.get()
    }

    fn decommission(&self) {
        if let Some(hook) = self.hook.borrow().as_ref() {
            self.hook_result.set(Some(hook()));
        }
        self.decommission_calls.set(self.decommission_calls.get() + 1);
        self.commissioned.set(false);
    }

    fn manual_pairing_code(&self) -> PairingCode {
        PairingCode::try_from("34970112332").unwrap()
    }

    fn qr_code_url(&self) -> QrCodeUrl {
        QrCodeUrl::try_from("MT:Y.K9042C00KA0648G00").unwrap()
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn contains(&self, event: &AppEvent) -> bool {
        self.events.contains(event)
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Rig ───────────────────────────────────────────────────────

pub type TestFan = FanController<MockPin, MockPin>;

/// A fully wired fan: node, endpoint, controller and service.
pub struct Rig {
    pub config: FanConfig,
    pub node: Arc<MatterNode>,
    pub fan: Arc<TestFan>,
    pub app: AppService<MockPin, MockPin>,
    pub speed_pin: MockPin,
    pub osc_pin: MockPin,
    pub inputs: ScriptedInputs,
    pub clock: ManualClock,
    pub sink: RecordingSink,
    pub now_ms: u32,
}

#[allow(dead_code)]
impl Rig {
    pub fn new(config: FanConfig) -> Self {
        let node = Arc::new(MatterNode::with_test_credentials());
        let store: Arc<dyn AttributeStore> = node.clone();
        let attrs = FanAttributes::new(store, &config);
        attrs.install();

        let clock = ManualClock::default();
        let speed_pin = MockPin::new();
        let osc_pin = MockPin::new();
        let fan = Arc::new(FanController::new(
            &config,
            speed_pin.clone(),
            Some(osc_pin.clone()),
            attrs.clone(),
            Arc::new(clock.clone()),
        ));
        node.set_write_handler(Arc::new(FanEndpoint::new(attrs, fan.clone(), fan.clone())));
        let app = AppService::new(&config, fan.clone());

        Self {
            config,
            node,
            fan,
            app,
            speed_pin,
            osc_pin,
            inputs: ScriptedInputs::default(),
            clock,
            sink: RecordingSink::default(),
            now_ms: 0,
        }
    }

    pub fn start(&mut self, commissioning: &impl CommissioningPort) {
        self.clock.set(self.now_ms);
        self.app.start(self.now_ms, commissioning, &mut self.sink);
    }

    /// Advance time by one control interval and tick once.
    pub fn step(&mut self, commissioning: &impl CommissioningPort) {
        self.now_ms = self.now_ms.wrapping_add(self.config.control_loop_interval_ms);
        self.clock.set(self.now_ms);
        self.app
            .tick(self.now_ms, &mut self.inputs, commissioning, &mut self.sink);
    }

    /// Tick for `ms` milliseconds of simulated time.
    pub fn run_for(&mut self, ms: u32, commissioning: &impl CommissioningPort) {
        let steps = ms / self.config.control_loop_interval_ms;
        for _ in 0..steps {
            self.step(commissioning);
        }
    }

    pub fn path(&self, attribute: u32) -> AttributePath {
        AttributePath::new(self.config.fan_endpoint_id, CLUSTER_ID, attribute)
    }

    /// Controller write through the node's pre-update callback.
    pub fn write(&self, attribute: u32, value: AttrValue) -> Option<AttrValue> {
        self.node.write_attribute(self.path(attribute), value).ok()
    }

    pub fn read(&self, attribute: u32) -> Option<AttrValue> {
        self.node.read_attribute(self.path(attribute))
    }
}
