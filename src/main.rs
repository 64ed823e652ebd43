//! SmartFan firmware entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  HardwareAdapter   LogEventSink   MatterNode    Esp32Time    │
//! │  (InputPort)       (EventSink)    (Attributes + (Clock)      │
//! │  ConsoleAdapter                    Commissioning)            │
//! │  (AppCommand)                                                │
//! │  ─────────────── Port Trait Boundary ─────────────────       │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │ AppService: commissioning tracker · button · fan ticks │  │
//! │  │ FanController: speed + oscillation reconcilers         │  │
//! │  │ FanEndpoint: Fan Control cluster write handler         │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::io::BufReader;
use std::sync::Arc;

use anyhow::Result;
use esp_idf_hal::delay::FreeRtos;
use log::{info, warn};

use smartfan::adapters::console::ConsoleAdapter;
use smartfan::adapters::hardware::HardwareAdapter;
use smartfan::adapters::log_sink::LogEventSink;
use smartfan::adapters::matter_node::MatterNode;
use smartfan::adapters::time::Esp32TimeAdapter;
use smartfan::app::fan::FanController;
use smartfan::app::fan_cluster::{FanAttributes, FanEndpoint};
use smartfan::app::ports::{AttributeStore, Clock};
use smartfan::app::service::AppService;
use smartfan::config::FanConfig;
use smartfan::drivers::hw_init;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  SmartFan v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let config = load_config();
    info!(
        "Config: endpoint={} SpeedMax={} RockSupport=0x{:02X} inputs={}",
        config.fan_endpoint_id, config.speed_max, config.rock_support, config.input_pin_count
    );

    // ── 3. Board ──────────────────────────────────────────────
    let board = hw_init::init_board(&config)?;
    let config = config.for_board(board.oscillation_pulse.is_some());

    // ── 4. Matter node + fan endpoint ─────────────────────────
    let clock: Arc<dyn Clock> = Arc::new(Esp32TimeAdapter::new());
    let node = Arc::new(MatterNode::with_test_credentials());
    let store: Arc<dyn AttributeStore> = node.clone();
    let attrs = FanAttributes::new(store, &config);
    attrs.install();

    let fan = Arc::new(FanController::new(
        &config,
        board.speed_pulse,
        board.oscillation_pulse,
        attrs.clone(),
        clock.clone(),
    ));
    node.set_write_handler(Arc::new(FanEndpoint::new(attrs, fan.clone(), fan.clone())));

    // ── 5. Application service ────────────────────────────────
    let mut hw = HardwareAdapter::new(board.inputs);
    let mut log_sink = LogEventSink::new();
    let mut app = AppService::new(&config, fan);
    app.start(clock.now_ms(), node.as_ref(), &mut log_sink);

    let console = match ConsoleAdapter::spawn(BufReader::new(std::io::stdin())) {
        Ok(console) => Some(console),
        Err(e) => {
            warn!("Console unavailable: {}", e);
            None
        }
    };

    info!("System ready. Entering control loop.");

    // ── 6. Control loop ───────────────────────────────────────
    loop {
        if let Some(console) = &console {
            while let Some(cmd) = console.poll() {
                app.handle_command(cmd, node.as_ref(), &mut log_sink);
            }
        }
        app.tick(clock.now_ms(), &mut hw, node.as_ref(), &mut log_sink);
        FreeRtos::delay_ms(config.control_loop_interval_ms);
    }
}

/// Build-time JSON override, falling back to defaults.
fn load_config() -> FanConfig {
    match option_env!("SMARTFAN_CONFIG_JSON") {
        Some(json) => match FanConfig::from_json(json) {
            Ok(config) => {
                info!("Config loaded from SMARTFAN_CONFIG_JSON");
                config
            }
            Err(e) => {
                warn!("SMARTFAN_CONFIG_JSON rejected ({}), using defaults", e);
                FanConfig::default()
            }
        },
        None => FanConfig::default(),
    }
}
