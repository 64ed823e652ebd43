//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter       | Implements                        | Connects to            |
//! |---------------|-----------------------------------|------------------------|
//! | `console`     | AppCommand source                 | UART console (stdin)   |
//! | `hardware`    | InputPort                         | ESP32 GPIO inputs      |
//! | `log_sink`    | EventSink                         | Serial log output      |
//! | `matter_node` | AttributeStore, CommissioningPort | In-process attribute table |
//! | `time`        | Clock                             | ESP32 system timer     |

pub mod console;
pub mod hardware;
pub mod log_sink;
pub mod matter_node;
pub mod time;
