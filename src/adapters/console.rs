//! Serial console adapter: line commands typed on the UART console.
//!
//! A reader thread turns each line into an [`AppCommand`] and queues it on
//! a channel; the control loop drains the queue once per tick with
//! [`ConsoleAdapter::poll`], so commands run on the tick thread like every
//! other local request.
//!
//! ESP-IDF's console VFS reports "no data yet" as `WouldBlock`; the reader
//! backs off and keeps any partial line it already has.

use std::io::{BufRead, ErrorKind};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use log::{info, warn};

use crate::app::commands::AppCommand;

const READER_STACK_BYTES: usize = 8 * 1024;
const IDLE_BACKOFF: Duration = Duration::from_millis(50);

pub struct ConsoleAdapter {
    rx: Receiver<AppCommand>,
}

impl ConsoleAdapter {
    /// Start the reader thread over `reader` (stdin on the board).
    pub fn spawn<R: BufRead + Send + 'static>(reader: R) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("console".into())
            .stack_size(READER_STACK_BYTES)
            .spawn(move || read_commands(reader, &tx))?;
        Ok(Self { rx })
    }

    /// Next queued command. Never blocks.
    pub fn poll(&self) -> Option<AppCommand> {
        self.rx.try_recv().ok()
    }
}

fn read_commands<R: BufRead>(mut reader: R, tx: &Sender<AppCommand>) {
    let mut line = String::new();
    loop {
        match reader.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {
                let text = line.trim();
                if !text.is_empty() {
                    match text.parse::<AppCommand>() {
                        Ok(cmd) => {
                            info!("console: {:?}", cmd);
                            if tx.send(cmd).is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!("console: {} ({:?})", e, text),
                    }
                }
                line.clear();
            }
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => {
                thread::sleep(IDLE_BACKOFF);
            }
            Err(e) => {
                warn!("console: read failed: {}", e);
                break;
            }
        }
    }
    info!("console: input closed");
}
