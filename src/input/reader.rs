//! stdin reader for raw terminal input.
//!
//! Reads raw bytes from stdin in a dedicated thread and pushes them into the
//! router's bounded queue. The thread never decodes anything; a full queue
//! blocks the reader, not the render thread.

use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::SyncSender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::error::{Result, TuiError};

/// What the reader thread sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMessage {
    /// Raw bytes from stdin.
    Data(Vec<u8>),
    /// stdin closed or failed.
    Closed,
}

/// Dedicated stdin reader thread.
pub struct StdinReader {
    handle: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
}

impl StdinReader {
    pub fn spawn(tx: SyncSender<InputMessage>) -> Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();

        let handle = thread::Builder::new()
            .name("ember-stdin".to_string())
            .spawn(move || Self::read_loop(running_clone, tx))
            .map_err(|source| TuiError::Thread {
                name: "ember-stdin",
                source,
            })?;

        Ok(Self {
            handle: Some(handle),
            running,
        })
    }

    fn read_loop(running: Arc<AtomicBool>, tx: SyncSender<InputMessage>) {
        let stdin = io::stdin();
        let mut buf = [0u8; 256];

        while running.load(Ordering::SeqCst) {
            match stdin.lock().read(&mut buf) {
                Ok(0) => {
                    let _ = tx.send(InputMessage::Closed);
                    break;
                }
                Ok(n) => {
                    if tx.send(InputMessage::Data(buf[..n].to_vec())).is_err() {
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::warn!(error = %e, "stdin read failed");
                    let _ = tx.send(InputMessage::Closed);
                    break;
                }
            }
        }
    }

    /// Ask the thread to stop.
    ///
    /// The thread may be parked in `read`; it exits on the next byte, when
    /// stdin closes or with the process. It is never joined.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.handle.take();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for StdinReader {
    fn drop(&mut self) {
        self.stop();
    }
}
