//! Output sinks - where encoded frames go.
//!
//! The render thread never writes to the terminal itself. Finished byte
//! batches are handed to a sink:
//!
//! - [`TerminalWriter`] - dedicated writer thread, frames written in order,
//!   never dropped
//! - [`MemorySink`] - keeps frames in memory for headless use and tests

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

use crate::error::{Result, TuiError};

/// Receives finished frames in the order they were rendered.
pub trait OutputSink {
    fn submit(&mut self, frame: Vec<u8>) -> Result<()>;

    /// Block until every submitted frame is out. No frames may follow.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

// =============================================================================
// TerminalWriter
// =============================================================================

/// Dedicated stdout writer thread.
pub struct TerminalWriter {
    tx: Option<Sender<Vec<u8>>>,
    handle: Option<JoinHandle<io::Result<()>>>,
}

impl TerminalWriter {
    pub fn spawn() -> Result<Self> {
        Self::spawn_with(io::stdout)
    }

    /// Spawn a writer thread over the writer produced by `open`.
    pub fn spawn_with<W, F>(open: F) -> Result<Self>
    where
        W: Write,
        F: FnOnce() -> W + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<Vec<u8>>();
        let handle = thread::Builder::new()
            .name("ember-writer".to_string())
            .spawn(move || {
                let mut out = open();
                for frame in rx {
                    out.write_all(&frame)?;
                    out.flush()?;
                }
                Ok(())
            })
            .map_err(|source| TuiError::Thread {
                name: "ember-writer",
                source,
            })?;

        Ok(Self {
            tx: Some(tx),
            handle: Some(handle),
        })
    }

    /// Close the queue and wait until every submitted frame is written.
    pub fn finish(&mut self) -> Result<()> {
        self.tx.take();
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        match handle.join() {
            Ok(result) => result.map_err(TuiError::from),
            Err(_) => Err(TuiError::Terminal(io::Error::other("writer thread panicked"))),
        }
    }
}

impl OutputSink for TerminalWriter {
    fn submit(&mut self, frame: Vec<u8>) -> Result<()> {
        let sent = self.tx.as_ref().is_some_and(|tx| tx.send(frame).is_ok());
        if sent {
            return Ok(());
        }
        // The thread only hangs up after a write error; surface it.
        self.finish()?;
        Err(TuiError::Terminal(io::Error::new(
            io::ErrorKind::BrokenPipe,
            "terminal writer closed",
        )))
    }

    fn close(&mut self) -> Result<()> {
        self.finish()
    }
}

impl Drop for TerminalWriter {
    fn drop(&mut self) {
        if let Err(err) = self.finish() {
            tracing::warn!(error = %err, "terminal writer failed");
        }
    }
}

// =============================================================================
// MemorySink
// =============================================================================

/// Frames kept in memory. Clones share the same frame list.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    frames: Rc<RefCell<Vec<Vec<u8>>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame_count(&self) -> usize {
        self.frames.borrow().len()
    }

    /// The most recent frame, lossily decoded.
    pub fn last_frame(&self) -> Option<String> {
        self.frames
            .borrow()
            .last()
            .map(|frame| String::from_utf8_lossy(frame).into_owned())
    }

    /// Remove and return every frame collected so far.
    pub fn take(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut *self.frames.borrow_mut())
    }
}

impl OutputSink for MemorySink {
    fn submit(&mut self, frame: Vec<u8>) -> Result<()> {
        self.frames.borrow_mut().push(frame);
        Ok(())
    }
}
