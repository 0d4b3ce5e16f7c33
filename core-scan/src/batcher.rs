//! Frame-window batching of raw decode events.
//!
//! A decode engine reports the same code many times per second, often several
//! times per frame. The batcher collects everything reported within one
//! window of `FRAME_WINDOW_MS` and hands it downstream as a single [`Batch`].
//!
//! The window itself is the pure state machine [`BatchWindow`]:
//!
//! ```text
//!   push            timer fires          flush delivered
//! Empty ──> Accumulating ──> Flushing ──────────────> Empty
//!              │  ^                                     │
//!              └──┘ push (append)                       │
//!                                         push ─────────┘ (opens next window)
//! ```
//!
//! [`EventBatcher`] drives it with one tokio timer task per window.

use std::mem;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::error::{Result, ScanError};

/// Raw decode events collected within one window, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Monotonically increasing per batcher, starting at 1.
    pub window_id: u64,
    pub entries: Vec<String>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of [`BatchWindow::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// A new window opened; the caller must arm its timer.
    OpenedWindow(u64),
    /// Appended to the window already open.
    Appended(u64),
    /// A flush is in progress; the entry is held for the next window, which
    /// opens when the flush completes.
    Deferred,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum WindowState {
    Empty,
    Accumulating { window_id: u64, entries: Vec<String> },
    Flushing { window_id: u64, deferred: Vec<String> },
}

/// Observable phase of a [`BatchWindow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPhase {
    Empty,
    Accumulating,
    Flushing,
}

/// Timer-free batch window. Guarantees one flush per opened window.
#[derive(Debug)]
pub struct BatchWindow {
    state: WindowState,
    last_window_id: u64,
}

impl Default for BatchWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchWindow {
    pub fn new() -> Self {
        Self {
            state: WindowState::Empty,
            last_window_id: 0,
        }
    }

    pub fn phase(&self) -> WindowPhase {
        match self.state {
            WindowState::Empty => WindowPhase::Empty,
            WindowState::Accumulating { .. } => WindowPhase::Accumulating,
            WindowState::Flushing { .. } => WindowPhase::Flushing,
        }
    }

    /// Entries waiting in the open window (or deferred behind a flush).
    pub fn pending(&self) -> usize {
        match &self.state {
            WindowState::Empty => 0,
            WindowState::Accumulating { entries, .. } => entries.len(),
            WindowState::Flushing { deferred, .. } => deferred.len(),
        }
    }

    fn open(&mut self, entries: Vec<String>) -> u64 {
        self.last_window_id += 1;
        let window_id = self.last_window_id;
        self.state = WindowState::Accumulating { window_id, entries };
        window_id
    }

    pub fn push(&mut self, raw: String) -> PushOutcome {
        match &mut self.state {
            WindowState::Empty => PushOutcome::OpenedWindow(self.open(vec![raw])),
            WindowState::Accumulating { window_id, entries } => {
                entries.push(raw);
                PushOutcome::Appended(*window_id)
            }
            WindowState::Flushing { deferred, .. } => {
                deferred.push(raw);
                PushOutcome::Deferred
            }
        }
    }

    /// Swap out the batch of window `window_id`.
    ///
    /// Returns `None` (and changes nothing) unless that exact window is
    /// accumulating, so a stale or duplicate timer can never flush twice.
    pub fn begin_flush(&mut self, window_id: u64) -> Option<Batch> {
        match &mut self.state {
            WindowState::Accumulating {
                window_id: open_id,
                entries,
            } if *open_id == window_id => {
                let entries = mem::take(entries);
                self.state = WindowState::Flushing {
                    window_id,
                    deferred: Vec::new(),
                };
                Some(Batch { window_id, entries })
            }
            _ => None,
        }
    }

    /// Finish the in-progress flush.
    ///
    /// Returns the id of a newly opened window if entries were deferred while
    /// flushing; the caller must arm a timer for it.
    pub fn complete_flush(&mut self) -> Option<u64> {
        match mem::replace(&mut self.state, WindowState::Empty) {
            WindowState::Flushing { deferred, .. } if !deferred.is_empty() => {
                Some(self.open(deferred))
            }
            WindowState::Flushing { .. } => None,
            other => {
                self.state = other;
                None
            }
        }
    }

    /// Id of the window currently open or flushing.
    pub fn current_window(&self) -> Option<u64> {
        match &self.state {
            WindowState::Empty => None,
            WindowState::Accumulating { window_id, .. } | WindowState::Flushing { window_id, .. } => {
                Some(*window_id)
            }
        }
    }
}

/// Receiving side of an [`EventBatcher`]. Batches arrive in window order.
pub type BatchReceiver = mpsc::UnboundedReceiver<Batch>;

/// Thread-safe batcher. Cheap to clone; clones share one window.
#[derive(Clone)]
pub struct EventBatcher {
    window: Arc<Mutex<BatchWindow>>,
    frame_window: Duration,
    sender: mpsc::UnboundedSender<Batch>,
    handle: Handle,
}

impl std::fmt::Debug for EventBatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBatcher")
            .field("frame_window", &self.frame_window)
            .field("phase", &self.window.lock().phase())
            .finish()
    }
}

impl EventBatcher {
    /// Create a batcher whose timers run on the current tokio runtime.
    pub fn new(frame_window: Duration) -> Result<(Self, BatchReceiver)> {
        let handle = Handle::try_current().map_err(|e| ScanError::NoRuntime(e.to_string()))?;
        Ok(Self::with_handle(handle, frame_window))
    }

    /// Create a batcher whose timers run on `handle`. `push` may then be
    /// called from any thread, including non-runtime camera callback threads.
    pub fn with_handle(handle: Handle, frame_window: Duration) -> (Self, BatchReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let batcher = Self {
            window: Arc::new(Mutex::new(BatchWindow::new())),
            frame_window,
            sender,
            handle,
        };
        (batcher, receiver)
    }

    pub fn frame_window(&self) -> Duration {
        self.frame_window
    }

    /// Add one raw decode event.
    pub fn push(&self, raw: impl Into<String>) {
        let outcome = self.window.lock().push(raw.into());
        match outcome {
            PushOutcome::OpenedWindow(window_id) => {
                trace!(window_id, "Batch window opened");
                self.arm(window_id);
            }
            PushOutcome::Appended(_) | PushOutcome::Deferred => {}
        }
    }

    /// Flush the open window immediately instead of waiting for its timer.
    /// Its timer still fires later and finds nothing to do.
    pub fn flush_now(&self) -> bool {
        let mut window = self.window.lock();
        let Some(window_id) = window.current_window() else {
            return false;
        };
        let flushed = deliver(&mut window, &self.sender, window_id);
        if let Some(next) = window.complete_flush() {
            drop(window);
            self.arm(next);
        }
        flushed
    }

    /// Entries waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.window.lock().pending()
    }

    fn arm(&self, window_id: u64) {
        let window = Arc::clone(&self.window);
        let sender = self.sender.clone();
        let delay = self.frame_window;

        self.handle.spawn(async move {
            let mut window_id = window_id;
            loop {
                tokio::time::sleep(delay).await;

                let next = {
                    let mut window = window.lock();
                    deliver(&mut window, &sender, window_id);
                    window.complete_flush()
                };

                match next {
                    Some(next_id) => window_id = next_id,
                    None => break,
                }
            }
        });
    }
}

fn deliver(window: &mut BatchWindow, sender: &mpsc::UnboundedSender<Batch>, window_id: u64) -> bool {
    let Some(batch) = window.begin_flush(window_id) else {
        return false;
    };
    debug!(window_id, entries = batch.len(), "Batch window flushed");
    if sender.send(batch).is_err() {
        debug!(window_id, "Batch receiver dropped; discarding flush");
    }
    true
}
