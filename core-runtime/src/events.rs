//! # Event Bus System
//!
//! Broadcasts engine activity to any number of observers using
//! `tokio::sync::broadcast`. Observers are optional; the engine never waits on
//! them and emitting with no subscriber is not an error worth reporting.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     emit      ┌───────────┐
//! │ Correlation  ├──────────────>│           │
//! └──────────────┘               │           │     subscribe    ┌────────────┐
//! ┌──────────────┐     emit      │ EventBus  ├─────────────────>│ Subscriber │
//! │ Voice alloc  ├──────────────>│ (broadcast│                  └────────────┘
//! └──────────────┘               │  channel) │     subscribe    ┌────────────┐
//! ┌──────────────┐     emit      │           ├─────────────────>│ Subscriber │
//! │ Capture ctrl ├──────────────>│           │                  └────────────┘
//! └──────────────┘               └───────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, EventStream, ScanEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(64);
//! let mut scans = EventStream::new(bus.subscribe())
//!     .filter(|event| matches!(event, CoreEvent::Scan(_)));
//!
//! bus.emit(CoreEvent::Scan(ScanEvent::BatchCorrelated {
//!     window_id: 1,
//!     raw_count: 3,
//!     playable: vec!["qr-001".to_string()],
//!     unknown: 1,
//!     cooling: 0,
//! }))
//! .ok();
//!
//! let event = scans.recv().await.unwrap();
//! assert_eq!(event.description(), "Batch correlated");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber fell behind and missed `n`
//!   events. Non-fatal; keep receiving.
//! - **`RecvError::Closed`**: every sender was dropped; the engine shut down.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    Scan(ScanEvent),
    Playback(PlaybackEvent),
    Capture(CaptureEvent),
}

impl CoreEvent {
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Scan(e) => e.description(),
            CoreEvent::Playback(e) => e.description(),
            CoreEvent::Capture(e) => e.description(),
        }
    }

    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Capture(CaptureEvent::StartFailed { .. }) => EventSeverity::Error,
            CoreEvent::Playback(PlaybackEvent::MediaLoadFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Scan(ScanEvent::VoicesDropped { .. }) => EventSeverity::Warning,
            CoreEvent::Capture(CaptureEvent::Activated { .. }) => EventSeverity::Info,
            CoreEvent::Playback(PlaybackEvent::VoiceStarted { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Scan Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ScanEvent {
    /// A flushed window went through correlation.
    BatchCorrelated {
        window_id: u64,
        /// Raw decode events in the window, duplicates included.
        raw_count: usize,
        /// Ids admitted for playback, in order.
        playable: Vec<String>,
        unknown: usize,
        cooling: usize,
    },
    /// Ids that passed cooldown but exceeded the voice cap.
    VoicesDropped { window_id: u64, ids: Vec<String> },
}

impl ScanEvent {
    fn description(&self) -> &str {
        match self {
            ScanEvent::BatchCorrelated { .. } => "Batch correlated",
            ScanEvent::VoicesDropped { .. } => "Voices dropped over cap",
        }
    }
}

// ============================================================================
// Playback Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    VoiceStarted {
        id: String,
        label: String,
        role: String,
        pan: f32,
    },
    MediaLoadFailed {
        id: String,
        /// Already redacted for logging.
        media_key: String,
        message: String,
    },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::VoiceStarted { .. } => "Voice started",
            PlaybackEvent::MediaLoadFailed { .. } => "Media load failed",
        }
    }
}

// ============================================================================
// Capture Events
// ============================================================================

/// Capture lifecycle: `Idle → Starting → Running → Stopping → Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureState {
    Idle,
    Starting,
    Running,
    Stopping,
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CaptureState::Idle => "idle",
            CaptureState::Starting => "starting",
            CaptureState::Running => "running",
            CaptureState::Stopping => "stopping",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum CaptureEvent {
    StateChanged {
        from: CaptureState,
        to: CaptureState,
    },
    Activated {
        generation: u64,
        /// Display form of the target that opened, e.g. `device:abc`.
        target: String,
        used_fallback: bool,
    },
    StartFailed { generation: u64, message: String },
}

impl CaptureEvent {
    fn description(&self) -> &str {
        match self {
            CaptureEvent::StateChanged { .. } => "Capture state changed",
            CaptureEvent::Activated { .. } => "Capture source activated",
            CaptureEvent::StartFailed { .. } => "Capture start failed",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Cloneable handle to the broadcast channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event. Fails only when nobody is subscribed.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// Receiver with an optional predicate applied before events are returned.
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Non-blocking receive. `None` when no matching event is queued.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}
