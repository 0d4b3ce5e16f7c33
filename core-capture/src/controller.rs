//! # Capture Controller
//!
//! Owns the lifecycle of the host decode engine:
//!
//! ```text
//!          start/switch             engine started
//!   Idle ───────────────> Starting ───────────────> Running
//!    ^                       │                         │
//!    │      start failed     │                         │ stop/switch
//!    ├───────────────────────┘                         v
//!    └────────────────────────────────────────────── Stopping
//! ```
//!
//! Every start, switch and stop request takes a new generation number when
//! it is made, before it queues for the operation lock. A start attempt only
//! becomes the active source if its generation is still the newest once the
//! engine reports back; otherwise the engine is stopped again and the caller
//! gets [`CaptureError::Superseded`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bridge_traits::{
    CaptureDeviceEnumerator, CaptureTarget, DecodeEngine, DecodeErrorCallback, DecodedCallback,
    FacingMode, ScanConfig,
};
use core_runtime::events::{CaptureEvent, CaptureState, CoreEvent, EventBus};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, instrument, warn};

use crate::error::{CaptureError, Result};
use crate::selector::CaptureSelector;

/// The source currently feeding the decode engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveCapture {
    pub generation: u64,
    pub facing: FacingMode,
    pub target: CaptureTarget,
    /// `true` when the device handle failed and the generic facing request
    /// opened instead.
    pub used_fallback: bool,
}

pub struct CaptureController {
    engine: Arc<dyn DecodeEngine>,
    selector: CaptureSelector,
    scan_config: ScanConfig,
    on_decoded: DecodedCallback,
    on_error: DecodeErrorCallback,
    generation: AtomicU64,
    active: Mutex<Option<ActiveCapture>>,
    state: watch::Sender<CaptureState>,
    events: Option<EventBus>,
}

impl CaptureController {
    pub fn new(
        engine: Arc<dyn DecodeEngine>,
        enumerator: Arc<dyn CaptureDeviceEnumerator>,
        scan_config: ScanConfig,
        on_decoded: DecodedCallback,
        on_error: DecodeErrorCallback,
    ) -> Self {
        let (state, _) = watch::channel(CaptureState::Idle);
        Self {
            engine,
            selector: CaptureSelector::new(enumerator),
            scan_config,
            on_decoded,
            on_error,
            generation: AtomicU64::new(0),
            active: Mutex::new(None),
            state,
            events: None,
        }
    }

    /// Publish state changes and start outcomes on `bus`.
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.events = Some(bus);
        self
    }

    pub fn selector(&self) -> &CaptureSelector {
        &self.selector
    }

    pub fn state(&self) -> CaptureState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<CaptureState> {
        self.state.subscribe()
    }

    /// Newest generation handed out.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// The active source. Waits for an in-flight operation to settle.
    pub async fn active(&self) -> Option<ActiveCapture> {
        self.active.lock().await.clone()
    }

    /// Start capturing from the camera facing `facing`. Restarts if a source
    /// is already running.
    pub async fn start(&self, facing: FacingMode) -> Result<ActiveCapture> {
        self.activate(facing).await
    }

    /// Stop the active source, if any, then start `facing`.
    pub async fn switch(&self, facing: FacingMode) -> Result<ActiveCapture> {
        self.activate(facing).await
    }

    /// Stop capture. Stopping when nothing runs is a no-op.
    ///
    /// Also invalidates any start still in flight.
    #[instrument(skip(self))]
    pub async fn stop(&self) -> Result<()> {
        let generation = self.next_generation();
        let mut active = self.active.lock().await;
        debug!(generation, "Stop requested");
        self.stop_locked(&mut active).await
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    #[instrument(skip(self), fields(generation = tracing::field::Empty))]
    async fn activate(&self, facing: FacingMode) -> Result<ActiveCapture> {
        let generation = self.next_generation();
        tracing::Span::current().record("generation", generation);

        let mut active = self.active.lock().await;
        if !self.is_current(generation) {
            debug!("Request superseded while queued");
            return Err(CaptureError::Superseded { generation });
        }

        if let Err(error) = self.stop_locked(&mut active).await {
            warn!(%error, "Stopping previous source failed; starting anyway");
        }

        self.set_state(CaptureState::Starting);
        let device = self.selector.resolve(facing).await;
        if !self.is_current(generation) {
            self.set_state(CaptureState::Idle);
            return Err(CaptureError::Superseded { generation });
        }

        let generic = CaptureTarget::Facing(facing);
        let (target, used_fallback) = match device {
            Some(device) => {
                let target = CaptureTarget::Device {
                    device_id: device.device_id,
                };
                match self.open(&target).await {
                    Ok(()) => (target, false),
                    Err(error) => {
                        warn!(%target, %error, "Device start failed; retrying with facing hint");
                        match self.open(&generic).await {
                            Ok(()) => (generic, true),
                            Err(error) => return Err(self.start_failed(generation, &generic, error)),
                        }
                    }
                }
            }
            None => match self.open(&generic).await {
                Ok(()) => (generic, false),
                Err(error) => return Err(self.start_failed(generation, &generic, error)),
            },
        };

        if !self.is_current(generation) {
            info!(%target, "Discarding stale capture start");
            if let Err(error) = self.engine.stop().await {
                warn!(%error, "Stopping stale capture failed");
            }
            if let Err(error) = self.engine.clear().await {
                debug!(%error, "Clearing scanner surface failed");
            }
            self.set_state(CaptureState::Idle);
            return Err(CaptureError::Superseded { generation });
        }

        let started = ActiveCapture {
            generation,
            facing,
            target,
            used_fallback,
        };
        *active = Some(started.clone());
        self.set_state(CaptureState::Running);
        info!(target = %started.target, used_fallback, "Capture running");
        self.emit(CaptureEvent::Activated {
            generation,
            target: started.target.to_string(),
            used_fallback,
        });
        Ok(started)
    }

    async fn open(&self, target: &CaptureTarget) -> bridge_traits::error::Result<()> {
        self.engine
            .start(
                target.clone(),
                self.scan_config,
                Arc::clone(&self.on_decoded),
                Arc::clone(&self.on_error),
            )
            .await
    }

    fn start_failed(
        &self,
        generation: u64,
        target: &CaptureTarget,
        error: bridge_traits::BridgeError,
    ) -> CaptureError {
        warn!(%target, %error, "Capture start failed");
        self.set_state(CaptureState::Idle);
        let message = error.to_string();
        self.emit(CaptureEvent::StartFailed {
            generation,
            message: message.clone(),
        });
        CaptureError::StartFailed {
            target: target.to_string(),
            message,
        }
    }

    async fn stop_locked(&self, active: &mut Option<ActiveCapture>) -> Result<()> {
        let Some(previous) = active.take() else {
            return Ok(());
        };

        self.set_state(CaptureState::Stopping);
        let stopped = self.engine.stop().await;
        if let Err(error) = self.engine.clear().await {
            debug!(%error, "Clearing scanner surface failed");
        }
        self.set_state(CaptureState::Idle);

        match stopped {
            Ok(()) => {
                info!(target = %previous.target, "Capture stopped");
                Ok(())
            }
            Err(error) => Err(CaptureError::Stop(error.to_string())),
        }
    }

    fn set_state(&self, next: CaptureState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(from = %previous, to = %next, "Capture state changed");
            self.emit(CaptureEvent::StateChanged {
                from: previous,
                to: next,
            });
        }
    }

    fn emit(&self, event: CaptureEvent) {
        if let Some(bus) = &self.events {
            // No subscribers is fine.
            let _ = bus.emit(CoreEvent::Capture(event));
        }
    }
}

impl std::fmt::Debug for CaptureController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureController")
            .field("state", &self.state())
            .field("generation", &self.generation())
            .finish_non_exhaustive()
    }
}
