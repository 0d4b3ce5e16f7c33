//! # Scan Engine
//!
//! Wires every component from an [`EngineConfig`] and owns the correlation
//! loop:
//!
//! ```text
//! decode engine ──on_decoded──> EventBatcher ──Batch──> correlation loop
//!                                                          │ CorrelationEngine::evaluate
//!                                                          v
//!                                              spawned VoiceAllocator::allocate
//!                                                          │
//!                                               PlaybackSink + HitNotifier
//! ```
//!
//! Batches are correlated one at a time, in window order. Each allocation
//! runs as its own task so a slow media load never holds up the next window.

use std::sync::Arc;

use bridge_traits::{Clock, DecodeErrorCallback, DecodedCallback, FacingMode};
use core_capture::{ActiveCapture, CaptureController, CaptureState};
use core_catalog::Catalog;
use core_playback::{AllocationReport, CacheStats, MediaCache, VoiceAllocator};
use core_runtime::config::EngineConfig;
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent, Receiver, ScanEvent};
use core_runtime::logging::redact_media_key;
use core_scan::{Batch, BatchReceiver, CorrelationEngine, EventBatcher};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, instrument, trace, warn};

use crate::error::{CoreError, Result};

/// Running engine. Dropping it cancels the correlation loop; call
/// [`shutdown`](Self::shutdown) to also stop capture and wait for voices
/// still loading.
pub struct ScanEngine {
    catalog: Arc<Catalog>,
    cache: Arc<MediaCache>,
    batcher: EventBatcher,
    capture: Arc<CaptureController>,
    events: EventBus,
    default_facing: FacingMode,
    cancel: CancellationToken,
    tasks: TaskTracker,
}

impl ScanEngine {
    /// Load the catalog and start the correlation loop.
    ///
    /// Must be called inside a tokio runtime; batch timers and allocations
    /// are spawned on it.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Runtime`] for invalid tunables
    /// - [`CoreError::Catalog`] if the catalog cannot be loaded; nothing
    ///   correlates without one
    /// - [`CoreError::Scan`] when no tokio runtime is running
    #[instrument(skip(config), fields(catalog = %config.catalog_source.describe()))]
    pub async fn bootstrap(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        debug!(?config, "Bootstrapping scan engine");

        let catalog = Arc::new(Catalog::load(config.catalog_source.as_ref()).await?);
        if catalog.is_empty() {
            warn!("Catalog has no entries; decoded codes will never play");
        }

        let cache = Arc::new(MediaCache::new(
            Arc::clone(&config.media_fetcher),
            Arc::clone(&config.decode_backend),
        ));
        if config.preload_media {
            let keys = catalog.media_keys();
            let loaded = cache.preload(&keys).await;
            info!(requested = keys.len(), loaded, "Catalog media preloaded");
        }

        let events = EventBus::new(config.event_buffer_size);
        let (batcher, batches) = EventBatcher::new(config.tunables.frame_window)?;
        let correlation = CorrelationEngine::from_tunables(Arc::clone(&catalog), &config.tunables);
        let allocator = Arc::new(
            VoiceAllocator::new(
                Arc::clone(&cache),
                Arc::clone(&config.playback_sink),
                Arc::clone(&config.notifier),
            )
            .with_layout(config.tunables.pan_layout),
        );

        let cancel = CancellationToken::new();
        let capture = Arc::new(
            CaptureController::new(
                Arc::clone(&config.decode_engine),
                Arc::clone(&config.device_enumerator),
                config.scan_config,
                batcher_callback(&batcher, &cancel),
                decode_miss_callback(),
            )
            .with_event_bus(events.clone()),
        );

        let tasks = TaskTracker::new();
        tasks.spawn(
            CorrelationLoop {
                batches,
                correlation,
                allocator,
                clock: Arc::clone(&config.clock),
                events: events.clone(),
                tasks: tasks.clone(),
                cancel: cancel.clone(),
            }
            .run(),
        );

        info!(
            entries = catalog.len(),
            frame_window_ms = config.tunables.frame_window.as_millis() as u64,
            debounce_ms = config.tunables.debounce_ms(),
            max_voices = config.tunables.max_voices,
            "Scan engine ready"
        );

        Ok(Self {
            catalog,
            cache,
            batcher,
            capture,
            events,
            default_facing: config.default_facing,
            cancel,
            tasks,
        })
    }

    /// Feed one decoded text. Ignored after shutdown.
    pub fn push_decoded(&self, text: impl Into<String>) {
        if self.cancel.is_cancelled() {
            trace!("Decode event after shutdown dropped");
            return;
        }
        self.batcher.push(text);
    }

    /// Callback form of [`push_decoded`](Self::push_decoded) for hosts that
    /// run their own decode engine outside the capture controller.
    pub fn decoded_callback(&self) -> DecodedCallback {
        batcher_callback(&self.batcher, &self.cancel)
    }

    /// Start capture with `facing`, or the configured default.
    pub async fn start_capture(&self, facing: Option<FacingMode>) -> Result<ActiveCapture> {
        self.ensure_running()?;
        let facing = facing.unwrap_or(self.default_facing);
        Ok(self.capture.start(facing).await?)
    }

    pub async fn switch_capture(&self, facing: FacingMode) -> Result<ActiveCapture> {
        self.ensure_running()?;
        Ok(self.capture.switch(facing).await?)
    }

    pub async fn stop_capture(&self) -> Result<()> {
        Ok(self.capture.stop().await?)
    }

    pub fn capture_state(&self) -> CaptureState {
        self.capture.state()
    }

    pub fn subscribe_capture_state(&self) -> watch::Receiver<CaptureState> {
        self.capture.subscribe_state()
    }

    /// Scan, playback and capture events.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.events.subscribe()
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stop capture, end the correlation loop and wait for in-flight
    /// allocations. Idempotent.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.cancel.cancel();

        if let Err(error) = self.capture.stop().await {
            warn!(%error, "Capture did not stop cleanly during shutdown");
        }

        self.tasks.close();
        self.tasks.wait().await;
        info!("Scan engine shut down");
    }

    fn ensure_running(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(CoreError::ShutDown);
        }
        Ok(())
    }
}

impl Drop for ScanEngine {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for ScanEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanEngine")
            .field("entries", &self.catalog.len())
            .field("capture", &self.capture.state())
            .field("shut_down", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

fn batcher_callback(batcher: &EventBatcher, cancel: &CancellationToken) -> DecodedCallback {
    let batcher = batcher.clone();
    let cancel = cancel.clone();
    Arc::new(move |text: String| {
        if !cancel.is_cancelled() {
            batcher.push(text);
        }
    })
}

fn decode_miss_callback() -> DecodeErrorCallback {
    // Fires for every frame without a readable code.
    Arc::new(|message: String| trace!(%message, "Frame decode miss"))
}

struct CorrelationLoop {
    batches: BatchReceiver,
    correlation: CorrelationEngine,
    allocator: Arc<VoiceAllocator>,
    clock: Arc<dyn Clock>,
    events: EventBus,
    tasks: TaskTracker,
    cancel: CancellationToken,
}

impl CorrelationLoop {
    async fn run(mut self) {
        debug!("Correlation loop started");
        loop {
            let batch = tokio::select! {
                _ = self.cancel.cancelled() => break,
                batch = self.batches.recv() => match batch {
                    Some(batch) => batch,
                    None => break,
                },
            };
            self.handle(batch);
        }
        debug!("Correlation loop stopped");
    }

    fn handle(&mut self, batch: Batch) {
        let now = self.clock.now_millis();
        let outcome = self.correlation.evaluate(&batch.entries, now);

        emit(
            &self.events,
            CoreEvent::Scan(ScanEvent::BatchCorrelated {
                window_id: batch.window_id,
                raw_count: batch.len(),
                playable: outcome.playable.ids(),
                unknown: outcome.unknown.len(),
                cooling: outcome.cooling.len(),
            }),
        );
        if !outcome.overflow.is_empty() {
            debug!(window_id = batch.window_id, dropped = ?outcome.overflow, "Voice cap reached");
            emit(
                &self.events,
                CoreEvent::Scan(ScanEvent::VoicesDropped {
                    window_id: batch.window_id,
                    ids: outcome.overflow,
                }),
            );
        }

        if outcome.playable.is_empty() {
            return;
        }

        let playable = outcome.playable.into_vec();
        let allocator = Arc::clone(&self.allocator);
        let events = self.events.clone();
        self.tasks.spawn(async move {
            let report = allocator.allocate(&playable).await;
            publish_report(&events, report);
        });
    }
}

fn publish_report(events: &EventBus, report: AllocationReport) {
    for voice in report.started {
        emit(
            events,
            CoreEvent::Playback(PlaybackEvent::VoiceStarted {
                id: voice.descriptor.id.clone(),
                label: voice.descriptor.label.clone(),
                role: voice.descriptor.role.clone(),
                pan: voice.pan,
            }),
        );
    }
    for failed in report.failed {
        emit(
            events,
            CoreEvent::Playback(PlaybackEvent::MediaLoadFailed {
                id: failed.descriptor.id.clone(),
                media_key: redact_media_key(&failed.descriptor.media_key),
                message: failed.error.to_string(),
            }),
        );
    }
}

fn emit(events: &EventBus, event: CoreEvent) {
    // Nobody listening is normal.
    let _ = events.emit(event);
}
