//! # Voice Allocator
//!
//! Turns one playable set into sounding voices: loads every buffer
//! concurrently, spreads the survivors across the stereo field and hands
//! each to the playback sink, raising one hit notification per voice.

use std::sync::Arc;
use std::time::Duration;

use bridge_traits::{HitNotifier, PlaybackSink};
use core_catalog::MediaDescriptor;
use core_runtime::config::PanLayout;
use core_runtime::logging::redact_media_key;
use futures::future::join_all;
use tracing::{debug, info, instrument, warn};

use crate::cache::MediaCache;
use crate::error::PlaybackError;

/// A voice handed to the sink.
#[derive(Debug, Clone, PartialEq)]
pub struct StartedVoice {
    pub descriptor: Arc<MediaDescriptor>,
    pub pan: f32,
}

/// An entry skipped because its buffer could not be loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedVoice {
    pub descriptor: Arc<MediaDescriptor>,
    pub error: PlaybackError,
}

/// What one allocation did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllocationReport {
    /// In playable-set order.
    pub started: Vec<StartedVoice>,
    pub failed: Vec<FailedVoice>,
}

impl AllocationReport {
    pub fn is_empty(&self) -> bool {
        self.started.is_empty() && self.failed.is_empty()
    }
}

pub struct VoiceAllocator {
    cache: Arc<MediaCache>,
    sink: Arc<dyn PlaybackSink>,
    notifier: Arc<dyn HitNotifier>,
    layout: PanLayout,
}

impl VoiceAllocator {
    pub fn new(
        cache: Arc<MediaCache>,
        sink: Arc<dyn PlaybackSink>,
        notifier: Arc<dyn HitNotifier>,
    ) -> Self {
        Self {
            cache,
            sink,
            notifier,
            layout: PanLayout::default(),
        }
    }

    pub fn with_layout(mut self, layout: PanLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn layout(&self) -> PanLayout {
        self.layout
    }

    pub fn cache(&self) -> &Arc<MediaCache> {
        &self.cache
    }

    /// Load, pan and start every entry of `playable`.
    ///
    /// A failed load skips that entry only. Pans are spread over the entries
    /// that loaded, so a failure never leaves a gap in the stereo field.
    #[instrument(skip(self, playable), fields(count = playable.len()))]
    pub async fn allocate(&self, playable: &[Arc<MediaDescriptor>]) -> AllocationReport {
        let mut report = AllocationReport::default();
        if playable.is_empty() {
            return report;
        }

        let loads = join_all(
            playable
                .iter()
                .map(|descriptor| self.cache.get(&descriptor.media_key)),
        )
        .await;

        let mut ready = Vec::with_capacity(playable.len());
        for (descriptor, result) in playable.iter().zip(loads) {
            match result {
                Ok(buffer) => ready.push((descriptor, buffer)),
                Err(error) => {
                    warn!(
                        id = %descriptor.id,
                        media_key = %redact_media_key(&descriptor.media_key),
                        %error,
                        "Skipping voice; media failed to load"
                    );
                    report.failed.push(FailedVoice {
                        descriptor: Arc::clone(descriptor),
                        error,
                    });
                }
            }
        }

        let count = ready.len();
        for (index, (descriptor, buffer)) in ready.into_iter().enumerate() {
            let pan = self.layout.pan(index, count);
            debug!(id = %descriptor.id, pan, "Starting voice");
            self.sink.play(buffer, pan, Duration::ZERO);
            self.notifier.notify(&descriptor.label, &descriptor.role);
            report.started.push(StartedVoice {
                descriptor: Arc::clone(descriptor),
                pan,
            });
        }

        info!(
            started = report.started.len(),
            failed = report.failed.len(),
            "Voices allocated"
        );
        report
    }
}
