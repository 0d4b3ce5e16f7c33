//! # Media Cache Manager
//!
//! `get(key)` returns the decoded buffer for a media key, fetching and
//! decoding it on first use. The slot map holds either a decoded buffer or a
//! shared handle to the single load in flight:
//!
//! ```text
//!        get (miss)              load Ok
//! (none) ──────────> Loading ──────────────> Ready
//!                       │
//!                       └──── load Err ────> (none)   next get retries
//! ```
//!
//! The `Loading` marker is inserted under the slot lock before the first
//! await, so a concurrent `get` for the same key always finds it and joins
//! the same load.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bridge_traits::{AudioDecodeBackend, DecodedBuffer, MediaFetcher};
use core_runtime::logging::redact_media_key;
use futures::future::{join_all, BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::cache::stats::{CacheCounters, CacheStats};
use crate::error::{PlaybackError, Result};

type SharedLoad = Shared<BoxFuture<'static, Result<DecodedBuffer>>>;

enum Slot {
    Ready(DecodedBuffer),
    Loading { generation: u64, load: SharedLoad },
}

/// Decoded-audio cache keyed by media key.
pub struct MediaCache {
    fetcher: Arc<dyn MediaFetcher>,
    decoder: Arc<dyn AudioDecodeBackend>,
    slots: Mutex<HashMap<String, Slot>>,
    generation: AtomicU64,
    counters: CacheCounters,
}

impl std::fmt::Debug for MediaCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaCache")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl MediaCache {
    pub fn new(fetcher: Arc<dyn MediaFetcher>, decoder: Arc<dyn AudioDecodeBackend>) -> Self {
        Self {
            fetcher,
            decoder,
            slots: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
            counters: CacheCounters::default(),
        }
    }

    /// Decoded buffer for `key`.
    ///
    /// # Errors
    ///
    /// [`PlaybackError::MediaLoad`] if the fetch fails,
    /// [`PlaybackError::Decode`] if the payload is not audio. Failures are not
    /// cached.
    #[instrument(skip(self, key), fields(media_key = %redact_media_key(key)))]
    pub async fn get(&self, key: &str) -> Result<DecodedBuffer> {
        let (generation, load) = {
            let mut slots = self.slots.lock();
            match slots.get(key) {
                Some(Slot::Ready(buffer)) => {
                    self.counters.hit();
                    return Ok(buffer.clone());
                }
                Some(Slot::Loading { generation, load }) => {
                    self.counters.coalesce();
                    debug!("Joining in-flight load");
                    (*generation, load.clone())
                }
                None => {
                    self.counters.miss();
                    let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
                    let load = self.start_load(key);
                    slots.insert(
                        key.to_string(),
                        Slot::Loading {
                            generation,
                            load: load.clone(),
                        },
                    );
                    (generation, load)
                }
            }
        };

        let result = load.await;
        self.settle(key, generation, &result);
        result
    }

    fn start_load(&self, key: &str) -> SharedLoad {
        let fetcher = Arc::clone(&self.fetcher);
        let decoder = Arc::clone(&self.decoder);
        let key = key.to_string();

        async move {
            let payload = fetcher
                .fetch(&key)
                .await
                .map_err(|e| PlaybackError::media_load(&key, e))?;
            debug!(bytes = payload.len(), "Media fetched");

            decoder
                .decode(&key, payload)
                .await
                .map_err(|e| PlaybackError::decode(&key, e))
        }
        .boxed()
        .shared()
    }

    /// Replace the `Loading` marker of `generation` with the outcome. Every
    /// waiter calls this; only the first to arrive finds a matching marker.
    fn settle(&self, key: &str, generation: u64, result: &Result<DecodedBuffer>) {
        let mut slots = self.slots.lock();
        let current = matches!(
            slots.get(key),
            Some(Slot::Loading { generation: g, .. }) if *g == generation
        );
        if !current {
            return;
        }

        match result {
            Ok(buffer) => {
                debug!(frames = buffer.frames(), "Media decoded and cached");
                slots.insert(key.to_string(), Slot::Ready(buffer.clone()));
            }
            Err(error) => {
                self.counters.failure();
                warn!(%error, "Media load failed; key left empty for retry");
                slots.remove(key);
            }
        }
    }

    /// Warm the cache for `keys` concurrently. Returns how many resolved.
    #[instrument(skip(self, keys))]
    pub async fn preload<I, S>(&self, keys: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keys: Vec<S> = keys.into_iter().collect();
        let results = join_all(keys.iter().map(|key| self.get(key.as_ref()))).await;
        let loaded = results.iter().filter(|r| r.is_ok()).count();
        info!(requested = keys.len(), loaded, "Media preload finished");
        loaded
    }

    /// `true` if a decoded buffer is held for `key`.
    pub fn contains(&self, key: &str) -> bool {
        matches!(self.slots.lock().get(key), Some(Slot::Ready(_)))
    }

    pub fn is_loading(&self, key: &str) -> bool {
        matches!(self.slots.lock().get(key), Some(Slot::Loading { .. }))
    }

    /// Number of decoded buffers held.
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .values()
            .filter(|slot| matches!(slot, Slot::Ready(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop the entry for `key`. An in-flight load still completes for its
    /// waiters but its result is not stored.
    pub fn evict(&self, key: &str) -> bool {
        self.slots.lock().remove(key).is_some()
    }

    pub fn clear(&self) {
        self.slots.lock().clear();
    }

    pub fn stats(&self) -> CacheStats {
        let slots = self.slots.lock();
        let ready = slots
            .values()
            .filter(|slot| matches!(slot, Slot::Ready(_)))
            .count();
        self.counters.snapshot(ready, slots.len() - ready)
    }
}
