//! The correlation decision: raw decode text in, ordered playable set out.

use std::collections::HashSet;
use std::ops::Deref;
use std::sync::Arc;

use core_catalog::{Catalog, MediaDescriptor};
use core_runtime::config::{EngineTunables, MAX_SIMULTANEOUS_VOICES};
use tracing::{debug, trace};

use crate::cooldown::CooldownTracker;

/// Ordered descriptors admitted for playback in one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayableSet {
    entries: Vec<Arc<MediaDescriptor>>,
}

impl PlayableSet {
    pub fn ids(&self) -> Vec<String> {
        self.entries.iter().map(|d| d.id.clone()).collect()
    }

    pub fn into_vec(self) -> Vec<Arc<MediaDescriptor>> {
        self.entries
    }
}

impl Deref for PlayableSet {
    type Target = [Arc<MediaDescriptor>];

    fn deref(&self) -> &Self::Target {
        &self.entries
    }
}

impl IntoIterator for PlayableSet {
    type Item = Arc<MediaDescriptor>;
    type IntoIter = std::vec::IntoIter<Arc<MediaDescriptor>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Full decision for one batch, with what was dropped and why.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrelationOutcome {
    pub playable: PlayableSet,
    /// Distinct ids with no catalog entry.
    pub unknown: Vec<String>,
    /// Ids still inside their debounce window.
    pub cooling: Vec<String>,
    /// Ids that passed cooldown but fell beyond the voice cap.
    pub overflow: Vec<String>,
}

/// Trim, drop empties and de-duplicate, keeping first-appearance order.
pub fn distinct_ids<S: AsRef<str>>(raw: &[S]) -> Vec<&str> {
    let mut seen = HashSet::with_capacity(raw.len());
    raw.iter()
        .map(|text| text.as_ref().trim())
        .filter(|id| !id.is_empty() && seen.insert(*id))
        .collect()
}

/// Stateful correlator. Owns the cooldown state, so every call takes
/// `&mut self` and runs to completion without suspending.
#[derive(Debug)]
pub struct CorrelationEngine {
    catalog: Arc<Catalog>,
    cooldown: CooldownTracker,
    max_voices: usize,
}

impl CorrelationEngine {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self::with_limits(catalog, CooldownTracker::default(), MAX_SIMULTANEOUS_VOICES)
    }

    pub fn from_tunables(catalog: Arc<Catalog>, tunables: &EngineTunables) -> Self {
        Self::with_limits(
            catalog,
            CooldownTracker::new(tunables.debounce_ms()),
            tunables.max_voices,
        )
    }

    pub fn with_limits(catalog: Arc<Catalog>, cooldown: CooldownTracker, max_voices: usize) -> Self {
        Self {
            catalog,
            cooldown,
            max_voices,
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn cooldown(&self) -> &CooldownTracker {
        &self.cooldown
    }

    pub fn max_voices(&self) -> usize {
        self.max_voices
    }

    /// Decide which entries of `raw` play now.
    pub fn correlate<S: AsRef<str>>(&mut self, raw: &[S], now_ms: u64) -> PlayableSet {
        self.evaluate(raw, now_ms).playable
    }

    /// Like [`correlate`](Self::correlate), also reporting dropped ids.
    ///
    /// Cooldown is recorded for every id that resolves and is not cooling,
    /// including ids then cut by the voice cap.
    pub fn evaluate<S: AsRef<str>>(&mut self, raw: &[S], now_ms: u64) -> CorrelationOutcome {
        let mut outcome = CorrelationOutcome::default();
        if raw.is_empty() {
            return outcome;
        }

        let mut admitted = Vec::new();
        for id in distinct_ids(raw) {
            let Some(descriptor) = self.catalog.lookup(id) else {
                trace!(id, "Unknown identifier dropped");
                outcome.unknown.push(id.to_string());
                continue;
            };

            if !self.cooldown.should_trigger(id, now_ms) {
                trace!(id, now_ms, "Identifier cooling down");
                outcome.cooling.push(id.to_string());
                continue;
            }

            admitted.push(descriptor);
        }

        if admitted.len() > self.max_voices {
            outcome.overflow = admitted
                .drain(self.max_voices..)
                .map(|d| d.id.clone())
                .collect();
        }

        outcome.playable = PlayableSet { entries: admitted };

        debug!(
            raw = raw.len(),
            playable = outcome.playable.len(),
            unknown = outcome.unknown.len(),
            cooling = outcome.cooling.len(),
            overflow = outcome.overflow.len(),
            "Batch correlated"
        );
        outcome
    }
}
