use std::collections::HashMap;

use core_runtime::config::DEBOUNCE_MS;

/// Per-identifier debounce gate.
///
/// Not synchronized: the correlation engine owns it and consults it only
/// from `&mut self`, inside the synchronous decision step.
#[derive(Debug, Clone)]
pub struct CooldownTracker {
    window_ms: u64,
    last_trigger: HashMap<String, u64>,
}

impl Default for CooldownTracker {
    fn default() -> Self {
        Self::new(DEBOUNCE_MS)
    }
}

impl CooldownTracker {
    pub fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            last_trigger: HashMap::new(),
        }
    }

    /// Returns `true` and records `now_ms` if `id` has never triggered or last
    /// triggered at least `window_ms` ago. Returns `false` without touching
    /// state otherwise.
    pub fn should_trigger(&mut self, id: &str, now_ms: u64) -> bool {
        if let Some(&last) = self.last_trigger.get(id) {
            if now_ms.saturating_sub(last) < self.window_ms {
                return false;
            }
        }
        self.last_trigger.insert(id.to_string(), now_ms);
        true
    }

    /// Non-mutating check, for diagnostics.
    pub fn is_cooling(&self, id: &str, now_ms: u64) -> bool {
        self.last_trigger
            .get(id)
            .is_some_and(|&last| now_ms.saturating_sub(last) < self.window_ms)
    }

    pub fn last_trigger(&self, id: &str) -> Option<u64> {
        self.last_trigger.get(id).copied()
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    /// Number of identifiers ever triggered.
    pub fn len(&self) -> usize {
        self.last_trigger.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_trigger.is_empty()
    }
}
