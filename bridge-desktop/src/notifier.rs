use bridge_traits::playback::HitNotifier;
use tracing::info;

/// Writes each hit to `tracing` at info level. Used when the host has no UI.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl HitNotifier for LogNotifier {
    fn notify(&self, label: &str, role: &str) {
        info!(target: "tonescan::hits", label, role, "Hit");
    }
}
