//! Playback surfaces driven by the voice allocator.
//!
//! Both traits are fire-and-forget: the allocator never awaits the host's
//! rendering or display work, and a misbehaving host cannot stall the
//! correlation loop.

use std::time::Duration;

use crate::audio::DecodedBuffer;

/// Host audio output.
///
/// `pan` is in `[-1.0, 1.0]` (hard left to hard right). `start_offset` is the
/// delay before the voice becomes audible, relative to the call.
pub trait PlaybackSink: Send + Sync {
    fn play(&self, buffer: DecodedBuffer, pan: f32, start_offset: Duration);
}

/// Transient UI notification raised once per played item.
///
/// The host owns display and expiry timing.
pub trait HitNotifier: Send + Sync {
    fn notify(&self, label: &str, role: &str);
}
