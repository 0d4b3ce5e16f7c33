//! # Playback
//!
//! Everything between "these entries should sound now" and the host's audio
//! output:
//! - [`MediaCache`]: single-flight fetch+decode, memoized per media key
//! - [`CallbackDecoder`] and [`SymphoniaBackend`]: decode backends converging
//!   on [`AudioDecodeBackend`](bridge_traits::AudioDecodeBackend)
//! - [`VoiceAllocator`]: concurrent buffer loads, pan assignment, sink hand-off

pub mod cache;
pub mod decoder;
pub mod error;
pub mod voice;

pub use cache::{CacheStats, MediaCache};
pub use decoder::CallbackDecoder;
#[cfg(feature = "decoder-symphonia")]
pub use decoder::SymphoniaBackend;
pub use error::{PlaybackError, Result};
pub use voice::{AllocationReport, FailedVoice, StartedVoice, VoiceAllocator};
