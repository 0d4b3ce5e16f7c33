//! Decoded audio handle and decode backend abstractions.
//!
//! Two decoder styles exist in the wild: backends that complete directly
//! (an async call returning the buffer) and backends that report through a
//! success/error callback pair. Both are expressed here; the playback crate
//! adapts the callback style onto [`AudioDecodeBackend`] so nothing above the
//! media cache ever branches on backend style.

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{BridgeError, Result};

/// Immutable decoded PCM audio.
///
/// Samples are interleaved `f32` in `[-1.0, 1.0]`. Cloning is cheap: the
/// sample storage is shared, so a buffer can be handed to several voices
/// without copying.
#[derive(Clone, PartialEq)]
pub struct DecodedBuffer {
    samples: Arc<[f32]>,
    sample_rate: u32,
    channels: u16,
}

impl DecodedBuffer {
    /// Create a buffer from interleaved samples.
    pub fn new(samples: impl Into<Arc<[f32]>>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
            channels,
        }
    }

    /// Interleaved samples.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of frames (one sample per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    /// Playback length at the native sample rate.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }

    /// Returns `true` if both handles share the same sample storage.
    pub fn ptr_eq(&self, other: &DecodedBuffer) -> bool {
        Arc::ptr_eq(&self.samples, &other.samples)
    }
}

impl fmt::Debug for DecodedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedBuffer")
            .field("frames", &self.frames())
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .finish()
    }
}

/// Decoder that completes directly with the decoded buffer.
#[async_trait]
pub trait AudioDecodeBackend: Send + Sync {
    /// Decode an encoded payload. `key` is the media key the payload was
    /// fetched under; backends may use its extension as a format hint.
    async fn decode(&self, key: &str, payload: Bytes) -> Result<DecodedBuffer>;
}

/// Success continuation for [`CallbackDecodeBackend`].
pub type DecodeSuccess = Box<dyn FnOnce(DecodedBuffer) + Send>;

/// Error continuation for [`CallbackDecodeBackend`].
pub type DecodeFailure = Box<dyn FnOnce(BridgeError) + Send>;

/// Decoder that reports completion through a callback pair.
///
/// Implementations must eventually invoke exactly one of the two callbacks,
/// from any thread. Dropping both without calling either is treated as a
/// decode failure by the adapter.
pub trait CallbackDecodeBackend: Send + Sync {
    fn decode_with_callbacks(
        &self,
        key: &str,
        payload: Bytes,
        on_success: DecodeSuccess,
        on_error: DecodeFailure,
    );
}
