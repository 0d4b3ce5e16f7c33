//! # Playback Error Types

use bridge_traits::error::BridgeError;
use core_runtime::logging::redact_media_key;
use thiserror::Error;

/// Errors from loading, decoding or rendering media.
///
/// `Clone` so one in-flight load can hand the same failure to every caller
/// waiting on it. Keys are stored redacted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    /// The payload could not be fetched.
    #[error("Failed to load media {key}: {message}")]
    MediaLoad { key: String, message: String },

    /// The payload was fetched but is not decodable audio.
    #[error("Failed to decode media {key}: {message}")]
    Decode { key: String, message: String },

    /// Container format not recognized.
    #[error("Unsupported or invalid audio format: {0}")]
    InvalidFormat(String),

    /// Codec present but not supported.
    #[error("Unsupported codec: {0}")]
    UnsupportedCodec(String),
}

impl PlaybackError {
    pub fn media_load(key: &str, error: impl std::fmt::Display) -> Self {
        PlaybackError::MediaLoad {
            key: redact_media_key(key),
            message: error.to_string(),
        }
    }

    pub fn decode(key: &str, error: impl std::fmt::Display) -> Self {
        PlaybackError::Decode {
            key: redact_media_key(key),
            message: error.to_string(),
        }
    }

    /// Returns `true` if retrying the same key may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, PlaybackError::MediaLoad { .. })
    }

    /// Returns `true` if the payload itself is bad.
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::Decode { .. }
                | PlaybackError::InvalidFormat(_)
                | PlaybackError::UnsupportedCodec(_)
        )
    }
}

impl From<PlaybackError> for BridgeError {
    fn from(error: PlaybackError) -> Self {
        BridgeError::OperationFailed(error.to_string())
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
