//! # Host Bridge Traits
//!
//! Capability traits that a host platform implements so the scanning core can
//! run without knowing anything about cameras, audio devices or networking.
//!
//! ## Overview
//!
//! This crate defines the contract between the core engine and the
//! platform-specific adapters around it. Each trait represents one capability
//! the core consumes, or one surface it drives.
//!
//! ## Traits
//!
//! ### Media & Catalog
//! - [`CatalogSource`](media::CatalogSource) - One-shot fetch of the catalog document
//! - [`MediaFetcher`](media::MediaFetcher) - Fetch raw audio payloads by key
//!
//! ### Audio
//! - [`AudioDecodeBackend`](audio::AudioDecodeBackend) - Async payload → PCM decoding
//! - [`CallbackDecodeBackend`](audio::CallbackDecodeBackend) - Completion-callback decoding
//! - [`PlaybackSink`](playback::PlaybackSink) - Renders a decoded buffer at a pan position
//! - [`HitNotifier`](playback::HitNotifier) - Transient UI notification per played hit
//!
//! ### Capture
//! - [`DecodeEngine`](capture::DecodeEngine) - Camera-fed code scanner
//! - [`CaptureDeviceEnumerator`](capture::CaptureDeviceEnumerator) - Lists capture devices
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Monotonic time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with descriptive errors when a required capability is
//! missing:
//!
//! ```ignore
//! use core_runtime::config::EngineConfig;
//!
//! let config = EngineConfig::builder()
//!     .catalog_source(catalog)
//!     .build()?; // Error::CapabilityMissing { capability: "MediaFetcher", .. }
//! ```
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert platform errors into it and keep messages actionable
//! (include the key, device or URL involved).
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so implementations can be shared
//! across async tasks behind an `Arc`.

pub mod audio;
pub mod capture;
pub mod error;
pub mod media;
pub mod playback;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use audio::{
    AudioDecodeBackend, CallbackDecodeBackend, DecodeFailure, DecodeSuccess, DecodedBuffer,
};
pub use capture::{
    CaptureDeviceEnumerator, CaptureDeviceInfo, CaptureTarget, DecodeEngine, DecodeErrorCallback,
    DecodedCallback, DeviceKind, FacingMode, ScanConfig,
};
pub use media::{CatalogSource, MediaFetcher};
pub use playback::{HitNotifier, PlaybackSink};
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, ManualClock, SystemClock};
