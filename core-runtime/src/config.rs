//! # Engine Configuration
//!
//! Collects the host bridges and tunables the scanning engine needs. Use
//! [`EngineConfig::builder()`]; `build()` fails fast with
//! [`Error::CapabilityMissing`] naming the first absent bridge, so a host
//! learns at startup (not mid-scan) that something was not wired up.
//!
//! ```ignore
//! use core_runtime::config::EngineConfig;
//!
//! let config = EngineConfig::builder()
//!     .catalog_source(catalog)
//!     .media_fetcher(fetcher)
//!     .decode_backend(decoder)
//!     .playback_sink(sink)
//!     .notifier(notifier)
//!     .decode_engine(scanner)
//!     .device_enumerator(devices)
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{
    AudioDecodeBackend, CaptureDeviceEnumerator, CatalogSource, Clock, DecodeEngine, FacingMode,
    HitNotifier, MediaFetcher, PlaybackSink, ScanConfig, SystemClock,
};
use std::sync::Arc;
use std::time::Duration;

/// Minimum spacing between two triggers of the same identifier.
pub const DEBOUNCE_MS: u64 = 700;

/// Length of one event-batching window.
pub const FRAME_WINDOW_MS: u64 = 120;

/// Upper bound on voices started by one correlation cycle.
pub const MAX_SIMULTANEOUS_VOICES: usize = 6;

/// How pan positions are assigned to the voices of one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanLayout {
    /// `pan(i) = (i / max(1, n - 1)) * 2 - 1`. A single voice sits hard left.
    #[default]
    LinearSpread,
    /// Same spread, but a single voice is centred.
    CenterSingle,
}

impl PanLayout {
    /// Pan for voice `index` of `count`, in `[-1.0, 1.0]`.
    pub fn pan(&self, index: usize, count: usize) -> f32 {
        if count == 1 && *self == PanLayout::CenterSingle {
            return 0.0;
        }
        let span = count.saturating_sub(1).max(1) as f32;
        (index as f32 / span) * 2.0 - 1.0
    }
}

/// Timing and admission parameters. Defaults are the process constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineTunables {
    pub debounce: Duration,
    pub frame_window: Duration,
    pub max_voices: usize,
    pub pan_layout: PanLayout,
}

impl Default for EngineTunables {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEBOUNCE_MS),
            frame_window: Duration::from_millis(FRAME_WINDOW_MS),
            max_voices: MAX_SIMULTANEOUS_VOICES,
            pan_layout: PanLayout::default(),
        }
    }
}

impl EngineTunables {
    pub fn debounce_ms(&self) -> u64 {
        self.debounce.as_millis() as u64
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_voices == 0 {
            return Err(Error::Config(
                "max_voices must be at least 1; a zero cap would never play anything".to_string(),
            ));
        }
        if self.frame_window.is_zero() {
            return Err(Error::Config(
                "frame_window must be non-zero; every decode event would flush alone".to_string(),
            ));
        }
        Ok(())
    }
}

/// Everything the engine façade needs to bootstrap.
#[derive(Clone)]
pub struct EngineConfig {
    pub catalog_source: Arc<dyn CatalogSource>,
    pub media_fetcher: Arc<dyn MediaFetcher>,
    pub decode_backend: Arc<dyn AudioDecodeBackend>,
    pub playback_sink: Arc<dyn PlaybackSink>,
    pub notifier: Arc<dyn HitNotifier>,
    pub decode_engine: Arc<dyn DecodeEngine>,
    pub device_enumerator: Arc<dyn CaptureDeviceEnumerator>,
    pub clock: Arc<dyn Clock>,
    pub tunables: EngineTunables,
    pub scan_config: ScanConfig,
    /// Facing used when a capture request does not name one.
    pub default_facing: FacingMode,
    pub event_buffer_size: usize,
    /// Fetch and decode every catalog media key during bootstrap.
    pub preload_media: bool,
}

impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("catalog_source", &self.catalog_source.describe())
            .field("tunables", &self.tunables)
            .field("scan_config", &self.scan_config)
            .field("default_facing", &self.default_facing)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("preload_media", &self.preload_media)
            .finish_non_exhaustive()
    }
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        self.tunables.validate()?;
        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "event_buffer_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn missing(capability: &str, message: &str) -> Error {
    Error::CapabilityMissing {
        capability: capability.to_string(),
        message: message.to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn default_notifier() -> Result<Arc<dyn HitNotifier>> {
    Ok(Arc::new(bridge_desktop::LogNotifier::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn default_notifier() -> Result<Arc<dyn HitNotifier>> {
    Err(missing(
        "HitNotifier",
        "A HitNotifier is required to surface played hits. \
         Desktop: enable the 'desktop-shims' feature to use the tracing-backed LogNotifier.",
    ))
}

#[cfg(feature = "desktop-shims")]
fn default_media_fetcher() -> Result<Arc<dyn MediaFetcher>> {
    let fetcher = bridge_desktop::ReqwestMediaFetcher::new().map_err(|e| {
        Error::Internal(format!("Failed to create default HTTP media fetcher: {}", e))
    })?;
    Ok(Arc::new(fetcher))
}

#[cfg(not(feature = "desktop-shims"))]
fn default_media_fetcher() -> Result<Arc<dyn MediaFetcher>> {
    Err(missing(
        "MediaFetcher",
        "A MediaFetcher is required to download audio payloads. \
         Desktop: enable the 'desktop-shims' feature to use the reqwest-backed fetcher.",
    ))
}

/// Builder for [`EngineConfig`].
#[derive(Default)]
pub struct EngineConfigBuilder {
    catalog_source: Option<Arc<dyn CatalogSource>>,
    media_fetcher: Option<Arc<dyn MediaFetcher>>,
    decode_backend: Option<Arc<dyn AudioDecodeBackend>>,
    playback_sink: Option<Arc<dyn PlaybackSink>>,
    notifier: Option<Arc<dyn HitNotifier>>,
    decode_engine: Option<Arc<dyn DecodeEngine>>,
    device_enumerator: Option<Arc<dyn CaptureDeviceEnumerator>>,
    clock: Option<Arc<dyn Clock>>,
    tunables: Option<EngineTunables>,
    pan_layout: Option<PanLayout>,
    scan_config: Option<ScanConfig>,
    default_facing: Option<FacingMode>,
    event_buffer_size: Option<usize>,
    preload_media: bool,
}

impl EngineConfigBuilder {
    pub fn catalog_source(mut self, source: Arc<dyn CatalogSource>) -> Self {
        self.catalog_source = Some(source);
        self
    }

    /// When omitted under `desktop-shims`, a `ReqwestMediaFetcher` without a
    /// base URL is used. It only resolves absolute `http(s)` keys; catalogs
    /// with relative keys such as `sounds/C.mp3` need a fetcher built with
    /// `with_base_url` or a `TokioFileFetcher`.
    pub fn media_fetcher(mut self, fetcher: Arc<dyn MediaFetcher>) -> Self {
        self.media_fetcher = Some(fetcher);
        self
    }

    /// Any direct-completion decoder. Callback-style decoders are wrapped with
    /// `core_playback::CallbackDecoder` first.
    pub fn decode_backend(mut self, backend: Arc<dyn AudioDecodeBackend>) -> Self {
        self.decode_backend = Some(backend);
        self
    }

    pub fn playback_sink(mut self, sink: Arc<dyn PlaybackSink>) -> Self {
        self.playback_sink = Some(sink);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn HitNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn decode_engine(mut self, engine: Arc<dyn DecodeEngine>) -> Self {
        self.decode_engine = Some(engine);
        self
    }

    pub fn device_enumerator(mut self, enumerator: Arc<dyn CaptureDeviceEnumerator>) -> Self {
        self.device_enumerator = Some(enumerator);
        self
    }

    /// Override the monotonic clock (tests use `ManualClock`).
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn tunables(mut self, tunables: EngineTunables) -> Self {
        self.tunables = Some(tunables);
        self
    }

    /// Overrides the layout carried by [`Self::tunables`] regardless of call
    /// order.
    pub fn pan_layout(mut self, layout: PanLayout) -> Self {
        self.pan_layout = Some(layout);
        self
    }

    pub fn scan_config(mut self, config: ScanConfig) -> Self {
        self.scan_config = Some(config);
        self
    }

    pub fn default_facing(mut self, facing: FacingMode) -> Self {
        self.default_facing = Some(facing);
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn preload_media(mut self, enabled: bool) -> Self {
        self.preload_media = enabled;
        self
    }

    /// Assemble and validate the configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] when a required bridge was not provided
    ///   and no desktop default applies
    /// - [`Error::Config`] when the tunables are invalid
    pub fn build(self) -> Result<EngineConfig> {
        let catalog_source = self.catalog_source.ok_or_else(|| {
            missing(
                "CatalogSource",
                "A CatalogSource is required; the engine cannot correlate without a catalog.",
            )
        })?;

        let media_fetcher = match self.media_fetcher {
            Some(fetcher) => fetcher,
            None => default_media_fetcher()?,
        };

        let decode_backend = self.decode_backend.ok_or_else(|| {
            missing(
                "AudioDecodeBackend",
                "An audio decoder is required. Use core_playback::SymphoniaBackend \
                 or wrap a callback decoder in core_playback::CallbackDecoder.",
            )
        })?;

        let playback_sink = self.playback_sink.ok_or_else(|| {
            missing(
                "PlaybackSink",
                "A PlaybackSink is required to render voices.",
            )
        })?;

        let notifier = match self.notifier {
            Some(notifier) => notifier,
            None => default_notifier()?,
        };

        let decode_engine = self.decode_engine.ok_or_else(|| {
            missing(
                "DecodeEngine",
                "A DecodeEngine is required to feed decoded text from the camera.",
            )
        })?;

        let device_enumerator = self.device_enumerator.ok_or_else(|| {
            missing(
                "CaptureDeviceEnumerator",
                "A CaptureDeviceEnumerator is required to choose a camera.",
            )
        })?;

        let mut tunables = self.tunables.unwrap_or_default();
        if let Some(layout) = self.pan_layout {
            tunables.pan_layout = layout;
        }

        let config = EngineConfig {
            catalog_source,
            media_fetcher,
            decode_backend,
            playback_sink,
            notifier,
            decode_engine,
            device_enumerator,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock::new())),
            tunables,
            scan_config: self.scan_config.unwrap_or_default(),
            default_facing: self.default_facing.unwrap_or(FacingMode::Environment),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            preload_media: self.preload_media,
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{
        CaptureDeviceInfo, CaptureTarget, DecodeErrorCallback, DecodedBuffer, DecodedCallback,
        ManualClock,
    };
    use bytes::Bytes;

    struct StubBridges;

    #[async_trait]
    impl CatalogSource for StubBridges {
        async fn load_document(&self) -> BridgeResult<Bytes> {
            Ok(Bytes::from_static(b"[]"))
        }
    }

    #[async_trait]
    impl MediaFetcher for StubBridges {
        async fn fetch(&self, _key: &str) -> BridgeResult<Bytes> {
            Ok(Bytes::new())
        }
    }

    #[async_trait]
    impl AudioDecodeBackend for StubBridges {
        async fn decode(&self, _key: &str, _payload: Bytes) -> BridgeResult<DecodedBuffer> {
            Ok(DecodedBuffer::new(vec![0.0f32; 2], 8000, 1))
        }
    }

    impl PlaybackSink for StubBridges {
        fn play(&self, _buffer: DecodedBuffer, _pan: f32, _start_offset: Duration) {}
    }

    impl HitNotifier for StubBridges {
        fn notify(&self, _label: &str, _role: &str) {}
    }

    #[async_trait]
    impl DecodeEngine for StubBridges {
        async fn start(
            &self,
            _target: CaptureTarget,
            _config: ScanConfig,
            _on_decoded: DecodedCallback,
            _on_error: DecodeErrorCallback,
        ) -> BridgeResult<()> {
            Ok(())
        }

        async fn stop(&self) -> BridgeResult<()> {
            Ok(())
        }

        async fn clear(&self) -> BridgeResult<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl CaptureDeviceEnumerator for StubBridges {
        async fn enumerate(&self) -> BridgeResult<Vec<CaptureDeviceInfo>> {
            Ok(Vec::new())
        }
    }

    fn complete_builder() -> EngineConfigBuilder {
        let stub = Arc::new(StubBridges);
        EngineConfig::builder()
            .catalog_source(stub.clone())
            .media_fetcher(stub.clone())
            .decode_backend(stub.clone())
            .playback_sink(stub.clone())
            .notifier(stub.clone())
            .decode_engine(stub.clone())
            .device_enumerator(stub)
    }

    #[test]
    fn tunable_defaults_match_constants() {
        let tunables = EngineTunables::default();
        assert_eq!(tunables.debounce_ms(), 700);
        assert_eq!(tunables.frame_window, Duration::from_millis(120));
        assert_eq!(tunables.max_voices, 6);
        assert_eq!(tunables.pan_layout, PanLayout::LinearSpread);
    }

    #[test]
    fn linear_spread_pans() {
        let layout = PanLayout::LinearSpread;
        assert_eq!(layout.pan(0, 1), -1.0);
        assert_eq!(layout.pan(0, 2), -1.0);
        assert_eq!(layout.pan(1, 2), 1.0);
        assert_eq!(layout.pan(1, 3), 0.0);
        assert!((layout.pan(1, 6) - (-0.6)).abs() < 1e-6);
    }

    #[test]
    fn center_single_only_changes_lone_voice() {
        let layout = PanLayout::CenterSingle;
        assert_eq!(layout.pan(0, 1), 0.0);
        assert_eq!(layout.pan(0, 3), -1.0);
        assert_eq!(layout.pan(2, 3), 1.0);
    }

    #[test]
    fn builds_with_all_bridges() {
        let config = complete_builder().build().unwrap();
        assert_eq!(config.tunables, EngineTunables::default());
        assert_eq!(config.scan_config, ScanConfig::default());
        assert_eq!(config.default_facing, FacingMode::Environment);
        assert_eq!(config.event_buffer_size, DEFAULT_EVENT_BUFFER_SIZE);
        assert!(!config.preload_media);
    }

    #[test]
    fn missing_catalog_source_is_reported() {
        let stub = Arc::new(StubBridges);
        let err = EngineConfig::builder()
            .media_fetcher(stub)
            .build()
            .unwrap_err();
        match err {
            Error::CapabilityMissing { capability, .. } => assert_eq!(capability, "CatalogSource"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_decode_engine_is_reported() {
        let stub = Arc::new(StubBridges);
        let err = EngineConfig::builder()
            .catalog_source(stub.clone())
            .media_fetcher(stub.clone())
            .decode_backend(stub.clone())
            .playback_sink(stub.clone())
            .notifier(stub)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            Error::CapabilityMissing { ref capability, .. } if capability == "DecodeEngine"
        ));
    }

    #[test]
    fn rejects_zero_voice_cap() {
        let tunables = EngineTunables {
            max_voices: 0,
            ..EngineTunables::default()
        };
        let err = complete_builder().tunables(tunables).build().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn rejects_zero_frame_window() {
        let tunables = EngineTunables {
            frame_window: Duration::ZERO,
            ..EngineTunables::default()
        };
        assert!(tunables.validate().is_err());
    }

    #[test]
    fn pan_layout_override_keeps_other_tunables() {
        let config = complete_builder()
            .pan_layout(PanLayout::CenterSingle)
            .build()
            .unwrap();
        assert_eq!(config.tunables.pan_layout, PanLayout::CenterSingle);
        assert_eq!(config.tunables.max_voices, MAX_SIMULTANEOUS_VOICES);
    }

    #[test]
    fn pan_layout_survives_tunables_in_either_order() {
        let custom = EngineTunables {
            max_voices: 3,
            ..EngineTunables::default()
        };

        let layout_first = complete_builder()
            .pan_layout(PanLayout::CenterSingle)
            .tunables(custom)
            .build()
            .unwrap();
        assert_eq!(layout_first.tunables.pan_layout, PanLayout::CenterSingle);
        assert_eq!(layout_first.tunables.max_voices, 3);

        let tunables_first = complete_builder()
            .tunables(custom)
            .pan_layout(PanLayout::CenterSingle)
            .build()
            .unwrap();
        assert_eq!(tunables_first.tunables.pan_layout, PanLayout::CenterSingle);
        assert_eq!(tunables_first.tunables.max_voices, 3);
    }

    #[test]
    fn tunables_layout_applies_without_override() {
        let custom = EngineTunables {
            pan_layout: PanLayout::CenterSingle,
            ..EngineTunables::default()
        };
        let config = complete_builder().tunables(custom).build().unwrap();
        assert_eq!(config.tunables.pan_layout, PanLayout::CenterSingle);
    }

    #[test]
    fn custom_clock_is_used() {
        let clock = Arc::new(ManualClock::new(42));
        let config = complete_builder().clock(clock).build().unwrap();
        assert_eq!(config.clock.now_millis(), 42);
    }

    #[test]
    fn debug_output_omits_bridges() {
        let config = complete_builder().preload_media(true).build().unwrap();
        let rendered = format!("{config:?}");
        assert!(rendered.contains("preload_media: true"));
        assert!(rendered.contains("catalog"));
    }
}
