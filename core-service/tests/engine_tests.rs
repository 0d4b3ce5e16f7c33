//! End-to-end behaviour of the engine façade against in-memory bridges.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::{
    AudioDecodeBackend, CaptureDeviceEnumerator, CaptureDeviceInfo, CaptureTarget, CatalogSource,
    DecodeEngine, DecodeErrorCallback, DecodedBuffer, DecodedCallback, FacingMode, HitNotifier,
    ManualClock, MediaFetcher, PlaybackSink, ScanConfig,
};
use bytes::Bytes;
use core_capture::CaptureState;
use core_catalog::CatalogError;
use core_runtime::config::EngineConfig;
use core_runtime::events::{CoreEvent, PlaybackEvent, Receiver, ScanEvent};
use core_service::{CoreError, ScanEngine};
use parking_lot::Mutex;

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

struct JsonCatalog(Result<String, ()>);

#[async_trait]
impl CatalogSource for JsonCatalog {
    async fn load_document(&self) -> BridgeResult<Bytes> {
        match &self.0 {
            Ok(document) => Ok(Bytes::from(document.clone())),
            Err(()) => Err(BridgeError::OperationFailed("connection refused".into())),
        }
    }

    fn describe(&self) -> String {
        "test catalog".to_string()
    }
}

struct KeyFetcher;

#[async_trait]
impl MediaFetcher for KeyFetcher {
    async fn fetch(&self, key: &str) -> BridgeResult<Bytes> {
        if key.starts_with("missing/") {
            return Err(BridgeError::NotFound(key.to_string()));
        }
        Ok(Bytes::from(key.as_bytes().to_vec()))
    }
}

/// Serves every key after a fixed delay, so allocations outlive a window.
struct SlowFetcher(Duration);

#[async_trait]
impl MediaFetcher for SlowFetcher {
    async fn fetch(&self, key: &str) -> BridgeResult<Bytes> {
        tokio::time::sleep(self.0).await;
        Ok(Bytes::from(key.as_bytes().to_vec()))
    }
}

struct LengthDecoder;

#[async_trait]
impl AudioDecodeBackend for LengthDecoder {
    async fn decode(&self, _key: &str, payload: Bytes) -> BridgeResult<DecodedBuffer> {
        Ok(DecodedBuffer::new(vec![0.1f32; payload.len()], 8000, 1))
    }
}

#[derive(Default)]
struct RecordingSink {
    pans: Mutex<Vec<f32>>,
}

impl PlaybackSink for RecordingSink {
    fn play(&self, _buffer: DecodedBuffer, pan: f32, _start_offset: Duration) {
        self.pans.lock().push(pan);
    }
}

#[derive(Default)]
struct RecordingNotifier {
    hits: Mutex<Vec<(String, String)>>,
}

impl HitNotifier for RecordingNotifier {
    fn notify(&self, label: &str, role: &str) {
        self.hits.lock().push((label.to_string(), role.to_string()));
    }
}

#[derive(Default)]
struct FakeScanner {
    on_decoded: Mutex<Option<DecodedCallback>>,
    targets: Mutex<Vec<CaptureTarget>>,
}

impl FakeScanner {
    fn decode(&self, text: &str) {
        let callback = self.on_decoded.lock().clone();
        if let Some(callback) = callback {
            callback(text.to_string());
        }
    }
}

#[async_trait]
impl DecodeEngine for FakeScanner {
    async fn start(
        &self,
        target: CaptureTarget,
        _config: ScanConfig,
        on_decoded: DecodedCallback,
        _on_error: DecodeErrorCallback,
    ) -> BridgeResult<()> {
        self.targets.lock().push(target);
        *self.on_decoded.lock() = Some(on_decoded);
        Ok(())
    }

    async fn stop(&self) -> BridgeResult<()> {
        *self.on_decoded.lock() = None;
        Ok(())
    }

    async fn clear(&self) -> BridgeResult<()> {
        Ok(())
    }
}

struct FrontBack;

#[async_trait]
impl CaptureDeviceEnumerator for FrontBack {
    async fn enumerate(&self) -> BridgeResult<Vec<CaptureDeviceInfo>> {
        Ok(vec![
            CaptureDeviceInfo::video("Front Camera", "cam-front"),
            CaptureDeviceInfo::video("Back Camera", "cam-back"),
        ])
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// Eight playable tones plus one entry whose media is missing.
fn catalog_document() -> String {
    let mut records: Vec<String> = (1..=8)
        .map(|n| {
            format!(
                r#"{{"id":"qr-00{n}","label":"Tone {n}","role":"melody","mediaKey":"sounds/{n}.mp3"}}"#
            )
        })
        .collect();
    records.push(
        r#"{"id":"qr-009","label":"Ghost","role":"fx","mediaKey":"missing/ghost.mp3"}"#.to_string(),
    );
    format!("[{}]", records.join(","))
}

struct Harness {
    sink: Arc<RecordingSink>,
    notifier: Arc<RecordingNotifier>,
    scanner: Arc<FakeScanner>,
    clock: Arc<ManualClock>,
}

impl Harness {
    fn new() -> Self {
        Self {
            sink: Arc::new(RecordingSink::default()),
            notifier: Arc::new(RecordingNotifier::default()),
            scanner: Arc::new(FakeScanner::default()),
            clock: Arc::new(ManualClock::new(0)),
        }
    }

    fn config(&self, catalog: JsonCatalog, preload: bool) -> EngineConfig {
        self.config_with_fetcher(catalog, Arc::new(KeyFetcher), preload)
    }

    fn config_with_fetcher(
        &self,
        catalog: JsonCatalog,
        fetcher: Arc<dyn MediaFetcher>,
        preload: bool,
    ) -> EngineConfig {
        EngineConfig::builder()
            .catalog_source(Arc::new(catalog))
            .media_fetcher(fetcher)
            .decode_backend(Arc::new(LengthDecoder))
            .playback_sink(self.sink.clone())
            .notifier(self.notifier.clone())
            .decode_engine(self.scanner.clone())
            .device_enumerator(Arc::new(FrontBack))
            .clock(self.clock.clone())
            .preload_media(preload)
            .build()
            .unwrap()
    }

    async fn engine(&self) -> ScanEngine {
        ScanEngine::bootstrap(self.config(JsonCatalog(Ok(catalog_document())), false))
            .await
            .unwrap()
    }
}

async fn next_matching<F>(events: &mut Receiver<CoreEvent>, mut predicate: F) -> CoreEvent
where
    F: FnMut(&CoreEvent) -> bool,
{
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event bus closed");
        if predicate(&event) {
            return event;
        }
    }
}

async fn next_batch(events: &mut Receiver<CoreEvent>) -> ScanEvent {
    match next_matching(events, |e| {
        matches!(e, CoreEvent::Scan(ScanEvent::BatchCorrelated { .. }))
    })
    .await
    {
        CoreEvent::Scan(event) => event,
        other => panic!("unexpected event {other:?}"),
    }
}

async fn next_voice(events: &mut Receiver<CoreEvent>) -> PlaybackEvent {
    match next_matching(events, |e| {
        matches!(e, CoreEvent::Playback(PlaybackEvent::VoiceStarted { .. }))
    })
    .await
    {
        CoreEvent::Playback(event) => event,
        other => panic!("unexpected event {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unreachable_catalog_is_fatal() {
    let harness = Harness::new();
    let err = ScanEngine::bootstrap(harness.config(JsonCatalog(Err(())), false))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::Catalog(CatalogError::Unreachable { .. })
    ));
}

#[tokio::test]
async fn malformed_catalog_is_fatal() {
    let harness = Harness::new();
    let err = ScanEngine::bootstrap(harness.config(JsonCatalog(Ok("{oops".into())), false))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Catalog(CatalogError::Malformed(_))));
}

#[tokio::test(start_paused = true)]
async fn repeated_code_in_one_window_plays_once() {
    let harness = Harness::new();
    let engine = harness.engine().await;
    let mut events = engine.subscribe();

    for raw in ["qr-001", "qr-001", " qr-001 ", "not-a-code", ""] {
        engine.push_decoded(raw);
    }

    assert_eq!(
        next_batch(&mut events).await,
        ScanEvent::BatchCorrelated {
            window_id: 1,
            raw_count: 5,
            playable: vec!["qr-001".to_string()],
            unknown: 1,
            cooling: 0,
        }
    );
    assert_eq!(
        next_voice(&mut events).await,
        PlaybackEvent::VoiceStarted {
            id: "qr-001".to_string(),
            label: "Tone 1".to_string(),
            role: "melody".to_string(),
            pan: -1.0,
        }
    );
    assert_eq!(*harness.sink.pans.lock(), vec![-1.0]);
    assert_eq!(
        *harness.notifier.hits.lock(),
        vec![("Tone 1".to_string(), "melody".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn cooldown_spans_windows() {
    let harness = Harness::new();
    let engine = harness.engine().await;
    let mut events = engine.subscribe();

    engine.push_decoded("qr-001");
    next_voice(&mut events).await;

    harness.clock.set(500);
    engine.push_decoded("qr-001");
    match next_batch(&mut events).await {
        ScanEvent::BatchCorrelated {
            playable, cooling, ..
        } => {
            assert!(playable.is_empty());
            assert_eq!(cooling, 1);
        }
        other => panic!("unexpected {other:?}"),
    }

    harness.clock.set(800);
    engine.push_decoded("qr-001");
    match next_batch(&mut events).await {
        ScanEvent::BatchCorrelated { playable, .. } => assert_eq!(playable, vec!["qr-001"]),
        other => panic!("unexpected {other:?}"),
    }
    next_voice(&mut events).await;

    assert_eq!(harness.sink.pans.lock().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn pending_load_does_not_let_a_later_window_retrigger() {
    let harness = Harness::new();
    let config = harness.config_with_fetcher(
        JsonCatalog(Ok(catalog_document())),
        Arc::new(SlowFetcher(Duration::from_secs(3))),
        false,
    );
    let engine = ScanEngine::bootstrap(config).await.unwrap();
    let mut events = engine.subscribe();

    engine.push_decoded("qr-001");
    match next_batch(&mut events).await {
        ScanEvent::BatchCorrelated { playable, .. } => assert_eq!(playable, vec!["qr-001"]),
        other => panic!("unexpected {other:?}"),
    }

    harness.clock.set(300);
    engine.push_decoded("qr-001");
    engine.push_decoded("qr-002");
    assert_eq!(
        next_batch(&mut events).await,
        ScanEvent::BatchCorrelated {
            window_id: 2,
            raw_count: 2,
            playable: vec!["qr-002".to_string()],
            unknown: 0,
            cooling: 1,
        }
    );
    assert!(harness.sink.pans.lock().is_empty());
    assert!(harness.notifier.hits.lock().is_empty());

    let mut started = Vec::new();
    for _ in 0..2 {
        match next_voice(&mut events).await {
            PlaybackEvent::VoiceStarted { id, .. } => started.push(id),
            other => panic!("unexpected {other:?}"),
        }
    }
    started.sort();
    assert_eq!(started, vec!["qr-001", "qr-002"]);
    assert_eq!(*harness.sink.pans.lock(), vec![-1.0, -1.0]);
}

#[tokio::test(start_paused = true)]
async fn voice_cap_drops_overflow() {
    let harness = Harness::new();
    let engine = harness.engine().await;
    let mut events = engine.subscribe();

    for n in 1..=8 {
        engine.push_decoded(format!("qr-00{n}"));
    }

    let dropped = next_matching(&mut events, |e| {
        matches!(e, CoreEvent::Scan(ScanEvent::VoicesDropped { .. }))
    })
    .await;
    assert_eq!(
        dropped,
        CoreEvent::Scan(ScanEvent::VoicesDropped {
            window_id: 1,
            ids: vec!["qr-007".to_string(), "qr-008".to_string()],
        })
    );

    for _ in 0..6 {
        next_voice(&mut events).await;
    }
    let expected: Vec<f32> = (0..6).map(|i| (i as f32 / 5.0) * 2.0 - 1.0).collect();
    assert_eq!(*harness.sink.pans.lock(), expected);
}

#[tokio::test(start_paused = true)]
async fn failed_media_is_reported_and_skipped() {
    let harness = Harness::new();
    let engine = harness.engine().await;
    let mut events = engine.subscribe();

    engine.push_decoded("qr-009");
    engine.push_decoded("qr-001");

    let failed = next_matching(&mut events, |e| {
        matches!(e, CoreEvent::Playback(PlaybackEvent::MediaLoadFailed { .. }))
    })
    .await;
    match failed {
        CoreEvent::Playback(PlaybackEvent::MediaLoadFailed { id, media_key, .. }) => {
            assert_eq!(id, "qr-009");
            assert_eq!(media_key, "missing/ghost.mp3");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(*harness.sink.pans.lock(), vec![-1.0]);
    assert_eq!(harness.notifier.hits.lock().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn capture_callbacks_feed_the_batcher() {
    let harness = Harness::new();
    let engine = harness.engine().await;
    let mut events = engine.subscribe();

    let active = engine.start_capture(None).await.unwrap();
    assert_eq!(
        active.target,
        CaptureTarget::Device {
            device_id: "cam-back".to_string()
        }
    );
    assert_eq!(engine.capture_state(), CaptureState::Running);

    harness.scanner.decode("qr-002");
    match next_voice(&mut events).await {
        PlaybackEvent::VoiceStarted { id, .. } => assert_eq!(id, "qr-002"),
        other => panic!("unexpected {other:?}"),
    }

    let switched = engine.switch_capture(FacingMode::User).await.unwrap();
    assert_eq!(
        switched.target,
        CaptureTarget::Device {
            device_id: "cam-front".to_string()
        }
    );
    assert_eq!(harness.scanner.targets.lock().len(), 2);

    engine.stop_capture().await.unwrap();
    assert_eq!(*engine.subscribe_capture_state().borrow(), CaptureState::Idle);
}

#[tokio::test(start_paused = true)]
async fn external_callback_pushes_decoded_text() {
    let harness = Harness::new();
    let engine = harness.engine().await;
    let mut events = engine.subscribe();

    let callback = engine.decoded_callback();
    std::thread::spawn(move || callback("qr-003".to_string()))
        .join()
        .unwrap();

    match next_voice(&mut events).await {
        PlaybackEvent::VoiceStarted { id, .. } => assert_eq!(id, "qr-003"),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn preload_warms_every_catalog_key() {
    let harness = Harness::new();
    let engine = ScanEngine::bootstrap(harness.config(JsonCatalog(Ok(catalog_document())), true))
        .await
        .unwrap();

    let stats = engine.cache_stats();
    assert_eq!(stats.ready, 8);
    assert_eq!(stats.failures, 1);
    assert_eq!(engine.catalog().len(), 9);
}

#[tokio::test]
async fn shutdown_stops_everything() {
    let harness = Harness::new();
    let engine = harness.engine().await;

    engine.start_capture(Some(FacingMode::User)).await.unwrap();
    engine.shutdown().await;
    engine.shutdown().await;

    assert!(engine.is_shut_down());
    assert_eq!(engine.capture_state(), CaptureState::Idle);
    assert!(matches!(
        engine.start_capture(None).await,
        Err(CoreError::ShutDown)
    ));

    engine.push_decoded("qr-001");
    assert!(harness.sink.pans.lock().is_empty());
}
