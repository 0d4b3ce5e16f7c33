//! Voice allocation: pan spread, failure skipping and sink hand-off.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::{AudioDecodeBackend, DecodedBuffer, HitNotifier, MediaFetcher, PlaybackSink};
use bytes::Bytes;
use core_catalog::MediaDescriptor;
use core_playback::{MediaCache, PlaybackError, VoiceAllocator};
use core_runtime::config::PanLayout;
use mockall::mock;
use mockall::predicate::eq;
use parking_lot::Mutex;

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

struct LengthDecoder;

#[async_trait]
impl AudioDecodeBackend for LengthDecoder {
    async fn decode(&self, _key: &str, payload: Bytes) -> BridgeResult<DecodedBuffer> {
        Ok(DecodedBuffer::new(vec![0.25f32; payload.len()], 8000, 1))
    }
}

#[derive(Default)]
struct RecordingSink {
    played: Mutex<Vec<(usize, f32, Duration)>>,
}

impl RecordingSink {
    fn pans(&self) -> Vec<f32> {
        self.played.lock().iter().map(|(_, pan, _)| *pan).collect()
    }
}

impl PlaybackSink for RecordingSink {
    fn play(&self, buffer: DecodedBuffer, pan: f32, start_offset: Duration) {
        self.played.lock().push((buffer.frames(), pan, start_offset));
    }
}

mock! {
    Notifier {}

    impl HitNotifier for Notifier {
        fn notify(&self, label: &str, role: &str);
    }
}

fn descriptor(id: &str, media_key: &str) -> Arc<MediaDescriptor> {
    Arc::new(MediaDescriptor::new(id, format!("Label {id}"), "tone", media_key))
}

fn allocator(sink: Arc<RecordingSink>, notifier: MockNotifier) -> VoiceAllocator {
    let cache = Arc::new(MediaCache::new(Arc::new(KeyFetcher), Arc::new(LengthDecoder)));
    VoiceAllocator::new(cache, sink, Arc::new(notifier))
}

fn quiet_notifier() -> MockNotifier {
    let mut notifier = MockNotifier::new();
    notifier.expect_notify().return_const(());
    notifier
}

#[tokio::test]
async fn three_voices_spread_left_center_right() {
    let sink = Arc::new(RecordingSink::default());
    let allocator = allocator(sink.clone(), quiet_notifier());

    let playable = vec![
        descriptor("qr-001", "sounds/C.mp3"),
        descriptor("qr-002", "sounds/E.mp3"),
        descriptor("qr-003", "sounds/G.mp3"),
    ];
    let report = allocator.allocate(&playable).await;

    assert_eq!(sink.pans(), vec![-1.0, 0.0, 1.0]);
    assert!(report.failed.is_empty());
    let ids: Vec<&str> = report.started.iter().map(|v| v.descriptor.id.as_str()).collect();
    assert_eq!(ids, vec!["qr-001", "qr-002", "qr-003"]);
    assert!(sink
        .played
        .lock()
        .iter()
        .all(|(_, _, offset)| *offset == Duration::ZERO));
}

#[tokio::test]
async fn failed_load_is_skipped_and_pans_recomputed() {
    let sink = Arc::new(RecordingSink::default());
    let allocator = allocator(sink.clone(), quiet_notifier());

    let playable = vec![
        descriptor("qr-001", "sounds/C.mp3"),
        descriptor("qr-404", "missing/X.mp3"),
        descriptor("qr-003", "sounds/G.mp3"),
    ];
    let report = allocator.allocate(&playable).await;

    assert_eq!(sink.pans(), vec![-1.0, 1.0]);
    assert_eq!(report.started.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].descriptor.id, "qr-404");
    assert!(matches!(
        report.failed[0].error,
        PlaybackError::MediaLoad { .. }
    ));
}

#[tokio::test]
async fn single_voice_pan_follows_layout() {
    let sink = Arc::new(RecordingSink::default());
    let linear = allocator(sink.clone(), quiet_notifier());
    linear
        .allocate(&[descriptor("qr-001", "sounds/C.mp3")])
        .await;
    assert_eq!(sink.pans(), vec![-1.0]);

    let centered_sink = Arc::new(RecordingSink::default());
    let centered =
        allocator(centered_sink.clone(), quiet_notifier()).with_layout(PanLayout::CenterSingle);
    assert_eq!(centered.layout(), PanLayout::CenterSingle);
    centered
        .allocate(&[descriptor("qr-001", "sounds/C.mp3")])
        .await;
    assert_eq!(centered_sink.pans(), vec![0.0]);
}

#[tokio::test]
async fn notifies_once_per_started_voice() {
    let mut notifier = MockNotifier::new();
    notifier
        .expect_notify()
        .with(eq("Label qr-001"), eq("tone"))
        .times(1)
        .return_const(());
    notifier
        .expect_notify()
        .with(eq("Label qr-002"), eq("tone"))
        .times(1)
        .return_const(());

    let sink = Arc::new(RecordingSink::default());
    let allocator = allocator(sink.clone(), notifier);

    allocator
        .allocate(&[
            descriptor("qr-001", "sounds/C.mp3"),
            descriptor("qr-002", "sounds/E.mp3"),
            descriptor("qr-009", "missing/Z.mp3"),
        ])
        .await;

    assert_eq!(sink.played.lock().len(), 2);
}

#[tokio::test]
async fn empty_set_touches_nothing() {
    let mut notifier = MockNotifier::new();
    notifier.expect_notify().never();
    let sink = Arc::new(RecordingSink::default());
    let allocator = allocator(sink.clone(), notifier);

    let report = allocator.allocate(&[]).await;

    assert!(report.is_empty());
    assert!(sink.played.lock().is_empty());
}

#[tokio::test]
async fn shared_media_key_loads_once() {
    let sink = Arc::new(RecordingSink::default());
    let allocator = allocator(sink.clone(), quiet_notifier());

    allocator
        .allocate(&[
            descriptor("qr-001", "sounds/C.mp3"),
            descriptor("qr-101", "sounds/C.mp3"),
        ])
        .await;

    let stats = allocator.cache().stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.requests(), 2);
    assert_eq!(allocator.cache().len(), 1);
    assert_eq!(sink.pans(), vec![-1.0, 1.0]);
}
