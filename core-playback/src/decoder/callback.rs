use std::sync::Arc;

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::{
    AudioDecodeBackend, CallbackDecodeBackend, DecodeFailure, DecodeSuccess, DecodedBuffer,
};
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::oneshot;

type Completion = oneshot::Sender<BridgeResult<DecodedBuffer>>;

/// Exposes a [`CallbackDecodeBackend`] as an [`AudioDecodeBackend`].
///
/// Both callbacks share one completion slot; whichever runs first resolves
/// the decode and the other becomes a no-op. If the backend drops both
/// without calling either, the decode fails.
#[derive(Clone)]
pub struct CallbackDecoder {
    backend: Arc<dyn CallbackDecodeBackend>,
}

impl CallbackDecoder {
    pub fn new(backend: Arc<dyn CallbackDecodeBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl AudioDecodeBackend for CallbackDecoder {
    async fn decode(&self, key: &str, payload: Bytes) -> BridgeResult<DecodedBuffer> {
        let (tx, rx) = oneshot::channel();
        let slot: Arc<Mutex<Option<Completion>>> = Arc::new(Mutex::new(Some(tx)));

        let success_slot = Arc::clone(&slot);
        let on_success: DecodeSuccess = Box::new(move |buffer| {
            if let Some(tx) = success_slot.lock().take() {
                let _ = tx.send(Ok(buffer));
            }
        });
        let on_error: DecodeFailure = Box::new(move |error| {
            if let Some(tx) = slot.lock().take() {
                let _ = tx.send(Err(error));
            }
        });

        self.backend
            .decode_with_callbacks(key, payload, on_success, on_error);

        rx.await.map_err(|_| {
            BridgeError::OperationFailed("decoder dropped both completion callbacks".to_string())
        })?
    }
}
