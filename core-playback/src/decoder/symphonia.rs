//! # Symphonia Decoder
//!
//! Decodes a complete in-memory payload into one [`DecodedBuffer`]. Scan
//! sounds are short clips, so the whole clip is decoded up front instead of
//! streamed.

use std::io::Cursor;

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::{AudioDecodeBackend, DecodedBuffer};
use bytes::Bytes;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::error::{PlaybackError, Result};

/// Consecutive corrupt packets tolerated before the payload is rejected.
const MAX_CONSECUTIVE_ERRORS: usize = 10;

/// In-process decoder backed by symphonia. Runs on the blocking pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaBackend;

impl SymphoniaBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AudioDecodeBackend for SymphoniaBackend {
    async fn decode(&self, key: &str, payload: Bytes) -> BridgeResult<DecodedBuffer> {
        let extension = extension_hint(key);
        tokio::task::spawn_blocking(move || decode_payload(payload, extension.as_deref()))
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("decode task failed: {}", e)))?
            .map_err(BridgeError::from)
    }
}

/// File extension of a media key, ignoring any query string.
fn extension_hint(key: &str) -> Option<String> {
    let path = key.split(['?', '#']).next().unwrap_or(key);
    let name = path.rsplit('/').next().unwrap_or(path);
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Decode an entire payload to interleaved `f32`.
pub fn decode_payload(payload: Bytes, extension: Option<&str>) -> Result<DecodedBuffer> {
    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let stream = MediaSourceStream::new(Box::new(Cursor::new(payload)), Default::default());
    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            stream,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| PlaybackError::InvalidFormat(format!("Failed to probe format: {}", e)))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| PlaybackError::InvalidFormat("No audio track found".to_string()))?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
    let mut channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(0);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| PlaybackError::UnsupportedCodec(e.to_string()))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut consecutive_errors = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            // Chained streams: keep what the first one produced.
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                return Err(PlaybackError::InvalidFormat(format!(
                    "Failed to read packet: {}",
                    e
                )))
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                consecutive_errors = 0;
                let spec = *decoded.spec();
                sample_rate = spec.rate;
                channels = spec.channels.count() as u16;

                let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buffer.samples());
            }
            Err(SymphoniaError::DecodeError(err)) => {
                consecutive_errors += 1;
                if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                    return Err(PlaybackError::InvalidFormat(format!(
                        "Too many corrupt packets: {}",
                        err
                    )));
                }
                warn!(consecutive_errors, "Skipping undecodable packet: {}", err);
            }
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => {
                return Err(PlaybackError::InvalidFormat(format!(
                    "Failed to decode packet: {}",
                    e
                )))
            }
        }
    }

    if samples.is_empty() || sample_rate == 0 || channels == 0 {
        return Err(PlaybackError::InvalidFormat(
            "Payload contained no audio frames".to_string(),
        ));
    }

    debug!(
        frames = samples.len() / channels as usize,
        sample_rate, channels, "Payload decoded"
    );
    Ok(DecodedBuffer::new(samples, sample_rate, channels))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 16-bit PCM WAV with `frames` frames of a constant value per channel.
    fn wav(sample_rate: u32, channels: u16, frames: usize, value: i16) -> Vec<u8> {
        let block_align = channels * 2;
        let data_len = (frames * block_align as usize) as u32;
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&channels.to_le_bytes());
        out.extend_from_slice(&sample_rate.to_le_bytes());
        out.extend_from_slice(&(sample_rate * block_align as u32).to_le_bytes());
        out.extend_from_slice(&block_align.to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        for _ in 0..frames * channels as usize {
            out.extend_from_slice(&value.to_le_bytes());
        }
        out
    }

    #[test]
    fn decodes_pcm_wav() {
        let payload = Bytes::from(wav(8000, 2, 800, 16384));
        let buffer = decode_payload(payload, Some("wav")).unwrap();

        assert_eq!(buffer.sample_rate(), 8000);
        assert_eq!(buffer.channels(), 2);
        assert_eq!(buffer.frames(), 800);
        assert!((buffer.samples()[0] - 0.5).abs() < 1e-3);
    }

    #[test]
    fn rejects_garbage() {
        let payload = Bytes::from_static(b"definitely not audio data at all");
        let err = decode_payload(payload, Some("mp3")).unwrap_err();
        assert!(err.is_decode_error());
    }

    #[test]
    fn extension_hint_ignores_query() {
        assert_eq!(extension_hint("sounds/C.MP3?sig=1").as_deref(), Some("mp3"));
        assert_eq!(extension_hint("https://x/y/clip.ogg").as_deref(), Some("ogg"));
        assert_eq!(extension_hint("sounds/noext"), None);
        assert_eq!(extension_hint(".hidden"), None);
    }

    #[tokio::test]
    async fn backend_runs_on_blocking_pool() {
        let backend = SymphoniaBackend::new();
        let buffer = backend
            .decode("tone.wav", Bytes::from(wav(22050, 1, 2205, 0)))
            .await
            .unwrap();
        assert_eq!(buffer.frames(), 2205);
        assert_eq!(buffer.duration().as_millis(), 100);
    }
}
