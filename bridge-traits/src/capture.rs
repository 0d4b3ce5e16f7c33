//! Capture device and decode engine abstractions.
//!
//! The host owns the camera and the code scanner; the core only chooses which
//! device to open and receives decoded text through callbacks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::Result;

/// Kind of media device reported by enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    VideoInput,
    AudioInput,
    AudioOutput,
    Other(String),
}

/// One enumerated device.
///
/// `label` is empty on hosts that hide device names until camera permission
/// has been granted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureDeviceInfo {
    pub kind: DeviceKind,
    pub label: String,
    pub device_id: String,
}

impl CaptureDeviceInfo {
    pub fn video(label: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self {
            kind: DeviceKind::VideoInput,
            label: label.into(),
            device_id: device_id.into(),
        }
    }

    pub fn is_video_input(&self) -> bool {
        self.kind == DeviceKind::VideoInput
    }
}

/// Camera facing preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Front / selfie camera.
    User,
    /// Rear / world-facing camera.
    Environment,
}

impl FacingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FacingMode::User => "user",
            FacingMode::Environment => "environment",
        }
    }

    pub fn opposite(&self) -> FacingMode {
        match self {
            FacingMode::User => FacingMode::Environment,
            FacingMode::Environment => FacingMode::User,
        }
    }
}

impl fmt::Display for FacingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FacingMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" | "front" => Ok(FacingMode::User),
            "environment" | "rear" | "back" => Ok(FacingMode::Environment),
            other => Err(format!("unknown facing mode: {other}")),
        }
    }
}

/// What the decode engine should open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureTarget {
    /// A concrete device handle from enumeration.
    Device { device_id: String },
    /// Generic facing-mode request; the host picks the device.
    Facing(FacingMode),
}

impl fmt::Display for CaptureTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureTarget::Device { device_id } => write!(f, "device:{device_id}"),
            CaptureTarget::Facing(mode) => write!(f, "facing:{mode}"),
        }
    }
}

/// Scanner options forwarded to the decode engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Decode attempts per second.
    pub scan_rate_hint: u32,
    /// Edge length in pixels of the square scan region.
    pub scan_region_hint: u32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            scan_rate_hint: 10,
            scan_region_hint: 250,
        }
    }
}

/// Invoked with each decoded text, possibly many times per frame.
pub type DecodedCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Invoked with per-frame decode errors. These are routine (no code in view)
/// and are not capture failures.
pub type DecodeErrorCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Camera-fed code scanner owned by the host.
#[async_trait]
pub trait DecodeEngine: Send + Sync {
    /// Open `target` and start decoding. Fails if the device cannot be opened.
    async fn start(
        &self,
        target: CaptureTarget,
        config: ScanConfig,
        on_decoded: DecodedCallback,
        on_error: DecodeErrorCallback,
    ) -> Result<()>;

    /// Stop decoding and release the device.
    async fn stop(&self) -> Result<()>;

    /// Clear any scanner UI left behind after stopping.
    async fn clear(&self) -> Result<()>;
}

/// Lists the host's media devices.
#[async_trait]
pub trait CaptureDeviceEnumerator: Send + Sync {
    async fn enumerate(&self) -> Result<Vec<CaptureDeviceInfo>>;
}
