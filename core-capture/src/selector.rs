//! # Capture Source Selection
//!
//! Hosts rarely tag devices with a facing direction, so selection works off
//! labels. A label containing one of the facing's patterns wins; with no
//! match, enumeration order decides (front cameras tend to be listed first).
//!
//! Labels are empty until camera permission is granted. Unlabeled devices
//! never match a pattern and fall through to the positional rule.

use std::sync::Arc;

use bridge_traits::{CaptureDeviceEnumerator, CaptureDeviceInfo, FacingMode};
use tracing::{debug, instrument, warn};

/// Label fragments identifying a world-facing camera.
pub const REAR_LABEL_PATTERNS: &[&str] = &["back", "rear", "environment", "wide", "ultrawide"];

/// Label fragments identifying a selfie camera.
pub const FRONT_LABEL_PATTERNS: &[&str] = &["front", "user", "selfie"];

fn patterns(facing: FacingMode) -> &'static [&'static str] {
    match facing {
        FacingMode::Environment => REAR_LABEL_PATTERNS,
        FacingMode::User => FRONT_LABEL_PATTERNS,
    }
}

fn label_matches(label: &str, facing: FacingMode) -> bool {
    let label = label.to_lowercase();
    patterns(facing)
        .iter()
        .any(|pattern| label.contains(pattern))
}

/// Resolves a [`FacingMode`] to a concrete video input.
#[derive(Clone)]
pub struct CaptureSelector {
    enumerator: Arc<dyn CaptureDeviceEnumerator>,
}

impl CaptureSelector {
    pub fn new(enumerator: Arc<dyn CaptureDeviceEnumerator>) -> Self {
        Self { enumerator }
    }

    /// Video inputs in host order. Enumeration failures yield an empty list.
    pub async fn video_inputs(&self) -> Vec<CaptureDeviceInfo> {
        match self.enumerator.enumerate().await {
            Ok(devices) => devices
                .into_iter()
                .filter(CaptureDeviceInfo::is_video_input)
                .collect(),
            Err(error) => {
                warn!(%error, "Device enumeration failed; treating as no devices");
                Vec::new()
            }
        }
    }

    /// Device best matching `facing`, or `None` when there are no video
    /// inputs and the caller should request the facing mode generically.
    #[instrument(skip(self))]
    pub async fn resolve(&self, facing: FacingMode) -> Option<CaptureDeviceInfo> {
        let devices = self.video_inputs().await;
        let chosen = Self::choose(&devices, facing).cloned();
        match &chosen {
            Some(device) => debug!(device_id = %device.device_id, label = %device.label, "Resolved capture device"),
            None => debug!("No video inputs enumerated"),
        }
        chosen
    }

    /// Pure selection over an already-enumerated list.
    ///
    /// Front takes the first label match, rear the last. Without a match the
    /// first device is front and the last is rear.
    pub fn choose(devices: &[CaptureDeviceInfo], facing: FacingMode) -> Option<&CaptureDeviceInfo> {
        let mut matching = devices
            .iter()
            .filter(|device| label_matches(&device.label, facing));

        let by_label = match facing {
            FacingMode::User => matching.next(),
            FacingMode::Environment => matching.last(),
        };

        by_label.or_else(|| match facing {
            FacingMode::User => devices.first(),
            FacingMode::Environment => devices.last(),
        })
    }
}
