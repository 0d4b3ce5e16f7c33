//! # Capture
//!
//! Chooses which camera the host decode engine should open and drives the
//! capture lifecycle:
//!
//! - [`CaptureSelector`] maps a facing preference onto an enumerated device
//! - [`CaptureController`] starts, switches and stops capture with one
//!   fallback retry and generation-versioned start attempts

pub mod controller;
pub mod error;
pub mod selector;

pub use controller::{ActiveCapture, CaptureController};
pub use core_runtime::events::CaptureState;
pub use error::{CaptureError, Result};
pub use selector::{CaptureSelector, FRONT_LABEL_PATTERNS, REAR_LABEL_PATTERNS};
