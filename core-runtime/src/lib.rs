//! # Core Runtime Module
//!
//! Foundational infrastructure shared by the scanning engine crates:
//! - Logging and tracing setup
//! - Engine configuration and tunables
//! - Event bus
//!
//! ## Overview
//!
//! Every other core crate depends on this one for its configuration types,
//! its logging conventions (including media-key redaction) and the event
//! types broadcast to observers.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{
    EngineConfig, EngineConfigBuilder, EngineTunables, PanLayout, DEBOUNCE_MS, FRAME_WINDOW_MS,
    MAX_SIMULTANEOUS_VOICES,
};
pub use error::{Error, Result};
