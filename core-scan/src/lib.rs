//! # Scan Correlation
//!
//! Turns the raw, bursty stream of decoded text from a camera scanner into
//! ordered sets of catalog entries to play:
//!
//! - [`EventBatcher`] collects decode events per frame window
//! - [`CorrelationEngine`] de-duplicates, resolves, debounces and caps them
//! - [`CooldownTracker`] holds per-identifier debounce state

pub mod batcher;
pub mod cooldown;
pub mod correlation;
pub mod error;

pub use batcher::{Batch, BatchReceiver, BatchWindow, EventBatcher, PushOutcome, WindowPhase};
pub use cooldown::CooldownTracker;
pub use correlation::{distinct_ids, CorrelationEngine, CorrelationOutcome, PlayableSet};
pub use error::{Result, ScanError};
