//! Workspace placeholder crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates (e.g., `core-service`, `core-playback`). Host applications
//! can depend on `tonescan-workspace` and enable the documented features
//! without needing to wire each crate individually:
//!
//! - `desktop-shims`: desktop bridge implementations (reqwest/tokio fetchers,
//!   tracing-backed notifier) wired into `core-service`.
//! - `symphonia-decoder`: the symphonia-backed audio decode backend.

#[cfg(feature = "desktop-shims")]
pub use core_service as service;

#[cfg(feature = "symphonia-decoder")]
pub use core_playback as playback;
