//! Engine façade and bootstrap.
//!
//! [`ScanEngine::bootstrap`] takes an [`EngineConfig`](core_runtime::config::EngineConfig)
//! carrying the host's bridge implementations and returns a running engine.
//! Desktop hosts enable the `desktop-shims` feature for the reqwest, file and
//! log-backed bridges from `bridge-desktop`.
//!
//! ```ignore
//! use core_runtime::config::EngineConfig;
//! use core_service::ScanEngine;
//!
//! let config = EngineConfig::builder()
//!     .catalog_source(catalog)
//!     .decode_backend(decoder)
//!     .playback_sink(sink)
//!     .decode_engine(scanner)
//!     .device_enumerator(devices)
//!     .build()?;
//!
//! let engine = ScanEngine::bootstrap(config).await?;
//! engine.start_capture(None).await?;
//! ```

pub mod engine;
pub mod error;

pub use engine::ScanEngine;
pub use error::{CoreError, Result};

#[cfg(feature = "desktop-shims")]
pub use bridge_desktop::{FetchedCatalog, LogNotifier, ReqwestMediaFetcher, TokioFileFetcher};
