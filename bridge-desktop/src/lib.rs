//! # Desktop Bridge Implementations
//!
//! Default implementations of the media-side bridge traits for desktop
//! platforms (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `ReqwestMediaFetcher`: `MediaFetcher` over HTTP(S) using `reqwest`
//! - `TokioFileFetcher`: `MediaFetcher` over a local directory using `tokio::fs`
//! - `FetchedCatalog`: `CatalogSource` reading one document through any fetcher
//! - `LogNotifier`: `HitNotifier` writing hits to `tracing`
//!
//! Camera capture and audio output stay with the host application.
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use bridge_desktop::{FetchedCatalog, ReqwestMediaFetcher};
//!
//! let fetcher = Arc::new(ReqwestMediaFetcher::with_base_url("https://cdn.example.com/kit/")?);
//! let catalog = FetchedCatalog::new(fetcher.clone(), "catalog.json");
//! ```

mod catalog;
mod filesystem;
mod http;
mod notifier;

pub use catalog::FetchedCatalog;
pub use filesystem::TokioFileFetcher;
pub use http::{ReqwestMediaFetcher, RetryPolicy};
pub use notifier::LogNotifier;
