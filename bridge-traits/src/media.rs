//! Catalog and media payload sources.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Source of the identifier → media catalog document.
///
/// Called exactly once at engine bootstrap. The returned bytes are parsed by
/// the catalog crate; implementations only deliver the raw document.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch the complete catalog document.
    async fn load_document(&self) -> Result<Bytes>;

    /// Human-readable description of where the catalog comes from, for logs.
    fn describe(&self) -> String {
        "catalog".to_string()
    }
}

/// Fetches binary media payloads addressed by a URL-like key.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::media::MediaFetcher;
///
/// async fn payload_len(fetcher: &dyn MediaFetcher) -> usize {
///     fetcher.fetch("sounds/C.mp3").await.map(|b| b.len()).unwrap_or(0)
/// }
/// ```
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Fetch the encoded payload stored under `key`.
    ///
    /// Returns [`BridgeError::NotFound`](crate::error::BridgeError::NotFound)
    /// when the key does not resolve to anything.
    async fn fetch(&self, key: &str) -> Result<Bytes>;
}
